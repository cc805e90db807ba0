// Standard library imports
use std::{
    collections::HashMap,
    env,
    fmt::{self, Display, Formatter},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

// Third party imports
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use tracing::info;

// Internal imports
use crate::error::{SecurityError, SecurityResult};
use crate::utils::redact_url;

const DEFAULT_MAX_ALLOWANCE_CHECK: usize = 100;
const DEFAULT_BATCH_SIZE: usize = 5;
const DEFAULT_BATCH_DELAY_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 180;

/// Mạng được hỗ trợ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Ethereum,
    Sepolia,
}

impl NetworkKind {
    pub const ALL: [NetworkKind; 2] = [NetworkKind::Ethereum, NetworkKind::Sepolia];

    /// Chọn mạng theo nội dung yêu cầu, mặc định là mainnet
    pub fn select(text: &str) -> Self {
        if text.to_lowercase().contains("sepolia") {
            NetworkKind::Sepolia
        } else {
            NetworkKind::Ethereum
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            NetworkKind::Ethereum => "ethereum",
            NetworkKind::Sepolia => "sepolia",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            NetworkKind::Ethereum => 1,
            NetworkKind::Sepolia => 11_155_111,
        }
    }

    pub fn explorer_base_url(&self) -> &'static str {
        match self {
            NetworkKind::Ethereum => "https://api.etherscan.io/api",
            NetworkKind::Sepolia => "https://api-sepolia.etherscan.io/api",
        }
    }

    fn alchemy_url(&self, api_key: &str) -> String {
        match self {
            NetworkKind::Ethereum => format!("https://eth-mainnet.g.alchemy.com/v2/{}", api_key),
            NetworkKind::Sepolia => format!("https://eth-sepolia.g.alchemy.com/v2/{}", api_key),
        }
    }
}

impl Display for NetworkKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Tên hiển thị của chain theo chain ID
pub fn chain_name(chain_id: u64) -> String {
    let name = match chain_id {
        1 => "Ethereum Mainnet",
        5 => "Goerli Testnet",
        11_155_111 => "Sepolia Testnet",
        137 => "Polygon Mainnet",
        80_001 => "Polygon Mumbai",
        42_161 => "Arbitrum One",
        10 => "Optimism",
        56 => "BNB Smart Chain",
        43_114 => "Avalanche C-Chain",
        other => return format!("Unknown Network ({})", other),
    };
    name.to_string()
}

/// Cấu hình cho một mạng
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub kind: NetworkKind,
    pub chain_id: u64,
    /// `None` khi chưa cấu hình RPC cho mạng này
    pub rpc_url: Option<String>,
    pub explorer_api_key: String,
    pub explorer_base_url: String,
    /// Timeout cho từng request
    pub request_timeout: Duration,
    /// Chỉ quét log trong N block gần nhất
    pub block_scan_range: Option<u64>,
}

impl NetworkConfig {
    pub fn rpc_url(&self) -> SecurityResult<&str> {
        self.rpc_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                SecurityError::Config(format!("RPC URL not configured for {}", self.kind))
            })
    }
}

/// Bảng mạng bất biến, tạo một lần khi khởi động
#[derive(Debug, Clone, Default)]
pub struct NetworkTable {
    networks: HashMap<NetworkKind, NetworkConfig>,
}

impl NetworkTable {
    pub fn new(configs: impl IntoIterator<Item = NetworkConfig>) -> Self {
        Self {
            networks: configs.into_iter().map(|cfg| (cfg.kind, cfg)).collect(),
        }
    }

    pub fn get(&self, kind: NetworkKind) -> SecurityResult<&NetworkConfig> {
        self.networks
            .get(&kind)
            .ok_or_else(|| SecurityError::Config(format!("network {} is not configured", kind)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.networks.values()
    }
}

/// Cách tìm spender cho mỗi token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpenderDiscovery {
    /// Đọc log Approval lịch sử của chủ ví
    ApprovalEvents,
    /// Thử mọi spender trong registry
    KnownSpenderAllowlist,
}

impl FromStr for SpenderDiscovery {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "events" | "approval_events" => Ok(SpenderDiscovery::ApprovalEvents),
            "allowlist" | "known_spenders" => Ok(SpenderDiscovery::KnownSpenderAllowlist),
            other => Err(format!("unknown spender discovery strategy '{}'", other)),
        }
    }
}

/// Cấu hình cho bộ tổng hợp allowance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowanceSettings {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub max_tokens: usize,
    pub discovery: SpenderDiscovery,
}

impl Default for AllowanceSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
            max_tokens: DEFAULT_MAX_ALLOWANCE_CHECK,
            discovery: SpenderDiscovery::ApprovalEvents,
        }
    }
}

/// Cấu hình ứng dụng
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub networks: NetworkTable,
    pub allowance: AllowanceSettings,
    /// Giới hạn tổng thời gian cho mỗi yêu cầu
    pub analysis_timeout: Duration,
    pub known_spenders_file: Option<PathBuf>,
}

impl AppConfig {
    /// Đọc cấu hình từ biến môi trường (và file .env nếu có)
    pub fn from_env() -> SecurityResult<Self> {
        dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        for network in config.networks.iter() {
            info!(
                network = %network.kind,
                chain_id = network.chain_id,
                rpc_url = %network.rpc_url.as_deref().map(redact_url).unwrap_or_else(|| "<none>".to_string()),
                "Cấu hình mạng"
            );
        }
        Ok(config)
    }

    /// Đọc cấu hình từ một hàm tra cứu bất kỳ, gom tất cả lỗi lại
    pub fn from_lookup<F>(lookup: F) -> SecurityResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut errors: Vec<String> = Vec::new();

        let api_key = get("ETHERSCAN_API_KEY").unwrap_or_else(|| {
            errors.push("ETHERSCAN_API_KEY: Etherscan API key is required".to_string());
            String::new()
        });

        let max_tokens = parse_positive(&get, "MAX_ALLOWANCE_CHECK", DEFAULT_MAX_ALLOWANCE_CHECK as u64, &mut errors);
        let batch_size = parse_positive(&get, "BATCH_SIZE", DEFAULT_BATCH_SIZE as u64, &mut errors);
        let request_timeout = parse_positive(&get, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS, &mut errors);
        let analysis_timeout = parse_positive(&get, "ANALYSIS_TIMEOUT_SECS", DEFAULT_ANALYSIS_TIMEOUT_SECS, &mut errors);

        let batch_delay_ms = match get("BATCH_DELAY_MS") {
            Some(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
                errors.push(format!("BATCH_DELAY_MS: expected a number, got '{}'", raw));
                DEFAULT_BATCH_DELAY_MS
            }),
            None => DEFAULT_BATCH_DELAY_MS,
        };

        let block_scan_range = get("BLOCK_SCAN_RANGE").and_then(|raw| match raw.parse::<u64>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                errors.push(format!("BLOCK_SCAN_RANGE: expected a positive number, got '{}'", raw));
                None
            }
        });

        let discovery = match get("SPENDER_DISCOVERY") {
            Some(raw) => raw.parse::<SpenderDiscovery>().unwrap_or_else(|e| {
                errors.push(format!("SPENDER_DISCOVERY: {}", e));
                SpenderDiscovery::ApprovalEvents
            }),
            None => SpenderDiscovery::ApprovalEvents,
        };

        let rpc_api_key = get("RPC_API_KEY");
        let rpc_url_for = |kind: NetworkKind| -> Option<String> {
            let explicit = match kind {
                NetworkKind::Ethereum => get("ETHEREUM_RPC_URL").or_else(|| get("RPC_URL")),
                NetworkKind::Sepolia => get("SEPOLIA_RPC_URL"),
            };
            explicit.or_else(|| rpc_api_key.as_deref().map(|key| kind.alchemy_url(key)))
        };

        let networks: Vec<NetworkConfig> = NetworkKind::ALL
            .iter()
            .map(|&kind| NetworkConfig {
                kind,
                chain_id: kind.chain_id(),
                rpc_url: rpc_url_for(kind),
                explorer_api_key: api_key.clone(),
                explorer_base_url: kind.explorer_base_url().to_string(),
                request_timeout: Duration::from_secs(request_timeout),
                block_scan_range,
            })
            .collect();

        if networks.iter().all(|n| n.rpc_url.is_none()) {
            errors.push("RPC_URL: RPC URL is required (set RPC_URL, ETHEREUM_RPC_URL, SEPOLIA_RPC_URL or RPC_API_KEY)".to_string());
        }

        if !errors.is_empty() {
            return Err(SecurityError::Config(format!(
                "configuration validation failed:\n{}",
                errors.join("\n")
            )));
        }

        Ok(Self {
            networks: NetworkTable::new(networks),
            allowance: AllowanceSettings {
                batch_size: batch_size as usize,
                batch_delay: Duration::from_millis(batch_delay_ms),
                max_tokens: max_tokens as usize,
                discovery,
            },
            analysis_timeout: Duration::from_secs(analysis_timeout),
            known_spenders_file: get("KNOWN_SPENDERS_FILE").map(PathBuf::from),
        })
    }
}

fn parse_positive<G>(get: &G, key: &str, default: u64, errors: &mut Vec<String>) -> u64
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(n) if n > 0 => n,
            _ => {
                errors.push(format!("{}: expected a positive number, got '{}'", key, raw));
                default
            }
        },
        None => default,
    }
}

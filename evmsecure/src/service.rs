// Standard library imports
use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

// Third party imports
use tracing::{error, info, warn};

// Internal imports
use crate::allowance::{AllowanceAggregator, BatchBackoff};
use crate::contract_safety::ContractRiskAnalyzer;
use crate::report::{format_allowance_message, format_analysis_message};
use evmsecure_blockchain::{with_timeout, ChainDataClient, EvmChainClient};
use evmsecure_common::{
    chain_name, extract_address, AllowanceResult, AllowanceSettings, AppConfig,
    KnownSpenderRegistry, NetworkKind, SecurityAnalysis, SecurityError, SecurityResult,
};

/// Loại yêu cầu người dùng gửi tới
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Allowances,
    Contract,
}

impl FromStr for RequestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allowances" | "allowance" => Ok(RequestKind::Allowances),
            "contract" | "safety" => Ok(RequestKind::Contract),
            other => Err(format!("unknown command '{}'", other)),
        }
    }
}

impl Display for RequestKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Allowances => f.write_str("allowances"),
            RequestKind::Contract => f.write_str("contract"),
        }
    }
}

/// Điểm vào cho các yêu cầu dạng văn bản tự do.
///
/// Mỗi mạng có một client dùng chung, tạo một lần khi khởi động.
pub struct SecurityService {
    clients: HashMap<NetworkKind, Arc<dyn ChainDataClient>>,
    registry: Arc<KnownSpenderRegistry>,
    settings: AllowanceSettings,
    analysis_timeout: Duration,
    backoff: Option<Arc<dyn BatchBackoff>>,
}

impl SecurityService {
    pub fn new(
        clients: HashMap<NetworkKind, Arc<dyn ChainDataClient>>,
        registry: Arc<KnownSpenderRegistry>,
        settings: AllowanceSettings,
        analysis_timeout: Duration,
    ) -> Self {
        Self {
            clients,
            registry,
            settings,
            analysis_timeout,
            backoff: None,
        }
    }

    /// Tạo service từ cấu hình, bỏ qua các mạng chưa có RPC
    pub fn from_config(config: &AppConfig) -> SecurityResult<Self> {
        let registry = match &config.known_spenders_file {
            Some(path) => KnownSpenderRegistry::load_with_file(path)?,
            None => KnownSpenderRegistry::builtin(),
        };

        let mut clients: HashMap<NetworkKind, Arc<dyn ChainDataClient>> = HashMap::new();
        for network in config.networks.iter() {
            if network.rpc_url.is_none() {
                warn!(network = %network.kind, "Chưa cấu hình RPC, bỏ qua mạng");
                continue;
            }
            let client = EvmChainClient::new(network)?;
            clients.insert(network.kind, Arc::new(client));
        }

        info!(
            networks = clients.len(),
            known_spenders = registry.len(),
            "Đã khởi tạo security service"
        );

        Ok(Self::new(
            clients,
            Arc::new(registry),
            config.allowance.clone(),
            config.analysis_timeout,
        ))
    }

    /// Thay chính sách nghỉ giữa các batch allowance
    pub fn with_backoff(mut self, backoff: Arc<dyn BatchBackoff>) -> Self {
        self.backoff = Some(backoff);
        self
    }

    fn client_for(&self, text: &str) -> SecurityResult<(NetworkKind, Arc<dyn ChainDataClient>)> {
        let network = NetworkKind::select(text);
        let client = self.clients.get(&network).cloned().ok_or_else(|| {
            SecurityError::Config(format!("RPC URL not configured for {}", network))
        })?;
        Ok((network, client))
    }

    /// Kiểm tra allowance cho địa chỉ đầu tiên trong văn bản
    pub async fn check_allowances(&self, text: &str) -> SecurityResult<AllowanceResult> {
        let address = extract_address(text).ok_or(SecurityError::NoAddressFound)?;
        let (network, client) = self.client_for(text)?;
        info!(
            address,
            network = %network,
            chain = %chain_name(client.chain_id()),
            "Nhận yêu cầu kiểm tra allowance"
        );

        let mut aggregator =
            AllowanceAggregator::new(client, self.registry.clone(), self.settings.clone());
        if let Some(backoff) = &self.backoff {
            aggregator = aggregator.with_backoff(backoff.clone());
        }

        with_timeout(
            "allowance check",
            self.analysis_timeout,
            aggregator.get_allowances(address),
        )
        .await
    }

    /// Phân tích contract cho địa chỉ đầu tiên trong văn bản
    pub async fn check_contract(&self, text: &str) -> SecurityResult<SecurityAnalysis> {
        let address = extract_address(text).ok_or(SecurityError::NoAddressFound)?;
        let (network, client) = self.client_for(text)?;
        info!(
            address,
            network = %network,
            chain = %chain_name(client.chain_id()),
            "Nhận yêu cầu phân tích contract"
        );

        let analyzer = ContractRiskAnalyzer::new(client);
        with_timeout(
            "contract analysis",
            self.analysis_timeout,
            analyzer.analyze(address),
        )
        .await
    }

    /// Xử lý yêu cầu và trả về báo cáo dạng văn bản
    pub async fn render(&self, kind: RequestKind, text: &str) -> SecurityResult<String> {
        match kind {
            RequestKind::Allowances => self
                .check_allowances(text)
                .await
                .map(|result| format_allowance_message(&result)),
            RequestKind::Contract => self
                .check_contract(text)
                .await
                .map(|analysis| format_analysis_message(&analysis)),
        }
    }

    /// Như `render` nhưng lỗi được chuyển thành thông báo cho người dùng
    pub async fn respond(&self, kind: RequestKind, text: &str) -> String {
        match self.render(kind, text).await {
            Ok(message) => message,
            Err(e) => {
                if e.is_input_error() {
                    warn!(request = %kind, "Yêu cầu không hợp lệ: {}", e);
                } else {
                    error!(request = %kind, "Yêu cầu thất bại: {}", e);
                }
                e.user_message()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use ethers::types::{Address, Bytes, H256, U256};
    use evmsecure_blockchain::SourceInfo;
    use evmsecure_common::TokenMetadata;

    #[test]
    fn test_request_kind_parse() {
        assert_eq!("allowances".parse::<RequestKind>(), Ok(RequestKind::Allowances));
        assert_eq!("Contract".parse::<RequestKind>(), Ok(RequestKind::Contract));
        assert!("swap".parse::<RequestKind>().is_err());
    }

    #[tokio::test]
    async fn test_missing_address_is_input_error() {
        let service = SecurityService::new(
            HashMap::new(),
            Arc::new(KnownSpenderRegistry::builtin()),
            AllowanceSettings::default(),
            Duration::from_secs(5),
        );
        let err = service.check_contract("is this safe?").await.unwrap_err();
        assert_eq!(err, SecurityError::NoAddressFound);
        assert_eq!(
            service.respond(RequestKind::Allowances, "hello").await,
            "Please provide a valid Ethereum address."
        );
    }

    #[tokio::test]
    async fn test_unconfigured_network() {
        let service = SecurityService::new(
            HashMap::new(),
            Arc::new(KnownSpenderRegistry::builtin()),
            AllowanceSettings::default(),
            Duration::from_secs(5),
        );
        let err = service
            .check_contract("check 0x742d35Cc6634C0532925a3b844Bc454e4438f44e on sepolia")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SecurityError::Config("RPC URL not configured for sepolia".to_string())
        );
    }

    #[tokio::test]
    async fn test_transaction_hash_is_invalid_address() {
        // Chuỗi hex dài hơn địa chỉ phải bị từ chối trước mọi lời gọi mạng
        let mut clients: HashMap<NetworkKind, Arc<dyn ChainDataClient>> = HashMap::new();
        clients.insert(NetworkKind::Ethereum, Arc::new(NoNetwork));
        let service = SecurityService::new(
            clients,
            Arc::new(KnownSpenderRegistry::builtin()),
            AllowanceSettings::default(),
            Duration::from_secs(5),
        );
        let tx_hash = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

        let err = service
            .check_contract(&format!("check {}", tx_hash))
            .await
            .unwrap_err();
        assert_eq!(err, SecurityError::InvalidAddress(tx_hash.to_string()));

        let err = service
            .check_allowances(&format!("allowances for {}", tx_hash))
            .await
            .unwrap_err();
        assert_eq!(err, SecurityError::InvalidAddress(tx_hash.to_string()));
        assert_eq!(
            service.respond(RequestKind::Contract, tx_hash).await,
            "Please provide a valid Ethereum address."
        );
    }

    /// Client panic ở mọi lời gọi mạng
    struct NoNetwork;

    #[async_trait::async_trait]
    impl ChainDataClient for NoNetwork {
        fn chain_id(&self) -> u64 {
            1
        }

        async fn get_code(&self, _: Address) -> SecurityResult<Bytes> {
            panic!("unexpected get_code")
        }

        async fn get_storage_at(&self, _: Address, _: H256) -> SecurityResult<H256> {
            panic!("unexpected get_storage_at")
        }

        async fn get_verified_source(&self, _: Address) -> SecurityResult<SourceInfo> {
            panic!("unexpected get_verified_source")
        }

        async fn get_first_transaction(&self, _: Address) -> Option<DateTime<Utc>> {
            panic!("unexpected get_first_transaction")
        }

        async fn get_token_transfer_history(&self, _: Address) -> SecurityResult<Vec<Address>> {
            panic!("unexpected get_token_transfer_history")
        }

        async fn get_token_metadata(&self, _: Address) -> SecurityResult<TokenMetadata> {
            panic!("unexpected get_token_metadata")
        }

        async fn get_allowance(&self, _: Address, _: Address, _: Address) -> SecurityResult<U256> {
            panic!("unexpected get_allowance")
        }

        async fn get_approval_spenders(&self, _: Address, _: Address) -> SecurityResult<Vec<Address>> {
            panic!("unexpected get_approval_spenders")
        }
    }
}

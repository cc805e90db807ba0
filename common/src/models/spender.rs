// External imports
use ethers::core::types::Address;

// Standard library imports
use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
    path::Path,
};

// Third party imports
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// Internal imports
use crate::error::{SecurityError, SecurityResult};
use crate::utils::parse_address;

/// Mức rủi ro của một spender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpenderRisk {
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
    Unknown,
}

impl Display for SpenderRisk {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            SpenderRisk::Low => "LOW",
            SpenderRisk::Medium => "MEDIUM",
            SpenderRisk::High => "HIGH",
            SpenderRisk::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// Thông tin phân loại spender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpenderInfo {
    /// Tên hiển thị
    pub name: String,
    /// Giao thức
    pub protocol: String,
    /// Mức rủi ro
    pub risk: SpenderRisk,
}

impl SpenderInfo {
    /// Giá trị thay thế cho spender không có trong registry
    pub fn unknown() -> Self {
        Self {
            name: "Unknown Protocol".to_string(),
            protocol: "Unknown".to_string(),
            risk: SpenderRisk::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        self.risk != SpenderRisk::Unknown
    }
}

/// Một dòng trong file registry JSON
#[derive(Debug, Clone, Deserialize)]
struct SpenderEntry {
    address: String,
    name: String,
    protocol: String,
    risk: SpenderRisk,
}

/// Bảng tra cứu spender đã biết, chỉ đọc sau khi khởi tạo
#[derive(Debug, Clone, Default)]
pub struct KnownSpenderRegistry {
    entries: HashMap<Address, SpenderInfo>,
    order: Vec<Address>,
}

impl KnownSpenderRegistry {
    /// Registry rỗng
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry với các router phổ biến trên Ethereum mainnet
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        let builtin = [
            ("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D", "Uniswap V2 Router", "Uniswap"),
            ("0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45", "Uniswap V3 Router", "Uniswap"),
            ("0xE592427A0AEce92De3Edee1F18E0157C05861564", "Uniswap V3 SwapRouter", "Uniswap"),
            ("0x000000000022D473030F116dDEE9F6B43aC78BA3", "Permit2", "Uniswap"),
            ("0x1111111254EEB25477B68fb85Ed929f73A960582", "1inch Aggregation Router V5", "1inch"),
            ("0xDef1C0ded9bec7F1a1670819833240f027b25EfF", "0x Exchange Proxy", "0x"),
        ];
        for (address, name, protocol) in builtin {
            // Dùng from_str trực tiếp vì bảng này là hằng số
            if let Ok(address) = address.parse::<Address>() {
                registry.insert(
                    address,
                    SpenderInfo {
                        name: name.to_string(),
                        protocol: protocol.to_string(),
                        risk: SpenderRisk::Low,
                    },
                );
            }
        }
        registry
    }

    /// Đọc thêm spender từ chuỗi JSON (mảng các entry)
    pub fn extend_from_json(&mut self, json: &str) -> SecurityResult<usize> {
        let entries: Vec<SpenderEntry> = serde_json::from_str(json)
            .map_err(|e| SecurityError::Config(format!("known spenders file: {}", e)))?;
        let count = entries.len();
        for entry in entries {
            let address = parse_address(&entry.address).map_err(|e| {
                SecurityError::Config(format!("known spenders file: {}", e))
            })?;
            self.insert(
                address,
                SpenderInfo {
                    name: entry.name,
                    protocol: entry.protocol,
                    risk: entry.risk,
                },
            );
        }
        debug!(count, "Đã nạp spender từ JSON");
        Ok(count)
    }

    /// Registry mặc định cộng thêm các entry trong file
    pub fn load_with_file(path: &Path) -> SecurityResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SecurityError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut registry = Self::builtin();
        let added = registry.extend_from_json(&content)?;
        info!(path = %path.display(), added, "Đã nạp registry spender");
        Ok(registry)
    }

    fn insert(&mut self, address: Address, info: SpenderInfo) {
        if self.entries.insert(address, info).is_none() {
            self.order.push(address);
        }
    }

    /// Tra cứu, không bao giờ lỗi
    pub fn classify(&self, spender: &Address) -> SpenderInfo {
        self.entries
            .get(spender)
            .cloned()
            .unwrap_or_else(SpenderInfo::unknown)
    }

    pub fn get(&self, spender: &Address) -> Option<&SpenderInfo> {
        self.entries.get(spender)
    }

    /// Danh sách địa chỉ theo thứ tự thêm vào
    pub fn addresses(&self) -> &[Address] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let registry = KnownSpenderRegistry::builtin();
        let lower: Address = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d".parse().unwrap();
        let info = registry.classify(&lower);
        assert_eq!(info.name, "Uniswap V2 Router");
        assert_eq!(info.protocol, "Uniswap");
        assert_eq!(info.risk, SpenderRisk::Low);
        assert_eq!(registry.addresses()[0], lower);
    }

    #[test]
    fn test_unknown_spender_sentinel() {
        let registry = KnownSpenderRegistry::builtin();
        let stranger: Address = "0x000000000000000000000000000000000000dead".parse().unwrap();
        let info = registry.classify(&stranger);
        assert_eq!(info, SpenderInfo::unknown());
        assert_eq!(info.name, "Unknown Protocol");
        assert_eq!(info.protocol, "Unknown");
        assert!(!info.is_known());
    }

    #[test]
    fn test_extend_from_json() {
        let mut registry = KnownSpenderRegistry::empty();
        let json = r#"[
            {"address": "0x00000000000000adc04c56bf30ac9d3c0aaf14dc", "name": "Seaport 1.5", "protocol": "OpenSea", "risk": "MEDIUM"}
        ]"#;
        assert_eq!(registry.extend_from_json(json).unwrap(), 1);
        let address: Address = "0x00000000000000adc04c56bf30ac9d3c0aaf14dc".parse().unwrap();
        assert_eq!(registry.classify(&address).risk, SpenderRisk::Medium);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_extend_from_json_rejects_bad_address() {
        let mut registry = KnownSpenderRegistry::empty();
        let json = r#"[{"address": "0x123", "name": "x", "protocol": "y", "risk": "LOW"}]"#;
        assert!(matches!(
            registry.extend_from_json(json),
            Err(SecurityError::Config(_))
        ));
    }
}

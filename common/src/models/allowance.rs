// External imports
use ethers::core::types::{Address, U256};

// Third party imports
use serde::{Deserialize, Serialize};

// Internal imports
use super::spender::SpenderInfo;

/// Metadata ERC-20 của token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

impl TokenMetadata {
    /// Giá trị thay thế khi không đọc được metadata
    pub fn unknown(address: Address) -> Self {
        Self {
            address,
            symbol: "UNKNOWN".to_string(),
            name: "Unknown Token".to_string(),
            decimals: 18,
        }
    }
}

/// Một quyền chi tiêu còn hiệu lực
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAllowance {
    pub token: Address,
    pub spender: Address,
    /// Số lượng theo đơn vị nhỏ nhất, luôn khác 0
    #[serde(with = "decimal_u256")]
    pub amount: U256,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub spender_info: SpenderInfo,
}

impl TokenAllowance {
    /// Trả về `None` khi amount bằng 0
    pub fn new(
        metadata: &TokenMetadata,
        spender: Address,
        amount: U256,
        spender_info: SpenderInfo,
    ) -> Option<Self> {
        if amount.is_zero() {
            return None;
        }
        Some(Self {
            token: metadata.address,
            spender,
            amount,
            symbol: metadata.symbol.clone(),
            name: metadata.name.clone(),
            decimals: metadata.decimals,
            spender_info,
        })
    }
}

/// Kết quả kiểm tra allowance của một ví
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceResult {
    pub address: Address,
    pub allowances: Vec<TokenAllowance>,
    /// Unix timestamp (ms)
    pub timestamp: u64,
    pub chain_id: u64,
}

/// Serialize U256 dưới dạng chuỗi số thập phân
mod decimal_u256 {
    use ethers::core::types::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_dec_str(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> TokenMetadata {
        TokenMetadata {
            address: Address::repeat_byte(0x11),
            symbol: "USDC".to_string(),
            name: "USD Coin".to_string(),
            decimals: 6,
        }
    }

    #[test]
    fn test_zero_amount_is_rejected() {
        assert!(TokenAllowance::new(
            &metadata(),
            Address::repeat_byte(0x22),
            U256::zero(),
            SpenderInfo::unknown()
        )
        .is_none());
    }

    #[test]
    fn test_amount_serializes_as_decimal_string() {
        let allowance = TokenAllowance::new(
            &metadata(),
            Address::repeat_byte(0x22),
            U256::MAX,
            SpenderInfo::unknown(),
        )
        .unwrap();
        let json = serde_json::to_value(&allowance).unwrap();
        assert_eq!(
            json["amount"],
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
        let back: TokenAllowance = serde_json::from_value(json).unwrap();
        assert_eq!(back.amount, U256::MAX);
    }

    #[test]
    fn test_unknown_metadata_sentinel() {
        let address = Address::repeat_byte(0x33);
        let unknown = TokenMetadata::unknown(address);
        assert_eq!(unknown.symbol, "UNKNOWN");
        assert_eq!(unknown.name, "Unknown Token");
        assert_eq!(unknown.decimals, 18);
        assert_eq!(unknown.address, address);
    }
}

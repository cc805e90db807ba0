// External imports
use ethers::abi::Abi;

// Internal imports
use evmsecure_common::{SecurityError, SecurityResult};

/// ABI tối thiểu của ERC-20 dùng cho việc đọc metadata và allowance
pub const ERC20_ABI_JSON: &str = r#"[
    {"constant":true,"inputs":[],"name":"name","outputs":[{"name":"","type":"string"}],"stateMutability":"view","type":"function"},
    {"constant":true,"inputs":[],"name":"symbol","outputs":[{"name":"","type":"string"}],"stateMutability":"view","type":"function"},
    {"constant":true,"inputs":[],"name":"decimals","outputs":[{"name":"","type":"uint8"}],"stateMutability":"view","type":"function"},
    {"constant":true,"inputs":[{"name":"owner","type":"address"},{"name":"spender","type":"address"}],"name":"allowance","outputs":[{"name":"","type":"uint256"}],"stateMutability":"view","type":"function"},
    {"anonymous":false,"inputs":[{"indexed":true,"name":"owner","type":"address"},{"indexed":true,"name":"spender","type":"address"},{"indexed":false,"name":"value","type":"uint256"}],"name":"Approval","type":"event"}
]"#;

/// Chữ ký event Approval
pub const APPROVAL_EVENT: &str = "Approval(address,address,uint256)";

/// Parse ABI ERC-20
pub fn erc20_abi() -> SecurityResult<Abi> {
    serde_json::from_str(ERC20_ABI_JSON)
        .map_err(|e| SecurityError::Config(format!("invalid ERC20 ABI: {}", e)))
}

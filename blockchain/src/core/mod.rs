// External imports
use ethers::types::{Address, Bytes, H256, U256};

// Third party imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// Internal imports
use evmsecure_common::{SecurityResult, TokenMetadata};

pub mod evm_client;
pub mod explorer;
pub mod timeout;

pub use evm_client::*;
pub use explorer::*;
pub use timeout::*;

/// Trait định nghĩa các thao tác đọc dữ liệu on-chain và explorer.
///
/// Các lần đọc quan trọng cho an toàn (code, storage, mã nguồn, lịch sử token)
/// trả lỗi lên trên. Các lần đọc chỉ mang tính hiển thị thì tự xuống cấp.
#[async_trait]
pub trait ChainDataClient: Send + Sync {
    /// Chain ID theo cấu hình, không gọi mạng
    fn chain_id(&self) -> u64;

    /// Bytecode đã triển khai, rỗng nếu không phải contract
    async fn get_code(&self, address: Address) -> SecurityResult<Bytes>;

    /// Một word trong storage, slot trống và slot bằng 0 là như nhau
    async fn get_storage_at(&self, address: Address, slot: H256) -> SecurityResult<H256>;

    /// Trạng thái xác minh và mã nguồn trên explorer
    async fn get_verified_source(&self, address: Address) -> SecurityResult<SourceInfo>;

    /// Thời điểm giao dịch đầu tiên, `None` khi không lấy được
    async fn get_first_transaction(&self, address: Address) -> Option<DateTime<Utc>>;

    /// Các token contract mà địa chỉ từng giao dịch
    async fn get_token_transfer_history(&self, address: Address) -> SecurityResult<Vec<Address>>;

    /// symbol, name, decimals của token
    async fn get_token_metadata(&self, token: Address) -> SecurityResult<TokenMetadata>;

    /// allowance(owner, spender)
    async fn get_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> SecurityResult<U256>;

    /// Các spender từng được owner approve trên token, theo thứ tự log
    async fn get_approval_spenders(
        &self,
        token: Address,
        owner: Address,
    ) -> SecurityResult<Vec<Address>>;
}

// Third party imports
use thiserror::Error;

/// Lỗi của engine phân tích
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecurityError {
    /// Địa chỉ không đúng định dạng hoặc sai checksum
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    /// Địa chỉ không có bytecode
    #[error("No contract found at address: {0}")]
    NotAContract(String),
    /// Lỗi RPC hoặc explorer trên một lần đọc quan trọng
    #[error("Network error: {0}")]
    Network(String),
    /// Quá thời gian chờ
    #[error("Timeout after {after_ms}ms: {operation}")]
    Timeout {
        /// Tên thao tác
        operation: String,
        /// Thời gian đã chờ (ms)
        after_ms: u64,
    },
    /// Lỗi cấu hình
    #[error("Config error: {0}")]
    Config(String),
    /// Không tìm thấy địa chỉ trong yêu cầu
    #[error("No address found in request")]
    NoAddressFound,
}

impl SecurityError {
    /// Tạo lỗi mạng từ bất kỳ lỗi nào hiển thị được
    pub fn network(context: &str, err: impl std::fmt::Display) -> Self {
        SecurityError::Network(format!("{}: {}", context, err))
    }

    /// Lỗi do đầu vào của người dùng, không nên retry
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SecurityError::InvalidAddress(_) | SecurityError::NoAddressFound
        )
    }

    /// Thông báo cho người dùng cuối, không bao giờ chứa stack trace
    pub fn user_message(&self) -> String {
        match self {
            SecurityError::InvalidAddress(_) | SecurityError::NoAddressFound => {
                "Please provide a valid Ethereum address.".to_string()
            }
            SecurityError::NotAContract(address) => {
                format!("No contract found at address {}.", address)
            }
            SecurityError::Network(_) | SecurityError::Timeout { .. } => {
                format!("Analysis could not complete: {}", self)
            }
            SecurityError::Config(msg) => {
                format!("Analysis could not complete: service is not configured ({})", msg)
            }
        }
    }
}

/// Kiểu kết quả chung
pub type SecurityResult<T> = Result<T, SecurityError>;

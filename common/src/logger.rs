// Third party imports
use tracing_subscriber::{fmt, EnvFilter};

/// Mức log mặc định khi chưa đặt RUST_LOG
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Khởi tạo tracing subscriber theo biến RUST_LOG.
///
/// Gọi nhiều lần không gây lỗi, lần sau sẽ bị bỏ qua.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

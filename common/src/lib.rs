// Modules
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod utils;

// Re-exports
pub use config::{
    chain_name, AllowanceSettings, AppConfig, NetworkConfig, NetworkKind, NetworkTable,
    SpenderDiscovery,
};
pub use error::{SecurityError, SecurityResult};
pub use logger::init_tracing;
pub use models::*;
pub use utils::{current_timestamp_ms, display_address, extract_address, parse_address};

// Modules
pub mod abi;
pub mod core;

// Re-export các module chính
pub use crate::abi::erc20_abi;
pub use crate::core::*;

// Internal modules
mod allowance;
mod security;
mod spender;

// Re-exports
pub use allowance::*;
pub use security::*;
pub use spender::*;

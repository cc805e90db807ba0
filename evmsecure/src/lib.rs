//! Phân tích rủi ro on-chain cho mạng EVM: allowance của ví và độ an toàn của contract.

pub mod allowance;
pub mod contract_safety;
pub mod detectors;
pub mod report;
pub mod service;

// Re-exports
pub use allowance::{AllowanceAggregator, BatchBackoff, FixedBackoff, NoBackoff};
pub use contract_safety::{default_proxy_slots, ContractRiskAnalyzer, ProxySlot};
pub use detectors::{contains_opcode, HeuristicDetector, VulnerabilityDetector};
pub use report::{format_allowance_message, format_analysis_message, format_units, is_unlimited};
pub use service::{RequestKind, SecurityService};

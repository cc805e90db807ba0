// External imports
use ethers::types::{Address, H256};

// Standard library imports
use std::{str::FromStr, sync::Arc};

// Third party imports
use once_cell::sync::Lazy;
use tracing::{debug, info};

// Internal imports
use crate::detectors::{HeuristicDetector, VulnerabilityDetector};
use evmsecure_blockchain::ChainDataClient;
use evmsecure_common::{
    chain_name, display_address, parse_address, ContractFindings, SecurityAnalysis,
    SecurityError, SecurityResult,
};

/// Slot implementation theo EIP-1967
pub const EIP1967_IMPLEMENTATION_SLOT: &str =
    "0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc";
/// Slot `PROXIABLE` theo EIP-1822 (UUPS)
pub const EIP1822_PROXIABLE_SLOT: &str =
    "0xc5f16f0fcc639fa48a6947836d9850f504798523bf8c9a3a87d5876cf622bcf7";
/// Slot admin theo EIP-1967
pub const EIP1967_ADMIN_SLOT: &str =
    "0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

/// Một slot storage dùng để nhận diện proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxySlot {
    pub name: &'static str,
    pub slot: H256,
}

static DEFAULT_PROXY_SLOTS: Lazy<Vec<ProxySlot>> = Lazy::new(|| {
    [
        ("eip1967.implementation", EIP1967_IMPLEMENTATION_SLOT),
        ("eip1822.proxiable", EIP1822_PROXIABLE_SLOT),
        ("eip1967.admin", EIP1967_ADMIN_SLOT),
    ]
    .into_iter()
    .map(|(name, slot)| ProxySlot {
        name,
        slot: H256::from_str(slot).expect("proxy slot constant"),
    })
    .collect()
});

/// Danh sách slot mặc định, theo thứ tự ưu tiên
pub fn default_proxy_slots() -> Vec<ProxySlot> {
    DEFAULT_PROXY_SLOTS.clone()
}

/// Phân tích rủi ro của một smart contract
pub struct ContractRiskAnalyzer {
    client: Arc<dyn ChainDataClient>,
    detector: Box<dyn VulnerabilityDetector>,
    proxy_slots: Vec<ProxySlot>,
}

impl ContractRiskAnalyzer {
    pub fn new(client: Arc<dyn ChainDataClient>) -> Self {
        Self {
            client,
            detector: Box::new(HeuristicDetector),
            proxy_slots: default_proxy_slots(),
        }
    }

    /// Thay bộ kiểm tra lỗ hổng
    pub fn with_detector(mut self, detector: Box<dyn VulnerabilityDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Thay danh sách slot proxy
    pub fn with_proxy_slots(mut self, slots: Vec<ProxySlot>) -> Self {
        self.proxy_slots = slots;
        self
    }

    /// Phân tích contract tại địa chỉ.
    ///
    /// Địa chỉ được kiểm tra trước khi gọi mạng. Code rỗng trả về `NotAContract`.
    pub async fn analyze(&self, address: &str) -> SecurityResult<SecurityAnalysis> {
        let address = parse_address(address)?;
        let shown = display_address(&address);

        let code = self.client.get_code(address).await?;
        if code.is_empty() {
            return Err(SecurityError::NotAContract(shown));
        }
        debug!(
            address = %shown,
            size = code.len(),
            prefix = %hex::encode(&code[..code.len().min(8)]),
            "Đã lấy bytecode"
        );

        let (source, proxy, deployment_date) = tokio::join!(
            self.client.get_verified_source(address),
            self.check_proxy(address),
            self.client.get_first_transaction(address),
        );
        let source = source?;
        let proxy_implementation = proxy?;

        let issues = self
            .detector
            .scan(&code, source.source_code.as_deref().unwrap_or_default());

        let analysis = SecurityAnalysis::from_findings(ContractFindings {
            address,
            is_verified: source.is_verified,
            contract_name: source.contract_name,
            is_proxy: proxy_implementation.is_some(),
            proxy_implementation,
            deployment_date,
            issues,
        });

        info!(
            address = %shown,
            chain = %chain_name(self.client.chain_id()),
            score = analysis.security_score(),
            risk = %analysis.risk_level(),
            issues = analysis.issues().len(),
            "Phân tích contract hoàn tất"
        );
        Ok(analysis)
    }

    /// Dò các slot proxy theo thứ tự, dừng ở slot khác 0 đầu tiên
    pub async fn check_proxy(&self, address: Address) -> SecurityResult<Option<Address>> {
        for proxy_slot in &self.proxy_slots {
            let word = self.client.get_storage_at(address, proxy_slot.slot).await?;
            if !word.is_zero() {
                let implementation = Address::from_slice(&word.as_bytes()[12..]);
                debug!(
                    slot = proxy_slot.name,
                    implementation = %display_address(&implementation),
                    "Phát hiện proxy"
                );
                return Ok(Some(implementation));
            }
        }
        Ok(None)
    }
}

// External imports
use ethers::types::Address;

// Standard library imports
use std::{collections::HashSet, sync::Arc, time::Duration};

// Third party imports
use futures::future::join_all;
use tracing::{debug, info, warn};

// Internal imports
use evmsecure_blockchain::ChainDataClient;
use evmsecure_common::{
    chain_name, current_timestamp_ms, display_address, parse_address, AllowanceResult,
    AllowanceSettings, KnownSpenderRegistry, SecurityResult, SpenderDiscovery, TokenAllowance,
    TokenMetadata,
};

/// Chính sách nghỉ giữa các batch
pub trait BatchBackoff: Send + Sync {
    /// Thời gian nghỉ sau batch thứ `batch_index` (tính từ 0)
    fn delay_after(&self, batch_index: usize) -> Duration;
}

/// Nghỉ cố định sau mỗi batch
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff(pub Duration);

impl BatchBackoff for FixedBackoff {
    fn delay_after(&self, _batch_index: usize) -> Duration {
        self.0
    }
}

/// Không nghỉ
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl BatchBackoff for NoBackoff {
    fn delay_after(&self, _batch_index: usize) -> Duration {
        Duration::ZERO
    }
}

/// Bỏ trùng, giữ thứ tự gặp đầu tiên
fn dedup_in_order(addresses: Vec<Address>) -> Vec<Address> {
    let mut seen = HashSet::new();
    addresses
        .into_iter()
        .filter(|address| seen.insert(*address))
        .collect()
}

/// Tổng hợp các allowance còn hiệu lực của một ví
pub struct AllowanceAggregator {
    client: Arc<dyn ChainDataClient>,
    registry: Arc<KnownSpenderRegistry>,
    settings: AllowanceSettings,
    backoff: Arc<dyn BatchBackoff>,
}

impl AllowanceAggregator {
    pub fn new(
        client: Arc<dyn ChainDataClient>,
        registry: Arc<KnownSpenderRegistry>,
        settings: AllowanceSettings,
    ) -> Self {
        let backoff = Arc::new(FixedBackoff(settings.batch_delay));
        Self {
            client,
            registry,
            settings,
            backoff,
        }
    }

    /// Thay chính sách nghỉ giữa các batch
    pub fn with_backoff(mut self, backoff: Arc<dyn BatchBackoff>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Lấy các allowance khác 0 của chủ ví
    pub async fn get_allowances(&self, owner: &str) -> SecurityResult<AllowanceResult> {
        let owner = parse_address(owner)?;
        let shown = display_address(&owner);

        let mut tokens = self.client.get_token_transfer_history(owner).await?;
        if tokens.len() > self.settings.max_tokens {
            warn!(
                owner = %shown,
                found = tokens.len(),
                limit = self.settings.max_tokens,
                "Quá nhiều token, chỉ kiểm tra phần đầu danh sách"
            );
            tokens.truncate(self.settings.max_tokens);
        }
        info!(owner = %shown, tokens = tokens.len(), "Bắt đầu kiểm tra allowance");

        let batch_size = self.settings.batch_size.max(1);
        let batches: Vec<&[Address]> = tokens.chunks(batch_size).collect();
        let mut allowances = Vec::new();

        for (index, batch) in batches.iter().enumerate() {
            debug!(batch = index, size = batch.len(), "Xử lý batch token");
            let results = join_all(batch.iter().map(|&token| self.check_token(token, owner))).await;
            allowances.extend(results.into_iter().flatten());

            if index + 1 < batches.len() {
                let delay = self.backoff.delay_after(index);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        let chain_id = self.client.chain_id();
        info!(
            owner = %shown,
            chain = %chain_name(chain_id),
            allowances = allowances.len(),
            "Kiểm tra allowance hoàn tất"
        );

        Ok(AllowanceResult {
            address: owner,
            allowances,
            timestamp: current_timestamp_ms(),
            chain_id,
        })
    }

    /// Các allowance khác 0 của một token
    async fn check_token(&self, token: Address, owner: Address) -> Vec<TokenAllowance> {
        let (metadata, spenders) = tokio::join!(
            self.client.get_token_metadata(token),
            self.spender_candidates(token, owner),
        );
        let metadata = metadata.unwrap_or_else(|e| {
            warn!(token = %display_address(&token), "Không đọc được metadata: {}", e);
            TokenMetadata::unknown(token)
        });

        let mut allowances = Vec::new();
        for spender in spenders {
            let amount = match self.client.get_allowance(token, owner, spender).await {
                Ok(amount) => amount,
                Err(e) => {
                    debug!(
                        token = %display_address(&token),
                        spender = %display_address(&spender),
                        "Bỏ qua allowance lỗi: {}",
                        e
                    );
                    continue;
                }
            };

            let info = self.registry.classify(&spender);
            if let Some(allowance) = TokenAllowance::new(&metadata, spender, amount, info) {
                allowances.push(allowance);
            }
        }
        allowances
    }

    /// Danh sách spender cần kiểm tra theo chiến lược đã cấu hình
    async fn spender_candidates(&self, token: Address, owner: Address) -> Vec<Address> {
        match self.settings.discovery {
            SpenderDiscovery::ApprovalEvents => {
                match self.client.get_approval_spenders(token, owner).await {
                    Ok(spenders) => dedup_in_order(spenders),
                    Err(e) => {
                        warn!(
                            token = %display_address(&token),
                            "Không đọc được log Approval, bỏ qua token: {}",
                            e
                        );
                        Vec::new()
                    }
                }
            }
            SpenderDiscovery::KnownSpenderAllowlist => self.registry.addresses().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_in_order() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        assert_eq!(dedup_in_order(vec![a, b, a, b, a]), vec![a, b]);
    }

    #[test]
    fn test_backoff_policies() {
        let fixed = FixedBackoff(Duration::from_secs(1));
        assert_eq!(fixed.delay_after(0), Duration::from_secs(1));
        assert_eq!(fixed.delay_after(7), Duration::from_secs(1));
        assert_eq!(NoBackoff.delay_after(3), Duration::ZERO);
    }
}

// External imports
use ethers::{
    abi::{Abi, Detokenize, Tokenize},
    contract::Contract,
    providers::{Http, Middleware, Provider},
    types::{Address, BlockNumber, Bytes, Filter, Log, H256, U256},
};

// Standard library imports
use std::{collections::HashSet, sync::Arc, time::Duration};

// Third party imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

// Internal imports
use crate::abi::{erc20_abi, APPROVAL_EVENT};
use crate::core::{with_timeout, ChainDataClient, ExplorerClient, SourceInfo};
use evmsecure_common::{
    chain_name, display_address, utils::redact_url, NetworkConfig, SecurityError,
    SecurityResult, TokenMetadata,
};

/// Client đọc dữ liệu từ một mạng EVM qua JSON-RPC và explorer.
///
/// Provider và HTTP client được tạo một lần rồi dùng lại cho mọi request.
pub struct EvmChainClient {
    provider: Arc<Provider<Http>>,
    explorer: ExplorerClient,
    erc20: Abi,
    chain_id: u64,
    request_timeout: Duration,
    block_scan_range: Option<u64>,
}

impl EvmChainClient {
    /// Tạo client từ cấu hình mạng
    pub fn new(config: &NetworkConfig) -> SecurityResult<Self> {
        let rpc_url = config.rpc_url()?;
        let provider = Provider::<Http>::try_from(rpc_url).map_err(|e| {
            SecurityError::Config(format!("invalid RPC URL {}: {}", redact_url(rpc_url), e))
        })?;
        let explorer = ExplorerClient::new(
            &config.explorer_base_url,
            &config.explorer_api_key,
            config.request_timeout,
        )?;

        info!(
            network = %config.kind,
            chain = %chain_name(config.chain_id),
            rpc_url = %redact_url(rpc_url),
            "Đã khởi tạo chain client"
        );

        Ok(Self {
            provider: Arc::new(provider),
            explorer,
            erc20: erc20_abi()?,
            chain_id: config.chain_id,
            request_timeout: config.request_timeout,
            block_scan_range: config.block_scan_range,
        })
    }

    fn token_contract(&self, token: Address) -> Contract<Provider<Http>> {
        Contract::new(token, self.erc20.clone(), self.provider.clone())
    }

    /// Gọi một hàm view của ERC-20 với timeout
    async fn call_erc20<A, T>(&self, token: Address, function: &str, args: A) -> SecurityResult<T>
    where
        A: Tokenize,
        T: Detokenize + Send + Sync,
    {
        let contract = self.token_contract(token);
        let call = contract.method::<A, T>(function, args).map_err(|e| {
            SecurityError::Config(format!("ERC20 ABI has no function {}: {}", function, e))
        })?;

        with_timeout(function, self.request_timeout, async {
            call.call().await.map_err(|e| {
                SecurityError::network(
                    &format!("{}() on {}", function, display_address(&token)),
                    e,
                )
            })
        })
        .await
    }

    async fn approval_filter(&self, token: Address, owner: Address) -> SecurityResult<Filter> {
        let filter = Filter::new()
            .address(token)
            .event(APPROVAL_EVENT)
            .topic1(H256::from(owner))
            .to_block(BlockNumber::Latest);

        match self.block_scan_range {
            Some(range) => {
                let latest = with_timeout("eth_blockNumber", self.request_timeout, async {
                    self.provider
                        .get_block_number()
                        .await
                        .map_err(|e| SecurityError::network("eth_blockNumber", e))
                })
                .await?;
                Ok(filter.from_block(latest.saturating_sub(range.into())))
            }
            None => Ok(filter.from_block(BlockNumber::Earliest)),
        }
    }
}

/// Lấy spender (topic thứ 3) từ log Approval, bỏ trùng và giữ thứ tự
pub fn spenders_from_logs(logs: &[Log]) -> Vec<Address> {
    let mut seen = HashSet::new();
    logs.iter()
        .filter_map(|log| log.topics.get(2))
        .map(|topic| Address::from_slice(&topic.as_bytes()[12..]))
        .filter(|spender| seen.insert(*spender))
        .collect()
}

#[async_trait]
impl ChainDataClient for EvmChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_code(&self, address: Address) -> SecurityResult<Bytes> {
        with_timeout("eth_getCode", self.request_timeout, async {
            self.provider
                .get_code(address, None)
                .await
                .map_err(|e| SecurityError::network("eth_getCode", e))
        })
        .await
    }

    async fn get_storage_at(&self, address: Address, slot: H256) -> SecurityResult<H256> {
        with_timeout("eth_getStorageAt", self.request_timeout, async {
            self.provider
                .get_storage_at(address, slot, None)
                .await
                .map_err(|e| SecurityError::network("eth_getStorageAt", e))
        })
        .await
    }

    async fn get_verified_source(&self, address: Address) -> SecurityResult<SourceInfo> {
        with_timeout(
            "getsourcecode",
            self.request_timeout,
            self.explorer.get_source_code(address),
        )
        .await
    }

    async fn get_first_transaction(&self, address: Address) -> Option<DateTime<Utc>> {
        let result = with_timeout(
            "txlist",
            self.request_timeout,
            self.explorer.get_first_transaction(address),
        )
        .await;

        match result {
            Ok(date) => date,
            Err(e) => {
                debug!(address = %display_address(&address), "Không lấy được ngày triển khai: {}", e);
                None
            }
        }
    }

    async fn get_token_transfer_history(&self, address: Address) -> SecurityResult<Vec<Address>> {
        let tokens = with_timeout(
            "tokentx",
            self.request_timeout,
            self.explorer.get_token_transfers(address),
        )
        .await?;
        debug!(address = %display_address(&address), count = tokens.len(), "Đã lấy lịch sử token");
        Ok(tokens)
    }

    async fn get_token_metadata(&self, token: Address) -> SecurityResult<TokenMetadata> {
        let (symbol, name, decimals) = tokio::try_join!(
            self.call_erc20::<_, String>(token, "symbol", ()),
            self.call_erc20::<_, String>(token, "name", ()),
            self.call_erc20::<_, u8>(token, "decimals", ()),
        )?;

        Ok(TokenMetadata {
            address: token,
            symbol,
            name,
            decimals,
        })
    }

    async fn get_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> SecurityResult<U256> {
        self.call_erc20::<_, U256>(token, "allowance", (owner, spender))
            .await
    }

    async fn get_approval_spenders(
        &self,
        token: Address,
        owner: Address,
    ) -> SecurityResult<Vec<Address>> {
        let filter = self.approval_filter(token, owner).await?;
        let logs = with_timeout("eth_getLogs", self.request_timeout, async {
            self.provider
                .get_logs(&filter)
                .await
                .map_err(|e| SecurityError::network("eth_getLogs", e))
        })
        .await?;

        let spenders = spenders_from_logs(&logs);
        if spenders.is_empty() {
            warn!(
                token = %display_address(&token),
                "Không tìm thấy log Approval nào của chủ ví"
            );
        }
        Ok(spenders)
    }
}

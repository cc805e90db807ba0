#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::types::{Address, Bytes, H256, U256};

use evmsecure::BatchBackoff;
use evmsecure_blockchain::{ChainDataClient, SourceInfo};
use evmsecure_common::{SecurityError, SecurityResult, TokenMetadata};

/// Chain giả trong bộ nhớ, ghi lại mọi lần gọi
#[derive(Default)]
pub struct FakeChain {
    pub chain_id: u64,
    pub code: HashMap<Address, Bytes>,
    pub storage: HashMap<(Address, H256), H256>,
    pub sources: HashMap<Address, SourceInfo>,
    pub deployments: HashMap<Address, DateTime<Utc>>,
    pub transfers: HashMap<Address, Vec<Address>>,
    pub failing_history: bool,
    pub metadata: HashMap<Address, TokenMetadata>,
    pub approvals: HashMap<(Address, Address), Vec<Address>>,
    pub failing_logs: HashSet<Address>,
    pub allowances: HashMap<(Address, Address, Address), U256>,
    pub failing_allowances: HashSet<(Address, Address)>,
    calls: Mutex<Vec<String>>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            chain_id: 1,
            ..Default::default()
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait]
impl ChainDataClient for FakeChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_code(&self, address: Address) -> SecurityResult<Bytes> {
        self.record(format!("get_code {:?}", address));
        Ok(self.code.get(&address).cloned().unwrap_or_default())
    }

    async fn get_storage_at(&self, address: Address, slot: H256) -> SecurityResult<H256> {
        self.record(format!("get_storage_at {:?}", slot));
        Ok(self.storage.get(&(address, slot)).cloned().unwrap_or_default())
    }

    async fn get_verified_source(&self, address: Address) -> SecurityResult<SourceInfo> {
        self.record("get_verified_source".to_string());
        Ok(self.sources.get(&address).cloned().unwrap_or_default())
    }

    async fn get_first_transaction(&self, address: Address) -> Option<DateTime<Utc>> {
        self.record("get_first_transaction".to_string());
        self.deployments.get(&address).cloned()
    }

    async fn get_token_transfer_history(&self, address: Address) -> SecurityResult<Vec<Address>> {
        self.record("get_token_transfer_history".to_string());
        if self.failing_history {
            return Err(SecurityError::Network("invalid tokentx result".to_string()));
        }
        Ok(self.transfers.get(&address).cloned().unwrap_or_default())
    }

    async fn get_token_metadata(&self, token: Address) -> SecurityResult<TokenMetadata> {
        self.record(format!("get_token_metadata {:?}", token));
        self.metadata
            .get(&token)
            .cloned()
            .ok_or_else(|| SecurityError::Network("execution reverted".to_string()))
    }

    async fn get_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> SecurityResult<U256> {
        self.record(format!("get_allowance {:?} {:?}", token, spender));
        if self.failing_allowances.contains(&(token, spender)) {
            return Err(SecurityError::Network("execution reverted".to_string()));
        }
        Ok(self
            .allowances
            .get(&(token, owner, spender))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_approval_spenders(
        &self,
        token: Address,
        owner: Address,
    ) -> SecurityResult<Vec<Address>> {
        self.record(format!("get_approval_spenders {:?}", token));
        if self.failing_logs.contains(&token) {
            return Err(SecurityError::Network("query returned more than 10000 results".to_string()));
        }
        Ok(self.approvals.get(&(token, owner)).cloned().unwrap_or_default())
    }
}

/// Ghi lại chỉ số batch mà không nghỉ thật
#[derive(Default)]
pub struct RecordingBackoff {
    pub pauses: Mutex<Vec<usize>>,
}

impl BatchBackoff for RecordingBackoff {
    fn delay_after(&self, batch_index: usize) -> Duration {
        self.pauses.lock().unwrap().push(batch_index);
        Duration::ZERO
    }
}

pub fn address(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn bytecode(hex_code: &str) -> Bytes {
    Bytes::from(hex::decode(hex_code).unwrap())
}

pub fn verified(name: &str, source: &str) -> SourceInfo {
    SourceInfo {
        is_verified: true,
        contract_name: Some(name.to_string()),
        source_code: Some(source.to_string()),
    }
}

pub fn token(byte: u8, symbol: &str, decimals: u8) -> TokenMetadata {
    TokenMetadata {
        address: address(byte),
        symbol: symbol.to_string(),
        name: format!("{} Token", symbol),
        decimals,
    }
}

pub fn into_client(fake: &Arc<FakeChain>) -> Arc<dyn ChainDataClient> {
    fake.clone()
}

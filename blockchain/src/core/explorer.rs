// External imports
use ethers::types::Address;

// Standard library imports
use std::{collections::HashSet, str::FromStr, time::Duration};

// Third party imports
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

// Internal imports
use evmsecure_common::{display_address, SecurityError, SecurityResult};

/// Phong bì chung của mọi phản hồi Etherscan
#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerEnvelope {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: Value,
}

impl ExplorerEnvelope {
    /// `Some(result)` khi có dữ liệu, `None` khi explorer báo không có dữ liệu.
    ///
    /// Message bắt đầu bằng `NOTOK` (sai API key, vượt rate limit) là lỗi mạng.
    pub fn into_data(self) -> SecurityResult<Option<Value>> {
        if self.status == "1" {
            return Ok(Some(self.result));
        }
        if self.message.starts_with("NOTOK") {
            let detail = match &self.result {
                Value::String(s) if !s.is_empty() => s.clone(),
                _ => self.message.clone(),
            };
            return Err(SecurityError::Network(format!("explorer rejected request: {}", detail)));
        }
        debug!(message = %self.message, "Explorer không có dữ liệu");
        Ok(None)
    }
}

/// Thông tin mã nguồn đã xác minh
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub is_verified: bool,
    pub contract_name: Option<String>,
    pub source_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourceRecord {
    #[serde(rename = "SourceCode", default)]
    source_code: String,
    #[serde(rename = "ContractName", default)]
    contract_name: String,
}

#[derive(Debug, Deserialize)]
struct TxRecord {
    #[serde(rename = "timeStamp")]
    time_stamp: String,
}

#[derive(Debug, Deserialize)]
struct TokenTxRecord {
    #[serde(rename = "contractAddress")]
    contract_address: String,
}

/// Đọc kết quả `getsourcecode`
pub fn parse_source_info(data: Option<Value>) -> SourceInfo {
    let record = data
        .and_then(|value| serde_json::from_value::<Vec<SourceRecord>>(value).ok())
        .and_then(|records| records.into_iter().next());

    match record {
        Some(record) if !record.source_code.is_empty() => SourceInfo {
            is_verified: true,
            contract_name: Some(record.contract_name).filter(|name| !name.is_empty()),
            source_code: Some(record.source_code),
        },
        _ => SourceInfo::default(),
    }
}

/// Đọc timestamp (giây) của giao dịch đầu tiên trong `txlist`
pub fn parse_first_timestamp(data: Option<Value>) -> Option<DateTime<Utc>> {
    let records: Vec<TxRecord> = serde_json::from_value(data?).ok()?;
    let seconds: i64 = records.first()?.time_stamp.parse().ok()?;
    Utc.timestamp_opt(seconds, 0).single()
}

/// Danh sách token trong `tokentx`, bỏ trùng và giữ thứ tự gặp đầu tiên.
///
/// Kết quả có dữ liệu nhưng sai cấu trúc là lỗi mạng, không phải danh sách rỗng.
pub fn parse_token_addresses(data: Option<Value>) -> SecurityResult<Vec<Address>> {
    let records: Vec<TokenTxRecord> = match data {
        Some(value) => serde_json::from_value(value)
            .map_err(|e| SecurityError::network("invalid tokentx result", e))?,
        None => return Ok(Vec::new()),
    };

    let mut seen = HashSet::new();
    Ok(records
        .into_iter()
        .map(|record| record.contract_address.to_lowercase())
        .filter(|address| seen.insert(address.clone()))
        .filter_map(|address| Address::from_str(&address).ok())
        .collect())
}

/// Client cho API kiểu Etherscan
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ExplorerClient {
    pub fn new(base_url: &str, api_key: &str, request_timeout: Duration) -> SecurityResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SecurityError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn call(&self, params: &[(&str, &str)]) -> SecurityResult<Option<Value>> {
        let response = self
            .http
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| SecurityError::network("explorer request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SecurityError::Network(format!(
                "explorer returned HTTP {}",
                status
            )));
        }

        let envelope: ExplorerEnvelope = response
            .json()
            .await
            .map_err(|e| SecurityError::network("invalid explorer response", e))?;

        envelope.into_data()
    }

    /// Mã nguồn đã xác minh của contract
    pub async fn get_source_code(&self, address: Address) -> SecurityResult<SourceInfo> {
        let address = display_address(&address);
        let data = self
            .call(&[
                ("module", "contract"),
                ("action", "getsourcecode"),
                ("address", address.as_str()),
            ])
            .await?;
        Ok(parse_source_info(data))
    }

    /// Giao dịch đầu tiên của địa chỉ
    pub async fn get_first_transaction(
        &self,
        address: Address,
    ) -> SecurityResult<Option<DateTime<Utc>>> {
        let address = display_address(&address);
        let data = self
            .call(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address.as_str()),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("page", "1"),
                ("offset", "1"),
                ("sort", "asc"),
            ])
            .await?;
        Ok(parse_first_timestamp(data))
    }

    /// Các token mà địa chỉ từng giao dịch, mới nhất trước
    pub async fn get_token_transfers(&self, address: Address) -> SecurityResult<Vec<Address>> {
        let address = display_address(&address);
        let data = self
            .call(&[
                ("module", "account"),
                ("action", "tokentx"),
                ("address", address.as_str()),
                ("sort", "desc"),
            ])
            .await?;
        parse_token_addresses(data)
    }
}

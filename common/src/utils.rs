// External imports
use ethers::core::types::Address;
use ethers::utils::to_checksum;

// Standard library imports
use std::str::FromStr;

// Third party imports
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

// Internal imports
use crate::error::{SecurityError, SecurityResult};

static ADDRESS_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address regex"));

// Lấy cả chuỗi hex, chuỗi dài hơn 40 ký tự sẽ bị `parse_address` từ chối
static ADDRESS_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"0x[a-fA-F0-9]{40,}").expect("address regex"));

/// Lấy thời gian hiện tại (milliseconds)
pub fn current_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Kiểm tra và chuyển chuỗi thành địa chỉ.
///
/// Chuỗi phải có dạng `0x` + 40 ký tự hex. Nếu phần hex viết hoa/thường lẫn lộn
/// thì phải khớp checksum EIP-55, giống quy tắc `isAddress` của ethers.
pub fn parse_address(input: &str) -> SecurityResult<Address> {
    let trimmed = input.trim();
    if !ADDRESS_FORMAT.is_match(trimmed) {
        debug!(address = %trimmed, "Địa chỉ sai định dạng");
        return Err(SecurityError::InvalidAddress(trimmed.to_string()));
    }

    let address = Address::from_str(trimmed)
        .map_err(|_| SecurityError::InvalidAddress(trimmed.to_string()))?;

    let hex_part = &trimmed[2..];
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    if has_upper && has_lower && to_checksum(&address, None) != trimmed {
        debug!(address = %trimmed, "Địa chỉ sai checksum");
        return Err(SecurityError::InvalidAddress(trimmed.to_string()));
    }

    Ok(address)
}

/// Tìm địa chỉ đầu tiên xuất hiện trong một đoạn văn bản
pub fn extract_address(text: &str) -> Option<&str> {
    ADDRESS_IN_TEXT.find(text).map(|m| m.as_str())
}

/// Hiển thị địa chỉ dạng checksum
pub fn display_address(address: &Address) -> String {
    to_checksum(address, None)
}

/// Cắt ngắn URL trước khi ghi log
pub fn redact_url(url: &str) -> String {
    if url.len() <= 20 {
        return url.to_string();
    }
    let cut = url
        .char_indices()
        .nth(20)
        .map(|(idx, _)| idx)
        .unwrap_or(url.len());
    format!("{}...", &url[..cut])
}

// External imports
use ethers::types::U256;

// Internal imports
use evmsecure_common::{
    display_address, AllowanceResult, RiskLevel, SecurityAnalysis, TokenAllowance,
};

/// Số bit của các giá trị approve "vô hạn" hay gặp (2^n - 1)
const UNLIMITED_BITS: [usize; 3] = [64, 96, 128];

/// Giá trị approve được xem là không giới hạn
pub fn is_unlimited(amount: U256) -> bool {
    amount == U256::MAX
        || UNLIMITED_BITS
            .iter()
            .any(|&bits| amount == (U256::one() << bits) - U256::one())
}

/// Chuyển số lượng nhỏ nhất sang dạng thập phân, không dùng phép chia.
///
/// Bỏ số 0 ở cuối phần thập phân nhưng giữ ít nhất một chữ số (`1.0`).
/// Khi `decimals == 0` trả về số nguyên.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    if decimals == 0 {
        return digits;
    }

    let decimals = decimals as usize;
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };

    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    let fraction = if fraction.is_empty() { "0" } else { fraction };
    format!("{}.{}", whole, fraction)
}

/// Số lượng hiển thị của một allowance
pub fn format_allowance_amount(allowance: &TokenAllowance) -> String {
    if is_unlimited(allowance.amount) {
        "Unlimited".to_string()
    } else {
        format_units(allowance.amount, allowance.decimals)
    }
}

/// Báo cáo allowance dạng văn bản
pub fn format_allowance_message(result: &AllowanceResult) -> String {
    let owner = display_address(&result.address);
    if result.allowances.is_empty() {
        return format!("No significant token allowances found for {}", owner);
    }

    let mut message = format!(
        "Found {} token allowances for {}:\n\n",
        result.allowances.len(),
        owner
    );

    for allowance in &result.allowances {
        let info = &allowance.spender_info;
        let spender = if info.is_known() {
            info.name.clone()
        } else {
            display_address(&allowance.spender)
        };

        message.push_str(&format!("{} ({}):\n", allowance.symbol, allowance.name));
        message.push_str(&format!("- Spender: {}\n", spender));
        message.push_str(&format!("- Protocol: {}\n", info.protocol));
        message.push_str(&format!("- Amount: {}\n", format_allowance_amount(allowance)));
        if info.is_known() {
            message.push_str(&format!("- Risk Level: {}\n", info.risk));
        }
        message.push('\n');
    }

    message
}

/// Báo cáo phân tích contract dạng văn bản
pub fn format_analysis_message(analysis: &SecurityAnalysis) -> String {
    let title = analysis
        .contract_name()
        .map(str::to_string)
        .unwrap_or_else(|| display_address(&analysis.address()));
    let risk = match analysis.risk_level() {
        RiskLevel::High => "🚨 HIGH".to_string(),
        other => other.to_string(),
    };

    let mut message = format!("Security Analysis for {}\n\n", title);
    message.push_str(&format!("Security Score: {}/100\n", analysis.security_score()));
    message.push_str(&format!("Risk Level: {}\n\n", risk));

    if let Some(date) = analysis.deployment_date() {
        message.push_str(&format!("Deployed: {}\n", date.format("%Y-%m-%d")));
    }

    let verification = if analysis.is_verified() {
        "✅ Verified"
    } else {
        "❌ Not Verified"
    };
    message.push_str(&format!("Verification: {}\n", verification));

    if analysis.is_proxy() {
        message.push_str("Proxy Status: This is a proxy contract\n");
        let implementation = analysis
            .proxy_implementation()
            .map(|address| display_address(&address))
            .unwrap_or_else(|| "unknown".to_string());
        message.push_str(&format!("Implementation: {}\n", implementation));
    }

    if !analysis.issues().is_empty() {
        message.push_str("\nPotential Issues:\n");
        for issue in analysis.issues() {
            message.push_str(&format!(
                "- [{}] {}: {}\n",
                issue.severity, issue.kind, issue.description
            ));
        }
    }

    if !analysis.warnings().is_empty() {
        message.push_str("\nWarnings:\n");
        for warning in analysis.warnings() {
            message.push_str(&format!("- {}\n", warning));
        }
    }

    message
}

// External imports
use ethers::core::types::Address;

// Standard library imports
use std::fmt::{self, Display, Formatter};

// Third party imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Internal imports
use crate::utils::display_address;

/// Điểm khởi đầu trước khi trừ
const BASE_SCORE: i32 = 100;
const UNVERIFIED_PENALTY: i32 = 40;
const PROXY_PENALTY: i32 = 10;
const FIRST_HIGH_PENALTY: i32 = 40;
const EXTRA_HIGH_PENALTY: i32 = 30;
const MEDIUM_PENALTY: i32 = 15;
const LOW_PENALTY: i32 = 5;

/// Mức độ nghiêm trọng của một vấn đề
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
}

impl Display for IssueSeverity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            IssueSeverity::Low => "LOW",
            IssueSeverity::Medium => "MEDIUM",
            IssueSeverity::High => "HIGH",
        };
        f.write_str(label)
    }
}

/// Loại vấn đề phát hiện được
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    Delegatecall,
    Selfdestruct,
    DangerousReceive,
}

impl Display for IssueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let tag = match self {
            IssueKind::Delegatecall => "DELEGATECALL",
            IssueKind::Selfdestruct => "SELFDESTRUCT",
            IssueKind::DangerousReceive => "DANGEROUS_RECEIVE",
        };
        f.write_str(tag)
    }
}

/// Một vấn đề bảo mật
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityIssue {
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    pub description: String,
}

impl SecurityIssue {
    pub fn new(kind: IssueKind, severity: IssueSeverity, description: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            description: description.into(),
        }
    }
}

/// Mức rủi ro tổng thể
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    /// Chỉ là giá trị mặc định trước khi tính điểm
    Unknown,
}

impl RiskLevel {
    /// Xếp hạng rủi ro theo điểm
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => RiskLevel::Low,
            50..=79 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Unknown
    }
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Dữ liệu quan sát được trước khi tính các trường dẫn xuất
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContractFindings {
    pub address: Address,
    pub is_verified: bool,
    pub contract_name: Option<String>,
    pub is_proxy: bool,
    pub proxy_implementation: Option<Address>,
    pub deployment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub issues: Vec<SecurityIssue>,
}

/// Kết quả phân tích một contract.
///
/// Chỉ tạo được từ `ContractFindings`, nên điểm, mức rủi ro và cảnh báo luôn
/// khớp với dữ liệu đầu vào. Khi deserialize, các trường dẫn xuất được tính lại.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ContractFindings")]
pub struct SecurityAnalysis {
    address: Address,
    is_verified: bool,
    contract_name: Option<String>,
    is_proxy: bool,
    proxy_implementation: Option<Address>,
    deployment_date: Option<DateTime<Utc>>,
    issues: Vec<SecurityIssue>,
    risk_level: RiskLevel,
    security_score: u8,
    warnings: Vec<String>,
}

impl SecurityAnalysis {
    /// Tạo kết quả và tính lại điểm, mức rủi ro, cảnh báo cùng một lúc
    pub fn from_findings(findings: ContractFindings) -> Self {
        let security_score = security_score(
            findings.is_verified,
            findings.is_proxy,
            &findings.issues,
        );
        let warnings = build_warnings(
            findings.is_verified,
            findings.proxy_implementation.as_ref().filter(|_| findings.is_proxy),
            findings.is_proxy,
            findings.issues.len(),
        );

        Self {
            address: findings.address,
            is_verified: findings.is_verified,
            contract_name: findings.contract_name,
            is_proxy: findings.is_proxy,
            proxy_implementation: findings.proxy_implementation,
            deployment_date: findings.deployment_date,
            issues: findings.issues,
            risk_level: RiskLevel::from_score(security_score),
            security_score,
            warnings,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    pub fn contract_name(&self) -> Option<&str> {
        self.contract_name.as_deref()
    }

    pub fn is_proxy(&self) -> bool {
        self.is_proxy
    }

    pub fn proxy_implementation(&self) -> Option<Address> {
        self.proxy_implementation
    }

    pub fn deployment_date(&self) -> Option<DateTime<Utc>> {
        self.deployment_date
    }

    pub fn issues(&self) -> &[SecurityIssue] {
        &self.issues
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn security_score(&self) -> u8 {
        self.security_score
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl From<ContractFindings> for SecurityAnalysis {
    fn from(findings: ContractFindings) -> Self {
        Self::from_findings(findings)
    }
}

/// Tính điểm bảo mật (0-100), không phụ thuộc thứ tự các issue
pub fn security_score(is_verified: bool, is_proxy: bool, issues: &[SecurityIssue]) -> u8 {
    let mut score = BASE_SCORE;

    if !is_verified {
        score -= UNVERIFIED_PENALTY;
    }
    if is_proxy {
        score -= PROXY_PENALTY;
    }

    let count = |severity: IssueSeverity| {
        issues.iter().filter(|issue| issue.severity == severity).count() as i32
    };
    let high = count(IssueSeverity::High);
    let medium = count(IssueSeverity::Medium);
    let low = count(IssueSeverity::Low);

    // Issue HIGH đầu tiên bị phạt nặng, các issue sau cộng dồn
    if high > 0 {
        score -= FIRST_HIGH_PENALTY;
        if high > 1 {
            score -= (high - 1) * EXTRA_HIGH_PENALTY;
        }
    }
    score -= medium * MEDIUM_PENALTY;
    score -= low * LOW_PENALTY;

    score.clamp(0, BASE_SCORE) as u8
}

fn build_warnings(
    is_verified: bool,
    implementation: Option<&Address>,
    is_proxy: bool,
    issue_count: usize,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if !is_verified {
        warnings.push("Contract is not verified on Etherscan".to_string());
    }
    if is_proxy {
        let target = implementation
            .map(display_address)
            .unwrap_or_else(|| "unknown".to_string());
        warnings.push(format!("Contract is a proxy. Implementation at: {}", target));
    }
    if issue_count > 0 {
        warnings.push(format!("Found {} potential security issues", issue_count));
    }

    warnings
}

// Third party imports
use once_cell::sync::Lazy;
use regex::Regex;

// Internal imports
use evmsecure_common::{IssueKind, IssueSeverity, SecurityIssue};

/// Opcode DELEGATECALL
pub const OP_DELEGATECALL: u8 = 0xf4;
/// Opcode SELFDESTRUCT
pub const OP_SELFDESTRUCT: u8 = 0xff;

const OP_PUSH1: u8 = 0x60;
const OP_PUSH32: u8 = 0x7f;

static RECEIVE_SETS_OWNER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"receive\s*\(\s*\)\s*external\s+payable\s*\{[^}]*owner\s*=[^}]*\}")
        .expect("receive regex")
});

static FALLBACK_SETS_OWNER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"fallback\s*\(\s*\)\s*external\s+payable\s*\{[^}]*owner\s*=[^}]*\}")
        .expect("fallback regex")
});

/// Kiểm tra opcode có xuất hiện như một lệnh thật sự trong bytecode không.
///
/// Dữ liệu đi kèm PUSH1..PUSH32 được bỏ qua nên hằng số chứa byte đó không tính.
pub fn contains_opcode(bytecode: &[u8], opcode: u8) -> bool {
    let mut pc = 0;
    while pc < bytecode.len() {
        let op = bytecode[pc];
        if op == opcode {
            return true;
        }
        pc += 1;
        if (OP_PUSH1..=OP_PUSH32).contains(&op) {
            pc += (op - OP_PUSH1 + 1) as usize;
        }
    }
    false
}

/// Bộ kiểm tra lỗ hổng, mỗi phương thức là một heuristic
pub trait VulnerabilityDetector: Send + Sync {
    /// DELEGATECALL trong bytecode và `delegatecall` trong mã nguồn
    fn check_delegatecall(&self, bytecode: &[u8], source: &str) -> Option<SecurityIssue>;

    /// SELFDESTRUCT trong bytecode và `selfdestruct` trong mã nguồn
    fn check_selfdestruct(&self, bytecode: &[u8], source: &str) -> Option<SecurityIssue>;

    /// receive/fallback payable có gán owner
    fn check_dangerous_receive(&self, source: &str) -> Option<SecurityIssue>;

    /// Chạy tất cả các kiểm tra theo thứ tự cố định
    fn scan(&self, bytecode: &[u8], source: &str) -> Vec<SecurityIssue> {
        [
            self.check_delegatecall(bytecode, source),
            self.check_selfdestruct(bytecode, source),
            self.check_dangerous_receive(source),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Heuristic mặc định: cần cả dấu hiệu trong bytecode lẫn trong mã nguồn
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicDetector;

impl VulnerabilityDetector for HeuristicDetector {
    fn check_delegatecall(&self, bytecode: &[u8], source: &str) -> Option<SecurityIssue> {
        if contains_opcode(bytecode, OP_DELEGATECALL) && source.contains("delegatecall") {
            return Some(SecurityIssue::new(
                IssueKind::Delegatecall,
                IssueSeverity::High,
                "Contract uses delegatecall which can be dangerous if not properly secured",
            ));
        }
        None
    }

    fn check_selfdestruct(&self, bytecode: &[u8], source: &str) -> Option<SecurityIssue> {
        if contains_opcode(bytecode, OP_SELFDESTRUCT) && source.contains("selfdestruct") {
            return Some(SecurityIssue::new(
                IssueKind::Selfdestruct,
                IssueSeverity::High,
                "Contract contains selfdestruct capability",
            ));
        }
        None
    }

    fn check_dangerous_receive(&self, source: &str) -> Option<SecurityIssue> {
        let has_entry_point = source.contains("receive()") || source.contains("fallback()");
        let sets_owner = source.contains("owner =") || source.contains("_owner =");
        let uses_sender = source.contains("msg.sender");
        if !(has_entry_point && sets_owner && uses_sender) {
            return None;
        }

        if RECEIVE_SETS_OWNER.is_match(source) || FALLBACK_SETS_OWNER.is_match(source) {
            return Some(SecurityIssue::new(
                IssueKind::DangerousReceive,
                IssueSeverity::High,
                "Contract contains a receive/fallback function that can modify ownership - potential for ownership hijacking",
            ));
        }
        None
    }
}

pub mod dashboard;
pub mod header;
pub mod home;
pub mod mint;
pub mod reveal;
pub mod stake;
pub mod vote;

use alloy_primitives::B256;
use chrono::{DateTime, Local};

/// Timestamp format used by every history table.
pub const HISTORY_TIME_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Parse a user-typed amount. Empty, non-numeric, non-finite and
/// non-positive input all yield `None`.
pub fn parse_amount(input: &str) -> Option<f64> {
    let value: f64 = input.trim().parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Shortened transaction id for locally simulated entries, e.g. `0x3fa91c...b07`.
pub fn demo_tx_id() -> String {
    let bytes: [u8; 5] = rand::random();
    let hex = hex::encode(bytes);
    format!("0x{}...{}", &hex[..6], &hex[6..9])
}

/// Same shape as [`demo_tx_id`] for a real transaction hash.
pub fn short_hash(hash: B256) -> String {
    let hex = hex::encode(hash);
    format!("0x{}...{}", &hex[..6], &hex[hex.len() - 3..])
}

pub fn history_time(at: DateTime<Local>) -> String {
    at.format(HISTORY_TIME_FORMAT).to_string()
}

/// Renders `48.0` as `48` and `12.346` as `12.35`.
pub fn trim_number(value: f64) -> String {
    let fixed = format!("{value:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Why a page refused to start an action. Nothing was sent when one of
/// these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    NotConnected,
    InvalidAmount,
    ExceedsBalance,
    NoSelection,
    AlreadySubmitted,
    Busy,
}

impl InputError {
    pub fn message(self) -> &'static str {
        match self {
            InputError::NotConnected => "请先连接钱包",
            InputError::InvalidAmount => "请输入有效的数量",
            InputError::ExceedsBalance => "余额不足",
            InputError::NoSelection => "请选择一个预测选项",
            InputError::AlreadySubmitted => "本期已提交预测",
            InputError::Busy => "处理中，请稍候",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_amount_rejects_non_positive() {
        assert_eq!(parse_amount(" 12.5 "), Some(12.5));
        assert_eq!(parse_amount("0"), None);
        assert_eq!(parse_amount("-3"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("inf"), None);
    }

    #[test]
    fn trim_number_drops_trailing_zeros() {
        assert_eq!(trim_number(48.0), "48");
        assert_eq!(trim_number(24.5), "24.5");
        assert_eq!(trim_number(12.346), "12.35");
    }

    #[test]
    fn short_hash_keeps_head_and_tail() {
        let hash = B256::repeat_byte(0xab);
        assert_eq!(short_hash(hash), "0xababab...bab");
    }

    #[test]
    fn demo_tx_id_shape() {
        let id = demo_tx_id();
        assert!(id.starts_with("0x"));
        assert_eq!(id.len(), 2 + 6 + 3 + 3);
        assert_eq!(&id[8..11], "...");
    }
}

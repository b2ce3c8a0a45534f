use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level application error type.
///
/// Layer-specific errors (wallet, contract reads, contract writes) convert
/// into this at the application boundary. None of them is fatal: each is
/// scoped to the user action that triggered it.
#[derive(Error, Debug)]
pub enum BtcvoteError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Contract read error: {0}")]
    ContractRead(String),

    /// A failed write with the localized message already resolved.
    #[error("Contract write error: {message}")]
    ContractWrite { message: String, user_message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Classification of errors for logging and user display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Connecting or talking to a wallet failed.
    Wallet,
    /// A polled read failed; the next poll retries.
    ContractRead,
    /// A transaction failed or was rejected.
    ContractWrite,
    /// Network connectivity or timeout issue.
    Network,
    /// Invalid or missing configuration.
    Config,
    /// Internal system error.
    System,
}

impl BtcvoteError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Config,
            Self::Wallet(_) => ErrorCategory::Wallet,
            Self::ContractRead(_) => ErrorCategory::ContractRead,
            Self::ContractWrite { .. } => ErrorCategory::ContractWrite,
            Self::Network(_) | Self::Api(_) => ErrorCategory::Network,
            Self::Internal(_) => ErrorCategory::System,
        }
    }

    /// Whether the user can simply try the same action again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::Internal(_))
    }

    /// Returns a localized message suitable for inline display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(msg) => format!("配置错误：{msg}"),
            Self::Wallet(_) => "钱包连接失败，请重试".into(),
            Self::ContractRead(_) => "数据错误".into(),
            Self::ContractWrite { user_message, .. } => user_message.clone(),
            Self::Network(_) | Self::Api(_) => "网络错误，请检查连接".into(),
            Self::Internal(_) => "发生未知错误".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_match_variants() {
        assert_eq!(BtcvoteError::Wallet("x".into()).category(), ErrorCategory::Wallet);
        assert_eq!(
            BtcvoteError::ContractRead("x".into()).category(),
            ErrorCategory::ContractRead
        );
        assert_eq!(BtcvoteError::Api("x".into()).category(), ErrorCategory::Network);
        assert_eq!(BtcvoteError::Internal("x".into()).category(), ErrorCategory::System);
    }

    #[test]
    fn write_error_uses_resolved_user_message() {
        let err = BtcvoteError::ContractWrite {
            message: "execution reverted".into(),
            user_message: "交易已回滚".into(),
        };
        assert_eq!(err.user_message(), "交易已回滚");
        assert!(err.to_string().contains("execution reverted"));
    }

    #[test]
    fn only_config_and_internal_are_not_retryable() {
        assert!(BtcvoteError::Wallet("no extension".into()).is_retryable());
        assert!(BtcvoteError::Network("timeout".into()).is_retryable());
        assert!(!BtcvoteError::Config("bad".into()).is_retryable());
        assert!(!BtcvoteError::Internal("bug".into()).is_retryable());
    }

    #[test]
    fn read_errors_show_data_error_label() {
        assert_eq!(BtcvoteError::ContractRead("rpc".into()).user_message(), "数据错误");
    }
}

use btcvote_chain::{WalletKind, WalletSession, network_name};

/// `0x1234567890abcdef…` becomes `0x1234...cdef`. Short input is returned
/// unchanged.
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// The wallet button and network badge shown on every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderData {
    pub session: WalletSession,
    pub chain_id: u64,
}

impl HeaderData {
    pub fn new(session: WalletSession, chain_id: u64) -> Self {
        Self { session, chain_id }
    }

    pub fn network_label(&self) -> &'static str {
        network_name(self.chain_id)
    }

    pub fn wallet_kind(&self) -> Option<WalletKind> {
        self.session.kind
    }

    /// Text of the wallet button.
    pub fn wallet_label(&self) -> String {
        match (&self.session.address, self.session.pending) {
            (Some(address), _) => shorten_address(address),
            (None, true) => "连接中...".into(),
            (None, false) => "连接钱包".into(),
        }
    }

    /// Label of the action next to the wallet button, if any.
    pub fn action_label(&self) -> Option<&'static str> {
        self.session.connected.then_some("断开")
    }
}

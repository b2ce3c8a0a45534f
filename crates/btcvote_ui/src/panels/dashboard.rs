use btcvote_chain::{ReadState, TOKEN_DECIMALS, UserSnapshot, format_display};

/// Display-ready summary of the connected user.
///
/// Every amount is a formatted string with at most two decimals. While
/// disconnected all values are `"0"` and no flag is set; while loading or
/// after a failed read the values are `"0"` and the matching flag is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    pub native_balance: String,
    pub vdot_balance: String,
    pub ticket_balance: String,
    pub staked_amount: String,
    pub voting_power: String,
    /// Wallet vDOT plus vDOT locked in stakes.
    pub total_vdot: String,
    pub active_stakes: usize,
    pub has_voted: bool,
    pub is_loading: bool,
    pub has_error: bool,
    pub error: Option<String>,
}

impl UserData {
    fn zeros() -> Self {
        Self {
            native_balance: "0".into(),
            vdot_balance: "0".into(),
            ticket_balance: "0".into(),
            staked_amount: "0".into(),
            voting_power: "0".into(),
            total_vdot: "0".into(),
            active_stakes: 0,
            has_voted: false,
            is_loading: false,
            has_error: false,
            error: None,
        }
    }

    pub fn from_state(connected: bool, state: &ReadState<UserSnapshot>) -> Self {
        if !connected {
            return Self::zeros();
        }
        match (&state.data, state.is_loading, &state.error) {
            (Some(snapshot), false, None) => Self::from_snapshot(snapshot),
            _ => Self {
                is_loading: state.is_loading,
                has_error: state.has_error(),
                error: state.error.clone(),
                ..Self::zeros()
            },
        }
    }

    fn from_snapshot(snapshot: &UserSnapshot) -> Self {
        let fmt = |v| format_display(v, TOKEN_DECIMALS);
        let stakes = &snapshot.stakes;
        Self {
            native_balance: fmt(snapshot.native_balance),
            vdot_balance: fmt(snapshot.vdot_balance),
            ticket_balance: fmt(snapshot.ticket_balance),
            staked_amount: fmt(stakes.total_staked),
            voting_power: fmt(stakes.total_voting_power),
            total_vdot: fmt(snapshot.vdot_balance.saturating_add(stakes.total_staked)),
            active_stakes: stakes.active_stakes,
            has_voted: snapshot.vote_count > 0,
            is_loading: false,
            has_error: false,
            error: None,
        }
    }

    /// Label/value rows for a plain listing.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("原生余额", self.native_balance.clone()),
            ("vDOT 余额", self.vdot_balance.clone()),
            ("投票券", self.ticket_balance.clone()),
            ("已抵押", self.staked_amount.clone()),
            ("投票权", self.voting_power.clone()),
            ("vDOT 总计", self.total_vdot.clone()),
            ("已投票", if self.has_voted { "是" } else { "否" }.into()),
        ]
    }
}

impl Default for UserData {
    fn default() -> Self {
        Self::zeros()
    }
}

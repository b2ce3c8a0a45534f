use alloy_primitives::U256;
use chrono::{DateTime, Local};
use tracing::info;

use btcvote_chain::{
    FlowSnapshot, FlowState, LockOptionInfo, StakeDetails, TOKEN_DECIMALS, parse_ether, units,
};
use btcvote_core::{LockPreset, StakeDemo};

use super::{InputError, demo_tx_id, history_time, parse_amount, short_hash};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A lock period the user can pick.
#[derive(Debug, Clone, PartialEq)]
pub struct LockChoice {
    pub days: u64,
    pub multiplier: f64,
    pub label: String,
}

impl LockChoice {
    pub fn multiplier_label(&self) -> String {
        format!("奖励倍率 x{:.2}", self.multiplier)
    }
}

impl From<&LockPreset> for LockChoice {
    fn from(preset: &LockPreset) -> Self {
        Self {
            days: u64::from(preset.days),
            multiplier: preset.multiplier,
            label: preset.label.clone(),
        }
    }
}

impl From<&LockOptionInfo> for LockChoice {
    fn from(info: &LockOptionInfo) -> Self {
        Self {
            days: info.days,
            multiplier: info.multiplier,
            label: format!("{} 天", info.days),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StakeRow {
    pub time: String,
    pub amount: f64,
    pub lock_days: u64,
    pub status: String,
    pub tx: String,
}

impl StakeRow {
    pub fn summary(&self) -> String {
        format!("{:.2} vDOT · 锁定 {} 天", self.amount, self.lock_days)
    }
}

fn seeded_history() -> Vec<StakeRow> {
    vec![
        StakeRow {
            time: "2025/02/26 15:30".into(),
            amount: 24.0,
            lock_days: 7,
            status: "生效中".into(),
            tx: "0x914a...aa1".into(),
        },
        StakeRow {
            time: "2025/02/20 10:05".into(),
            amount: 12.0,
            lock_days: 30,
            status: "锁定中".into(),
            tx: "0xab32...b44".into(),
        },
    ]
}

/// Rows for the on-chain stake list. `now` is unix seconds.
pub fn rows_from_details(details: &StakeDetails, now: u64) -> Vec<StakeRow> {
    details
        .stakes
        .iter()
        .map(|stake| {
            let status = match (stake.active, now >= stake.end_time) {
                (false, _) => "已解锁",
                (true, true) => "可解锁",
                (true, false) => "锁定中",
            };
            let time = i64::try_from(stake.start_time)
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|at| history_time(at.with_timezone(&Local)))
                .unwrap_or_default();
            StakeRow {
                time,
                amount: units::to_f64(stake.amount, TOKEN_DECIMALS),
                lock_days: stake.lock_days(),
                status: status.into(),
                tx: format!("#{}", stake.index),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Panel data
// ---------------------------------------------------------------------------

/// State of the stake page.
#[derive(Debug, Clone)]
pub struct StakePanelData {
    pub amount: String,
    pub balance: f64,
    pub tickets: f64,
    pub lock_options: Vec<LockChoice>,
    pub selected_lock: usize,
    pub quick_select_percents: Vec<u32>,
    pub is_staking: bool,
    pub history: Vec<StakeRow>,
    pub last_error: Option<String>,
    default_amount: String,
}

impl StakePanelData {
    pub fn new(defaults: &StakeDemo) -> Self {
        Self {
            amount: defaults.default_amount.clone(),
            balance: defaults.vdot_balance,
            tickets: defaults.tickets,
            lock_options: defaults.lock_presets.iter().map(LockChoice::from).collect(),
            selected_lock: 0,
            quick_select_percents: defaults.quick_select_percents.clone(),
            is_staking: false,
            history: seeded_history(),
            last_error: None,
            default_amount: defaults.default_amount.clone(),
        }
    }

    /// Replace the preset lock periods with the ones active on-chain. An
    /// empty list keeps the presets.
    pub fn set_lock_options(&mut self, options: &[LockOptionInfo]) {
        if options.is_empty() {
            return;
        }
        let selected_days = self.selected().map(|c| c.days);
        self.lock_options = options.iter().map(LockChoice::from).collect();
        self.selected_lock = selected_days
            .and_then(|days| self.lock_options.iter().position(|c| c.days == days))
            .unwrap_or(0);
    }

    pub fn selected(&self) -> Option<&LockChoice> {
        self.lock_options.get(self.selected_lock)
    }

    /// Returns `true` if a lock period with `days` exists and is now selected.
    pub fn select_lock(&mut self, days: u64) -> bool {
        match self.lock_options.iter().position(|c| c.days == days) {
            Some(index) => {
                self.selected_lock = index;
                true
            }
            None => false,
        }
    }

    pub fn set_amount(&mut self, value: impl Into<String>) {
        self.amount = value.into();
        self.last_error = None;
    }

    /// Fill the amount with `percent` of the balance, rounded down to two
    /// decimals so it never exceeds the balance.
    pub fn quick_select(&mut self, percent: u32) {
        // Balance times percent is the amount in cents.
        let mut cents = (self.balance * f64::from(percent) + 1e-7).floor().max(0.0);
        if cents / 100.0 > self.balance && cents >= 1.0 {
            cents -= 1.0;
        }
        self.set_amount(format!("{:.2}", cents / 100.0));
    }

    pub fn projected_tickets(&self) -> f64 {
        match (parse_amount(&self.amount), self.selected()) {
            (Some(amount), Some(choice)) => amount * choice.multiplier,
            _ => 0.0,
        }
    }

    pub fn projected_label(&self) -> String {
        format!("{:.2} 张", self.projected_tickets())
    }

    pub fn balance_label(&self) -> String {
        format!("可用余额：{:.2} vDOT", self.balance)
    }

    pub fn validate(&self) -> Result<f64, InputError> {
        if self.is_staking {
            return Err(InputError::Busy);
        }
        let amount = parse_amount(&self.amount).ok_or(InputError::InvalidAmount)?;
        if amount > self.balance {
            return Err(InputError::ExceedsBalance);
        }
        Ok(amount)
    }

    /// Amount in wei and lock period for a contract stake.
    pub fn stake_args(&self) -> Result<(U256, u64), InputError> {
        self.validate()?;
        let choice = self.selected().ok_or(InputError::NoSelection)?;
        let amount = parse_ether(self.amount.trim()).map_err(|_| InputError::InvalidAmount)?;
        Ok((amount, choice.days))
    }

    pub fn button_label(&self, connected: bool) -> &'static str {
        if self.is_staking {
            "抵押处理中..."
        } else if connected {
            "确认抵押"
        } else {
            "连接钱包后抵押"
        }
    }

    pub fn begin(&mut self) -> Result<f64, InputError> {
        match self.validate() {
            Ok(amount) => {
                self.is_staking = true;
                self.last_error = None;
                Ok(amount)
            }
            Err(e) => {
                self.last_error = Some(e.message().to_string());
                Err(e)
            }
        }
    }

    /// Book a finished stake: balance down, projected tickets credited, a
    /// "锁定中" row on top of the history.
    pub fn complete(&mut self, tx: String) {
        if !self.is_staking {
            return;
        }
        let amount = parse_amount(&self.amount).unwrap_or(0.0);
        let projected = self.projected_tickets();
        let lock_days = self.selected().map(|c| c.days).unwrap_or_default();
        self.balance = (self.balance - amount).max(0.0);
        self.tickets += projected;
        info!(amount, lock_days, projected, "stake booked");
        self.history.insert(
            0,
            StakeRow {
                time: history_time(Local::now()),
                amount,
                lock_days,
                status: "锁定中".into(),
                tx,
            },
        );
        self.is_staking = false;
    }

    /// Finish a simulated stake.
    pub fn complete_demo(&mut self) {
        self.complete(demo_tx_id());
    }

    /// Mirror a stake flow onto the page.
    pub fn apply_flow(&mut self, snapshot: &FlowSnapshot) {
        match snapshot.state {
            FlowState::Success => {
                let tx = snapshot.tx_hash.map(short_hash).unwrap_or_default();
                self.complete(tx);
            }
            FlowState::Reverted => {
                self.is_staking = false;
                self.last_error = snapshot.error.as_ref().map(|e| e.user_message().to_string());
            }
            state if state.is_pending() => self.is_staking = true,
            _ => {}
        }
    }

    /// Back to the default amount and the first lock period, as on disconnect.
    pub fn reset(&mut self) {
        self.amount = self.default_amount.clone();
        self.selected_lock = 0;
        self.is_staking = false;
        self.last_error = None;
    }
}

impl Default for StakePanelData {
    fn default() -> Self {
        Self::new(&StakeDemo::default())
    }
}

use alloy_primitives::U256;
use chrono::Local;
use tracing::info;

use btcvote_chain::{FlowSnapshot, FlowState, parse_ether};
use btcvote_core::MintDemo;

use super::{InputError, demo_tx_id, history_time, parse_amount, short_hash};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Stages of the DOT → vDOT bridge shown while a mint is processing.
pub const BRIDGE_STEPS: [&str; 4] = [
    "提交铸造交易",
    "SLPx 跨链执行",
    "Bifrost 接收并铸造",
    "vDOT 回传到 Moonbeam",
];

/// Where minted vDOT comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintMode {
    /// Native currency is deposited into the vDOT contract and minted 1:1.
    Contract,
    /// Local simulation of the cross-chain bridge.
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintStatus {
    Idle,
    Processing,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MintRecord {
    pub id: String,
    pub dot: f64,
    pub vdot: f64,
    pub time: String,
    pub status: String,
}

fn seeded_history() -> Vec<MintRecord> {
    vec![
        MintRecord {
            id: "0x8fa2...32c".into(),
            dot: 12.5,
            vdot: 12.24,
            time: "2025/02/26 13:20".into(),
            status: "已完成".into(),
        },
        MintRecord {
            id: "0x7bc1...b41".into(),
            dot: 8.0,
            vdot: 7.82,
            time: "2025/02/24 09:12".into(),
            status: "已完成".into(),
        },
    ]
}

// ---------------------------------------------------------------------------
// Panel data
// ---------------------------------------------------------------------------

/// State of the mint page.
#[derive(Debug, Clone)]
pub struct MintPanelData {
    pub mode: MintMode,
    pub amount: String,
    pub balance: f64,
    pub exchange_rate: f64,
    pub network_fee: f64,
    pub service_fee: f64,
    pub status: MintStatus,
    /// Number of bridge steps reached, `0..=BRIDGE_STEPS.len()`.
    pub bridge_step: usize,
    pub history: Vec<MintRecord>,
    pub last_error: Option<String>,
    default_amount: String,
}

impl MintPanelData {
    /// Simulated bridge seeded from the demo defaults.
    pub fn demo(defaults: &MintDemo) -> Self {
        Self {
            mode: MintMode::Demo,
            amount: defaults.default_amount.clone(),
            balance: defaults.dot_balance,
            exchange_rate: defaults.exchange_rate,
            network_fee: defaults.network_fee,
            service_fee: defaults.service_fee,
            status: MintStatus::Idle,
            bridge_step: 0,
            history: seeded_history(),
            last_error: None,
            default_amount: defaults.default_amount.clone(),
        }
    }

    /// Contract deposit against a native balance already read from chain.
    pub fn contract(native_balance: f64) -> Self {
        Self {
            mode: MintMode::Contract,
            amount: String::new(),
            balance: native_balance,
            exchange_rate: 1.0,
            network_fee: 0.0,
            service_fee: 0.0,
            status: MintStatus::Idle,
            bridge_step: 0,
            history: Vec::new(),
            last_error: None,
            default_amount: String::new(),
        }
    }

    pub fn set_amount(&mut self, value: impl Into<String>) {
        self.amount = value.into();
        self.last_error = None;
    }

    /// Expected vDOT for the typed amount.
    ///
    /// The contract path mints 1:1 and shows four decimals (`"0"` for invalid
    /// input); the demo path applies the exchange rate with two decimals and
    /// stays blank for invalid input.
    pub fn preview(&self) -> String {
        let parsed = parse_amount(&self.amount);
        match (self.mode, parsed) {
            (MintMode::Contract, Some(amount)) => format!("{amount:.4}"),
            (MintMode::Contract, None) => "0".into(),
            (MintMode::Demo, Some(amount)) => format!("{:.2}", amount * self.exchange_rate),
            (MintMode::Demo, None) => String::new(),
        }
    }

    pub fn total_fee(&self) -> f64 {
        self.network_fee + self.service_fee
    }

    pub fn balance_label(&self) -> String {
        format!("余额：{:.2} DOT", self.balance)
    }

    /// Whether the bridge stage at `index` is reached.
    pub fn step_active(&self, index: usize) -> bool {
        self.bridge_step > index
    }

    pub fn validate(&self) -> Result<f64, InputError> {
        if self.status == MintStatus::Processing {
            return Err(InputError::Busy);
        }
        let amount = parse_amount(&self.amount).ok_or(InputError::InvalidAmount)?;
        if amount > self.balance {
            return Err(InputError::ExceedsBalance);
        }
        Ok(amount)
    }

    /// Wei value to deposit on the contract path.
    pub fn deposit_value(&self) -> Result<U256, InputError> {
        self.validate()?;
        parse_ether(self.amount.trim()).map_err(|_| InputError::InvalidAmount)
    }

    pub fn button_label(&self, connected: bool) -> &'static str {
        match self.status {
            MintStatus::Processing => "跨链处理中...",
            MintStatus::Completed => "铸造成功",
            MintStatus::Idle if connected => "确认铸造",
            MintStatus::Idle => "连接钱包后开始",
        }
    }

    // -- demo bridge ---------------------------------------------------------

    /// Start the simulated bridge at its first step.
    pub fn begin(&mut self) -> Result<(), InputError> {
        if let Err(e) = self.validate() {
            self.last_error = Some(e.message().to_string());
            return Err(e);
        }
        self.status = MintStatus::Processing;
        self.bridge_step = 1;
        self.last_error = None;
        Ok(())
    }

    /// Move the bridge forward one step. Reaching the last step settles the
    /// mint. Returns `true` if anything changed.
    pub fn advance_bridge(&mut self) -> bool {
        if self.status != MintStatus::Processing {
            return false;
        }
        self.bridge_step += 1;
        if self.bridge_step >= BRIDGE_STEPS.len() {
            self.bridge_step = BRIDGE_STEPS.len();
            self.settle(demo_tx_id());
        }
        true
    }

    fn settle(&mut self, id: String) {
        let dot = parse_amount(&self.amount).unwrap_or(0.0);
        let vdot = dot * self.exchange_rate;
        self.balance = (self.balance - dot).max(0.0);
        info!(dot, vdot, %id, "mint settled");
        self.history.insert(
            0,
            MintRecord {
                id,
                dot,
                vdot,
                time: history_time(Local::now()),
                status: "已完成".into(),
            },
        );
        self.status = MintStatus::Completed;
    }

    /// Return to idle after the completion banner.
    pub fn finish(&mut self) {
        if self.status == MintStatus::Completed {
            self.status = MintStatus::Idle;
            self.bridge_step = 0;
        }
    }

    // -- contract path -------------------------------------------------------

    /// Mirror a mint flow onto the page.
    pub fn apply_flow(&mut self, snapshot: &FlowSnapshot) {
        match snapshot.state {
            FlowState::Idle => {}
            state if state.is_pending() => {
                self.status = MintStatus::Processing;
                self.bridge_step = match state {
                    FlowState::Confirming => 2,
                    _ => 1,
                };
            }
            FlowState::Success => {
                if self.status != MintStatus::Completed {
                    self.bridge_step = BRIDGE_STEPS.len();
                    let id = snapshot.tx_hash.map(short_hash).unwrap_or_default();
                    self.settle(id);
                }
            }
            _ => {
                self.status = MintStatus::Idle;
                self.bridge_step = 0;
                self.last_error = snapshot.error.as_ref().map(|e| e.user_message().to_string());
            }
        }
    }

    /// Clear input and progress, as on disconnect. History is kept.
    pub fn reset(&mut self) {
        self.status = MintStatus::Idle;
        self.bridge_step = 0;
        self.amount = self.default_amount.clone();
        self.last_error = None;
    }
}

impl Default for MintPanelData {
    fn default() -> Self {
        Self::demo(&MintDemo::default())
    }
}

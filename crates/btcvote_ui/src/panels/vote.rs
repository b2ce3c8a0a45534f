use alloy_primitives::U256;
use chrono::{Datelike, Local};
use tracing::info;

use btcvote_chain::{FlowSnapshot, FlowState, TOKEN_DECIMALS, VotingStats, units};
use btcvote_core::VoteDemo;

use super::{InputError, trim_number};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// The six predictions offered each period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteOption {
    TwoYears,
    FourYears,
    SixYears,
    EightYears,
    TenYears,
    Never,
}

impl VoteOption {
    pub const ALL: [VoteOption; 6] = [
        VoteOption::TwoYears,
        VoteOption::FourYears,
        VoteOption::SixYears,
        VoteOption::EightYears,
        VoteOption::TenYears,
        VoteOption::Never,
    ];

    /// Years until BTC is overtaken; `None` for "never".
    pub fn years(self) -> Option<u64> {
        match self {
            VoteOption::TwoYears => Some(2),
            VoteOption::FourYears => Some(4),
            VoteOption::SixYears => Some(6),
            VoteOption::EightYears => Some(8),
            VoteOption::TenYears => Some(10),
            VoteOption::Never => None,
        }
    }

    pub fn from_years(years: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.years() == Some(years))
    }

    /// Position in the contract's per-option tallies.
    pub fn index(self) -> usize {
        match self {
            VoteOption::TwoYears => 0,
            VoteOption::FourYears => 1,
            VoteOption::SixYears => 2,
            VoteOption::EightYears => 3,
            VoteOption::TenYears => 4,
            VoteOption::Never => 5,
        }
    }

    pub fn label(self) -> String {
        match self.years() {
            Some(years) => format!("{years} 年内"),
            None => "永不会".into(),
        }
    }

    pub fn description(self, base_year: u64) -> String {
        match self.years() {
            Some(years) => format!("{} 年前被超越", base_year + years),
            None => "BTC 将持续领先".into(),
        }
    }

    /// The year submitted to the voting contract; 0 encodes "never".
    pub fn predicted_year(self, base_year: u64) -> u64 {
        self.years().map_or(0, |years| base_year + years)
    }

    pub fn from_predicted_year(year: u64, base_year: u64) -> Option<Self> {
        if year == 0 {
            return Some(VoteOption::Never);
        }
        year.checked_sub(base_year).and_then(Self::from_years)
    }
}

/// Calendar year option descriptions are relative to.
pub fn current_base_year() -> u64 {
    u64::try_from(Local::now().year()).unwrap_or_default()
}

/// Two-year bucket a predicted year falls into: odd years open a bucket,
/// even years close one. 2049 and 2050 both render as `2049-2051年`.
pub fn year_range_label(predicted_year: u64) -> String {
    match year_range_start(predicted_year) {
        Some(start) => format!("{}-{}年", start, start.saturating_add(2)),
        None => "永不会".into(),
    }
}

/// First year of the bucket `year` falls into; `None` for "never" (0).
pub fn year_range_start(year: u64) -> Option<u64> {
    match year {
        0 => None,
        y if y % 2 == 0 => Some(y - 1),
        y => Some(y),
    }
}

/// One bar of the result preview.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendBar {
    pub option: VoteOption,
    pub percentage: f64,
}

// ---------------------------------------------------------------------------
// Panel data
// ---------------------------------------------------------------------------

/// State of the vote page.
#[derive(Debug, Clone)]
pub struct VotePanelData {
    pub tickets: f64,
    pub selected: Option<VoteOption>,
    pub is_submitting: bool,
    pub has_submitted: bool,
    pub base_year: u64,
    pub trend: Vec<TrendBar>,
    pub last_error: Option<String>,
    initial_tickets: f64,
}

impl VotePanelData {
    pub fn new(defaults: &VoteDemo, base_year: u64) -> Self {
        let trend = VoteOption::ALL
            .into_iter()
            .zip(defaults.trend_preview.iter())
            .map(|(option, pct)| TrendBar {
                option,
                percentage: f64::from(*pct),
            })
            .collect();
        Self {
            tickets: defaults.tickets,
            selected: None,
            is_submitting: false,
            has_submitted: false,
            base_year,
            trend,
            last_error: None,
            initial_tickets: defaults.tickets,
        }
    }

    /// Selection is locked once a vote was submitted or is in flight.
    /// Returns `true` if the selection changed.
    pub fn select(&mut self, option: VoteOption) -> bool {
        if self.has_submitted || self.is_submitting || self.selected == Some(option) {
            return false;
        }
        self.selected = Some(option);
        self.last_error = None;
        true
    }

    pub fn predicted_year(&self) -> Option<u64> {
        self.selected.map(|o| o.predicted_year(self.base_year))
    }

    pub fn set_tickets(&mut self, tickets: f64) {
        self.tickets = tickets;
    }

    /// Replace the preview with live tallies. Nothing changes while no
    /// tickets have been cast.
    pub fn apply_stats(&mut self, stats: &VotingStats) {
        let total = units::to_f64(stats.total_tickets, TOKEN_DECIMALS);
        if total <= 0.0 {
            return;
        }
        self.trend = VoteOption::ALL
            .into_iter()
            .map(|option| {
                let tickets = stats
                    .option_tickets
                    .get(option.index())
                    .copied()
                    .unwrap_or(U256::ZERO);
                TrendBar {
                    option,
                    percentage: units::to_f64(tickets, TOKEN_DECIMALS) / total * 100.0,
                }
            })
            .collect();
    }

    pub fn validate(&self) -> Result<VoteOption, InputError> {
        if self.has_submitted {
            return Err(InputError::AlreadySubmitted);
        }
        if self.is_submitting {
            return Err(InputError::Busy);
        }
        let option = self.selected.ok_or(InputError::NoSelection)?;
        if self.tickets <= 0.0 {
            return Err(InputError::ExceedsBalance);
        }
        Ok(option)
    }

    pub fn begin(&mut self) -> Result<VoteOption, InputError> {
        match self.validate() {
            Ok(option) => {
                self.is_submitting = true;
                self.last_error = None;
                Ok(option)
            }
            Err(e) => {
                self.last_error = Some(e.message().to_string());
                Err(e)
            }
        }
    }

    /// All tickets are spent on the submitted prediction.
    pub fn complete(&mut self) {
        if !self.is_submitting {
            return;
        }
        info!(option = ?self.selected, tickets = self.tickets, "vote submitted");
        self.is_submitting = false;
        self.has_submitted = true;
        self.tickets = 0.0;
    }

    pub fn apply_flow(&mut self, snapshot: &FlowSnapshot) {
        match snapshot.state {
            FlowState::Success => self.complete(),
            FlowState::Reverted => {
                self.is_submitting = false;
                self.last_error = snapshot.error.as_ref().map(|e| e.user_message().to_string());
            }
            state if state.is_pending() => self.is_submitting = true,
            _ => {}
        }
    }

    /// Rows of the side summary.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let choice = match self.selected {
            Some(option) => match option.years() {
                Some(years) => format!("{years} 年"),
                None => option.label(),
            },
            None => "未选择".into(),
        };
        vec![
            ("投票券余额", format!("{} 张", trim_number(self.tickets))),
            ("当前选择", choice),
            ("Chainlink 状态", "监听中 (24h/次)".into()),
        ]
    }

    pub fn button_label(&self, connected: bool) -> &'static str {
        if self.has_submitted {
            "已提交，等待开奖"
        } else if self.is_submitting {
            "提交中..."
        } else if connected {
            "确认投票"
        } else {
            "连接钱包后投票"
        }
    }

    pub fn reset(&mut self) {
        self.selected = None;
        self.is_submitting = false;
        self.has_submitted = false;
        self.tickets = self.initial_tickets;
        self.last_error = None;
    }
}

impl Default for VotePanelData {
    fn default() -> Self {
        Self::new(&VoteDemo::default(), current_base_year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_buckets() {
        assert_eq!(year_range_label(2049), "2049-2051年");
        assert_eq!(year_range_label(2050), "2049-2051年");
        assert_eq!(year_range_label(2027), "2027-2029年");
        assert_eq!(year_range_label(0), "永不会");
    }

    #[test]
    fn never_encodes_as_zero() {
        assert_eq!(VoteOption::Never.predicted_year(2025), 0);
        assert_eq!(VoteOption::from_predicted_year(0, 2025), Some(VoteOption::Never));
    }
}

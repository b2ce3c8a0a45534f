//! Demo-mode defaults.
//!
//! Every page falls back to local state when no backend or contract is
//! configured. The seed values for that state live here, in one place, and
//! are injected into the panels instead of being hardcoded per page.

use serde::{Deserialize, Serialize};

/// A lock period offered by the staking page in demo mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockPreset {
    pub days: u32,
    pub multiplier: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MintDemo {
    pub dot_balance: f64,
    pub default_amount: String,
    pub exchange_rate: f64,
    pub network_fee: f64,
    pub service_fee: f64,
}

impl Default for MintDemo {
    fn default() -> Self {
        Self {
            dot_balance: 280.32,
            default_amount: "10".into(),
            exchange_rate: 0.98,
            network_fee: 0.12,
            service_fee: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakeDemo {
    pub vdot_balance: f64,
    pub default_amount: String,
    pub tickets: f64,
    pub quick_select_percents: Vec<u32>,
    pub lock_presets: Vec<LockPreset>,
}

impl Default for StakeDemo {
    fn default() -> Self {
        Self {
            vdot_balance: 96.4,
            default_amount: "32".into(),
            tickets: 54.0,
            quick_select_percents: vec![25, 50, 75, 100],
            lock_presets: vec![
                LockPreset {
                    days: 7,
                    multiplier: 1.0,
                    label: "7 天 (默认)".into(),
                },
                LockPreset {
                    days: 30,
                    multiplier: 1.1,
                    label: "30 天".into(),
                },
                LockPreset {
                    days: 90,
                    multiplier: 1.3,
                    label: "90 天".into(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteDemo {
    pub tickets: f64,
    /// Trend preview shown before results are available, in percent.
    pub trend_preview: Vec<u32>,
}

impl Default for VoteDemo {
    fn default() -> Self {
        Self {
            tickets: 48.0,
            trend_preview: vec![28, 22, 19, 14, 9, 8],
        }
    }
}

/// Values the home dashboard shows when the legacy API is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeDemo {
    pub dot_balance: f64,
    pub minted_vdot: f64,
    pub ticket_balance: f64,
    pub staked_amount: f64,
    pub voting_power: f64,
    pub last_mint_time: String,
}

impl Default for HomeDemo {
    fn default() -> Self {
        Self {
            dot_balance: 356.42,
            minted_vdot: 128.5,
            ticket_balance: 42.0,
            staked_amount: 24.5,
            voting_power: 24.0,
            last_mint_time: "约 2 小时前".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoDefaults {
    pub mint: MintDemo,
    pub stake: StakeDemo,
    pub vote: VoteDemo,
    pub home: HomeDemo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_presets_are_sorted_by_days() {
        let demo = StakeDemo::default();
        let days: Vec<u32> = demo.lock_presets.iter().map(|p| p.days).collect();
        assert_eq!(days, vec![7, 30, 90]);
    }

    #[test]
    fn trend_preview_sums_to_hundred() {
        let total: u32 = VoteDemo::default().trend_preview.iter().sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let parsed: DemoDefaults =
            serde_json::from_str(r#"{"stake": {"vdot_balance": 10.0}}"#).unwrap();
        assert_eq!(parsed.stake.vdot_balance, 10.0);
        assert_eq!(parsed.stake.quick_select_percents, vec![25, 50, 75, 100]);
        assert_eq!(parsed.mint, MintDemo::default());
    }
}

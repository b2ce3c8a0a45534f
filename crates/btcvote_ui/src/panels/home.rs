use tracing::{error, info, warn};

use btcvote_chain::{ContractStats, ReadState, TOKEN_DECIMALS, format_display};
use btcvote_core::{ApiError, HomeDemo, LegacyApiClient, StakePayload, VotePayload};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// One item of the onboarding checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionTask {
    pub label: &'static str,
    pub description: &'static str,
    pub done: bool,
}

/// A headline figure of the hero section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeroMetric {
    pub label: &'static str,
    pub value: String,
}

/// Protocol-wide figures; placeholders while loading or after a failed read.
pub fn hero_metrics(stats: &ReadState<ContractStats>) -> Vec<HeroMetric> {
    let (minted, staked, participants) = match (&stats.data, stats.is_loading) {
        (Some(s), _) if !stats.has_error() => (
            format!("{} vDOT", format_display(s.total_minted, TOKEN_DECIMALS)),
            format!("{} vDOT", format_display(s.total_staked, TOKEN_DECIMALS)),
            s.participant_label().to_string(),
        ),
        (_, true) => ("加载中...".into(), "加载中...".into(), "加载中...".into()),
        _ => ("--".into(), "--".into(), "--".into()),
    };
    vec![
        HeroMetric {
            label: "累计铸造",
            value: minted,
        },
        HeroMetric {
            label: "抵押总量",
            value: staked,
        },
        HeroMetric {
            label: "参与地址",
            value: participants,
        },
    ]
}

// ---------------------------------------------------------------------------
// Home data
// ---------------------------------------------------------------------------

/// The user's progress as shown on the home page.
///
/// Values come from the legacy API when one is configured and from the demo
/// defaults otherwise. Stake and vote update the figures optimistically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeData {
    pub dot_balance: f64,
    pub minted_vdot: f64,
    pub ticket_balance: f64,
    pub staked_amount: f64,
    pub voting_power: f64,
    pub has_voted: bool,
    pub last_mint_time: Option<String>,
    pub community_joined: bool,
    pub loading: bool,
}

impl HomeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_demo(&mut self, demo: &HomeDemo) {
        self.dot_balance = demo.dot_balance;
        self.minted_vdot = demo.minted_vdot;
        self.ticket_balance = demo.ticket_balance;
        self.staked_amount = demo.staked_amount;
        self.voting_power = demo.voting_power;
        self.has_voted = false;
        self.last_mint_time = Some(demo.last_mint_time.clone());
    }

    /// Take a freshly loaded stake payload. Missing minted vDOT falls back to
    /// the staked amount and a missing ticket balance to the voting power.
    pub fn apply_loaded_stake(&mut self, payload: &StakePayload, fallback_mint_time: &str) {
        self.staked_amount = payload.staked_amount.unwrap_or(0.0);
        self.voting_power = payload.voting_power.unwrap_or(0.0);
        self.dot_balance = payload.dot_balance.unwrap_or(0.0);
        self.minted_vdot = payload.minted_vdot.or(payload.staked_amount).unwrap_or(0.0);
        self.ticket_balance = payload.ticket_balance.or(payload.voting_power).unwrap_or(0.0);
        self.last_mint_time = Some(
            payload
                .last_mint_time
                .clone()
                .unwrap_or_else(|| fallback_mint_time.to_string()),
        );
    }

    pub fn apply_loaded_vote(&mut self, payload: &VotePayload) {
        self.has_voted = payload.has_voted.unwrap_or(false);
    }

    /// Load the user's figures. Without an API the demo values are used. A
    /// failed request is logged and leaves whatever was loaded so far.
    pub async fn load(&mut self, api: Option<&LegacyApiClient>, demo: &HomeDemo, address: &str) {
        self.loading = true;
        match api {
            None => self.load_demo(demo),
            Some(api) => {
                if let Err(e) = self.load_from_api(api, demo, address).await {
                    error!(%address, error = %e, "loading user data failed");
                }
            }
        }
        self.loading = false;
    }

    async fn load_from_api(
        &mut self,
        api: &LegacyApiClient,
        demo: &HomeDemo,
        address: &str,
    ) -> Result<(), ApiError> {
        let stake = api.get_stake(address).await?;
        self.apply_loaded_stake(&stake, &demo.last_mint_time);
        let vote = api.get_vote(address).await?;
        self.apply_loaded_vote(&vote);
        Ok(())
    }

    /// Stake `amount`. The error is the message to show the user.
    pub async fn stake(
        &mut self,
        api: Option<&LegacyApiClient>,
        demo: &HomeDemo,
        address: &str,
        amount: f64,
    ) -> Result<(), String> {
        let Some(api) = api else {
            self.staked_amount += amount;
            self.voting_power += amount;
            self.ticket_balance += amount;
            self.minted_vdot = (self.minted_vdot - amount).max(0.0);
            return Ok(());
        };
        match api.post_stake(address, amount).await {
            Ok(payload) => {
                self.staked_amount = payload.staked_amount.unwrap_or(self.staked_amount);
                self.voting_power = payload.voting_power.unwrap_or(self.voting_power);
                self.dot_balance = payload.dot_balance.unwrap_or(self.dot_balance);
                self.minted_vdot = payload.minted_vdot.unwrap_or(self.minted_vdot);
                self.ticket_balance = payload.ticket_balance.unwrap_or(self.ticket_balance);
                self.last_mint_time = payload
                    .last_mint_time
                    .or_else(|| self.last_mint_time.take())
                    .or_else(|| Some(demo.last_mint_time.clone()));
                info!(%address, amount, "stake recorded");
                Ok(())
            }
            Err(e) => Err(failure_message("抵押失败", e)),
        }
    }

    /// Vote for `option` with the full voting power. Returns `Ok(false)` when
    /// there is no voting power to spend.
    pub async fn vote(
        &mut self,
        api: Option<&LegacyApiClient>,
        address: &str,
        option: u64,
    ) -> Result<bool, String> {
        if self.voting_power <= 0.0 {
            return Ok(false);
        }
        let Some(api) = api else {
            self.has_voted = true;
            self.ticket_balance = (self.ticket_balance - self.voting_power).max(0.0);
            return Ok(true);
        };
        match api.post_vote(address, option, self.voting_power).await {
            Ok(payload) => {
                self.has_voted = true;
                self.ticket_balance = payload.ticket_balance.unwrap_or(self.ticket_balance);
                self.voting_power = payload.voting_power.unwrap_or(self.voting_power);
                info!(%address, option, "vote recorded");
                Ok(true)
            }
            Err(e) => Err(failure_message("投票失败", e)),
        }
    }

    pub fn join_community(&mut self) {
        self.community_joined = true;
    }

    pub fn tasks(&self, connected: bool) -> Vec<MissionTask> {
        vec![
            MissionTask {
                label: "连接钱包",
                description: "切换到 Moonbeam 网络并授权扩展。",
                done: connected,
            },
            MissionTask {
                label: "铸造 vDOT",
                description: "通过 SLPx 桥完成 DOT → vDOT 兑换。",
                done: self.minted_vdot > 0.0,
            },
            MissionTask {
                label: "抵押 vDOT",
                description: "在平台合约内锁定 vDOT 获得票券。",
                done: self.staked_amount > 0.0,
            },
            MissionTask {
                label: "提交预测",
                description: "选择年份并确认交易，等待 Chainlink 开奖。",
                done: self.has_voted,
            },
            MissionTask {
                label: "加入 TG 社区",
                description: "进入 Telegram 群获取开奖提醒与最新活动。",
                done: self.community_joined,
            },
        ]
    }

    pub fn completed_tasks(&self, connected: bool) -> usize {
        self.tasks(connected).iter().filter(|t| t.done).count()
    }

    pub fn status_line(&self) -> &'static str {
        if self.loading {
            "同步链上数据..."
        } else {
            "链上状态正常"
        }
    }

    pub fn last_mint_line(&self) -> String {
        match &self.last_mint_time {
            Some(time) => format!("最近一次铸造：{time}"),
            None => "等待铸造记录".into(),
        }
    }

    /// Clear everything the wallet loaded, as on disconnect.
    pub fn reset(&mut self) {
        let community_joined = self.community_joined;
        *self = Self::new();
        self.community_joined = community_joined;
    }
}

fn failure_message(action: &str, err: ApiError) -> String {
    match err {
        ApiError::Server { message, .. } => {
            warn!(action, %message, "legacy api rejected request");
            format!("{action}: {message}")
        }
        other => {
            error!(action, error = %other, "legacy api request failed");
            format!("{action}，请重试")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loaded_stake_falls_back() {
        let mut home = HomeData::new();
        let payload = StakePayload {
            staked_amount: Some(10.0),
            voting_power: Some(11.0),
            ..Default::default()
        };
        home.apply_loaded_stake(&payload, "约 2 小时前");
        assert_eq!(home.minted_vdot, 10.0);
        assert_eq!(home.ticket_balance, 11.0);
        assert_eq!(home.dot_balance, 0.0);
        assert_eq!(home.last_mint_time.as_deref(), Some("约 2 小时前"));
    }

    #[test]
    fn server_error_keeps_message() {
        let err = ApiError::Server {
            status: 400,
            message: "余额不足".into(),
        };
        assert_eq!(failure_message("抵押失败", err), "抵押失败: 余额不足");
        assert_eq!(
            failure_message("投票失败", ApiError::Network("refused".into())),
            "投票失败，请重试"
        );
    }
}

use btcvote_chain::{TOKEN_DECIMALS, VoteRecord, format_display};

use super::vote::{year_range_label, year_range_start};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleStatus {
    pub state: String,
    pub last_check: String,
    pub next_check: String,
    pub trigger_condition: String,
}

impl Default for OracleStatus {
    fn default() -> Self {
        Self {
            state: "监听中".into(),
            last_check: "2025/02/26 12:00 UTC".into(),
            next_check: "2025/02/27 12:00 UTC".into(),
            trigger_condition: "任一竞争链市值 ≥ BTC".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub address: String,
    pub reward: String,
    pub option: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub time: String,
    pub title: String,
    pub description: String,
}

/// Where one vote stands once its period is looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    /// The period has not been resolved.
    Pending,
    Claimable,
    Claimed,
    /// Resolved with a different answer.
    Missed,
}

impl ClaimStatus {
    /// A prediction wins when it lands in the same two-year bucket as the
    /// resolved answer.
    pub fn of(vote: &VoteRecord) -> Self {
        if !vote.period.resolved {
            ClaimStatus::Pending
        } else if year_range_start(vote.predicted_year)
            != year_range_start(vote.period.correct_answer_year)
        {
            ClaimStatus::Missed
        } else if vote.claimed {
            ClaimStatus::Claimed
        } else {
            ClaimStatus::Claimable
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClaimStatus::Pending => "等待开奖",
            ClaimStatus::Claimable => "可领取",
            ClaimStatus::Claimed => "已领取",
            ClaimStatus::Missed => "未中奖",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealRow {
    pub vote_index: u64,
    pub period_id: u64,
    pub prediction: String,
    pub tickets: String,
    pub status: ClaimStatus,
}

impl From<&VoteRecord> for RevealRow {
    fn from(vote: &VoteRecord) -> Self {
        Self {
            vote_index: vote.index,
            period_id: vote.period.id,
            prediction: year_range_label(vote.predicted_year),
            tickets: format_display(vote.tickets_used, TOKEN_DECIMALS),
            status: ClaimStatus::of(vote),
        }
    }
}

// ---------------------------------------------------------------------------
// Panel data
// ---------------------------------------------------------------------------

/// State of the reveal page: oracle watch, past winners, and the user's own
/// votes with their claim status.
#[derive(Debug, Clone)]
pub struct RevealData {
    pub oracle: OracleStatus,
    pub winners: Vec<Winner>,
    pub timeline: Vec<TimelineEntry>,
    pub rows: Vec<RevealRow>,
}

impl RevealData {
    pub fn new() -> Self {
        Self {
            oracle: OracleStatus::default(),
            winners: demo_winners(),
            timeline: demo_timeline(),
            rows: Vec::new(),
        }
    }

    pub fn set_history(&mut self, votes: &[VoteRecord]) {
        self.rows = votes.iter().map(RevealRow::from).collect();
    }

    /// Vote indices a `claimReward` can be sent for.
    pub fn claimable(&self) -> Vec<u64> {
        self.rows
            .iter()
            .filter(|r| r.status == ClaimStatus::Claimable)
            .map(|r| r.vote_index)
            .collect()
    }
}

impl Default for RevealData {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_winners() -> Vec<Winner> {
    [
        ("5Fsd...8P2K", "传奇 NFT"),
        ("5Hb3...1QW9", "稀有 NFT"),
        ("5Cv8...46D1", "普通 NFT"),
    ]
    .into_iter()
    .map(|(address, reward)| Winner {
        address: address.into(),
        reward: reward.into(),
        option: "6 年内".into(),
    })
    .collect()
}

fn demo_timeline() -> Vec<TimelineEntry> {
    [
        ("2025/02/26", "Chainlink 监测", "竞争链市值达到 BTC 98%"),
        ("2025/03/05", "触发开奖", "竞争链市值首次超过 BTC"),
        ("2025/03/05", "NFT 发放", "预测正确用户获得奖励"),
    ]
    .into_iter()
    .map(|(time, title, description)| TimelineEntry {
        time: time.into(),
        title: title.into(),
        description: description.into(),
    })
    .collect()
}

use alloy_primitives::{B256, U256};
use btcvote_chain::{FlowSnapshot, FlowState, VotingStats, WriteError, WriteErrorCode, parse_ether};
use btcvote_core::VoteDemo;
use btcvote_ui::panels::InputError;
use btcvote_ui::panels::vote::*;

fn panel() -> VotePanelData {
    VotePanelData::new(&VoteDemo::default(), 2025)
}

#[test]
fn options_describe_years_from_base() {
    assert_eq!(VoteOption::TwoYears.label(), "2 年内");
    assert_eq!(VoteOption::TwoYears.description(2025), "2027 年前被超越");
    assert_eq!(VoteOption::TenYears.description(2025), "2035 年前被超越");
    assert_eq!(VoteOption::Never.label(), "永不会");
    assert_eq!(VoteOption::Never.description(2025), "BTC 将持续领先");
}

#[test]
fn predicted_year_round_trips_through_options() {
    assert_eq!(VoteOption::FourYears.predicted_year(2025), 2029);
    assert_eq!(
        VoteOption::from_predicted_year(2031, 2025),
        Some(VoteOption::SixYears)
    );
    assert_eq!(VoteOption::from_predicted_year(2030, 2025), None);
    assert_eq!(VoteOption::from_predicted_year(1999, 2025), None);
}

#[test]
fn year_range_groups_pairs_of_years() {
    assert_eq!(year_range_label(2049), "2049-2051年");
    assert_eq!(year_range_label(2050), "2049-2051年");
    assert_eq!(year_range_label(0), "永不会");
    assert_eq!(year_range_start(2028), Some(2027));
}

#[test]
fn year_range_saturates_at_the_top() {
    assert_eq!(
        year_range_label(u64::MAX),
        format!("{}-{}年", u64::MAX, u64::MAX)
    );
    assert_eq!(year_range_label(u64::MAX - 1), format!("{}-{}年", u64::MAX - 2, u64::MAX));
}

#[test]
fn new_has_no_selection() {
    let data = panel();
    assert_eq!(data.selected, None);
    assert_eq!(data.tickets, 48.0);
    assert_eq!(data.trend.len(), 6);
    assert_eq!(data.trend[0].percentage, 28.0);
    assert_eq!(data.predicted_year(), None);
}

#[test]
fn summary_reflects_selection() {
    let mut data = panel();
    assert_eq!(data.summary()[0], ("投票券余额", "48 张".to_string()));
    assert_eq!(data.summary()[1], ("当前选择", "未选择".to_string()));
    data.select(VoteOption::SixYears);
    assert_eq!(data.summary()[1], ("当前选择", "6 年".to_string()));
    data.select(VoteOption::Never);
    assert_eq!(data.summary()[1], ("当前选择", "永不会".to_string()));
    assert_eq!(data.summary()[2].1, "监听中 (24h/次)");
}

#[test]
fn submit_without_selection_is_refused() {
    let mut data = panel();
    assert_eq!(data.begin(), Err(InputError::NoSelection));
    assert!(!data.is_submitting);
}

#[test]
fn submit_spends_all_tickets_and_locks_selection() {
    let mut data = panel();
    assert!(data.select(VoteOption::FourYears));
    assert_eq!(data.predicted_year(), Some(2029));
    assert_eq!(data.begin(), Ok(VoteOption::FourYears));
    assert_eq!(data.button_label(true), "提交中...");
    assert!(!data.select(VoteOption::TwoYears));

    data.complete();
    assert!(data.has_submitted);
    assert_eq!(data.tickets, 0.0);
    assert_eq!(data.button_label(true), "已提交，等待开奖");
    assert!(!data.select(VoteOption::TwoYears));
    assert_eq!(data.selected, Some(VoteOption::FourYears));
    assert_eq!(data.begin(), Err(InputError::AlreadySubmitted));
}

#[test]
fn no_tickets_means_no_vote() {
    let mut data = panel();
    data.set_tickets(0.0);
    data.select(VoteOption::TwoYears);
    assert_eq!(data.begin(), Err(InputError::ExceedsBalance));
}

#[test]
fn reverted_flow_unlocks_for_retry() {
    let mut data = panel();
    data.select(VoteOption::TwoYears);
    data.begin().unwrap();
    data.apply_flow(&FlowSnapshot {
        state: FlowState::Reverted,
        approve_hash: None,
        tx_hash: Some(B256::repeat_byte(1)),
        error: Some(WriteError::new(WriteErrorCode::UserRejected, "4001")),
    });
    assert!(!data.is_submitting);
    assert!(!data.has_submitted);
    assert_eq!(data.last_error.as_deref(), Some("用户取消了交易"));
    assert!(data.select(VoteOption::Never));
}

#[test]
fn live_stats_replace_preview() {
    let mut data = panel();
    let mut option_tickets = [U256::ZERO; 6];
    option_tickets[0] = parse_ether("30").unwrap();
    option_tickets[5] = parse_ether("10").unwrap();
    data.apply_stats(&VotingStats {
        period_id: 1,
        total_tickets: parse_ether("40").unwrap(),
        option_tickets,
    });
    assert_eq!(data.trend[0].percentage, 75.0);
    assert_eq!(data.trend[1].percentage, 0.0);
    assert_eq!(data.trend[5].percentage, 25.0);
}

#[test]
fn empty_stats_keep_preview() {
    let mut data = panel();
    data.apply_stats(&VotingStats {
        period_id: 1,
        total_tickets: U256::ZERO,
        option_tickets: [U256::ZERO; 6],
    });
    assert_eq!(data.trend[0].percentage, 28.0);
}

#[test]
fn reset_clears_submission() {
    let mut data = panel();
    data.select(VoteOption::TwoYears);
    data.begin().unwrap();
    data.complete();
    data.reset();
    assert_eq!(data.selected, None);
    assert_eq!(data.tickets, 48.0);
    assert_eq!(data.button_label(false), "连接钱包后投票");
}

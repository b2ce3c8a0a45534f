use btcvote_chain::{ContractStats, ReadState, parse_ether};
use btcvote_core::HomeDemo;
use btcvote_ui::panels::home::*;

async fn loaded() -> HomeData {
    let mut home = HomeData::new();
    home.load(None, &HomeDemo::default(), "0xabc").await;
    home
}

#[tokio::test]
async fn demo_load_fills_defaults() {
    let home = loaded().await;
    assert_eq!(home.dot_balance, 356.42);
    assert_eq!(home.minted_vdot, 128.5);
    assert_eq!(home.ticket_balance, 42.0);
    assert_eq!(home.staked_amount, 24.5);
    assert_eq!(home.voting_power, 24.0);
    assert!(!home.has_voted);
    assert!(!home.loading);
    assert_eq!(home.last_mint_line(), "最近一次铸造：约 2 小时前");
    assert_eq!(home.status_line(), "链上状态正常");
}

#[test]
fn fresh_home_waits_for_mint() {
    let home = HomeData::new();
    assert_eq!(home.last_mint_line(), "等待铸造记录");
    assert_eq!(home.completed_tasks(false), 0);
}

#[tokio::test]
async fn demo_stake_is_optimistic() {
    let mut home = loaded().await;
    home.stake(None, &HomeDemo::default(), "0xabc", 10.0)
        .await
        .unwrap();
    assert_eq!(home.staked_amount, 34.5);
    assert_eq!(home.voting_power, 34.0);
    assert_eq!(home.ticket_balance, 52.0);
    assert_eq!(home.minted_vdot, 118.5);
}

#[tokio::test]
async fn demo_stake_never_drives_minted_negative() {
    let mut home = loaded().await;
    home.stake(None, &HomeDemo::default(), "0xabc", 500.0)
        .await
        .unwrap();
    assert_eq!(home.minted_vdot, 0.0);
}

#[tokio::test]
async fn demo_vote_spends_voting_power() {
    let mut home = loaded().await;
    assert_eq!(home.vote(None, "0xabc", 4).await, Ok(true));
    assert!(home.has_voted);
    assert_eq!(home.ticket_balance, 18.0);
}

#[tokio::test]
async fn vote_without_power_does_nothing() {
    let mut home = HomeData::new();
    assert_eq!(home.vote(None, "0xabc", 4).await, Ok(false));
    assert!(!home.has_voted);
}

#[tokio::test]
async fn checklist_tracks_progress() {
    let mut home = loaded().await;
    let done: Vec<bool> = home.tasks(true).iter().map(|t| t.done).collect();
    assert_eq!(done, vec![true, true, true, false, false]);

    home.vote(None, "0xabc", 2).await.unwrap();
    home.join_community();
    assert_eq!(home.completed_tasks(true), 5);
    assert_eq!(home.tasks(true)[4].label, "加入 TG 社区");
}

#[tokio::test]
async fn reset_clears_wallet_data() {
    let mut home = loaded().await;
    home.join_community();
    home.reset();
    assert_eq!(home.staked_amount, 0.0);
    assert_eq!(home.last_mint_time, None);
    assert!(home.community_joined);
}

#[test]
fn hero_metrics_states() {
    let loading = hero_metrics(&ReadState::<ContractStats>::loading());
    assert!(loading.iter().all(|m| m.value == "加载中..."));

    let ready = hero_metrics(&ReadState::ready(ContractStats {
        total_minted: parse_ether("128520").unwrap(),
        total_staked: parse_ether("92310").unwrap(),
    }));
    assert_eq!(ready[0].label, "累计铸造");
    assert_eq!(ready[0].value, "128,520 vDOT");
    assert_eq!(ready[1].value, "92,310 vDOT");
    assert_eq!(ready[2].value, "1+");

    let failed = hero_metrics(&ReadState::<ContractStats> {
        data: None,
        is_loading: false,
        error: Some("timeout".into()),
    });
    assert!(failed.iter().all(|m| m.value == "--"));
}

use std::future::Future;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use btcvote_chain::{
    CancelToken, ContractName, Poller, ReadError, ReadState, RefreshTopic, TOKEN_DECIMALS,
    WalletKind, WriteError, WriteFlow, WriteOutcome, network_name, units,
};
use btcvote_core::BtcvoteError;
use btcvote_ui::panels::dashboard::UserData;
use btcvote_ui::panels::header::HeaderData;
use btcvote_ui::panels::home::{HomeData, HeroMetric, hero_metrics};
use btcvote_ui::panels::mint::{BRIDGE_STEPS, MintPanelData};
use btcvote_ui::panels::reveal::{RevealData, RevealRow};
use btcvote_ui::panels::stake::{StakePanelData, rows_from_details};
use btcvote_ui::panels::vote::{VoteOption, VotePanelData, current_base_year};
use btcvote_ui::panels::short_hash;

use crate::context::AppContext;

/// Simulated bridge latency per step after the first.
const BRIDGE_DELAYS_MS: [u64; 3] = [1200, 1500, 800];
const DEMO_STAKE_DELAY: Duration = Duration::from_millis(1500);
const DEMO_VOTE_DELAY: Duration = Duration::from_millis(1400);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn failed_read<T>(err: ReadError) -> ReadState<T> {
    warn!(error = %err, "read failed");
    ReadState {
        data: None,
        is_loading: false,
        error: Some(BtcvoteError::from(err).user_message()),
    }
}

fn read_state<T>(result: Result<T, ReadError>) -> ReadState<T> {
    match result {
        Ok(data) => ReadState::ready(data),
        Err(e) => failed_read(e),
    }
}

fn print_metrics(metrics: &[HeroMetric]) {
    for metric in metrics {
        println!("  {:<10} {}", metric.label, metric.value);
    }
}

fn print_rows(rows: &[(&'static str, String)]) {
    for (label, value) in rows {
        println!("  {label:<10} {value}");
    }
}

/// Cancel the returned token on Ctrl-C so a pending confirmation wait stops.
fn cancel_on_interrupt() -> (CancelToken, JoinHandle<()>) {
    let token = CancelToken::new();
    let on_signal = token.clone();
    let handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; no longer waiting for confirmation");
            on_signal.cancel();
        }
    });
    (token, handle)
}

/// Run a write while echoing each state change of `flow`.
async fn drive<Fut>(flow: &WriteFlow, action: Fut) -> Result<WriteOutcome, WriteError>
where
    Fut: Future<Output = Result<WriteOutcome, WriteError>>,
{
    let mut rx = flow.subscribe();
    let printer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let label = rx.borrow_and_update().state.label();
            if !label.is_empty() {
                println!("  {label}");
            }
        }
    });
    let result = action.await;
    printer.abort();
    result
}

fn report(flow: &WriteFlow, result: Result<WriteOutcome, WriteError>) -> Result<()> {
    match result {
        Ok(outcome) => {
            if let Some(hash) = outcome.approve_hash {
                println!("  授权交易 {}", short_hash(hash));
            }
            println!("{}", success_line(&outcome));
            Ok(())
        }
        Err(e) => {
            error!(flow = flow.name(), code = ?e.code, detail = %e.detail, "write failed");
            bail!("{}", e.user_message())
        }
    }
}

fn success_line(outcome: &WriteOutcome) -> String {
    let block = outcome
        .receipt
        .block_number
        .map_or_else(|| "-".to_string(), |b| b.to_string());
    format!("交易成功 {} (区块 {block})", short_hash(outcome.tx_hash()))
}

fn require(ctx: &AppContext, name: ContractName) -> Result<()> {
    if ctx.has_contract(name) {
        Ok(())
    } else {
        bail!("{name} 合约未部署在 {} 上", network_name(ctx.chain_id))
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub async fn status(ctx: &AppContext) -> Result<()> {
    println!("网络      {} ({})", network_name(ctx.chain_id), ctx.chain_id);
    match ctx.reader.client().block_number().await {
        Ok(height) => println!("区块高度  {height}"),
        Err(e) => {
            warn!(error = %e, "block number unavailable");
            println!("区块高度  不可用");
        }
    }
    match &ctx.api {
        Some(api) => println!("后端 API  {}", api.base_url()),
        None => println!("后端 API  未配置 (演示模式)"),
    }

    println!("合约:");
    for (name, address) in ctx.reader.contracts().deployed() {
        println!("  {:<16} {address}", name.label());
    }

    if ctx.has_contract(ContractName::VDot) && ctx.has_contract(ContractName::StakingContract) {
        let stats = read_state(ctx.reader.contract_stats().await);
        println!("协议数据:");
        print_metrics(&hero_metrics(&stats));
    }
    if ctx.has_contract(ContractName::VotingContract) {
        match ctx.reader.current_voting_period_id().await {
            Ok(period) => println!("当前投票期 #{period}"),
            Err(e) => warn!(error = %e, "voting period unavailable"),
        }
    }
    Ok(())
}

pub async fn dashboard(ctx: &AppContext, kind: WalletKind) -> Result<()> {
    let address = ctx.connect(kind).await?;
    let header = HeaderData::new(ctx.wallet.session(), ctx.chain_id);
    println!("{} · {} · {}", header.network_label(), kind, header.wallet_label());

    if kind == WalletKind::Evm && ctx.has_contract(ContractName::VDot) {
        if let Some(account) = ctx.evm.account() {
            let state = read_state(ctx.reader.user_snapshot(account).await);
            let user = UserData::from_state(true, &state);
            if let Some(error) = &user.error {
                println!("链上数据读取失败: {error}");
            }
            println!("链上资产:");
            print_rows(&user.rows());
        }
    }

    let mut home = HomeData::new();
    home.load(ctx.api.as_ref(), &ctx.config.demo.home, &address)
        .await;
    println!("{} · {}", home.status_line(), home.last_mint_line());
    let connected = ctx.wallet.is_connected();
    println!(
        "任务进度 {}/{}",
        home.completed_tasks(connected),
        home.tasks(connected).len()
    );
    for task in home.tasks(connected) {
        let mark = if task.done { "x" } else { " " };
        println!("  [{mark}] {} - {}", task.label, task.description);
    }
    Ok(())
}

pub async fn mint(ctx: &AppContext, amount: &str) -> Result<()> {
    if !ctx.has_contract(ContractName::VDot) {
        return mint_demo(ctx, amount).await;
    }

    let account = ctx.evm_account().await?;
    let native = ctx
        .reader
        .native_balance(account)
        .await
        .map_err(|e| anyhow!(BtcvoteError::from(e).user_message()))?;
    let mut panel = MintPanelData::contract(units::to_f64(native, TOKEN_DECIMALS));
    panel.set_amount(amount);
    let value = panel.deposit_value().map_err(|e| anyhow!(e.message()))?;
    println!("铸造 {} vDOT (1:1)", panel.preview());

    let flow = WriteFlow::new("mint");
    let (cancel, interrupt) = cancel_on_interrupt();
    let result = drive(&flow, ctx.writer.mint(&flow, Some(account), value, &cancel)).await;
    interrupt.abort();
    panel.apply_flow(&flow.snapshot());
    report(&flow, result)?;
    println!("{}", panel.balance_label());
    Ok(())
}

async fn mint_demo(ctx: &AppContext, amount: &str) -> Result<()> {
    let mut panel = MintPanelData::demo(&ctx.config.demo.mint);
    panel.set_amount(amount);
    panel.begin().map_err(|e| anyhow!(e.message()))?;
    println!(
        "铸造 {} DOT → {} vDOT (手续费 {:.2} DOT)",
        panel.amount,
        panel.preview(),
        panel.total_fee()
    );
    println!("  {}", BRIDGE_STEPS[0]);
    for delay in BRIDGE_DELAYS_MS {
        tokio::time::sleep(Duration::from_millis(delay)).await;
        panel.advance_bridge();
        if let Some(step) = BRIDGE_STEPS.get(panel.bridge_step.saturating_sub(1)) {
            println!("  {step}");
        }
    }
    if let Some(record) = panel.history.first() {
        println!("{} {} · {}", panel.button_label(true), record.id, record.time);
    }
    println!("{}", panel.balance_label());
    panel.finish();
    Ok(())
}

pub async fn stake(ctx: &AppContext, amount: &str, lock_days: u64) -> Result<()> {
    let mut panel = StakePanelData::new(&ctx.config.demo.stake);
    let on_chain = ctx.has_contract(ContractName::StakingContract);
    let account = if on_chain {
        let account = ctx.evm_account().await?;
        match ctx.reader.vdot_balance(account).await {
            Ok(balance) => panel.balance = units::to_f64(balance, TOKEN_DECIMALS),
            Err(e) => bail!(BtcvoteError::from(e).user_message()),
        }
        match ctx.reader.lock_options().await {
            Ok(options) => panel.set_lock_options(&options),
            Err(e) => warn!(error = %e, "lock options unavailable, using presets"),
        }
        Some(account)
    } else {
        None
    };

    if !panel.select_lock(lock_days) {
        let offered: Vec<String> = panel.lock_options.iter().map(|c| c.days.to_string()).collect();
        bail!("不支持 {lock_days} 天锁定期，可选: {}", offered.join(", "));
    }
    panel.set_amount(amount);
    if let Some(choice) = panel.selected() {
        println!(
            "抵押 {} vDOT · {} · {} · 预计获得 {}",
            panel.amount,
            choice.label,
            choice.multiplier_label(),
            panel.projected_label()
        );
    }

    let Some(account) = account else {
        panel.begin().map_err(|e| anyhow!(e.message()))?;
        println!("  {}", panel.button_label(true));
        tokio::time::sleep(DEMO_STAKE_DELAY).await;
        panel.complete_demo();
        if let Some(row) = panel.history.first() {
            println!("{} {} · {}", row.status, row.tx, row.summary());
        }
        println!("{} · 投票券 {:.2} 张", panel.balance_label(), panel.tickets);
        return Ok(());
    };

    let (value, days) = panel.stake_args().map_err(|e| anyhow!(e.message()))?;
    match ctx.reader.calculate_tickets(value, days).await {
        Ok(tickets) => println!("  链上计算: {} 张", units::format_display(tickets, TOKEN_DECIMALS)),
        Err(e) => warn!(error = %e, "ticket estimate unavailable"),
    }
    if let Ok(allowance) = ctx.reader.vdot_allowance(account).await {
        if allowance < value {
            println!("  需要先授权 vDOT");
        }
    }
    panel.begin().map_err(|e| anyhow!(e.message()))?;
    let flow = WriteFlow::new("stake");
    let (cancel, interrupt) = cancel_on_interrupt();
    let result = drive(
        &flow,
        ctx.writer.stake(&flow, Some(account), value, days, &cancel),
    )
    .await;
    interrupt.abort();
    panel.apply_flow(&flow.snapshot());
    report(&flow, result)
}

pub async fn unstake(ctx: &AppContext, index: u64) -> Result<()> {
    require(ctx, ContractName::StakingContract)?;
    let account = ctx.evm_account().await?;
    match ctx.reader.can_unstake(account, index).await {
        Ok(true) => {}
        Ok(false) => bail!("抵押 #{index} 仍在锁定期内"),
        Err(e) => bail!(BtcvoteError::from(e).user_message()),
    }

    let flow = WriteFlow::new("unstake");
    let (cancel, interrupt) = cancel_on_interrupt();
    let result = drive(&flow, ctx.writer.unstake(&flow, Some(account), index, &cancel)).await;
    interrupt.abort();
    report(&flow, result)
}

pub async fn vote(ctx: &AppContext, option: VoteOption) -> Result<()> {
    let mut panel = VotePanelData::new(&ctx.config.demo.vote, current_base_year());
    let on_chain = ctx.has_contract(ContractName::VotingContract);

    let chain = if on_chain {
        let account = ctx.evm_account().await?;
        let tickets = ctx
            .reader
            .ticket_balance(account)
            .await
            .map_err(|e| anyhow!(BtcvoteError::from(e).user_message()))?;
        panel.set_tickets(units::to_f64(tickets, TOKEN_DECIMALS));
        Some((account, tickets))
    } else {
        None
    };

    panel.select(option);
    panel.begin().map_err(|e| anyhow!(e.message()))?;
    println!("预测: {} · {}", option.label(), option.description(panel.base_year));

    match chain {
        None => {
            println!("  {}", panel.button_label(true));
            tokio::time::sleep(DEMO_VOTE_DELAY).await;
            panel.complete();
        }
        Some((account, tickets)) => {
            let year = option.predicted_year(panel.base_year);
            if let Ok(allowance) = ctx.reader.ticket_allowance(account).await {
                if allowance < tickets {
                    println!("  需要先授权投票券");
                }
            }
            info!(year, "submitting prediction");
            let flow = WriteFlow::new("vote");
            let (cancel, interrupt) = cancel_on_interrupt();
            let result = drive(
                &flow,
                ctx.writer.vote(&flow, Some(account), year, tickets, &cancel),
            )
            .await;
            interrupt.abort();
            panel.apply_flow(&flow.snapshot());
            report(&flow, result)?;
        }
    }
    println!("{}", panel.button_label(true));
    print_rows(&panel.summary());
    Ok(())
}

pub async fn claim(ctx: &AppContext, index: Option<u64>) -> Result<()> {
    require(ctx, ContractName::VotingContract)?;
    let account = ctx.evm_account().await?;
    let history = ctx
        .reader
        .vote_history(account)
        .await
        .map_err(|e| anyhow!(BtcvoteError::from(e).user_message()))?;
    let mut reveal = RevealData::new();
    reveal.set_history(&history);

    let claimable = reveal.claimable();
    let targets = match index {
        Some(i) if claimable.contains(&i) => vec![i],
        Some(i) => bail!("投票 #{i} 当前不可领取"),
        None => claimable,
    };
    if targets.is_empty() {
        println!("暂无可领取的奖励");
        return Ok(());
    }

    for vote_index in targets {
        println!("领取投票 #{vote_index} 的奖励");
        let flow = WriteFlow::new("claim");
        let (cancel, interrupt) = cancel_on_interrupt();
        let result = drive(
            &flow,
            ctx.writer.claim_reward(&flow, Some(account), vote_index, &cancel),
        )
        .await;
        interrupt.abort();
        report(&flow, result)?;
    }
    Ok(())
}

pub async fn history(ctx: &AppContext) -> Result<()> {
    require(ctx, ContractName::StakingContract)?;
    let account = ctx.evm_account().await?;
    let (stakes, votes) = tokio::try_join!(
        ctx.reader.stake_details(account),
        ctx.reader.vote_history(account)
    )
    .map_err(|e| anyhow!(BtcvoteError::from(e).user_message()))?;

    let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
    println!("抵押记录 (生效 {} 笔):", stakes.active_stakes);
    for row in rows_from_details(&stakes, now) {
        println!("  {} {} {} {}", row.tx, row.time, row.status, row.summary());
    }

    println!("投票记录:");
    for row in votes.iter().map(RevealRow::from) {
        println!(
            "  #{} 第 {} 期 {} {} 张 {}",
            row.vote_index,
            row.period_id,
            row.prediction,
            row.tickets,
            row.status.label()
        );
    }
    Ok(())
}

/// Poll the user summary and protocol stats until Ctrl-C.
pub async fn watch(ctx: &AppContext) -> Result<()> {
    let account = ctx.evm_account().await?;

    let reader = ctx.reader.clone();
    let mut user = Poller::new("user_snapshot", ctx.config.balance_poll_interval())
        .invalidated_by(&ctx.hub, RefreshTopic::Balances)
        .spawn(move || {
            let reader = reader.clone();
            async move { reader.user_snapshot(account).await }
        });

    let reader = ctx.reader.clone();
    let mut stats = Poller::new("contract_stats", ctx.config.read_poll_interval())
        .invalidated_by(&ctx.hub, RefreshTopic::Staking)
        .spawn(move || {
            let reader = reader.clone();
            async move { reader.contract_stats().await }
        });

    let mut accounts = tokio::time::interval(ctx.config.balance_poll_interval());
    info!(%account, "watching; press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = accounts.tick() => {
                if let Err(e) = ctx.evm.refresh_accounts().await {
                    warn!(error = %e, "account refresh failed");
                }
                if !ctx.wallet.is_connected() {
                    println!("钱包已断开");
                    break;
                }
            }
            state = user.changed() => {
                let Some(state) = state else { break };
                let data = UserData::from_state(ctx.wallet.is_connected(), &state);
                println!("[{}] 用户数据", chrono::Local::now().format("%H:%M:%S"));
                print_rows(&data.rows());
            }
            state = stats.changed() => {
                let Some(state) = state else { break };
                println!("[{}] 协议数据", chrono::Local::now().format("%H:%M:%S"));
                print_metrics(&hero_metrics(&state));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use btcvote_chain::TxReceipt;

    fn outcome(block_number: Option<u64>) -> WriteOutcome {
        WriteOutcome {
            approve_hash: None,
            receipt: TxReceipt {
                tx_hash: B256::repeat_byte(0xbb),
                success: true,
                block_number,
                gas_used: None,
            },
        }
    }

    #[test]
    fn success_line_shows_block_or_placeholder() {
        assert_eq!(success_line(&outcome(Some(42))), "交易成功 0xbbbbbb...bbb (区块 42)");
        assert_eq!(success_line(&outcome(None)), "交易成功 0xbbbbbb...bbb (区块 -)");
    }
}

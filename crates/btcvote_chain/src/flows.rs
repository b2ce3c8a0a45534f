//! Contract write flows.
//!
//! Every write runs through a [`WriteFlow`] state machine:
//!
//! ```text
//! Idle ─► Approving ─► Approved ─► Submitting ─► Confirming ─► Success
//!   │                                   ▲             │
//!   └───────────────────────────────────┘             └──────► Reverted
//! ```
//!
//! Stake and vote use the two-step allowance pattern; mint, unstake and
//! claim go straight to `Submitting`. A failure after the first transaction
//! was attempted lands in `Reverted` with a [`WriteErrorCode`] naming the
//! cause. Validation failures leave the flow in `Idle`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info, warn};

use btcvote_core::{AppConfig, BtcvoteError};

use crate::cancel::CancelToken;
use crate::contracts::{ContractName, IERC20, IStakingContract, IVotingContract};
use crate::poller::{RefetchHub, RefreshTopic};
use crate::reads::{ContractReader, ReadError};
use crate::receipt::{ReceiptError, wait_for_receipt};
use crate::rpc::{
    CODE_EXECUTION_REVERTED, CODE_SERVER_ERROR, CODE_USER_REJECTED, RpcError, TxReceipt,
    TxRequest,
};

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowState {
    Idle,
    Approving,
    Approved,
    Submitting,
    Confirming,
    Success,
    Reverted,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Success | FlowState::Reverted)
    }

    /// A transaction is being prepared, signed or confirmed.
    pub fn is_pending(self) -> bool {
        !matches!(self, FlowState::Idle) && !self.is_terminal()
    }

    pub fn can_transition_to(self, next: FlowState) -> bool {
        use FlowState::*;
        matches!(
            (self, next),
            (Idle, Approving)
                | (Idle, Submitting)
                | (Approving, Approved)
                | (Approving, Reverted)
                | (Approved, Submitting)
                | (Approved, Reverted)
                | (Submitting, Confirming)
                | (Submitting, Reverted)
                | (Confirming, Success)
                | (Confirming, Reverted)
        )
    }

    /// Button label shown while the flow is in this state.
    pub fn label(self) -> &'static str {
        match self {
            FlowState::Idle => "",
            FlowState::Approving => "授权中...",
            FlowState::Approved => "已授权",
            FlowState::Submitting => "请在钱包中确认...",
            FlowState::Confirming => "交易确认中...",
            FlowState::Success => "交易成功",
            FlowState::Reverted => "交易失败",
        }
    }
}

/// Observable state of one write flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub state: FlowState,
    pub approve_hash: Option<B256>,
    pub tx_hash: Option<B256>,
    pub error: Option<WriteError>,
}

impl Default for FlowSnapshot {
    fn default() -> Self {
        Self {
            state: FlowState::Idle,
            approve_hash: None,
            tx_hash: None,
            error: None,
        }
    }
}

/// Holds a flow's state and publishes every change.
///
/// Clones share the state; at most one write runs on it at a time.
#[derive(Debug, Clone)]
pub struct WriteFlow {
    name: &'static str,
    tx: watch::Sender<FlowSnapshot>,
    in_use: Arc<AtomicBool>,
}

/// Exclusive use of a [`WriteFlow`]; released on drop.
#[derive(Debug)]
struct FlowClaim {
    in_use: Arc<AtomicBool>,
}

impl Drop for FlowClaim {
    fn drop(&mut self) {
        self.in_use.store(false, Ordering::Release);
    }
}

impl WriteFlow {
    pub fn new(name: &'static str) -> Self {
        let (tx, _rx) = watch::channel(FlowSnapshot::default());
        Self {
            name,
            tx,
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> FlowState {
        self.tx.borrow().state
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.tx.subscribe()
    }

    /// Back to `Idle` from a terminal state. Returns `false` (and changes
    /// nothing) while a transaction is in flight.
    pub fn reset(&self) -> bool {
        if self.state().is_pending() {
            warn!(flow = self.name, state = ?self.state(), "reset ignored while pending");
            return false;
        }
        self.tx.send_replace(FlowSnapshot::default());
        true
    }

    /// Take the flow for one write. Fails with `Busy` when another write
    /// holds it or the flow is not `Idle`.
    fn claim(&self) -> Result<FlowClaim, WriteError> {
        if self
            .in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WriteError::new(
                WriteErrorCode::Busy,
                format!("{} flow is already running", self.name),
            ));
        }
        let claim = FlowClaim {
            in_use: Arc::clone(&self.in_use),
        };
        match self.state() {
            FlowState::Idle => Ok(claim),
            state => Err(WriteError::new(
                WriteErrorCode::Busy,
                format!("{} flow is {state:?}", self.name),
            )),
        }
    }

    fn advance(&self, next: FlowState) {
        let name = self.name;
        self.tx.send_modify(|snap| {
            if snap.state.can_transition_to(next) {
                info!(flow = name, from = ?snap.state, to = ?next, "flow transition");
                snap.state = next;
            } else {
                error!(flow = name, from = ?snap.state, to = ?next, "invalid flow transition");
            }
        });
    }

    fn record_approve_hash(&self, hash: B256) {
        self.tx.send_modify(|snap| snap.approve_hash = Some(hash));
    }

    fn record_tx_hash(&self, hash: B256) {
        self.tx.send_modify(|snap| snap.tx_hash = Some(hash));
    }

    fn fail(&self, err: &WriteError) {
        let name = self.name;
        self.tx.send_modify(|snap| {
            warn!(flow = name, from = ?snap.state, code = ?err.code, detail = %err.detail, "flow failed");
            snap.state = FlowState::Reverted;
            snap.error = Some(err.clone());
        });
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteErrorCode {
    NotConnected,
    InvalidAmount,
    InsufficientBalance,
    InsufficientAllowance,
    UserRejected,
    Reverted,
    Timeout,
    Cancelled,
    Busy,
    Rpc,
}

impl WriteErrorCode {
    pub fn default_message(self) -> &'static str {
        match self {
            WriteErrorCode::NotConnected => "请先连接钱包",
            WriteErrorCode::InvalidAmount => "请输入有效的数量",
            WriteErrorCode::InsufficientBalance => "余额不足",
            WriteErrorCode::InsufficientAllowance => "授权额度不足",
            WriteErrorCode::UserRejected => "用户取消了交易",
            WriteErrorCode::Reverted => "交易失败，合约执行被回滚",
            WriteErrorCode::Timeout => "交易确认超时，请稍后在钱包中查看",
            WriteErrorCode::Cancelled => "已停止等待交易确认",
            WriteErrorCode::Busy => "已有交易正在进行中",
            WriteErrorCode::Rpc => "网络错误，请稍后重试",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code:?}: {detail}")]
pub struct WriteError {
    pub code: WriteErrorCode,
    /// Technical detail for logs.
    pub detail: String,
    user_message: String,
}

impl WriteError {
    pub fn new(code: WriteErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
            user_message: code.default_message().to_string(),
        }
    }

    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = message.into();
        self
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// Classify a JSON-RPC failure. Error codes decide first; message
    /// matching is a fallback for nodes that report everything as -32000.
    pub fn from_rpc(err: &RpcError) -> Self {
        let code = match err {
            RpcError::Rpc { code, message, .. } => {
                let lower = message.to_lowercase();
                match *code {
                    CODE_USER_REJECTED => WriteErrorCode::UserRejected,
                    CODE_EXECUTION_REVERTED => revert_reason(&lower),
                    CODE_SERVER_ERROR if lower.contains("insufficient funds") => {
                        WriteErrorCode::InsufficientBalance
                    }
                    _ if lower.contains("execution reverted") => revert_reason(&lower),
                    _ if lower.contains("user rejected") || lower.contains("user denied") => {
                        WriteErrorCode::UserRejected
                    }
                    _ => WriteErrorCode::Rpc,
                }
            }
            RpcError::Timeout => WriteErrorCode::Timeout,
            RpcError::Transport(_) | RpcError::Decode(_) => WriteErrorCode::Rpc,
        };
        Self::new(code, err.to_string())
    }

    fn from_receipt(err: &ReceiptError) -> Self {
        match err {
            ReceiptError::Timeout { .. } => Self::new(WriteErrorCode::Timeout, err.to_string()),
            ReceiptError::Cancelled(_) => Self::new(WriteErrorCode::Cancelled, err.to_string()),
            ReceiptError::Rpc(e) => Self::from_rpc(e),
        }
    }

    fn from_read(err: &ReadError) -> Self {
        match err {
            ReadError::Rpc(e) => Self::from_rpc(e),
            other => Self::new(WriteErrorCode::Rpc, other.to_string()),
        }
    }
}

fn revert_reason(lower: &str) -> WriteErrorCode {
    if lower.contains("allowance") {
        WriteErrorCode::InsufficientAllowance
    } else if lower.contains("exceeds balance") {
        WriteErrorCode::InsufficientBalance
    } else {
        WriteErrorCode::Reverted
    }
}

impl From<WriteError> for BtcvoteError {
    fn from(err: WriteError) -> Self {
        BtcvoteError::ContractWrite {
            message: err.to_string(),
            user_message: err.user_message,
        }
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct WriteSettings {
    pub receipt_poll_interval: Duration,
    pub receipt_timeout: Duration,
}

impl WriteSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            receipt_poll_interval: config.receipt_poll_interval(),
            receipt_timeout: config.receipt_timeout(),
        }
    }
}

impl Default for WriteSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Result of a write that reached `Success`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub approve_hash: Option<B256>,
    pub receipt: TxReceipt,
}

impl WriteOutcome {
    pub fn tx_hash(&self) -> B256 {
        self.receipt.tx_hash
    }
}

/// An ERC-20 approval the primary action depends on.
struct Allowance {
    token: ContractName,
    spender: ContractName,
    amount: U256,
}

/// The transaction a flow ultimately sends.
struct Action {
    to: ContractName,
    data: Vec<u8>,
    value: U256,
    invalidates: &'static [RefreshTopic],
}

/// Submits contract writes on behalf of the connected account.
#[derive(Clone)]
pub struct ContractWriter {
    reader: ContractReader,
    hub: RefetchHub,
    settings: WriteSettings,
}

impl ContractWriter {
    pub fn new(reader: ContractReader, hub: RefetchHub, settings: WriteSettings) -> Self {
        Self {
            reader,
            hub,
            settings,
        }
    }

    pub fn reader(&self) -> &ContractReader {
        &self.reader
    }

    pub fn hub(&self) -> &RefetchHub {
        &self.hub
    }

    /// Lock `amount` vDOT for `lock_days`, approving the staking contract first
    /// if its allowance is short.
    pub async fn stake(
        &self,
        flow: &WriteFlow,
        from: Option<Address>,
        amount: U256,
        lock_days: u64,
        cancel: &CancelToken,
    ) -> Result<WriteOutcome, WriteError> {
        let _claim = flow.claim()?;
        let from = require_account(from)?;
        require_positive(amount)?;

        let balance = self
            .reader
            .vdot_balance(from)
            .await
            .map_err(|e| WriteError::from_read(&e))?;
        if amount > balance {
            return Err(WriteError::new(
                WriteErrorCode::InsufficientBalance,
                format!("stake {amount} > vDOT balance {balance}"),
            )
            .with_user_message("vDOT 余额不足"));
        }

        let action = Action {
            to: ContractName::StakingContract,
            data: IStakingContract::stakeCall {
                amount,
                lockDays: U256::from(lock_days),
            }
            .abi_encode(),
            value: U256::ZERO,
            invalidates: &[RefreshTopic::Balances, RefreshTopic::Staking],
        };
        let allowance = Allowance {
            token: ContractName::VDot,
            spender: ContractName::StakingContract,
            amount,
        };
        self.run(flow, from, Some(allowance), action, cancel).await
    }

    /// Spend `tickets` on a prediction. `predicted_year` 0 means "never".
    pub async fn vote(
        &self,
        flow: &WriteFlow,
        from: Option<Address>,
        predicted_year: u64,
        tickets: U256,
        cancel: &CancelToken,
    ) -> Result<WriteOutcome, WriteError> {
        let _claim = flow.claim()?;
        let from = require_account(from)?;
        require_positive(tickets)?;

        let balance = self
            .reader
            .ticket_balance(from)
            .await
            .map_err(|e| WriteError::from_read(&e))?;
        if tickets > balance {
            return Err(WriteError::new(
                WriteErrorCode::InsufficientBalance,
                format!("vote {tickets} > ticket balance {balance}"),
            )
            .with_user_message("投票券余额不足"));
        }

        let action = Action {
            to: ContractName::VotingContract,
            data: IVotingContract::voteCall {
                predictedYear: U256::from(predicted_year),
                tickets,
            }
            .abi_encode(),
            value: U256::ZERO,
            invalidates: &[RefreshTopic::Balances, RefreshTopic::Voting],
        };
        let allowance = Allowance {
            token: ContractName::VotingTicket,
            spender: ContractName::VotingContract,
            amount: tickets,
        };
        self.run(flow, from, Some(allowance), action, cancel).await
    }

    /// Deposit native currency into the vDOT contract, minting 1:1.
    pub async fn mint(
        &self,
        flow: &WriteFlow,
        from: Option<Address>,
        amount: U256,
        cancel: &CancelToken,
    ) -> Result<WriteOutcome, WriteError> {
        let _claim = flow.claim()?;
        let from = require_account(from)?;
        require_positive(amount)?;
        let action = Action {
            to: ContractName::VDot,
            data: Vec::new(),
            value: amount,
            invalidates: &[RefreshTopic::Balances],
        };
        self.run(flow, from, None, action, cancel).await
    }

    pub async fn unstake(
        &self,
        flow: &WriteFlow,
        from: Option<Address>,
        stake_index: u64,
        cancel: &CancelToken,
    ) -> Result<WriteOutcome, WriteError> {
        let _claim = flow.claim()?;
        let from = require_account(from)?;
        let action = Action {
            to: ContractName::StakingContract,
            data: IStakingContract::unstakeCall {
                stakeIndex: U256::from(stake_index),
            }
            .abi_encode(),
            value: U256::ZERO,
            invalidates: &[RefreshTopic::Balances, RefreshTopic::Staking],
        };
        self.run(flow, from, None, action, cancel).await
    }

    pub async fn claim_reward(
        &self,
        flow: &WriteFlow,
        from: Option<Address>,
        vote_index: u64,
        cancel: &CancelToken,
    ) -> Result<WriteOutcome, WriteError> {
        let _claim = flow.claim()?;
        let from = require_account(from)?;
        let action = Action {
            to: ContractName::VotingContract,
            data: IVotingContract::claimRewardCall {
                voteIndex: U256::from(vote_index),
            }
            .abi_encode(),
            value: U256::ZERO,
            invalidates: &[RefreshTopic::Voting],
        };
        self.run(flow, from, None, action, cancel).await
    }

    // -- internals -----------------------------------------------------------

    fn address(&self, name: ContractName) -> Result<Address, WriteError> {
        let contracts = self.reader.contracts();
        if contracts.is_deployed(name) {
            Ok(contracts.get(name))
        } else {
            Err(WriteError::new(
                WriteErrorCode::Rpc,
                format!("{name} is not deployed on this network"),
            )
            .with_user_message("合约未部署"))
        }
    }

    async fn run(
        &self,
        flow: &WriteFlow,
        from: Address,
        allowance: Option<Allowance>,
        action: Action,
        cancel: &CancelToken,
    ) -> Result<WriteOutcome, WriteError> {
        let to = self.address(action.to)?;

        let approve_hash = match allowance {
            Some(allowance) => self.ensure_allowance(flow, from, allowance, cancel).await?,
            None => None,
        };

        flow.advance(FlowState::Submitting);
        let tx = TxRequest {
            from,
            to,
            data: action.data,
            value: action.value,
        };
        let hash = match self.reader.client().send_transaction(&tx).await {
            Ok(hash) => hash,
            Err(e) => return Err(self.failed(flow, WriteError::from_rpc(&e))),
        };
        flow.record_tx_hash(hash);
        flow.advance(FlowState::Confirming);
        info!(flow = flow.name(), %hash, "transaction submitted");

        let receipt = self.confirm(flow, hash, cancel).await?;
        flow.advance(FlowState::Success);
        for topic in action.invalidates {
            self.hub.invalidate(*topic);
        }
        Ok(WriteOutcome {
            approve_hash,
            receipt,
        })
    }

    /// Approve the spender when the current allowance is short. `None` when no
    /// approval was needed.
    async fn ensure_allowance(
        &self,
        flow: &WriteFlow,
        from: Address,
        allowance: Allowance,
        cancel: &CancelToken,
    ) -> Result<Option<B256>, WriteError> {
        let current = self
            .reader
            .token_allowance(allowance.token, from, allowance.spender)
            .await
            .map_err(|e| WriteError::from_read(&e))?;
        if current >= allowance.amount {
            return Ok(None);
        }

        let token = self.address(allowance.token)?;
        let spender = self.address(allowance.spender)?;
        flow.advance(FlowState::Approving);
        info!(flow = flow.name(), token = %allowance.token, %current, wanted = %allowance.amount, "approval required");

        let approve = IERC20::approveCall {
            spender,
            amount: allowance.amount,
        };
        let tx = TxRequest::call(from, token, approve.abi_encode());
        let hash = match self.reader.client().send_transaction(&tx).await {
            Ok(hash) => hash,
            Err(e) => return Err(self.failed(flow, WriteError::from_rpc(&e))),
        };
        flow.record_approve_hash(hash);
        self.confirm(flow, hash, cancel).await?;
        flow.advance(FlowState::Approved);
        Ok(Some(hash))
    }

    /// Wait for a mined receipt; a revert is a failure.
    async fn confirm(
        &self,
        flow: &WriteFlow,
        hash: B256,
        cancel: &CancelToken,
    ) -> Result<TxReceipt, WriteError> {
        let receipt = wait_for_receipt(
            self.reader.client(),
            hash,
            self.settings.receipt_poll_interval,
            self.settings.receipt_timeout,
            cancel,
        )
        .await
        .map_err(|e| self.failed(flow, WriteError::from_receipt(&e)))?;

        if !receipt.success {
            return Err(self.failed(
                flow,
                WriteError::new(WriteErrorCode::Reverted, format!("transaction {hash} reverted")),
            ));
        }
        Ok(receipt)
    }

    fn failed(&self, flow: &WriteFlow, err: WriteError) -> WriteError {
        flow.fail(&err);
        err
    }
}

fn require_account(from: Option<Address>) -> Result<Address, WriteError> {
    from.ok_or_else(|| WriteError::new(WriteErrorCode::NotConnected, "no connected account"))
}

fn require_positive(amount: U256) -> Result<(), WriteError> {
    if amount.is_zero() {
        return Err(WriteError::new(WriteErrorCode::InvalidAmount, "amount must be positive"));
    }
    Ok(())
}

//! Typed contract reads.
//!
//! Each read resolves its contract from the active chain's [`ContractSet`],
//! ABI-encodes the call, runs `eth_call` and decodes the result. Reads
//! against a contract whose address is zero fail with
//! [`ReadError::NotDeployed`] without touching the network.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use btcvote_core::BtcvoteError;

use crate::contracts::{ContractName, ContractSet, IERC20, IStakingContract, IVotingContract};
use crate::rpc::{JsonRpcClient, RpcError};

/// Lock periods the staking contract is queried for, in days.
pub const LOCK_PERIOD_DAYS: [u64; 3] = [7, 30, 90];

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const MULTIPLIER_BASIS: f64 = 10_000.0;
/// Upper bound on per-user stake and vote counts; anything larger is treated
/// as corrupt contract data.
const MAX_USER_ENTRIES: u64 = 10_000;
const PREALLOC_LIMIT: u64 = 64;

/// Number of prediction options the voting contract tallies.
pub const VOTE_OPTION_COUNT: usize = 6;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ReadError {
    #[error("{0} is not deployed on this network")]
    NotDeployed(ContractName),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("Failed to decode {call}: {message}")]
    Decode { call: &'static str, message: String },
}

impl From<ReadError> for BtcvoteError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Rpc(RpcError::Transport(msg)) => BtcvoteError::Network(msg),
            ReadError::Rpc(RpcError::Timeout) => BtcvoteError::Network("RPC timeout".into()),
            other => BtcvoteError::ContractRead(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

/// One entry of a user's stake list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    pub index: u64,
    pub amount: U256,
    pub lock_duration_secs: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub tickets_minted: U256,
    pub active: bool,
}

impl StakeRecord {
    pub fn lock_days(&self) -> u64 {
        self.lock_duration_secs / SECONDS_PER_DAY
    }
}

/// Totals over every stake of one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeDetails {
    pub stakes: Vec<StakeRecord>,
    /// Sum of `amount` over active stakes.
    pub total_staked: U256,
    /// Sum of `tickets_minted` over active stakes.
    pub total_voting_power: U256,
    pub active_stakes: usize,
}

impl StakeDetails {
    pub fn from_records(stakes: Vec<StakeRecord>) -> Self {
        let mut details = StakeDetails::default();
        for stake in stakes.iter().filter(|s| s.active) {
            details.total_staked = details.total_staked.saturating_add(stake.amount);
            details.total_voting_power =
                details.total_voting_power.saturating_add(stake.tickets_minted);
            details.active_stakes += 1;
        }
        details.stakes = stakes;
        details
    }
}

/// An active lock option, converted for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockOptionInfo {
    /// The key the option was read with.
    pub days: u64,
    /// `duration / 86400` as stored on-chain.
    pub duration_days: f64,
    /// Multiplier in basis points divided by 10 000.
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodInfo {
    pub id: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub active: bool,
    pub resolved: bool,
    pub correct_answer_year: u64,
}

/// A vote joined with its voting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub index: u64,
    /// 0 encodes "never".
    pub predicted_year: u64,
    pub tickets_used: U256,
    pub timestamp: u64,
    pub claimed: bool,
    pub period: PeriodInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingStats {
    pub period_id: u64,
    pub total_tickets: U256,
    /// Per-option tallies; options the contract did not report are zero.
    pub option_tickets: [U256; VOTE_OPTION_COUNT],
}

/// Protocol-wide figures for the home and debug pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStats {
    pub total_minted: U256,
    pub total_staked: U256,
}

impl ContractStats {
    /// Participant count is not indexed on-chain; anything staked means at
    /// least one participant.
    pub fn participant_label(&self) -> &'static str {
        if self.total_staked.is_zero() { "0" } else { "1+" }
    }
}

/// Everything the user summary needs from chain in one read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub native_balance: U256,
    pub vdot_balance: U256,
    pub ticket_balance: U256,
    pub vote_count: u64,
    pub stakes: StakeDetails,
}

// ---------------------------------------------------------------------------
// ContractReader
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ContractReader {
    client: JsonRpcClient,
    contracts: ContractSet,
}

impl ContractReader {
    pub fn new(client: JsonRpcClient, contracts: ContractSet) -> Self {
        Self { client, contracts }
    }

    pub fn for_chain(client: JsonRpcClient, chain_id: u64) -> Self {
        Self::new(client, ContractSet::for_chain(chain_id))
    }

    pub fn client(&self) -> &JsonRpcClient {
        &self.client
    }

    pub fn contracts(&self) -> &ContractSet {
        &self.contracts
    }

    fn address(&self, name: ContractName) -> Result<Address, ReadError> {
        if self.contracts.is_deployed(name) {
            Ok(self.contracts.get(name))
        } else {
            Err(ReadError::NotDeployed(name))
        }
    }

    async fn call<C: SolCall>(&self, name: ContractName, call: C) -> Result<C::Return, ReadError> {
        let to = self.address(name)?;
        let output = self.client.call(to, &call.abi_encode()).await?;
        C::abi_decode_returns(&output).map_err(|e| ReadError::Decode {
            call: C::SIGNATURE,
            message: e.to_string(),
        })
    }

    // -- ERC-20 --------------------------------------------------------------

    pub async fn token_balance(&self, token: ContractName, owner: Address) -> Result<U256, ReadError> {
        self.call(token, IERC20::balanceOfCall { account: owner }).await
    }

    pub async fn token_allowance(
        &self,
        token: ContractName,
        owner: Address,
        spender: ContractName,
    ) -> Result<U256, ReadError> {
        let spender = self.address(spender)?;
        self.call(token, IERC20::allowanceCall { owner, spender }).await
    }

    pub async fn total_supply(&self, token: ContractName) -> Result<U256, ReadError> {
        self.call(token, IERC20::totalSupplyCall {}).await
    }

    pub async fn vdot_balance(&self, owner: Address) -> Result<U256, ReadError> {
        self.token_balance(ContractName::VDot, owner).await
    }

    pub async fn ticket_balance(&self, owner: Address) -> Result<U256, ReadError> {
        self.token_balance(ContractName::VotingTicket, owner).await
    }

    /// vDOT the staking contract may pull from `owner`.
    pub async fn vdot_allowance(&self, owner: Address) -> Result<U256, ReadError> {
        self.token_allowance(ContractName::VDot, owner, ContractName::StakingContract)
            .await
    }

    /// Tickets the voting contract may pull from `owner`.
    pub async fn ticket_allowance(&self, owner: Address) -> Result<U256, ReadError> {
        self.token_allowance(ContractName::VotingTicket, owner, ContractName::VotingContract)
            .await
    }

    pub async fn native_balance(&self, owner: Address) -> Result<U256, ReadError> {
        Ok(self.client.get_balance(owner).await?)
    }

    // -- Staking -------------------------------------------------------------

    pub async fn user_stake_count(&self, user: Address) -> Result<u64, ReadError> {
        let count = self
            .call(
                ContractName::StakingContract,
                IStakingContract::getUserStakeCountCall { user },
            )
            .await?;
        bounded_count(count, IStakingContract::getUserStakeCountCall::SIGNATURE)
    }

    pub async fn user_stake(&self, user: Address, index: u64) -> Result<StakeRecord, ReadError> {
        let info = self
            .call(
                ContractName::StakingContract,
                IStakingContract::getUserStakeCall {
                    user,
                    index: U256::from(index),
                },
            )
            .await?;
        Ok(StakeRecord {
            index,
            amount: info.amount,
            lock_duration_secs: info.lockDuration.saturating_to(),
            start_time: info.startTime.saturating_to(),
            end_time: info.endTime.saturating_to(),
            tickets_minted: info.ticketsMinted,
            active: info.active,
        })
    }

    pub async fn total_staked(&self) -> Result<U256, ReadError> {
        self.call(
            ContractName::StakingContract,
            IStakingContract::totalStakedCall {},
        )
        .await
    }

    pub async fn lock_option(&self, days: u64) -> Result<IStakingContract::LockOption, ReadError> {
        self.call(
            ContractName::StakingContract,
            IStakingContract::lockOptionsCall {
                lockDays: U256::from(days),
            },
        )
        .await
    }

    /// Active lock options among [`LOCK_PERIOD_DAYS`], sorted by days.
    pub async fn lock_options(&self) -> Result<Vec<LockOptionInfo>, ReadError> {
        let mut options = Vec::with_capacity(LOCK_PERIOD_DAYS.len());
        for days in LOCK_PERIOD_DAYS {
            let option = self.lock_option(days).await?;
            if !option.active {
                debug!(days, "lock option inactive");
                continue;
            }
            options.push(LockOptionInfo {
                days,
                duration_days: option.duration.saturating_to::<u64>() as f64
                    / SECONDS_PER_DAY as f64,
                multiplier: option.multiplier.saturating_to::<u64>() as f64 / MULTIPLIER_BASIS,
            });
        }
        options.sort_by_key(|o| o.days);
        Ok(options)
    }

    pub async fn calculate_tickets(&self, amount: U256, lock_days: u64) -> Result<U256, ReadError> {
        self.call(
            ContractName::StakingContract,
            IStakingContract::calculateTicketsCall {
                amount,
                lockDays: U256::from(lock_days),
            },
        )
        .await
    }

    pub async fn can_unstake(&self, user: Address, index: u64) -> Result<bool, ReadError> {
        self.call(
            ContractName::StakingContract,
            IStakingContract::canUnstakeCall {
                user,
                index: U256::from(index),
            },
        )
        .await
    }

    /// Reads every stake of `user` and totals the active ones.
    pub async fn stake_details(&self, user: Address) -> Result<StakeDetails, ReadError> {
        let count = self.user_stake_count(user).await?;
        let mut stakes = Vec::with_capacity(count.min(PREALLOC_LIMIT) as usize);
        for index in 0..count {
            stakes.push(self.user_stake(user, index).await?);
        }
        Ok(StakeDetails::from_records(stakes))
    }

    // -- Voting --------------------------------------------------------------

    pub async fn user_vote_count(&self, user: Address) -> Result<u64, ReadError> {
        let count = self
            .call(
                ContractName::VotingContract,
                IVotingContract::getUserVoteCountCall { user },
            )
            .await?;
        bounded_count(count, IVotingContract::getUserVoteCountCall::SIGNATURE)
    }

    pub async fn user_vote(&self, user: Address, index: u64) -> Result<IVotingContract::UserVote, ReadError> {
        self.call(
            ContractName::VotingContract,
            IVotingContract::getUserVoteCall {
                user,
                index: U256::from(index),
            },
        )
        .await
    }

    pub async fn voting_period(&self, period_id: u64) -> Result<PeriodInfo, ReadError> {
        let period = self
            .call(
                ContractName::VotingContract,
                IVotingContract::votingPeriodsCall {
                    periodId: U256::from(period_id),
                },
            )
            .await?;
        Ok(PeriodInfo {
            id: period_id,
            start_time: period.startTime.saturating_to(),
            end_time: period.endTime.saturating_to(),
            active: period.active,
            resolved: period.resolved,
            correct_answer_year: period.correctAnswerYear.saturating_to(),
        })
    }

    pub async fn current_voting_period_id(&self) -> Result<u64, ReadError> {
        let id = self
            .call(
                ContractName::VotingContract,
                IVotingContract::currentVotingPeriodIdCall {},
            )
            .await?;
        to_u64(id, IVotingContract::currentVotingPeriodIdCall::SIGNATURE)
    }

    pub async fn voting_stats(&self, period_id: u64) -> Result<VotingStats, ReadError> {
        let stats = self
            .call(
                ContractName::VotingContract,
                IVotingContract::getVotingStatsCall {
                    periodId: U256::from(period_id),
                },
            )
            .await?;
        let mut option_tickets = [U256::ZERO; VOTE_OPTION_COUNT];
        for (slot, tickets) in option_tickets.iter_mut().zip(stats.optionTickets) {
            *slot = tickets;
        }
        Ok(VotingStats {
            period_id,
            total_tickets: stats.totalTickets,
            option_tickets,
        })
    }

    /// Every vote of `user` joined with its period.
    ///
    /// Entries that fail to load, or that reference period 0, are skipped
    /// with a warning so one bad record does not hide the rest.
    pub async fn vote_history(&self, user: Address) -> Result<Vec<VoteRecord>, ReadError> {
        let count = self.user_vote_count(user).await?;
        let mut history = Vec::with_capacity(count.min(PREALLOC_LIMIT) as usize);
        for index in 0..count {
            let vote = match self.user_vote(user, index).await {
                Ok(vote) => vote,
                Err(e) => {
                    warn!(index, error = %e, "failed to load vote");
                    continue;
                }
            };
            let period_id: u64 = vote.votingPeriodId.saturating_to();
            if period_id == 0 {
                warn!(index, "vote without voting period skipped");
                continue;
            }
            let period = match self.voting_period(period_id).await {
                Ok(period) => period,
                Err(e) => {
                    warn!(index, period_id, error = %e, "failed to load voting period");
                    continue;
                }
            };
            history.push(VoteRecord {
                index,
                predicted_year: vote.predictedYear.saturating_to(),
                tickets_used: vote.ticketsUsed,
                timestamp: vote.timestamp.saturating_to(),
                claimed: vote.claimed,
                period,
            });
        }
        Ok(history)
    }

    // -- Aggregates ----------------------------------------------------------

    pub async fn contract_stats(&self) -> Result<ContractStats, ReadError> {
        let (total_minted, total_staked) =
            tokio::try_join!(self.total_supply(ContractName::VDot), self.total_staked())?;
        Ok(ContractStats {
            total_minted,
            total_staked,
        })
    }

    pub async fn user_snapshot(&self, user: Address) -> Result<UserSnapshot, ReadError> {
        let (native_balance, vdot_balance, ticket_balance, vote_count, stakes) = tokio::try_join!(
            self.native_balance(user),
            self.vdot_balance(user),
            self.ticket_balance(user),
            self.user_vote_count(user),
            self.stake_details(user),
        )?;
        Ok(UserSnapshot {
            native_balance,
            vdot_balance,
            ticket_balance,
            vote_count,
            stakes,
        })
    }
}

fn to_u64(value: U256, call: &'static str) -> Result<u64, ReadError> {
    if value > U256::from(u64::MAX) {
        return Err(ReadError::Decode {
            call,
            message: format!("{value} does not fit in u64"),
        });
    }
    Ok(value.to::<u64>())
}

fn bounded_count(value: U256, call: &'static str) -> Result<u64, ReadError> {
    let count = to_u64(value, call)?;
    if count > MAX_USER_ENTRIES {
        return Err(ReadError::Decode {
            call,
            message: format!("count {count} exceeds {MAX_USER_ENTRIES}"),
        });
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::Network;
    use crate::scripted::{ScriptedTransport, call_selector, encode_return};
    use alloy_sol_types::SolValue;
    use serde_json::Value;
    use std::sync::Arc;

    fn reader(transport: ScriptedTransport) -> ContractReader {
        ContractReader::new(
            JsonRpcClient::new(Arc::new(transport)),
            ContractSet::for_network(Network::Hardhat),
        )
    }

    fn stake(amount: u64, tickets: u64, active: bool) -> IStakingContract::StakeInfo {
        IStakingContract::StakeInfo {
            amount: U256::from(amount),
            lockDuration: U256::from(30 * SECONDS_PER_DAY),
            startTime: U256::from(1_700_000_000u64),
            endTime: U256::from(1_702_592_000u64),
            ticketsMinted: U256::from(tickets),
            active,
        }
    }

    #[test]
    fn stake_details_only_total_active_stakes() {
        let records = vec![
            StakeRecord {
                index: 0,
                amount: U256::from(10u64),
                lock_duration_secs: 7 * SECONDS_PER_DAY,
                start_time: 0,
                end_time: 0,
                tickets_minted: U256::from(10u64),
                active: true,
            },
            StakeRecord {
                index: 1,
                amount: U256::from(5u64),
                lock_duration_secs: 30 * SECONDS_PER_DAY,
                start_time: 0,
                end_time: 0,
                tickets_minted: U256::from(6u64),
                active: false,
            },
        ];
        let details = StakeDetails::from_records(records);
        assert_eq!(details.total_staked, U256::from(10u64));
        assert_eq!(details.total_voting_power, U256::from(10u64));
        assert_eq!(details.active_stakes, 1);
        assert_eq!(details.stakes.len(), 2);
        assert_eq!(details.stakes[1].lock_days(), 30);
    }

    #[test]
    fn participant_label() {
        let mut stats = ContractStats {
            total_minted: U256::ZERO,
            total_staked: U256::ZERO,
        };
        assert_eq!(stats.participant_label(), "0");
        stats.total_staked = U256::from(1u64);
        assert_eq!(stats.participant_label(), "1+");
    }

    #[tokio::test]
    async fn undeployed_contract_fails_without_rpc() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| Ok(Value::Null)));
        let reader = ContractReader::new(
            JsonRpcClient::new(transport.clone()),
            ContractSet::for_network(Network::Moonbeam),
        );
        let err = reader.total_staked().await.unwrap_err();
        assert!(matches!(err, ReadError::NotDeployed(ContractName::StakingContract)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn balance_of_decodes_uint() {
        let reader = reader(ScriptedTransport::new(|_, params| {
            assert_eq!(call_selector(params), Some(IERC20::balanceOfCall::SELECTOR));
            Ok(encode_return(&U256::from(42u64).abi_encode()))
        }));
        let balance = reader.vdot_balance(Address::repeat_byte(7)).await.unwrap();
        assert_eq!(balance, U256::from(42u64));
    }

    #[tokio::test]
    async fn stake_details_iterates_every_index() {
        let reader = reader(ScriptedTransport::new(|_, params| {
            let selector = call_selector(params).unwrap();
            if selector == IStakingContract::getUserStakeCountCall::SELECTOR {
                return Ok(encode_return(&U256::from(2u64).abi_encode()));
            }
            // Both indices return the same active stake.
            Ok(encode_return(&stake(100, 110, true).abi_encode()))
        }));
        let details = reader.stake_details(Address::repeat_byte(1)).await.unwrap();
        assert_eq!(details.active_stakes, 2);
        assert_eq!(details.total_staked, U256::from(200u64));
        assert_eq!(details.total_voting_power, U256::from(220u64));
    }

    #[tokio::test]
    async fn lock_options_skip_inactive_and_convert_units() {
        let reader = reader(ScriptedTransport::new(|_, params| {
            let (_, data) = crate::scripted::call_parts(params).unwrap();
            let call = IStakingContract::lockOptionsCall::abi_decode(&data).unwrap();
            let days: u64 = call.lockDays.saturating_to();
            let option = IStakingContract::LockOption {
                duration: U256::from(days * SECONDS_PER_DAY),
                multiplier: U256::from(match days {
                    7 => 10_000u64,
                    30 => 11_000,
                    _ => 13_000,
                }),
                active: days != 30,
            };
            Ok(encode_return(&option.abi_encode()))
        }));
        let options = reader.lock_options().await.unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].days, 7);
        assert_eq!(options[0].duration_days, 7.0);
        assert_eq!(options[1].days, 90);
        assert!((options[1].multiplier - 1.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn vote_history_skips_period_zero() {
        let reader = reader(ScriptedTransport::new(|_, params| {
            let (_, data) = crate::scripted::call_parts(params).unwrap();
            let selector: [u8; 4] = data[..4].try_into().unwrap();
            if selector == IVotingContract::getUserVoteCountCall::SELECTOR {
                return Ok(encode_return(&U256::from(2u64).abi_encode()));
            }
            if selector == IVotingContract::getUserVoteCall::SELECTOR {
                let call = IVotingContract::getUserVoteCall::abi_decode(&data).unwrap();
                let vote = IVotingContract::UserVote {
                    predictedYear: U256::from(2030u64),
                    ticketsUsed: U256::from(5u64),
                    votingPeriodId: if call.index.is_zero() { U256::ZERO } else { U256::from(1u64) },
                    timestamp: U256::from(1_700_000_000u64),
                    claimed: false,
                };
                return Ok(encode_return(&vote.abi_encode()));
            }
            let period = IVotingContract::VotingPeriod {
                startTime: U256::from(1u64),
                endTime: U256::from(2u64),
                active: false,
                resolved: true,
                correctAnswerYear: U256::from(2030u64),
            };
            Ok(encode_return(&period.abi_encode()))
        }));
        let history = reader.vote_history(Address::repeat_byte(1)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].index, 1);
        assert_eq!(history[0].predicted_year, 2030);
        assert!(history[0].period.resolved);
    }

    #[tokio::test]
    async fn voting_stats_pads_missing_options() {
        let reader = reader(ScriptedTransport::new(|_, _| {
            let out = (U256::from(30u64), vec![U256::from(20u64), U256::from(10u64)]).abi_encode_params();
            Ok(encode_return(&out))
        }));
        let stats = reader.voting_stats(1).await.unwrap();
        assert_eq!(stats.total_tickets, U256::from(30u64));
        assert_eq!(stats.option_tickets[1], U256::from(10u64));
        assert_eq!(stats.option_tickets[5], U256::ZERO);
    }

    #[tokio::test]
    async fn absurd_counts_are_decode_errors() {
        let reader = reader(ScriptedTransport::new(|_, _| {
            Ok(encode_return(&U256::from(u64::MAX).abi_encode()))
        }));
        let user = Address::repeat_byte(1);
        let err = reader.stake_details(user).await.unwrap_err();
        assert!(matches!(err, ReadError::Decode { .. }));
        let err = reader.vote_history(user).await.unwrap_err();
        assert!(matches!(err, ReadError::Decode { .. }));
    }

    #[tokio::test]
    async fn rpc_failure_surfaces_as_read_error() {
        let reader = reader(ScriptedTransport::new(|_, _| {
            Err(RpcError::Transport("connection refused".into()))
        }));
        let err = reader.total_staked().await.unwrap_err();
        assert!(matches!(err, ReadError::Rpc(_)));
        let top: BtcvoteError = err.into();
        assert_eq!(top.category(), btcvote_core::ErrorCategory::Network);
    }
}

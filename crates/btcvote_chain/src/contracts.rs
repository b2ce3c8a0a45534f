//! Contract address table and ABI bindings.
//!
//! Addresses are selected by chain id from a static table. Networks where a
//! contract has not been deployed yet carry the zero address.

use std::collections::BTreeMap;
use std::fmt;

use alloy_primitives::{Address, address};
use alloy_sol_types::sol;
use serde::{Deserialize, Serialize};

use crate::chains::Network;

sol! {
    /// ERC-20 surface shared by vDOT and the voting ticket.
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function totalSupply() external view returns (uint256);
    }

    interface IStakingContract {
        struct StakeInfo {
            uint256 amount;
            uint256 lockDuration;
            uint256 startTime;
            uint256 endTime;
            uint256 ticketsMinted;
            bool active;
        }

        struct LockOption {
            uint256 duration;
            uint256 multiplier;
            bool active;
        }

        function stake(uint256 amount, uint256 lockDays) external;
        function unstake(uint256 stakeIndex) external;
        function getUserStake(address user, uint256 index) external view returns (StakeInfo memory);
        function getUserStakeCount(address user) external view returns (uint256);
        function totalStaked() external view returns (uint256);
        function lockOptions(uint256 lockDays) external view returns (LockOption memory);
        function calculateTickets(uint256 amount, uint256 lockDays) external view returns (uint256);
        function canUnstake(address user, uint256 index) external view returns (bool);
    }

    interface IVotingContract {
        struct UserVote {
            uint256 predictedYear;
            uint256 ticketsUsed;
            uint256 votingPeriodId;
            uint256 timestamp;
            bool claimed;
        }

        struct VotingPeriod {
            uint256 startTime;
            uint256 endTime;
            bool active;
            bool resolved;
            uint256 correctAnswerYear;
        }

        function vote(uint256 predictedYear, uint256 tickets) external;
        function claimReward(uint256 voteIndex) external;
        function getUserVote(address user, uint256 index) external view returns (UserVote memory);
        function getUserVoteCount(address user) external view returns (uint256);
        function votingPeriods(uint256 periodId) external view returns (VotingPeriod memory);
        function currentVotingPeriodId() external view returns (uint256);
        function getVotingStats(uint256 periodId) external view returns (uint256 totalTickets, uint256[] memory optionTickets);
    }
}

/// Every contract the dashboard knows an address for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractName {
    VDot,
    StakingContract,
    VotingTicket,
    VotingContract,
    VotingNftReward,
    BtcOracle,
    OmniLsAdapter,
}

impl ContractName {
    pub fn all() -> [ContractName; 7] {
        [
            ContractName::VDot,
            ContractName::StakingContract,
            ContractName::VotingTicket,
            ContractName::VotingContract,
            ContractName::VotingNftReward,
            ContractName::BtcOracle,
            ContractName::OmniLsAdapter,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContractName::VDot => "vDOT",
            ContractName::StakingContract => "StakingContract",
            ContractName::VotingTicket => "VotingTicket",
            ContractName::VotingContract => "VotingContract",
            ContractName::VotingNftReward => "VotingNFTReward",
            ContractName::BtcOracle => "BTCOracle",
            ContractName::OmniLsAdapter => "OmniLSAdapter",
        }
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Addresses of all contracts on one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSet {
    pub vdot: Address,
    pub staking: Address,
    pub voting_ticket: Address,
    pub voting: Address,
    pub nft_reward: Address,
    pub btc_oracle: Address,
    pub omni_ls_adapter: Address,
}

const HARDHAT_CONTRACTS: ContractSet = ContractSet {
    vdot: address!("0x3Aa5ebB10DC797CAC828524e59A333d0A371443c"),
    staking: address!("0x4ed7c70F96B99c776995fB64377f0d4aB3B0e1C1"),
    voting_ticket: address!("0x68B1D87F95878fE05B998F19b66F4baba5De1aed"),
    voting: address!("0xc6e7DF5E7b4f2A278906862b61205850344D4e7d"),
    nft_reward: address!("0x9A9f2CCfdE556A7E9Ff0848998Aa4a0CFD8863AE"),
    btc_oracle: address!("0x959922bE3CAee4b8Cd9a407cc3ac1C251C2007B1"),
    omni_ls_adapter: address!("0x8A791620dd6260079BF849Dc5567aDC3F2FdC318"),
};

// Mainnet deployments are pending.
const UNDEPLOYED: ContractSet = ContractSet {
    vdot: Address::ZERO,
    staking: Address::ZERO,
    voting_ticket: Address::ZERO,
    voting: Address::ZERO,
    nft_reward: Address::ZERO,
    btc_oracle: Address::ZERO,
    omni_ls_adapter: Address::ZERO,
};

impl ContractSet {
    /// Contract table for a network.
    pub fn for_network(network: Network) -> ContractSet {
        match network {
            Network::Hardhat => HARDHAT_CONTRACTS,
            Network::Moonbeam | Network::Moonriver => UNDEPLOYED,
        }
    }

    /// Contract table for a chain id; unknown ids use the fallback network.
    pub fn for_chain(chain_id: u64) -> ContractSet {
        Self::for_network(Network::resolve(chain_id))
    }

    pub fn get(&self, name: ContractName) -> Address {
        match name {
            ContractName::VDot => self.vdot,
            ContractName::StakingContract => self.staking,
            ContractName::VotingTicket => self.voting_ticket,
            ContractName::VotingContract => self.voting,
            ContractName::VotingNftReward => self.nft_reward,
            ContractName::BtcOracle => self.btc_oracle,
            ContractName::OmniLsAdapter => self.omni_ls_adapter,
        }
    }

    pub fn is_deployed(&self, name: ContractName) -> bool {
        !self.get(name).is_zero()
    }

    /// Only the contracts with a non-zero address.
    pub fn deployed(&self) -> BTreeMap<ContractName, Address> {
        ContractName::all()
            .into_iter()
            .filter(|name| self.is_deployed(*name))
            .map(|name| (name, self.get(name)))
            .collect()
    }
}

/// Address of a named contract on a chain.
pub fn contract_address(chain_id: u64, name: ContractName) -> Address {
    ContractSet::for_chain(chain_id).get(name)
}

pub fn is_contract_deployed(chain_id: u64, name: ContractName) -> bool {
    ContractSet::for_chain(chain_id).is_deployed(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use alloy_sol_types::SolCall;

    #[test]
    fn hardhat_has_all_contracts_deployed() {
        let deployed = ContractSet::for_network(Network::Hardhat).deployed();
        assert_eq!(deployed.len(), 7);
    }

    #[test]
    fn mainnets_have_nothing_deployed() {
        assert!(ContractSet::for_network(Network::Moonbeam).deployed().is_empty());
        assert!(!is_contract_deployed(1285, ContractName::VDot));
    }

    #[test]
    fn unknown_chain_uses_hardhat_table() {
        assert_eq!(
            contract_address(999, ContractName::VotingContract),
            HARDHAT_CONTRACTS.voting
        );
    }

    #[test]
    fn erc20_selectors_match_standard() {
        assert_eq!(IERC20::balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(IERC20::allowanceCall::SELECTOR, [0xdd, 0x62, 0xed, 0x3e]);
        assert_eq!(IERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(IERC20::totalSupplyCall::SELECTOR, [0x18, 0x16, 0x0d, 0xdd]);
    }

    #[test]
    fn stake_call_encodes_two_words() {
        let call = IStakingContract::stakeCall {
            amount: U256::from(5u64),
            lockDays: U256::from(30u64),
        };
        let data = call.abi_encode();
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(data[4 + 63], 30);
    }
}

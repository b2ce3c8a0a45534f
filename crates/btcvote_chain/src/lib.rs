pub mod cancel;
pub mod chains;
pub mod contracts;
pub mod flows;
pub mod poller;
pub mod reads;
pub mod receipt;
pub mod rpc;
pub mod rpc_config;
pub mod scripted;
pub mod units;
pub mod wallet;

// Re-export primary types for convenient access.
pub use cancel::CancelToken;
pub use chains::{Network, NetworkConfig, network_name};
pub use contracts::{ContractName, ContractSet, contract_address, is_contract_deployed};
pub use flows::{
    ContractWriter, FlowSnapshot, FlowState, WriteError, WriteErrorCode, WriteFlow, WriteOutcome,
    WriteSettings,
};
pub use poller::{PollHandle, Poller, ReadState, RefetchHub, RefreshTopic};
pub use reads::{
    ContractReader, ContractStats, LockOptionInfo, PeriodInfo, ReadError, StakeDetails,
    StakeRecord, UserSnapshot, VoteRecord, VotingStats,
};
pub use receipt::{ReceiptError, wait_for_receipt};
pub use rpc::{HttpTransport, JsonRpcClient, RpcError, RpcTransport, TxReceipt, TxRequest};
pub use rpc_config::{RpcConfig, RpcConfigStore};
pub use units::{TOKEN_DECIMALS, UnitsError, format_display, format_ether, format_units, parse_ether, parse_units};
pub use wallet::{
    ConnectorEvent, InjectedAccount, InjectedExtension, RpcEvmConnector, SubstrateConnector,
    SubstrateExtension, UnifiedWallet, WalletConnector, WalletError, WalletKind, WalletSession,
};

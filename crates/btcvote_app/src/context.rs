use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use anyhow::{Context as _, Result, bail};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use btcvote_chain::{
    ContractName, ContractReader, ContractWriter, InjectedExtension, JsonRpcClient, RefetchHub,
    RpcConfigStore, RpcEvmConnector, SubstrateConnector, UnifiedWallet, WalletKind, WriteSettings,
};
use btcvote_core::{AppConfig, LegacyApiClient};

const RPC_TIMEOUT: Duration = Duration::from_secs(15);

/// Everything a command needs, wired from configuration.
pub struct AppContext {
    pub config: AppConfig,
    pub chain_id: u64,
    pub reader: ContractReader,
    pub writer: ContractWriter,
    pub hub: RefetchHub,
    pub evm: Arc<RpcEvmConnector>,
    pub substrate: Arc<SubstrateConnector>,
    pub wallet: Arc<UnifiedWallet>,
    pub api: Option<LegacyApiClient>,
    wallet_events: JoinHandle<()>,
}

impl AppContext {
    pub fn build(mut config: AppConfig, chain: Option<u64>, rpc: Option<String>) -> Result<Self> {
        if let Some(chain_id) = chain {
            config.chain_id = chain_id;
        }
        if let Some(url) = rpc {
            config.rpc_overrides.insert(config.chain_id, url);
        }
        config.validate()?;

        let chain_id = config.chain_id;
        let url = RpcConfigStore::from_app_config(&config).url_for_chain(chain_id);
        debug!(chain_id, %url, "using RPC endpoint");

        let client = JsonRpcClient::http(url, RPC_TIMEOUT);
        let reader = ContractReader::for_chain(client.clone(), chain_id);
        let hub = RefetchHub::new();
        let writer = ContractWriter::new(reader.clone(), hub.clone(), WriteSettings::from_config(&config));

        let evm = Arc::new(RpcEvmConnector::new(client, chain_id));
        let substrate = Arc::new(SubstrateConnector::new(Arc::new(
            InjectedExtension::from_config(&config),
        )));
        let wallet = Arc::new(UnifiedWallet::new(evm.clone(), substrate.clone()));
        let wallet_events = wallet.spawn_event_listener();

        let api = config
            .api_base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| LegacyApiClient::new(u));

        Ok(Self {
            config,
            chain_id,
            reader,
            writer,
            hub,
            evm,
            substrate,
            wallet,
            api,
            wallet_events,
        })
    }

    /// Contract-backed pages need the contract deployed on this chain;
    /// otherwise they run on demo state.
    pub fn has_contract(&self, name: ContractName) -> bool {
        self.reader.contracts().is_deployed(name)
    }

    pub async fn connect(&self, kind: WalletKind) -> Result<String> {
        let address = self
            .wallet
            .connect(kind)
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))
            .with_context(|| format!("connecting {kind} wallet"))?;
        info!(%kind, %address, "session ready");
        Ok(address)
    }

    /// Connect the EVM wallet and return its account.
    pub async fn evm_account(&self) -> Result<Address> {
        self.connect(WalletKind::Evm).await?;
        match self.evm.account() {
            Some(account) => Ok(account),
            None => bail!("EVM wallet returned no usable account"),
        }
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.wallet_events.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btcvote_core::InjectedAccountConfig;

    const DOT_ACCOUNT: &str = "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5";

    #[tokio::test]
    async fn extension_disconnect_clears_the_session() {
        let mut config = AppConfig::default();
        config.substrate_accounts = vec![InjectedAccountConfig {
            name: "alice".into(),
            address: DOT_ACCOUNT.into(),
        }];
        let ctx = AppContext::build(config, None, None).unwrap();

        assert_eq!(ctx.connect(WalletKind::Substrate).await.unwrap(), DOT_ACCOUNT);
        assert_eq!(ctx.wallet.kind(), Some(WalletKind::Substrate));

        ctx.substrate.extension_disconnected();
        tokio::time::timeout(Duration::from_secs(1), async {
            while ctx.wallet.kind().is_some() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(!ctx.wallet.is_connected());
    }
}

//! Helper functions to build Ethereum [providers](https://docs.rs/alloy/latest/alloy/providers/trait.Provider.html)
//! for talking to the staking contract.

use std::{ops::Deref, time::Duration};

use alloy::{
    eips::BlockNumberOrTag,
    network::{Ethereum, EthereumWallet},
    primitives::Address,
    providers::{
        Provider, ProviderBuilder, RootProvider,
        fillers::{FillProvider, JoinFill, WalletFiller},
        utils::JoinedRecommendedFillers,
    },
    rpc::types::{Filter, Log},
    signers::local::{LocalSignerError, MnemonicBuilder, PrivateKeySigner, coins_bip39::English},
    sol_types::SolEvent,
    transports::{http::reqwest::Url, ws::WsConnect},
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::StakingError;

/// Provider connected to a blockchain URL with a wallet, ready to send tx
pub type HttpProviderWithWallet = FillProvider<
    JoinFill<JoinedRecommendedFillers, WalletFiller<EthereumWallet>>,
    RootProvider,
    Ethereum,
>;

/// Provider connected to blockchain URL with read only access
pub type HttpProvider = FillProvider<JoinedRecommendedFillers, RootProvider, Ethereum>;

/// Connection settings for one staking contract deployment.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StakingContractConfig {
    /// HTTP JSON-RPC endpoint.
    pub rpc_url: String,
    /// WebSocket endpoint for event subscriptions, if any.
    #[serde(default)]
    pub ws_url: Option<String>,
    /// Deployed BuilderStaking contract address, hex encoded.
    pub contract_address: String,
    /// Wallet account index under the configured mnemonic.
    #[serde(default)]
    pub account_index: u32,
}

impl StakingContractConfig {
    /// Parsed contract address.
    pub fn contract_address(&self) -> Result<Address, StakingError> {
        Ok(self.contract_address.parse()?)
    }

    /// Parsed HTTP endpoint.
    pub fn rpc_url(&self) -> anyhow::Result<Url> {
        self.rpc_url
            .parse()
            .map_err(|err| anyhow::anyhow!("invalid rpc url {}: {err}", self.rpc_url))
    }
}

/// Build a local signer from wallet mnemonic and account index
pub fn build_signer(
    mnemonic: String,
    account_index: u32,
) -> Result<PrivateKeySigner, LocalSignerError> {
    MnemonicBuilder::<English>::default()
        .phrase(mnemonic)
        .index(account_index)?
        .build()
}

/// a handy thin wrapper around wallet builder and provider builder that directly
/// returns an instantiated `Provider` with default fillers with wallet, ready to send tx
pub fn build_provider(
    mnemonic: String,
    account_index: u32,
    url: Url,
) -> Result<HttpProviderWithWallet, LocalSignerError> {
    let signer = build_signer(mnemonic, account_index)?;
    let wallet = EthereumWallet::from(signer);
    Ok(ProviderBuilder::new().wallet(wallet).connect_http(url))
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct PubSubProviderConfig {
    pub url: Url,
    pub max_retries: u32,
    pub retry_interval: Duration,
}

impl PubSubProviderConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            max_retries: 12,
            retry_interval: Duration::from_secs(5),
        }
    }
}

/// A PubSub service (with backend handle), disconnect on drop.
pub struct PubSubProvider {
    inner: HttpProvider,
}

impl Deref for PubSubProvider {
    type Target = HttpProvider;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl PubSubProvider {
    pub async fn new(cfg: PubSubProviderConfig) -> anyhow::Result<Self> {
        let ws = WsConnect::new(cfg.url)
            .with_max_retries(cfg.max_retries)
            .with_retry_interval(cfg.retry_interval);
        let provider = ProviderBuilder::new()
            .connect_pubsub_with(ws)
            .await
            .map_err(|err| {
                error!(?err, "event pubsub failed to start");
                err
            })?;
        Ok(Self { inner: provider })
    }

    /// create an event stream of event type `E`, subscribing since `from_block` on `contract`
    ///
    /// Each item is the decoded event or the decode failure for that log;
    /// nothing is dropped on the way to the caller.
    pub async fn event_stream<E: SolEvent>(
        &self,
        contract: Address,
        from_block: BlockNumberOrTag,
    ) -> Result<impl Stream<Item = Result<Log<E>, StakingError>> + Send + use<E>, StakingError>
    {
        let filter = Filter::new()
            .address(contract)
            .event_signature(E::SIGNATURE_HASH)
            .from_block(from_block);

        let events = self
            .subscribe_logs(&filter)
            .await
            .map_err(|err| {
                error!(?err, "pubsub subscription failed");
                StakingError::Subscription(err)
            })?
            .into_stream();

        Ok(events.map(|log| log.log_decode_validate::<E>().map_err(StakingError::from)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses_contract_address() {
        let cfg = StakingContractConfig {
            rpc_url: "http://localhost:8545".to_string(),
            ws_url: None,
            contract_address: "0x000000000000000000000000000000000000dEaD".to_string(),
            account_index: 0,
        };
        assert_eq!(
            cfg.contract_address().unwrap(),
            Address::from([
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
                0x00, 0x00, 0x00, 0x00, 0x00, 0xde, 0xad
            ])
        );
        assert!(cfg.rpc_url().is_ok());
    }

    #[test]
    fn config_rejects_malformed_address() {
        let cfg = StakingContractConfig {
            rpc_url: "http://localhost:8545".to_string(),
            ws_url: None,
            contract_address: "not-an-address".to_string(),
            account_index: 0,
        };
        assert!(matches!(
            cfg.contract_address(),
            Err(StakingError::Parse(_))
        ));
    }
}

//! BuilderStaking contract bindings and event access.
//!
//! This crate provides typed Rust bindings to read, transact against, and
//! observe the Primev builder staking contract through an
//! [`alloy`](https://docs.rs/alloy) provider. ABI encoding, transport and
//! signing all come from `alloy`; the interface description itself is
//! embedded at build time in [`BuilderStaking`].

use alloy::{primitives::Address, signers::local::LocalSignerError, transports::http::reqwest::Url};

mod bindings;
mod error;
mod events;
mod sol_types;
mod staking;

pub mod provider;

pub use error::StakingError;
pub use events::{EventLogIterator, EventSubscription, FilterRange};
pub use sol_types::*;
pub use staking::{BuilderStakingClient, CallOpts, TxOpts};

use crate::provider::HttpProviderWithWallet;

/// Bind a [`BuilderStakingClient`] to the contract at `address`, over a
/// wallet-backed HTTP provider derived from `mnemonic`/`account_index`.
pub fn connect(
    url: Url,
    mnemonic: String,
    account_index: u32,
    address: Address,
) -> Result<BuilderStakingClient<HttpProviderWithWallet>, LocalSignerError> {
    let provider = provider::build_provider(mnemonic, account_index, url)?;
    Ok(BuilderStakingClient::new(address, provider))
}

//! Error taxonomy for contract interaction.

use alloy::{contract, hex::FromHexError, sol_types, transports::TransportError};
use thiserror::Error;

/// Errors surfaced by the staking contract client.
///
/// Every failure is returned to the immediate caller; nothing in this crate
/// retries on its own.
#[derive(Debug, Error)]
pub enum StakingError {
    /// An address or commitment in configuration did not parse.
    #[error("malformed hex input: {0}")]
    Parse(#[from] FromHexError),

    /// A view call was rejected by the node or returned malformed data.
    #[error("contract call failed: {0}")]
    RemoteCall(#[source] contract::Error),

    /// A state-mutating call was rejected by the node.
    #[error("transaction submission failed: {0}")]
    TransactionSubmission(#[source] contract::Error),

    /// A historical log query failed at the transport layer.
    #[error("log retrieval failed: {0}")]
    LogRetrieval(#[source] TransportError),

    /// A raw log did not unpack into the requested event shape.
    #[error("log decoding failed: {0}")]
    Decode(#[from] sol_types::Error),

    /// A live log subscription could not be established or was lost.
    #[error("event subscription failed: {0}")]
    Subscription(#[source] TransportError),
}

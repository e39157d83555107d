//! Solidity types for contract interaction

use alloy::rpc::types::Log;

use crate::error::StakingError;

pub use crate::bindings::BuilderStaking;
pub use crate::bindings::BuilderStaking::{
    BalanceUpdated, MinimalStakeUpdated, OwnershipTransferred, StakeUpdated,
};

impl BalanceUpdated {
    /// Decode one raw log as this event, validating topic and data shape.
    pub fn from_log(log: &Log) -> Result<Log<Self>, StakingError> {
        Ok(log.log_decode_validate::<Self>()?)
    }
}

impl MinimalStakeUpdated {
    /// Decode one raw log as this event, validating topic and data shape.
    pub fn from_log(log: &Log) -> Result<Log<Self>, StakingError> {
        Ok(log.log_decode_validate::<Self>()?)
    }
}

impl StakeUpdated {
    /// Decode one raw log as this event, validating topic and data shape.
    pub fn from_log(log: &Log) -> Result<Log<Self>, StakingError> {
        Ok(log.log_decode_validate::<Self>()?)
    }

    #[cfg(test)]
    pub fn random() -> Self {
        use alloy::primitives::{Address, B256, U256};
        use rand::prelude::*;

        let mut rng = rand::rng();
        StakeUpdated {
            builder: Address::from(rng.random::<[u8; 20]>()),
            commitment: B256::from(rng.random::<[u8; 32]>()),
            stake: U256::from(rng.random::<u64>()),
        }
    }
}

impl OwnershipTransferred {
    /// Decode one raw log as this event, validating topic and data shape.
    pub fn from_log(log: &Log) -> Result<Log<Self>, StakingError> {
        Ok(log.log_decode_validate::<Self>()?)
    }
}

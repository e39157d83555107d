//! Typed client for the BuilderStaking contract.

use alloy::{
    eips::{BlockId, BlockNumberOrTag},
    network::Ethereum,
    primitives::{Address, B256, U256},
    providers::{PendingTransactionBuilder, Provider},
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
};
use tokio::sync::mpsc;

use crate::{
    error::StakingError,
    events::{self, EventLogIterator, EventSubscription, FilterRange},
    sol_types::{
        BalanceUpdated, BuilderStaking, MinimalStakeUpdated, OwnershipTransferred, StakeUpdated,
    },
};

/// Read-call context: target block and caller address.
#[derive(Clone, Copy, Debug, Default)]
pub struct CallOpts {
    pub block: Option<BlockId>,
    pub from: Option<Address>,
}

/// Transaction context applied to state-mutating calls. Unset fields are
/// filled in by the provider's wallet and fee estimation.
#[derive(Clone, Copy, Debug, Default)]
pub struct TxOpts {
    pub from: Option<Address>,
    /// Native value attached to the transaction; only `deposit` is payable.
    pub value: Option<U256>,
    pub nonce: Option<u64>,
    pub gas_limit: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

macro_rules! with_call_opts {
    ($call:expr, $opts:expr) => {{
        let mut call = $call;
        if let Some(block) = $opts.block {
            call = call.block(block);
        }
        if let Some(from) = $opts.from {
            call = call.from(from);
        }
        call
    }};
}

macro_rules! with_tx_opts {
    ($call:expr, $opts:expr) => {{
        let mut call = $call;
        if let Some(from) = $opts.from {
            call = call.from(from);
        }
        if let Some(value) = $opts.value {
            call = call.value(value);
        }
        if let Some(nonce) = $opts.nonce {
            call = call.nonce(nonce);
        }
        if let Some(gas) = $opts.gas_limit {
            call = call.gas(gas);
        }
        if let Some(fee) = $opts.max_fee_per_gas {
            call = call.max_fee_per_gas(fee);
        }
        if let Some(tip) = $opts.max_priority_fee_per_gas {
            call = call.max_priority_fee_per_gas(tip);
        }
        call
    }};
}

/// Client bound to a deployed BuilderStaking contract.
///
/// Every read re-queries the ledger; no state is cached beyond the bound
/// address and the provider handle. Pending transactions are returned
/// without waiting for confirmation, which stays the caller's
/// responsibility.
pub struct BuilderStakingClient<P: Provider + Clone> {
    instance: BuilderStaking::BuilderStakingInstance<P>,
}

impl<P: Provider + Clone> BuilderStakingClient<P> {
    /// Bind to the contract deployed at `address`.
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            instance: BuilderStaking::new(address, provider),
        }
    }

    /// Address the client is bound to.
    pub fn address(&self) -> Address {
        *self.instance.address()
    }

    /// The underlying generated contract instance, for request shapes this
    /// client does not expose.
    pub fn instance(&self) -> &BuilderStaking::BuilderStakingInstance<P> {
        &self.instance
    }

    fn provider(&self) -> &P {
        self.instance.provider()
    }

    /// Balance deposited on behalf of `builder`, in wei.
    ///
    /// Solidity: `function balances(address) view returns (uint256)`
    pub async fn balances(&self, opts: CallOpts, builder: Address) -> Result<U256, StakingError> {
        with_call_opts!(self.instance.balances(builder), opts)
            .call()
            .await
            .map_err(StakingError::RemoteCall)
    }

    /// Minimal stake required of `builder` before a commitment counts.
    ///
    /// Solidity: `function minimalStakes(address) view returns (uint256)`
    pub async fn minimal_stakes(
        &self,
        opts: CallOpts,
        builder: Address,
    ) -> Result<U256, StakingError> {
        with_call_opts!(self.instance.minimalStakes(builder), opts)
            .call()
            .await
            .map_err(StakingError::RemoteCall)
    }

    /// Stake recorded for `commitment`, in wei.
    ///
    /// Solidity: `function stakes(bytes32) view returns (uint256)`
    pub async fn stakes(&self, opts: CallOpts, commitment: B256) -> Result<U256, StakingError> {
        with_call_opts!(self.instance.stakes(commitment), opts)
            .call()
            .await
            .map_err(StakingError::RemoteCall)
    }

    /// Whether the stake behind `commitment` meets the minimal stake set
    /// for `builder`.
    ///
    /// Solidity: `function hasMinimalStake(address _builder, bytes32 _commitment) view returns (bool)`
    pub async fn has_minimal_stake(
        &self,
        opts: CallOpts,
        builder: Address,
        commitment: B256,
    ) -> Result<bool, StakingError> {
        with_call_opts!(self.instance.hasMinimalStake(builder, commitment), opts)
            .call()
            .await
            .map_err(StakingError::RemoteCall)
    }

    /// Current contract owner.
    pub async fn owner(&self, opts: CallOpts) -> Result<Address, StakingError> {
        with_call_opts!(self.instance.owner(), opts)
            .call()
            .await
            .map_err(StakingError::RemoteCall)
    }

    /// Address of the primev registry this staking contract reports to.
    pub async fn primev(&self, opts: CallOpts) -> Result<Address, StakingError> {
        with_call_opts!(self.instance.primev(), opts)
            .call()
            .await
            .map_err(StakingError::RemoteCall)
    }

    /// Stake `opts.value` towards `commitment` on behalf of `builder`.
    ///
    /// Solidity: `function deposit(address _builder, bytes32 _commitment) payable`
    pub async fn deposit(
        &self,
        opts: TxOpts,
        builder: Address,
        commitment: B256,
    ) -> Result<PendingTransactionBuilder<Ethereum>, StakingError> {
        with_tx_opts!(self.instance.deposit(builder, commitment), opts)
            .send()
            .await
            .map_err(StakingError::TransactionSubmission)
    }

    /// Withdraw the sender's whole balance.
    ///
    /// Solidity: `function withdraw()`
    pub async fn withdraw(
        &self,
        opts: TxOpts,
    ) -> Result<PendingTransactionBuilder<Ethereum>, StakingError> {
        with_tx_opts!(self.instance.withdraw(), opts)
            .send()
            .await
            .map_err(StakingError::TransactionSubmission)
    }

    /// Set the sender's minimal stake threshold. Owner only.
    ///
    /// Solidity: `function setMinimalStake(uint256 _minimalStake)`
    pub async fn set_minimal_stake(
        &self,
        opts: TxOpts,
        minimal_stake: U256,
    ) -> Result<PendingTransactionBuilder<Ethereum>, StakingError> {
        with_tx_opts!(self.instance.setMinimalStake(minimal_stake), opts)
            .send()
            .await
            .map_err(StakingError::TransactionSubmission)
    }

    /// Hand contract ownership to `new_owner`. Owner only.
    ///
    /// Solidity: `function transferOwnership(address newOwner)`
    pub async fn transfer_ownership(
        &self,
        opts: TxOpts,
        new_owner: Address,
    ) -> Result<PendingTransactionBuilder<Ethereum>, StakingError> {
        with_tx_opts!(self.instance.transferOwnership(new_owner), opts)
            .send()
            .await
            .map_err(StakingError::TransactionSubmission)
    }

    /// Renounce contract ownership, leaving the contract ownerless. Owner
    /// only.
    ///
    /// Solidity: `function renounceOwnership()`
    pub async fn renounce_ownership(
        &self,
        opts: TxOpts,
    ) -> Result<PendingTransactionBuilder<Ethereum>, StakingError> {
        with_tx_opts!(self.instance.renounceOwnership(), opts)
            .send()
            .await
            .map_err(StakingError::TransactionSubmission)
    }

    /// Historical `BalanceUpdated` logs over `range`.
    ///
    /// Topic: `0x8ad64a0ac7700dd8425ab0499f107cb6e2cd1581d803c5b8c1c79dcb8190b1af`
    pub async fn filter_balance_updated(
        &self,
        range: FilterRange,
    ) -> Result<EventLogIterator<P, BalanceUpdated>, StakingError> {
        let filter = events::event_filter::<BalanceUpdated>(self.address());
        EventLogIterator::new(self.provider().clone(), filter, range).await
    }

    /// Stream live `BalanceUpdated` logs into `sink`, starting at
    /// `from_block` (chain head when `None`). Requires a pubsub-capable
    /// provider.
    pub async fn watch_balance_updated(
        &self,
        from_block: Option<BlockNumberOrTag>,
        sink: mpsc::Sender<Log<BalanceUpdated>>,
    ) -> Result<EventSubscription, StakingError> {
        self.watch_event(from_block, sink).await
    }

    /// Historical `MinimalStakeUpdated` logs over `range`.
    ///
    /// Topic: `0x5980f614bd0d5d26f55eef7ec350fc66b080cd09bd38c87bcac4c4c7853d76f7`
    pub async fn filter_minimal_stake_updated(
        &self,
        range: FilterRange,
    ) -> Result<EventLogIterator<P, MinimalStakeUpdated>, StakingError> {
        let filter = events::event_filter::<MinimalStakeUpdated>(self.address());
        EventLogIterator::new(self.provider().clone(), filter, range).await
    }

    /// Stream live `MinimalStakeUpdated` logs into `sink`.
    pub async fn watch_minimal_stake_updated(
        &self,
        from_block: Option<BlockNumberOrTag>,
        sink: mpsc::Sender<Log<MinimalStakeUpdated>>,
    ) -> Result<EventSubscription, StakingError> {
        self.watch_event(from_block, sink).await
    }

    /// Historical `StakeUpdated` logs over `range`.
    ///
    /// Topic: `0x57401ebf3558e31f2eca30da2a7ee84bf3448e52fea178abdcd7b9442dbc8b2e`
    pub async fn filter_stake_updated(
        &self,
        range: FilterRange,
    ) -> Result<EventLogIterator<P, StakeUpdated>, StakingError> {
        let filter = events::event_filter::<StakeUpdated>(self.address());
        EventLogIterator::new(self.provider().clone(), filter, range).await
    }

    /// Stream live `StakeUpdated` logs into `sink`.
    pub async fn watch_stake_updated(
        &self,
        from_block: Option<BlockNumberOrTag>,
        sink: mpsc::Sender<Log<StakeUpdated>>,
    ) -> Result<EventSubscription, StakingError> {
        self.watch_event(from_block, sink).await
    }

    /// Historical `OwnershipTransferred` logs over `range`, optionally
    /// restricted to specific `previous_owner` / `new_owner` values (both
    /// fields are indexed; an empty list leaves the topic unconstrained).
    ///
    /// Topic: `0x8be0079c531659141344cd1fd0a4f28419497f9722a3daafe3b4186f6b6457e0`
    pub async fn filter_ownership_transferred(
        &self,
        range: FilterRange,
        previous_owner: Vec<Address>,
        new_owner: Vec<Address>,
    ) -> Result<EventLogIterator<P, OwnershipTransferred>, StakingError> {
        let filter = ownership_filter(self.address(), &previous_owner, &new_owner);
        EventLogIterator::new(self.provider().clone(), filter, range).await
    }

    /// Stream live `OwnershipTransferred` logs into `sink`, with the same
    /// indexed-topic restrictions as the historical filter.
    pub async fn watch_ownership_transferred(
        &self,
        from_block: Option<BlockNumberOrTag>,
        sink: mpsc::Sender<Log<OwnershipTransferred>>,
        previous_owner: Vec<Address>,
        new_owner: Vec<Address>,
    ) -> Result<EventSubscription, StakingError> {
        let mut filter = ownership_filter(self.address(), &previous_owner, &new_owner);
        if let Some(block) = from_block {
            filter = filter.from_block(block);
        }
        events::watch(self.provider(), filter, sink).await
    }

    async fn watch_event<E: SolEvent + Send + 'static>(
        &self,
        from_block: Option<BlockNumberOrTag>,
        sink: mpsc::Sender<Log<E>>,
    ) -> Result<EventSubscription, StakingError> {
        let mut filter = events::event_filter::<E>(self.address());
        if let Some(block) = from_block {
            filter = filter.from_block(block);
        }
        events::watch(self.provider(), filter, sink).await
    }
}

fn ownership_filter(contract: Address, previous_owner: &[Address], new_owner: &[Address]) -> Filter {
    let mut filter = events::event_filter::<OwnershipTransferred>(contract);
    if !previous_owner.is_empty() {
        filter = filter.topic1(previous_owner.iter().map(|a| a.into_word()).collect::<Vec<_>>());
    }
    if !new_owner.is_empty() {
        filter = filter.topic2(new_owner.iter().map(|a| a.into_word()).collect::<Vec<_>>());
    }
    filter
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{Bytes, b256},
        providers::ProviderBuilder,
        sol_types::{SolCall, SolValue},
        transports::mock::Asserter,
    };

    use super::*;
    use crate::bindings::BuilderStaking::{
        balancesCall, depositCall, hasMinimalStakeCall, minimalStakesCall, ownerCall, primevCall,
        renounceOwnershipCall, setMinimalStakeCall, stakesCall, transferOwnershipCall, withdrawCall,
    };

    #[test]
    fn function_selectors_match_interface() {
        assert_eq!(balancesCall::SELECTOR, [0x27, 0xe2, 0x35, 0xe3]);
        assert_eq!(hasMinimalStakeCall::SELECTOR, [0x0f, 0xf5, 0x5d, 0xb7]);
        assert_eq!(minimalStakesCall::SELECTOR, [0x13, 0x6f, 0xc2, 0xb3]);
        assert_eq!(ownerCall::SELECTOR, [0x8d, 0xa5, 0xcb, 0x5b]);
        assert_eq!(primevCall::SELECTOR, [0x98, 0x6b, 0x98, 0xae]);
        assert_eq!(stakesCall::SELECTOR, [0x8f, 0xee, 0x64, 0x07]);
        assert_eq!(depositCall::SELECTOR, [0xb9, 0xe1, 0xaa, 0x03]);
        assert_eq!(renounceOwnershipCall::SELECTOR, [0x71, 0x50, 0x18, 0xa6]);
        assert_eq!(setMinimalStakeCall::SELECTOR, [0x3d, 0x6e, 0xc6, 0x5e]);
        assert_eq!(transferOwnershipCall::SELECTOR, [0xf2, 0xfd, 0xe3, 0x8b]);
        assert_eq!(withdrawCall::SELECTOR, [0x3c, 0xcf, 0xd6, 0x0b]);
    }

    #[test]
    fn event_topics_match_interface() {
        assert_eq!(
            BalanceUpdated::SIGNATURE_HASH,
            b256!("8ad64a0ac7700dd8425ab0499f107cb6e2cd1581d803c5b8c1c79dcb8190b1af")
        );
        assert_eq!(
            MinimalStakeUpdated::SIGNATURE_HASH,
            b256!("5980f614bd0d5d26f55eef7ec350fc66b080cd09bd38c87bcac4c4c7853d76f7")
        );
        assert_eq!(
            StakeUpdated::SIGNATURE_HASH,
            b256!("57401ebf3558e31f2eca30da2a7ee84bf3448e52fea178abdcd7b9442dbc8b2e")
        );
        assert_eq!(
            OwnershipTransferred::SIGNATURE_HASH,
            b256!("8be0079c531659141344cd1fd0a4f28419497f9722a3daafe3b4186f6b6457e0")
        );
        assert_eq!(StakeUpdated::SIGNATURE, "StakeUpdated(address,bytes32,uint256)");
    }

    #[tokio::test]
    async fn view_calls_decode_results() {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        let client = BuilderStakingClient::new(Address::ZERO, provider);

        asserter.push_success(&Bytes::from(U256::ZERO.abi_encode()));
        assert_eq!(
            client.balances(CallOpts::default(), Address::ZERO).await.unwrap(),
            U256::ZERO
        );

        asserter.push_success(&Bytes::from(true.abi_encode()));
        assert!(
            client
                .has_minimal_stake(CallOpts::default(), Address::ZERO, B256::ZERO)
                .await
                .unwrap()
        );

        let owner = Address::from([0x11; 20]);
        asserter.push_success(&Bytes::from(owner.abi_encode()));
        assert_eq!(client.owner(CallOpts::default()).await.unwrap(), owner);
    }

    #[tokio::test]
    async fn view_call_rejects_malformed_response() {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        let client = BuilderStakingClient::new(Address::ZERO, provider);

        // One stray byte instead of a 32-byte word.
        asserter.push_success(&Bytes::from(vec![0x01]));
        let err = client.stakes(CallOpts::default(), B256::ZERO).await.unwrap_err();
        assert!(matches!(err, StakingError::RemoteCall(_)));
    }

    #[test]
    fn ownership_filter_sets_indexed_topics() {
        let previous = Address::from([0x22; 20]);
        let filter = ownership_filter(Address::ZERO, &[previous], &[]);
        let expected: alloy::rpc::types::Topic = previous.into_word().into();
        assert_eq!(filter.topics[1], expected);
        assert!(filter.topics[2].is_empty());
    }
}

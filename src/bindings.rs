//! Embedded interface description for the BuilderStaking contract.
//!
//! The `sol!` block below is the authoritative copy of the deployed
//! contract's interface; call builders, event types and their topic hashes
//! are derived from it at compile time.

use alloy::sol;

sol! {
    /// Staking registry keyed by builder address and commitment hash.
    ///
    /// Builders accrue a balance through `deposit`; a stake is tracked per
    /// commitment and checked against the per-builder minimal stake.
    #[sol(rpc, all_derives, extra_derives(serde::Serialize, serde::Deserialize))]
    contract BuilderStaking {
        event BalanceUpdated(address builder, uint256 balance);
        event MinimalStakeUpdated(address builder, uint256 minimalStake);
        event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);
        event StakeUpdated(address builder, bytes32 commitment, uint256 stake);

        function balances(address) external view returns (uint256);
        function hasMinimalStake(address _builder, bytes32 _commitment) external view returns (bool);
        function minimalStakes(address) external view returns (uint256);
        function owner() external view returns (address);
        function primev() external view returns (address);
        function stakes(bytes32) external view returns (uint256);

        function deposit(address _builder, bytes32 _commitment) external payable;
        function renounceOwnership() external;
        function setMinimalStake(uint256 _minimalStake) external;
        function transferOwnership(address newOwner) external;
        function withdraw() external;
    }
}

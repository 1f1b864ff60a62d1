//! Driving Ports (API - Inbound)

use crate::domain::{
    BtcDelegation, CovenantSigOutcome, CovenantSignatureBatch, DelegationStatus,
    FinalityProvider, Params, VotingPowerTable,
};
use crate::error::StakingResult;
use serde::{Deserialize, Serialize};
use shared_crypto::SchnorrSignature;
use shared_types::{Address, BlockHeight, BtcPublicKey, Hash};
use std::collections::BTreeSet;

/// Request to register a new BTC delegation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDelegationRequest {
    pub staker_address: Address,
    pub staker_btc_pk: BtcPublicKey,
    pub fp_btc_pks: Vec<BtcPublicKey>,
    pub staking_value_sat: u64,
    /// BTC height the staking transaction was included at.
    pub start_height: u64,
    pub staking_time: u16,
    pub unbonding_time: u16,
    pub staking_tx: Vec<u8>,
    pub staking_output_index: u32,
    pub slashing_tx: Vec<u8>,
    /// Staker signature on the staking slashing path.
    pub delegator_slashing_sig: SchnorrSignature,
    pub unbonding_tx: Vec<u8>,
    pub unbonding_slashing_tx: Vec<u8>,
    /// Staker signature on the unbonding slashing path.
    pub delegator_unbonding_slashing_sig: SchnorrSignature,
}

/// Delegation summary returned by list queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationInfo {
    pub staking_tx_hash: Hash,
    pub staker_address: Address,
    pub fp_btc_pks: Vec<BtcPublicKey>,
    pub staking_value_sat: u64,
    pub status: DelegationStatus,
    pub active: bool,
}

impl From<&BtcDelegation> for DelegationInfo {
    fn from(d: &BtcDelegation) -> Self {
        Self {
            staking_tx_hash: d.staking_tx_hash,
            staker_address: d.staker_address,
            fp_btc_pks: d.fp_btc_pks.clone(),
            staking_value_sat: d.staking_value_sat,
            status: d.status,
            active: d.is_active(),
        }
    }
}

/// Primary BTC staking API.
///
/// Mutations take the height of the block being processed. Every failed
/// mutation leaves the state unchanged.
pub trait BtcStakingApi {
    /// Register a finality provider.
    fn register_finality_provider(
        &mut self,
        btc_pk: BtcPublicKey,
        address: Address,
        commission_bps: u16,
        height: BlockHeight,
    ) -> StakingResult<()>;

    /// Validate and store a pending delegation. Returns its staking tx hash.
    fn create_delegation(
        &mut self,
        request: CreateDelegationRequest,
        height: BlockHeight,
    ) -> StakingResult<Hash>;

    /// Verify and record one covenant member's signatures.
    fn add_covenant_signatures(
        &mut self,
        batch: CovenantSignatureBatch,
        height: BlockHeight,
    ) -> StakingResult<CovenantSigOutcome>;

    /// Staker-initiated early unbonding.
    fn undelegate(
        &mut self,
        staking_tx_hash: Hash,
        delegator_unbonding_sig: SchnorrSignature,
        height: BlockHeight,
    ) -> StakingResult<()>;

    /// Slash a finality provider and every live delegation to it.
    /// Returns the delegations that became slashed.
    fn slash_finality_provider(
        &mut self,
        btc_pk: BtcPublicKey,
        height: BlockHeight,
    ) -> StakingResult<Vec<Hash>>;

    fn jail_finality_provider(&mut self, btc_pk: BtcPublicKey, height: BlockHeight)
        -> StakingResult<()>;

    fn unjail_finality_provider(
        &mut self,
        btc_pk: BtcPublicKey,
        height: BlockHeight,
    ) -> StakingResult<()>;

    /// Advance the BTC tip, expiring delegations whose timelock is about to
    /// elapse. Returns the delegations that expired.
    fn process_btc_tip(&mut self, btc_tip: u64, height: BlockHeight) -> Vec<Hash>;

    /// Schedule a new parameter version.
    fn update_params(&mut self, activation_height: BlockHeight, params: Params)
        -> StakingResult<u32>;

    /// Recompute the voting power table at `height` if anything changed.
    fn record_voting_power(&mut self, height: BlockHeight);

    // Queries

    fn delegation(&self, staking_tx_hash: &Hash) -> Option<&BtcDelegation>;

    /// Delegations referencing any of `fp_btc_pks`.
    fn delegations_by_finality_providers(&self, fp_btc_pks: &[BtcPublicKey])
        -> Vec<DelegationInfo>;

    fn delegations_by_staker(&self, staker: &Address) -> Vec<DelegationInfo>;

    fn finality_provider(&self, btc_pk: &BtcPublicKey) -> Option<&FinalityProvider>;

    fn finality_providers(&self) -> Vec<&FinalityProvider>;

    /// Most recent table at or below `height`.
    fn voting_power_at(&self, height: BlockHeight) -> Option<&VotingPowerTable>;

    /// Fold the given delegations that are still active now.
    fn voting_power_of(&self, height: BlockHeight, delegations: &BTreeSet<Hash>)
        -> VotingPowerTable;

    fn params(&self, version: u32) -> Option<&Params>;
}

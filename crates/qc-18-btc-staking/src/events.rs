//! Outgoing events for the BTC staking subsystem
//!
//! Drained by the node runtime after each request.

use crate::domain::{DelegationStatus, FinalityProviderStatus};
use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockHeight, BtcPublicKey, Hash};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakingEvent {
    FinalityProviderRegistered {
        btc_pk: BtcPublicKey,
        address: Address,
        commission_bps: u16,
    },
    FinalityProviderStatusChanged {
        btc_pk: BtcPublicKey,
        status: FinalityProviderStatus,
        height: BlockHeight,
    },
    DelegationCreated {
        staking_tx_hash: Hash,
        staker_address: Address,
        fp_btc_pks: Vec<BtcPublicKey>,
        staking_value_sat: u64,
    },
    CovenantSignaturesAdded {
        staking_tx_hash: Hash,
        covenant_pk: BtcPublicKey,
        recorded: usize,
    },
    DelegationStatusChanged {
        staking_tx_hash: Hash,
        from: DelegationStatus,
        to: DelegationStatus,
        height: BlockHeight,
    },
    ParamsUpdated {
        version: u32,
        activation_height: BlockHeight,
    },
}

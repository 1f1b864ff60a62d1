//! Ports module for the BTC staking subsystem

pub mod inbound;

pub use inbound::{BtcStakingApi, CreateDelegationRequest, DelegationInfo};

//! Outgoing events for the incentive subsystem

use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockHeight, Coins, StakeholderType};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncentiveEvent {
    RewardsDistributed {
        height: BlockHeight,
        pool: Coins,
        distributed: Coins,
        remainder: Coins,
        recipients: usize,
    },
    RewardWithdrawn {
        stakeholder_type: StakeholderType,
        address: Address,
        amount: Coins,
    },
}

//! Finality providers
//!
//! Registered once, then driven only by jail, unjail and slash events.

use crate::error::{StakingError, StakingResult};
use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockHeight, BtcPublicKey};
use std::fmt;

/// Finality provider lifecycle flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalityProviderStatus {
    Active,
    /// Keeps its delegations but contributes no voting power.
    Jailed,
    /// Terminal.
    Slashed,
}

impl fmt::Display for FinalityProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FinalityProviderStatus::Active => "active",
            FinalityProviderStatus::Jailed => "jailed",
            FinalityProviderStatus::Slashed => "slashed",
        };
        f.write_str(s)
    }
}

/// A finality provider that BTC stake can be delegated to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalityProvider {
    pub btc_pk: BtcPublicKey,
    /// Operator account credited with commission.
    pub address: Address,
    pub commission_bps: u16,
    pub status: FinalityProviderStatus,
    pub registered_height: BlockHeight,
    pub slashed_height: Option<BlockHeight>,
}

impl FinalityProvider {
    pub fn new(
        btc_pk: BtcPublicKey,
        address: Address,
        commission_bps: u16,
        registered_height: BlockHeight,
    ) -> Self {
        Self {
            btc_pk,
            address,
            commission_bps,
            status: FinalityProviderStatus::Active,
            registered_height,
            slashed_height: None,
        }
    }

    pub fn is_slashed(&self) -> bool {
        self.status == FinalityProviderStatus::Slashed
    }

    pub fn is_jailed(&self) -> bool {
        self.status == FinalityProviderStatus::Jailed
    }

    /// Whether delegations to this provider count towards voting power.
    pub fn has_voting_power(&self) -> bool {
        self.status == FinalityProviderStatus::Active
    }

    /// Jail the provider. Jailing an already jailed provider is a no-op.
    pub fn jail(&mut self) -> StakingResult<bool> {
        match self.status {
            FinalityProviderStatus::Active => {
                self.status = FinalityProviderStatus::Jailed;
                Ok(true)
            }
            FinalityProviderStatus::Jailed => Ok(false),
            FinalityProviderStatus::Slashed => Err(StakingError::FinalityProviderSlashed {
                btc_pk: self.btc_pk,
            }),
        }
    }

    /// Release the provider from jail. Unjailing an active provider is a no-op.
    pub fn unjail(&mut self) -> StakingResult<bool> {
        match self.status {
            FinalityProviderStatus::Jailed => {
                self.status = FinalityProviderStatus::Active;
                Ok(true)
            }
            FinalityProviderStatus::Active => Ok(false),
            FinalityProviderStatus::Slashed => Err(StakingError::FinalityProviderSlashed {
                btc_pk: self.btc_pk,
            }),
        }
    }

    /// Mark slashed. Returns false if it already was.
    pub fn slash(&mut self, height: BlockHeight) -> bool {
        if self.is_slashed() {
            return false;
        }
        self.status = FinalityProviderStatus::Slashed;
        self.slashed_height = Some(height);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp() -> FinalityProvider {
        FinalityProvider::new(BtcPublicKey([1; 32]), Address([2; 20]), 500, 10)
    }

    #[test]
    fn test_jail_unjail() {
        let mut fp = fp();
        assert!(fp.jail().unwrap());
        assert!(!fp.has_voting_power());
        assert!(!fp.jail().unwrap());
        assert!(fp.unjail().unwrap());
        assert!(fp.has_voting_power());
    }

    #[test]
    fn test_slashed_is_terminal() {
        let mut fp = fp();
        assert!(fp.slash(42));
        assert!(!fp.slash(43));
        assert_eq!(fp.slashed_height, Some(42));
        assert!(fp.jail().is_err());
        assert!(fp.unjail().is_err());
        assert!(!fp.has_voting_power());
    }
}

//! # Core Domain Entities
//!
//! Identity and addressing primitives used by every subsystem.
//!
//! ## Clusters
//!
//! - **Bitcoin**: `BtcPublicKey` (BIP-340 x-only keys), `Hash` (txids)
//! - **Accounts**: `Address` (reward recipient accounts)
//! - **Incentives**: `StakeholderType`

use crate::errors::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 32-byte hash (staking transaction ids, state roots).
pub type Hash = [u8; 32];

/// Block height on the staking chain.
pub type BlockHeight = u64;

/// Epoch number on the staking chain.
pub type EpochNumber = u64;

/// A 20-byte account address.
///
/// Rewards are always credited and withdrawn by address, so two delegations
/// from the same address share a single gauge entry.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(decode_fixed::<20>(s)?))
    }
}

/// BIP-340 x-only secp256k1 public key (32 bytes).
///
/// Used for stakers, finality providers and covenant members. Only the
/// encoding is validated here; curve membership is checked by
/// `shared-crypto` when the key is used for verification.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct BtcPublicKey(pub [u8; 32]);

impl BtcPublicKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; 32]> for BtcPublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for BtcPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for BtcPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BtcPublicKey({})", self.to_hex())
    }
}

impl FromStr for BtcPublicKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(decode_fixed::<32>(s)?))
    }
}

/// Kind of stakeholder a reward gauge belongs to.
///
/// The same address may hold one gauge of each type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StakeholderType {
    /// Operator account of a finality provider (commission).
    FinalityProvider,
    /// Staker account of one or more BTC delegations.
    BtcDelegation,
}

impl StakeholderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StakeholderType::FinalityProvider => "finality_provider",
            StakeholderType::BtcDelegation => "btc_delegation",
        }
    }
}

impl fmt::Display for StakeholderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StakeholderType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finality_provider" => Ok(StakeholderType::FinalityProvider),
            "btc_delegation" => Ok(StakeholderType::BtcDelegation),
            other => Err(TypeError::UnknownStakeholderType(other.to_string())),
        }
    }
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], TypeError> {
    let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
    if bytes.len() != N {
        return Err(TypeError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address([0xAB; 20]);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn test_btc_pk_rejects_wrong_length() {
        let err = "abcd".parse::<BtcPublicKey>().unwrap_err();
        assert!(matches!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_stakeholder_type_parse() {
        assert_eq!(
            "btc_delegation".parse::<StakeholderType>().unwrap(),
            StakeholderType::BtcDelegation
        );
        assert!("validator".parse::<StakeholderType>().is_err());
    }
}

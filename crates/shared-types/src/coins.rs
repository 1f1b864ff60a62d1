//! # Coins
//!
//! Multi-denomination integer amounts.
//!
//! ## Invariants
//!
//! - Denominations are kept sorted and zero amounts are never stored, so two
//!   `Coins` with equal amounts compare (and serialize) identically.
//! - Arithmetic is checked; proportional scaling truncates toward zero.

use crate::errors::TypeError;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single denomination amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

/// Sorted set of coin amounts keyed by denomination.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build from (denom, amount) pairs; repeated denominations are summed.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = (S, u128)>,
        S: Into<String>,
    {
        let mut coins = Coins::new();
        for (denom, amount) in pairs {
            coins.add_amount(denom.into(), amount)?;
        }
        Ok(coins)
    }

    pub fn from_coin(coin: Coin) -> Self {
        let mut coins = Coins::new();
        if coin.amount > 0 {
            coins.0.insert(coin.denom, coin.amount);
        }
        coins
    }

    /// Amount held in `denom` (zero if absent).
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0.get(denom).copied().unwrap_or(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u128)> {
        self.0.iter().map(|(d, a)| (d.as_str(), *a))
    }

    pub fn to_vec(&self) -> Vec<Coin> {
        self.iter().map(|(d, a)| Coin::new(d, a)).collect()
    }

    fn add_amount(&mut self, denom: String, amount: u128) -> Result<(), TypeError> {
        if amount == 0 {
            return Ok(());
        }
        let entry = self.0.entry(denom.clone()).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(TypeError::Overflow { denom })?;
        Ok(())
    }

    /// Component-wise sum.
    pub fn checked_add(&self, other: &Coins) -> Result<Coins, TypeError> {
        let mut sum = self.clone();
        for (denom, amount) in other.iter() {
            sum.add_amount(denom.to_string(), amount)?;
        }
        Ok(sum)
    }

    /// Component-wise difference; `None` if any denomination would go negative.
    pub fn checked_sub(&self, other: &Coins) -> Option<Coins> {
        let mut diff = self.clone();
        for (denom, amount) in other.iter() {
            let current = diff.amount_of(denom);
            let remaining = current.checked_sub(amount)?;
            if remaining == 0 {
                diff.0.remove(denom);
            } else {
                diff.0.insert(denom.to_string(), remaining);
            }
        }
        Some(diff)
    }

    /// True if every denomination of `self` is at most the one in `other`.
    pub fn is_all_lte(&self, other: &Coins) -> bool {
        self.iter().all(|(denom, amount)| amount <= other.amount_of(denom))
    }

    /// `floor(self * numerator / denominator)` per denomination.
    ///
    /// Intermediate products use 256-bit arithmetic. A zero denominator yields
    /// empty coins; results that do not fit in `u128` saturate.
    pub fn mul_ratio_floor(&self, numerator: u128, denominator: u128) -> Coins {
        if denominator == 0 || numerator == 0 {
            return Coins::new();
        }
        let num = U256::from(numerator);
        let den = U256::from(denominator);
        let max = U256::from(u128::MAX);
        let scaled = self
            .0
            .iter()
            .filter_map(|(denom, amount)| {
                let value = U256::from(*amount) * num / den;
                let value = if value > max { u128::MAX } else { value.low_u128() };
                (value > 0).then(|| (denom.clone(), value))
            })
            .collect();
        Coins(scaled)
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        Coins::from_coin(coin)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(denom, amount)| format!("{}{}", amount, denom))
            .collect();
        f.write_str(&parts.join(","))
    }
}

impl FromStr for Coins {
    type Err = TypeError;

    /// Parses `"100ubbn,5uatom"`. The empty string is zero coins.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut coins = Coins::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let split = part
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(|| TypeError::InvalidCoin(part.to_string()))?;
            let (amount, denom) = part.split_at(split);
            let amount: u128 = amount
                .parse()
                .map_err(|_| TypeError::InvalidCoin(part.to_string()))?;
            coins.add_amount(denom.to_string(), amount)?;
        }
        Ok(coins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coins(s: &str) -> Coins {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let c = coins("100ubbn,5uatom");
        assert_eq!(c.amount_of("ubbn"), 100);
        assert_eq!(c.amount_of("uatom"), 5);
        // sorted by denom
        assert_eq!(c.to_string(), "5uatom,100ubbn");
    }

    #[test]
    fn test_zero_amounts_not_stored() {
        let c = coins("0ubbn");
        assert!(c.is_zero());
        assert_eq!(c, Coins::new());
    }

    #[test]
    fn test_checked_sub_removes_exhausted_denoms() {
        let a = coins("100ubbn,5uatom");
        let b = coins("100ubbn");
        assert_eq!(a.checked_sub(&b).unwrap(), coins("5uatom"));
        assert!(b.checked_sub(&a).is_none());
    }

    #[test]
    fn test_is_all_lte() {
        assert!(coins("10ubbn").is_all_lte(&coins("10ubbn,1uatom")));
        assert!(!coins("11ubbn").is_all_lte(&coins("10ubbn")));
        assert!(Coins::new().is_all_lte(&Coins::new()));
    }

    #[test]
    fn test_mul_ratio_floor_truncates() {
        let c = coins("100ubbn,7uatom");
        let third = c.mul_ratio_floor(1, 3);
        assert_eq!(third, coins("33ubbn,2uatom"));
        assert!(third.is_all_lte(&c));
    }

    #[test]
    fn test_mul_ratio_floor_large_values() {
        let c = Coins::from_coin(Coin::new("ubbn", u128::MAX / 2));
        let half = c.mul_ratio_floor(u128::MAX / 2, u128::MAX);
        assert!(half.amount_of("ubbn") < u128::MAX / 2);
    }

    #[test]
    fn test_mul_ratio_floor_zero_denominator() {
        assert!(coins("100ubbn").mul_ratio_floor(1, 0).is_zero());
    }

    #[test]
    fn test_add_overflow_detected() {
        let a = Coins::from_coin(Coin::new("ubbn", u128::MAX));
        assert!(a.checked_add(&coins("1ubbn")).is_err());
    }

    #[test]
    fn test_bincode_roundtrip_is_canonical() {
        let a = coins("5uatom,100ubbn");
        let b = coins("100ubbn,5uatom");
        assert_eq!(
            bincode::serialize(&a).unwrap(),
            bincode::serialize(&b).unwrap()
        );
    }
}

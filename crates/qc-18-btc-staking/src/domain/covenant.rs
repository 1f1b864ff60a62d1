//! # Covenant Co-Signing
//!
//! Signatures are tracked per `(member, path, finality provider)`:
//!
//! | Path | Signature | Keyed by |
//! |------|-----------|----------|
//! | staking slashing | adaptor, encrypted to the fp key | fp → member |
//! | unbonding | BIP-340 Schnorr | member |
//! | unbonding slashing | adaptor, encrypted to the fp key | fp → member |
//!
//! A batch from one member is verified in full before anything is recorded.
//! Entries that are already recorded are skipped, so resubmission never
//! counts twice towards quorum.

use crate::domain::params::Params;
use crate::domain::scripts::{SpendDigests, SpendPath};
use crate::error::{StakingError, StakingResult};
use serde::{Deserialize, Serialize};
use shared_crypto::{AdaptorSignature, SchnorrPublicKey, SchnorrSignature};
use shared_types::{BtcPublicKey, Hash};
use std::collections::BTreeMap;

type AdaptorSigs = BTreeMap<BtcPublicKey, BTreeMap<BtcPublicKey, AdaptorSignature>>;

/// One covenant member's signatures for one delegation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovenantSignatureBatch {
    pub covenant_pk: BtcPublicKey,
    pub staking_tx_hash: Hash,
    /// `(fp key, adaptor signature)` on the staking slashing path.
    pub staking_slashing: Vec<(BtcPublicKey, AdaptorSignature)>,
    pub unbonding: Option<SchnorrSignature>,
    /// `(fp key, adaptor signature)` on the unbonding slashing path.
    pub unbonding_slashing: Vec<(BtcPublicKey, AdaptorSignature)>,
}

impl CovenantSignatureBatch {
    pub fn is_empty(&self) -> bool {
        self.staking_slashing.is_empty()
            && self.unbonding.is_none()
            && self.unbonding_slashing.is_empty()
    }
}

/// Result of an accepted batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CovenantSigOutcome {
    /// New signatures recorded; quorum not yet reached.
    Accepted { recorded: usize },
    /// Every signature in the batch was already recorded.
    Duplicate,
    /// New signatures recorded and the delegation reached quorum.
    Activated { recorded: usize },
}

/// Covenant signatures collected for a delegation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovenantSignatureSet {
    pub staking_slashing: AdaptorSigs,
    pub unbonding: BTreeMap<BtcPublicKey, SchnorrSignature>,
    pub unbonding_slashing: AdaptorSigs,
}

impl CovenantSignatureSet {
    /// Verify every signature in `batch` against the digests of its path.
    ///
    /// Fails on the first bad signature; nothing is recorded either way.
    pub fn verify_batch(
        batch: &CovenantSignatureBatch,
        params: &Params,
        fp_pks: &[BtcPublicKey],
        digests: &SpendDigests,
    ) -> StakingResult<()> {
        if !params.is_covenant_member(&batch.covenant_pk) {
            return Err(StakingError::UnknownCovenantMember {
                covenant_pk: batch.covenant_pk,
            });
        }
        let signer = SchnorrPublicKey::from_bytes(batch.covenant_pk.0)?;

        let adaptor_paths = [
            (SpendPath::StakingSlashing, &batch.staking_slashing),
            (SpendPath::UnbondingSlashing, &batch.unbonding_slashing),
        ];
        for (path, sigs) in adaptor_paths {
            for (fp_pk, sig) in sigs {
                if !fp_pks.contains(fp_pk) {
                    return Err(StakingError::FinalityProviderNotReferenced { btc_pk: *fp_pk });
                }
                let encryption_key = SchnorrPublicKey::from_bytes(fp_pk.0)?;
                sig.encrypt_verify(&signer, &encryption_key, digests.get(path))
                    .map_err(|_| StakingError::InvalidSignature {
                        path,
                        signer: batch.covenant_pk,
                    })?;
            }
        }

        if let Some(sig) = &batch.unbonding {
            signer
                .verify(digests.get(SpendPath::Unbonding), sig)
                .map_err(|_| StakingError::InvalidSignature {
                    path: SpendPath::Unbonding,
                    signer: batch.covenant_pk,
                })?;
        }
        Ok(())
    }

    /// Record the batch, skipping entries already present. Returns the number
    /// of newly recorded signatures.
    pub fn record(&mut self, batch: &CovenantSignatureBatch) -> usize {
        let member = batch.covenant_pk;
        let mut recorded = 0;

        for (fp_pk, sig) in &batch.staking_slashing {
            recorded += insert_new(
                self.staking_slashing.entry(*fp_pk).or_default(),
                member,
                *sig,
            );
        }
        if let Some(sig) = batch.unbonding {
            recorded += insert_new(&mut self.unbonding, member, sig);
        }
        for (fp_pk, sig) in &batch.unbonding_slashing {
            recorded += insert_new(
                self.unbonding_slashing.entry(*fp_pk).or_default(),
                member,
                *sig,
            );
        }
        recorded
    }

    /// Whether every `(slashing path, fp)` pair and the unbonding path hold
    /// at least `quorum` distinct members.
    pub fn has_quorum(&self, fp_pks: &[BtcPublicKey], quorum: u32) -> bool {
        let quorum = quorum as usize;
        let covered = |sigs: &AdaptorSigs| {
            fp_pks
                .iter()
                .all(|fp| sigs.get(fp).map_or(0, BTreeMap::len) >= quorum)
        };
        self.unbonding.len() >= quorum
            && covered(&self.staking_slashing)
            && covered(&self.unbonding_slashing)
    }

    /// Distinct members with a signature on `path` (for `fp_pk` on slashing
    /// paths).
    pub fn count(&self, path: SpendPath, fp_pk: &BtcPublicKey) -> usize {
        match path {
            SpendPath::StakingSlashing => self.staking_slashing.get(fp_pk).map_or(0, BTreeMap::len),
            SpendPath::Unbonding => self.unbonding.len(),
            SpendPath::UnbondingSlashing => {
                self.unbonding_slashing.get(fp_pk).map_or(0, BTreeMap::len)
            }
        }
    }

    /// Whether every signature in the batch is already recorded.
    pub fn contains_all(&self, batch: &CovenantSignatureBatch) -> bool {
        let member = &batch.covenant_pk;
        let has = |sigs: &AdaptorSigs, fp: &BtcPublicKey| {
            sigs.get(fp).is_some_and(|m| m.contains_key(member))
        };
        batch
            .staking_slashing
            .iter()
            .all(|(fp, _)| has(&self.staking_slashing, fp))
            && batch
                .unbonding_slashing
                .iter()
                .all(|(fp, _)| has(&self.unbonding_slashing, fp))
            && (batch.unbonding.is_none() || self.unbonding.contains_key(member))
    }
}

fn insert_new<V>(map: &mut BTreeMap<BtcPublicKey, V>, member: BtcPublicKey, sig: V) -> usize {
    if map.contains_key(&member) {
        return 0;
    }
    map.insert(member, sig);
    1
}

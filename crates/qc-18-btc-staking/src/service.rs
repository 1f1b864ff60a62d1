//! BTC Staking Service - Core business logic
//!
//! Owns the finality provider registry, delegation records with their
//! covenant signature sets, and the voting power tables recorded per height.
//!
//! The whole service is plain data (`Clone + Serialize`), so the node
//! runtime can take a working copy per block and commit it atomically.

use crate::domain::{
    verify_staking_txs, BtcDelegation, CovenantSigOutcome, CovenantSignatureBatch,
    CovenantSignatureSet, DelegationStatus, FinalityProvider, Params, ParamsRegistry, SpendPath,
    StakingKeys, StakingTxBundle, VotingPowerTable,
};
use crate::error::{StakingError, StakingResult};
use crate::events::StakingEvent;
use crate::metrics;
use crate::ports::inbound::{BtcStakingApi, CreateDelegationRequest, DelegationInfo};
use serde::{Deserialize, Serialize};
use shared_crypto::{SchnorrPublicKey, SchnorrSignature};
use shared_types::{Address, BlockHeight, BtcPublicKey, Hash};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// BTC staking state and operations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BtcStakingService {
    params: ParamsRegistry,
    finality_providers: BTreeMap<BtcPublicKey, FinalityProvider>,
    /// Delegations keyed by staking transaction hash.
    delegations: BTreeMap<Hash, BtcDelegation>,
    /// Lookup index only; `delegations` is the source of truth.
    fp_index: BTreeMap<BtcPublicKey, BTreeSet<Hash>>,
    /// Lookup index only; `delegations` is the source of truth.
    staker_index: BTreeMap<Address, BTreeSet<Hash>>,
    voting_power_tables: BTreeMap<BlockHeight, VotingPowerTable>,
    /// Set by any change that can alter voting power.
    voting_power_dirty: bool,
    btc_tip: u64,
    #[serde(skip)]
    events: Vec<StakingEvent>,
}

impl BtcStakingService {
    /// Create a service with `genesis` as params version 0.
    pub fn new(genesis: Params) -> StakingResult<Self> {
        Ok(Self {
            params: ParamsRegistry::new(genesis)?,
            finality_providers: BTreeMap::new(),
            delegations: BTreeMap::new(),
            fp_index: BTreeMap::new(),
            staker_index: BTreeMap::new(),
            voting_power_tables: BTreeMap::new(),
            voting_power_dirty: true,
            btc_tip: 0,
            events: Vec::new(),
        })
    }

    /// Take the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<StakingEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn btc_tip(&self) -> u64 {
        self.btc_tip
    }

    pub fn params_registry(&self) -> &ParamsRegistry {
        &self.params
    }

    pub fn delegation_count(&self) -> usize {
        self.delegations.len()
    }

    fn register_inner(
        &mut self,
        btc_pk: BtcPublicKey,
        address: Address,
        commission_bps: u16,
        height: BlockHeight,
    ) -> StakingResult<()> {
        if self.finality_providers.contains_key(&btc_pk) {
            return Err(StakingError::DuplicateFinalityProvider { btc_pk });
        }
        SchnorrPublicKey::from_bytes(btc_pk.0)?;
        self.params
            .at_height(height)
            .params
            .check_commission(commission_bps)?;

        self.finality_providers.insert(
            btc_pk,
            FinalityProvider::new(btc_pk, address, commission_bps, height),
        );
        info!(finality_provider = %btc_pk, %address, commission_bps, "Registered finality provider");
        self.events.push(StakingEvent::FinalityProviderRegistered {
            btc_pk,
            address,
            commission_bps,
        });
        Ok(())
    }

    fn create_delegation_inner(
        &mut self,
        req: CreateDelegationRequest,
        height: BlockHeight,
    ) -> StakingResult<Hash> {
        let versioned = self.params.at_height(height);
        let params_version = versioned.version;
        let params = &versioned.params;

        if req.fp_btc_pks.is_empty() {
            return Err(StakingError::invalid_tx(
                "delegation must reference at least one finality provider",
            ));
        }
        let unique: BTreeSet<_> = req.fp_btc_pks.iter().collect();
        if unique.len() != req.fp_btc_pks.len() {
            return Err(StakingError::invalid_tx(
                "duplicate finality provider in delegation",
            ));
        }
        for fp_pk in &req.fp_btc_pks {
            let fp = self
                .finality_providers
                .get(fp_pk)
                .ok_or(StakingError::UnknownFinalityProvider { btc_pk: *fp_pk })?;
            if fp.is_slashed() {
                return Err(StakingError::FinalityProviderSlashed { btc_pk: *fp_pk });
            }
        }

        if req.staking_value_sat < params.min_staking_value_sat
            || req.staking_value_sat > params.max_staking_value_sat
        {
            return Err(StakingError::invalid_tx(format!(
                "staking value {} outside [{}, {}]",
                req.staking_value_sat, params.min_staking_value_sat, params.max_staking_value_sat
            )));
        }
        if req.staking_time < params.min_staking_time_blocks
            || req.staking_time > params.max_staking_time_blocks
        {
            return Err(StakingError::invalid_tx(format!(
                "staking time {} outside [{}, {}]",
                req.staking_time, params.min_staking_time_blocks, params.max_staking_time_blocks
            )));
        }
        if req.unbonding_time < params.min_unbonding_time_blocks {
            return Err(StakingError::invalid_tx(format!(
                "unbonding time {} below minimum {}",
                req.unbonding_time, params.min_unbonding_time_blocks
            )));
        }

        let staker = SchnorrPublicKey::from_bytes(req.staker_btc_pk.0)?;
        let keys = StakingKeys::new(&req.staker_btc_pk, &req.fp_btc_pks, params)?;
        let verified = verify_staking_txs(
            StakingTxBundle {
                staking_tx: &req.staking_tx,
                staking_output_index: req.staking_output_index,
                slashing_tx: &req.slashing_tx,
                unbonding_tx: &req.unbonding_tx,
                unbonding_slashing_tx: &req.unbonding_slashing_tx,
            },
            &keys,
            req.staking_value_sat,
            req.staking_time,
            req.unbonding_time,
        )?;

        let staking_tx_hash = verified.staking_tx_hash;
        if self.delegations.contains_key(&staking_tx_hash) {
            return Err(StakingError::DuplicateDelegation { staking_tx_hash });
        }

        let staker_sigs = [
            (SpendPath::StakingSlashing, &req.delegator_slashing_sig),
            (SpendPath::UnbondingSlashing, &req.delegator_unbonding_slashing_sig),
        ];
        for (path, sig) in staker_sigs {
            staker
                .verify(verified.digests.get(path), sig)
                .map_err(|_| StakingError::InvalidSignature {
                    path,
                    signer: req.staker_btc_pk,
                })?;
        }

        let delegation = BtcDelegation {
            staking_tx_hash,
            staker_address: req.staker_address,
            staker_btc_pk: req.staker_btc_pk,
            fp_btc_pks: req.fp_btc_pks,
            staking_value_sat: req.staking_value_sat,
            start_height: req.start_height,
            end_height: req.start_height.saturating_add(req.staking_time as u64),
            staking_time: req.staking_time,
            unbonding_time: req.unbonding_time,
            unbonding_value_sat: verified.unbonding_value_sat,
            staking_tx: req.staking_tx,
            staking_output_index: req.staking_output_index,
            slashing_tx: req.slashing_tx,
            delegator_slashing_sig: req.delegator_slashing_sig,
            unbonding_tx: req.unbonding_tx,
            unbonding_slashing_tx: req.unbonding_slashing_tx,
            delegator_unbonding_slashing_sig: req.delegator_unbonding_slashing_sig,
            delegator_unbonding_sig: None,
            digests: verified.digests,
            covenant_sigs: CovenantSignatureSet::default(),
            params_version,
            status: DelegationStatus::Pending,
            created_height: height,
            activated_height: None,
            status_height: height,
        };

        for fp_pk in &delegation.fp_btc_pks {
            self.fp_index.entry(*fp_pk).or_default().insert(staking_tx_hash);
        }
        self.staker_index
            .entry(delegation.staker_address)
            .or_default()
            .insert(staking_tx_hash);

        info!(
            staking_tx_hash = %hex::encode(staking_tx_hash),
            staker = %delegation.staker_address,
            value_sat = delegation.staking_value_sat,
            finality_providers = delegation.fp_btc_pks.len(),
            params_version,
            "Created pending BTC delegation"
        );
        metrics::record_delegation_created();
        self.events.push(StakingEvent::DelegationCreated {
            staking_tx_hash,
            staker_address: delegation.staker_address,
            fp_btc_pks: delegation.fp_btc_pks.clone(),
            staking_value_sat: delegation.staking_value_sat,
        });
        self.delegations.insert(staking_tx_hash, delegation);
        Ok(staking_tx_hash)
    }

    fn add_covenant_signatures_inner(
        &mut self,
        batch: CovenantSignatureBatch,
        height: BlockHeight,
    ) -> StakingResult<CovenantSigOutcome> {
        let delegation = self.delegations.get_mut(&batch.staking_tx_hash).ok_or(
            StakingError::UnknownDelegation {
                staking_tx_hash: batch.staking_tx_hash,
            },
        )?;
        let params =
            self.params
                .get(delegation.params_version)
                .ok_or_else(|| StakingError::InvalidParams {
                    reason: format!("unknown params version {}", delegation.params_version),
                })?;

        match delegation.status {
            DelegationStatus::Pending => {}
            DelegationStatus::Active
                if params.is_covenant_member(&batch.covenant_pk)
                    && delegation.covenant_sigs.contains_all(&batch) =>
            {
                debug!(
                    staking_tx_hash = %hex::encode(batch.staking_tx_hash),
                    covenant = %batch.covenant_pk,
                    "Ignoring repeated covenant signatures for active delegation"
                );
                return Ok(CovenantSigOutcome::Duplicate);
            }
            from => {
                return Err(StakingError::InvalidStateTransition {
                    from,
                    to: DelegationStatus::Active,
                })
            }
        }

        CovenantSignatureSet::verify_batch(
            &batch,
            params,
            &delegation.fp_btc_pks,
            &delegation.digests,
        )?;

        let recorded = delegation.covenant_sigs.record(&batch);
        if recorded == 0 {
            return Ok(CovenantSigOutcome::Duplicate);
        }
        metrics::record_covenant_signatures(recorded as u64);
        debug!(
            staking_tx_hash = %hex::encode(batch.staking_tx_hash),
            covenant = %batch.covenant_pk,
            recorded,
            "Recorded covenant signatures"
        );
        self.events.push(StakingEvent::CovenantSignaturesAdded {
            staking_tx_hash: batch.staking_tx_hash,
            covenant_pk: batch.covenant_pk,
            recorded,
        });

        if delegation
            .covenant_sigs
            .has_quorum(&delegation.fp_btc_pks, params.covenant_quorum)
        {
            apply_transition(
                delegation,
                DelegationStatus::Active,
                height,
                &mut self.events,
            )?;
            self.voting_power_dirty = true;
            Ok(CovenantSigOutcome::Activated { recorded })
        } else {
            Ok(CovenantSigOutcome::Accepted { recorded })
        }
    }

    fn undelegate_inner(
        &mut self,
        staking_tx_hash: Hash,
        sig: SchnorrSignature,
        height: BlockHeight,
    ) -> StakingResult<()> {
        let delegation = self
            .delegations
            .get_mut(&staking_tx_hash)
            .ok_or(StakingError::UnknownDelegation { staking_tx_hash })?;
        if !delegation
            .status
            .can_transition_to(DelegationStatus::Unbonding)
        {
            return Err(StakingError::InvalidStateTransition {
                from: delegation.status,
                to: DelegationStatus::Unbonding,
            });
        }

        SchnorrPublicKey::from_bytes(delegation.staker_btc_pk.0)?
            .verify(delegation.digests.get(SpendPath::Unbonding), &sig)
            .map_err(|_| StakingError::InvalidSignature {
                path: SpendPath::Unbonding,
                signer: delegation.staker_btc_pk,
            })?;

        apply_transition(
            delegation,
            DelegationStatus::Unbonding,
            height,
            &mut self.events,
        )?;
        delegation.delegator_unbonding_sig = Some(sig);
        self.voting_power_dirty = true;
        Ok(())
    }

    fn slash_inner(
        &mut self,
        btc_pk: BtcPublicKey,
        height: BlockHeight,
    ) -> StakingResult<Vec<Hash>> {
        let fp = self
            .finality_providers
            .get_mut(&btc_pk)
            .ok_or(StakingError::UnknownFinalityProvider { btc_pk })?;
        if !fp.slash(height) {
            return Ok(Vec::new());
        }
        self.events.push(StakingEvent::FinalityProviderStatusChanged {
            btc_pk,
            status: fp.status,
            height,
        });

        let mut slashed = Vec::new();
        for hash in self.fp_index.get(&btc_pk).into_iter().flatten() {
            let Some(delegation) = self.delegations.get_mut(hash) else {
                continue;
            };
            if delegation.status.is_terminal() {
                continue;
            }
            apply_transition(
                delegation,
                DelegationStatus::Slashed,
                height,
                &mut self.events,
            )?;
            slashed.push(*hash);
        }

        warn!(
            finality_provider = %btc_pk,
            height,
            delegations = slashed.len(),
            "Finality provider slashed"
        );
        self.voting_power_dirty = true;
        Ok(slashed)
    }

    fn set_jailed(
        &mut self,
        btc_pk: BtcPublicKey,
        jailed: bool,
        height: BlockHeight,
    ) -> StakingResult<()> {
        let fp = self
            .finality_providers
            .get_mut(&btc_pk)
            .ok_or(StakingError::UnknownFinalityProvider { btc_pk })?;
        let changed = if jailed { fp.jail()? } else { fp.unjail()? };
        if changed {
            info!(finality_provider = %btc_pk, status = %fp.status, height, "Finality provider status changed");
            self.events.push(StakingEvent::FinalityProviderStatusChanged {
                btc_pk,
                status: fp.status,
                height,
            });
            self.voting_power_dirty = true;
        }
        Ok(())
    }
}

fn apply_transition(
    delegation: &mut BtcDelegation,
    to: DelegationStatus,
    height: BlockHeight,
    events: &mut Vec<StakingEvent>,
) -> StakingResult<()> {
    let from = delegation.status;
    delegation.transition(to, height)?;
    info!(
        staking_tx_hash = %hex::encode(delegation.staking_tx_hash),
        %from,
        %to,
        height,
        "Delegation status changed"
    );
    metrics::record_status_transition(to.as_str());
    events.push(StakingEvent::DelegationStatusChanged {
        staking_tx_hash: delegation.staking_tx_hash,
        from,
        to,
        height,
    });
    Ok(())
}

fn log_rejection(operation: &'static str) -> impl Fn(&StakingError) {
    move |err| {
        warn!(operation, reason = err.kind(), error = %err, "Rejected staking request");
        metrics::record_rejection(err.kind());
    }
}

impl BtcStakingApi for BtcStakingService {
    fn register_finality_provider(
        &mut self,
        btc_pk: BtcPublicKey,
        address: Address,
        commission_bps: u16,
        height: BlockHeight,
    ) -> StakingResult<()> {
        self.register_inner(btc_pk, address, commission_bps, height)
            .inspect_err(log_rejection("register_finality_provider"))
    }

    fn create_delegation(
        &mut self,
        request: CreateDelegationRequest,
        height: BlockHeight,
    ) -> StakingResult<Hash> {
        self.create_delegation_inner(request, height)
            .inspect_err(log_rejection("create_delegation"))
    }

    fn add_covenant_signatures(
        &mut self,
        batch: CovenantSignatureBatch,
        height: BlockHeight,
    ) -> StakingResult<CovenantSigOutcome> {
        self.add_covenant_signatures_inner(batch, height)
            .inspect_err(log_rejection("add_covenant_signatures"))
    }

    fn undelegate(
        &mut self,
        staking_tx_hash: Hash,
        delegator_unbonding_sig: SchnorrSignature,
        height: BlockHeight,
    ) -> StakingResult<()> {
        self.undelegate_inner(staking_tx_hash, delegator_unbonding_sig, height)
            .inspect_err(log_rejection("undelegate"))
    }

    fn slash_finality_provider(
        &mut self,
        btc_pk: BtcPublicKey,
        height: BlockHeight,
    ) -> StakingResult<Vec<Hash>> {
        self.slash_inner(btc_pk, height)
            .inspect_err(log_rejection("slash_finality_provider"))
    }

    fn jail_finality_provider(
        &mut self,
        btc_pk: BtcPublicKey,
        height: BlockHeight,
    ) -> StakingResult<()> {
        self.set_jailed(btc_pk, true, height)
            .inspect_err(log_rejection("jail_finality_provider"))
    }

    fn unjail_finality_provider(
        &mut self,
        btc_pk: BtcPublicKey,
        height: BlockHeight,
    ) -> StakingResult<()> {
        self.set_jailed(btc_pk, false, height)
            .inspect_err(log_rejection("unjail_finality_provider"))
    }

    fn process_btc_tip(&mut self, btc_tip: u64, height: BlockHeight) -> Vec<Hash> {
        self.btc_tip = self.btc_tip.max(btc_tip);
        let tip = self.btc_tip;

        let mut expired = Vec::new();
        for (hash, delegation) in self.delegations.iter_mut() {
            if !delegation.is_active() {
                continue;
            }
            let timeout = self
                .params
                .get(delegation.params_version)
                .map_or(0, |p| p.finalization_timeout_blocks);
            if delegation.is_expired_at(tip, timeout)
                && apply_transition(
                    delegation,
                    DelegationStatus::Expired,
                    height,
                    &mut self.events,
                )
                .is_ok()
            {
                expired.push(*hash);
            }
        }

        if !expired.is_empty() {
            debug!(btc_tip = tip, expired = expired.len(), "Expired BTC delegations");
            self.voting_power_dirty = true;
        }
        expired
    }

    fn update_params(
        &mut self,
        activation_height: BlockHeight,
        params: Params,
    ) -> StakingResult<u32> {
        let version = self
            .params
            .update(activation_height, params)
            .inspect_err(log_rejection("update_params"))?;
        info!(version, activation_height, "Scheduled staking params update");
        self.events.push(StakingEvent::ParamsUpdated {
            version,
            activation_height,
        });
        Ok(version)
    }

    fn record_voting_power(&mut self, height: BlockHeight) {
        if !self.voting_power_dirty && !self.voting_power_tables.is_empty() {
            return;
        }
        let table =
            VotingPowerTable::compute(height, self.delegations.values(), &self.finality_providers);
        debug!(
            height,
            total_power = %table.total_power(),
            finality_providers = table.finality_providers.len(),
            delegators = table.delegators.len(),
            "Recorded voting power table"
        );
        metrics::set_total_voting_power(table.total_power());

        // Tables at or above `height` are superseded
        drop(self.voting_power_tables.split_off(&height));
        self.voting_power_tables.insert(height, table);
        self.voting_power_dirty = false;
    }

    fn delegation(&self, staking_tx_hash: &Hash) -> Option<&BtcDelegation> {
        self.delegations.get(staking_tx_hash)
    }

    fn delegations_by_finality_providers(
        &self,
        fp_btc_pks: &[BtcPublicKey],
    ) -> Vec<DelegationInfo> {
        let hashes: BTreeSet<&Hash> = fp_btc_pks
            .iter()
            .filter_map(|fp| self.fp_index.get(fp))
            .flatten()
            .collect();
        hashes
            .into_iter()
            .filter_map(|h| self.delegations.get(h))
            .map(DelegationInfo::from)
            .collect()
    }

    fn delegations_by_staker(&self, staker: &Address) -> Vec<DelegationInfo> {
        self.staker_index
            .get(staker)
            .into_iter()
            .flatten()
            .filter_map(|h| self.delegations.get(h))
            .map(DelegationInfo::from)
            .collect()
    }

    fn finality_provider(&self, btc_pk: &BtcPublicKey) -> Option<&FinalityProvider> {
        self.finality_providers.get(btc_pk)
    }

    fn finality_providers(&self) -> Vec<&FinalityProvider> {
        self.finality_providers.values().collect()
    }

    fn voting_power_at(&self, height: BlockHeight) -> Option<&VotingPowerTable> {
        self.voting_power_tables
            .range(..=height)
            .next_back()
            .map(|(_, table)| table)
    }

    fn voting_power_of(
        &self,
        height: BlockHeight,
        delegations: &BTreeSet<Hash>,
    ) -> VotingPowerTable {
        VotingPowerTable::compute(
            height,
            delegations.iter().filter_map(|h| self.delegations.get(h)),
            &self.finality_providers,
        )
    }

    fn params(&self, version: u32) -> Option<&Params> {
        self.params.get(version)
    }
}

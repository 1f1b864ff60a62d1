//! Block-processing wiring for the staking and incentive subsystems.
//!
//! `begin_block` clones the committed state into a working copy and pays the
//! block's reward pool against the epoch-gated voting power. Operations then
//! mutate the working copy. `end_block` records voting power, persists a
//! snapshot and publishes the working copy in one swap. Queries only ever
//! see committed state.

use crate::adapters::{
    BincodeSnapshotSerializer, InMemoryBank, InMemorySnapshotStore, SnapshotSerializer,
    SnapshotStore,
};
use crate::container::NodeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::wiring::state::ChainState;
use parking_lot::RwLock;
use qc_18_btc_staking::{
    BtcStakingApi, CovenantSigOutcome, CovenantSignatureBatch, CreateDelegationRequest, Params,
    StakingEvent,
};
use qc_19_incentive::{BankGateway, DistributionOutcome, IncentiveApi, IncentiveEvent};
use shared_crypto::SchnorrSignature;
use shared_types::{
    Address, BlockHeight, BtcPublicKey, Coins, EpochNumber, Hash, StakeholderType,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Read handle on the committed state. Cheap to clone and `Send + Sync`.
#[derive(Clone, Debug)]
pub struct ChainReader {
    committed: Arc<RwLock<Arc<ChainState>>>,
}

impl ChainReader {
    /// The latest committed state. Never observes a block in progress.
    pub fn snapshot(&self) -> Arc<ChainState> {
        Arc::clone(&self.committed.read())
    }

    pub fn height(&self) -> BlockHeight {
        self.committed.read().height
    }
}

/// Events emitted while processing one block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommittedBlock {
    pub height: BlockHeight,
    pub staking_events: Vec<StakingEvent>,
    pub incentive_events: Vec<IncentiveEvent>,
}

/// Sequential block processor owning the committed and working state.
pub struct StakingChain<
    B = InMemoryBank,
    S = InMemorySnapshotStore,
    Z = BincodeSnapshotSerializer,
> {
    config: NodeConfig,
    committed: Arc<RwLock<Arc<ChainState>>>,
    working: Option<ChainState>,
    bank: B,
    store: S,
    serializer: Z,
}

impl StakingChain {
    /// Chain with in-memory adapters built from `config`.
    pub fn new(config: NodeConfig) -> RuntimeResult<Self> {
        let bank = InMemoryBank::from_config(&config.incentive);
        let store = InMemorySnapshotStore::new(config.storage.snapshot_retention);
        Self::with_adapters(config, bank, store, BincodeSnapshotSerializer)
    }
}

impl<B, S, Z> StakingChain<B, S, Z>
where
    B: BankGateway,
    S: SnapshotStore,
    Z: SnapshotSerializer,
{
    /// Resume from the newest snapshot in `store`, or start from genesis.
    pub fn with_adapters(
        config: NodeConfig,
        bank: B,
        store: S,
        serializer: Z,
    ) -> RuntimeResult<Self> {
        config.validate()?;
        let state = match store.latest()? {
            Some((height, bytes)) => {
                let state = serializer.deserialize(&bytes)?;
                info!(height, "Restored chain state from snapshot");
                state
            }
            None => {
                info!(
                    covenant_members = config.staking.genesis_params.covenant_pks.len(),
                    quorum = config.staking.genesis_params.covenant_quorum,
                    epoch_interval = config.epoch.epoch_interval,
                    "Starting chain from genesis"
                );
                ChainState::genesis(&config)?
            }
        };
        Ok(Self {
            config,
            committed: Arc::new(RwLock::new(Arc::new(state))),
            working: None,
            bank,
            store,
            serializer,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn reader(&self) -> ChainReader {
        ChainReader {
            committed: Arc::clone(&self.committed),
        }
    }

    pub fn snapshot(&self) -> Arc<ChainState> {
        Arc::clone(&self.committed.read())
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn block_in_progress(&self) -> Option<BlockHeight> {
        self.working.as_ref().map(|state| state.height)
    }

    // =========================================================================
    // BLOCK LIFECYCLE
    // =========================================================================

    /// Start block `height` and distribute `reward_pool`.
    ///
    /// Returns `None` when no epoch has been finalized yet; the pool is then
    /// not paid into the module account.
    pub fn begin_block(
        &mut self,
        height: BlockHeight,
        reward_pool: &Coins,
    ) -> RuntimeResult<Option<DistributionOutcome>> {
        if let Some(current) = self.block_in_progress() {
            return Err(RuntimeError::BlockInProgress { height: current });
        }
        let committed = self.snapshot();
        let expected = committed.height + 1;
        if height != expected {
            return Err(RuntimeError::NonSequentialHeight {
                expected,
                got: height,
            });
        }

        let mut state = ChainState::clone(&committed);
        state.height = height;

        let outcome = match state.effective_distribution() {
            Some(distribution) => {
                let outcome =
                    state
                        .incentive
                        .distribute_rewards(height, reward_pool, &distribution)?;
                self.bank.fund_module(reward_pool)?;
                Some(outcome)
            }
            None => {
                debug!(height, pool = %reward_pool, "No finalized epoch yet, skipping rewards");
                None
            }
        };

        self.working = Some(state);
        Ok(outcome)
    }

    /// Commit the block in progress.
    pub fn end_block(&mut self) -> RuntimeResult<CommittedBlock> {
        let mut state = self.working.take().ok_or(RuntimeError::NoBlockInProgress)?;
        let height = state.height;
        state.staking.record_voting_power(height);

        let persisted = self
            .serializer
            .serialize(&state)
            .and_then(|bytes| self.store.put(height, bytes));
        if let Err(e) = persisted {
            // Keep the block open, events included, so the commit can be retried.
            self.working = Some(state);
            return Err(e.into());
        }

        let block = CommittedBlock {
            height,
            staking_events: state.staking.drain_events(),
            incentive_events: state.incentive.drain_events(),
        };
        *self.committed.write() = Arc::new(state);
        info!(
            height,
            staking_events = block.staking_events.len(),
            incentive_events = block.incentive_events.len(),
            "Committed block"
        );
        Ok(block)
    }

    fn working(&mut self) -> RuntimeResult<&mut ChainState> {
        self.working.as_mut().ok_or(RuntimeError::NoBlockInProgress)
    }

    // =========================================================================
    // EPOCHS
    // =========================================================================

    /// Consensus reports `epoch` sealed. Returns the epoch's boundary height.
    pub fn seal_epoch(&mut self, epoch: EpochNumber) -> RuntimeResult<BlockHeight> {
        let interval = self.config.epoch.epoch_interval;
        let state = self.working()?;
        let boundary = state.epochs.seal(epoch, interval, state.height)?;
        info!(epoch, boundary, height = state.height, "Epoch sealed");
        Ok(boundary)
    }

    /// Consensus reports `epoch` finalized. Stake recorded at its boundary
    /// becomes eligible for rewards from the next block on.
    pub fn finalize_epoch(&mut self, epoch: EpochNumber) -> RuntimeResult<()> {
        let interval = self.config.epoch.epoch_interval;
        let state = self.working()?;
        let staking = &state.staking;
        let activated = state.epochs.finalize(epoch, interval, state.height, |boundary| {
            staking
                .voting_power_at(boundary)
                .map(|table| table.delegations.clone())
                .unwrap_or_default()
        })?;
        info!(
            epoch,
            height = state.height,
            effective_delegations = state.epochs.effective_delegations().len(),
            activated,
            "Epoch finalized"
        );
        Ok(())
    }

    // =========================================================================
    // STAKING OPERATIONS
    // =========================================================================

    pub fn register_finality_provider(
        &mut self,
        btc_pk: BtcPublicKey,
        address: Address,
        commission_bps: u16,
    ) -> RuntimeResult<()> {
        let state = self.working()?;
        let height = state.height;
        Ok(state
            .staking
            .register_finality_provider(btc_pk, address, commission_bps, height)?)
    }

    pub fn create_delegation(&mut self, request: CreateDelegationRequest) -> RuntimeResult<Hash> {
        let state = self.working()?;
        let height = state.height;
        Ok(state.staking.create_delegation(request, height)?)
    }

    pub fn add_covenant_signatures(
        &mut self,
        batch: CovenantSignatureBatch,
    ) -> RuntimeResult<CovenantSigOutcome> {
        let state = self.working()?;
        let height = state.height;
        Ok(state.staking.add_covenant_signatures(batch, height)?)
    }

    pub fn undelegate(
        &mut self,
        staking_tx_hash: Hash,
        delegator_unbonding_sig: SchnorrSignature,
    ) -> RuntimeResult<()> {
        let state = self.working()?;
        let height = state.height;
        Ok(state
            .staking
            .undelegate(staking_tx_hash, delegator_unbonding_sig, height)?)
    }

    pub fn slash_finality_provider(&mut self, btc_pk: BtcPublicKey) -> RuntimeResult<Vec<Hash>> {
        let state = self.working()?;
        let height = state.height;
        Ok(state.staking.slash_finality_provider(btc_pk, height)?)
    }

    pub fn jail_finality_provider(&mut self, btc_pk: BtcPublicKey) -> RuntimeResult<()> {
        let state = self.working()?;
        let height = state.height;
        Ok(state.staking.jail_finality_provider(btc_pk, height)?)
    }

    pub fn unjail_finality_provider(&mut self, btc_pk: BtcPublicKey) -> RuntimeResult<()> {
        let state = self.working()?;
        let height = state.height;
        Ok(state.staking.unjail_finality_provider(btc_pk, height)?)
    }

    /// New BTC tip; returns delegations that expired.
    pub fn process_btc_tip(&mut self, btc_tip: u64) -> RuntimeResult<Vec<Hash>> {
        let state = self.working()?;
        let height = state.height;
        Ok(state.staking.process_btc_tip(btc_tip, height))
    }

    pub fn update_params(
        &mut self,
        activation_height: BlockHeight,
        params: Params,
    ) -> RuntimeResult<u32> {
        Ok(self
            .working()?
            .staking
            .update_params(activation_height, params)?)
    }

    // =========================================================================
    // INCENTIVE OPERATIONS
    // =========================================================================

    /// Pay out a stakeholder's withdrawable rewards through the bank.
    pub fn withdraw_reward(
        &mut self,
        stakeholder_type: StakeholderType,
        address: &Address,
    ) -> RuntimeResult<Coins> {
        let state = self.working.as_mut().ok_or(RuntimeError::NoBlockInProgress)?;
        Ok(state
            .incentive
            .withdraw_reward(&mut self.bank, stakeholder_type, address)?)
    }
}

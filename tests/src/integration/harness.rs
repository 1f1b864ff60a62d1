//! Block driver for integration scenarios.
//!
//! Every block pays a fixed pool. The epoch ending at height `h` is sealed
//! and finalized in block `h + 1`, so stake active at a boundary earns from
//! block `h + 2` on.

use node_runtime::{NodeConfig, StakingChain};
use qc_18_btc_staking::test_utils::{btc_pk, covenant_batch, keypair, test_params, DelegationFixture};
use qc_18_btc_staking::CovenantSigOutcome;
use shared_types::{Address, BlockHeight, BtcPublicKey, Coins, Hash, StakeholderType};

pub const EPOCH_INTERVAL: u64 = 2;
pub const DENOM: &str = "ubbn";
pub const POOL_PER_BLOCK: u128 = 1_000_000;

pub fn pool() -> Coins {
    Coins::from_pairs([(DENOM, POOL_PER_BLOCK)]).expect("pool")
}

pub fn fp_pk(seed: u8) -> BtcPublicKey {
    btc_pk(&keypair(seed))
}

/// Operator address of the provider with key seed `seed`.
pub fn fp_address(seed: u8) -> Address {
    Address([seed; 20])
}

pub struct Harness {
    pub chain: StakingChain,
    quorum: usize,
    nonce: u32,
}

impl Harness {
    pub fn new(covenant_members: usize, quorum: u32) -> Self {
        let mut config = NodeConfig::default();
        config.staking.genesis_params = test_params(covenant_members, quorum);
        config.epoch.epoch_interval = EPOCH_INTERVAL;
        Self {
            chain: StakingChain::new(config).expect("valid config"),
            quorum: quorum as usize,
            nonce: 0,
        }
    }

    /// Last committed height.
    pub fn height(&self) -> BlockHeight {
        self.chain.snapshot().height
    }

    /// Process one block running `ops` on the working state.
    pub fn block<T>(&mut self, ops: impl FnOnce(&mut StakingChain) -> T) -> T {
        let height = self.height() + 1;
        self.chain.begin_block(height, &pool()).expect("begin block");
        let finished = height - 1;
        if finished > 0 && finished % EPOCH_INTERVAL == 0 {
            let epoch = finished / EPOCH_INTERVAL;
            self.chain.seal_epoch(epoch).expect("seal epoch");
            self.chain.finalize_epoch(epoch).expect("finalize epoch");
        }
        let out = ops(&mut self.chain);
        self.chain.end_block().expect("end block");
        out
    }

    pub fn advance(&mut self, blocks: u64) {
        for _ in 0..blocks {
            self.block(|_| ());
        }
    }

    /// Advance until stake active now is earning rewards.
    pub fn advance_until_effective(&mut self) {
        let boundary = self.height().div_ceil(EPOCH_INTERVAL) * EPOCH_INTERVAL;
        let target = boundary + 1;
        self.advance(target.saturating_sub(self.height()));
    }

    /// Staking transactions for a new delegation.
    pub fn fixture(&mut self, staker_seed: u8, fp_seeds: &[u8], value_sat: u64) -> DelegationFixture {
        self.nonce += 1;
        let params = self.chain.config().staking.genesis_params.clone();
        DelegationFixture::new(&params, staker_seed, fp_seeds, value_sat, self.nonce)
    }

    /// Create a delegation and collect quorum in one block.
    pub fn stake(
        &mut self,
        staker: Address,
        staker_seed: u8,
        fp_seeds: &[u8],
        value_sat: u64,
    ) -> Hash {
        let fixture = self.fixture(staker_seed, fp_seeds, value_sat);
        let quorum = self.quorum;
        self.block(|chain| {
            let start_height = chain.block_in_progress().expect("block open");
            let hash = chain
                .create_delegation(fixture.create_request(staker, start_height))
                .expect("create delegation");
            let mut outcome = CovenantSigOutcome::Duplicate;
            for member in 0..quorum {
                outcome = chain
                    .add_covenant_signatures(covenant_batch(&fixture, member))
                    .expect("covenant batch");
            }
            assert!(matches!(outcome, CovenantSigOutcome::Activated { .. }));
            hash
        })
    }

    /// Total credited to a gauge so far, in `DENOM`.
    pub fn credited(&self, stakeholder_type: StakeholderType, address: &Address) -> u128 {
        self.chain
            .snapshot()
            .reward_gauge(stakeholder_type, address)
            .map_or(0, |gauge| gauge.coins.amount_of(DENOM))
    }
}

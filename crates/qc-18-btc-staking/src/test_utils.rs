//! Test utilities: deterministic keys and fully signed delegation fixtures.
//!
//! Requires feature: `test-utils` (always available in unit tests).
//!
//! Keys are derived from one-byte seeds (`[seed; 32]` as the secret), so the
//! same seed always yields the same key across tests. Covenant members use
//! seeds starting at [`COVENANT_SEED_BASE`].

use crate::domain::{
    BtcDelegation, CovenantSignatureBatch, CovenantSignatureSet, DelegationStatus,
    FinalityProvider, Params, SpendDigests, StakingInfo, StakingKeys, StakingTxBundle,
    UnbondingInfo,
};
use crate::domain::scripts::{spend_digest, tx_hash};
use crate::ports::inbound::CreateDelegationRequest;
use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode;
use bitcoin::hashes::Hash as _;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use shared_crypto::{AdaptorSignature, SchnorrKeyPair, SchnorrPublicKey, SchnorrSignature};
use shared_types::{Address, BtcPublicKey, Hash};

/// First seed used for covenant member keys.
pub const COVENANT_SEED_BASE: u8 = 200;
/// Staking timelock used by fixtures.
pub const FIXTURE_STAKING_TIME: u16 = 1000;
/// Unbonding timelock used by fixtures.
pub const FIXTURE_UNBONDING_TIME: u16 = 100;
/// Fee taken by fixture unbonding transactions.
pub const FIXTURE_UNBONDING_FEE: u64 = 1000;

pub fn keypair(seed: u8) -> SchnorrKeyPair {
    SchnorrKeyPair::from_bytes([seed; 32]).expect("seed yields a valid secret")
}

pub fn btc_pk(keypair: &SchnorrKeyPair) -> BtcPublicKey {
    BtcPublicKey(*keypair.public_key().as_bytes())
}

pub fn covenant_key(index: usize) -> SchnorrKeyPair {
    keypair(COVENANT_SEED_BASE + index as u8)
}

pub fn covenant_keys(n: usize) -> Vec<SchnorrKeyPair> {
    (0..n).map(covenant_key).collect()
}

/// Params with an `n` member committee and the given quorum.
pub fn test_params(n: usize, quorum: u32) -> Params {
    Params {
        covenant_pks: covenant_keys(n).iter().map(btc_pk).collect(),
        covenant_quorum: quorum,
        min_staking_value_sat: 1,
        max_staking_value_sat: 100_000_000_000,
        min_staking_time_blocks: 10,
        max_staking_time_blocks: u16::MAX,
        min_unbonding_time_blocks: 10,
        min_commission_bps: 0,
        finalization_timeout_blocks: 10,
    }
}

/// Finality provider with key `keypair(seed)` and address `[seed; 20]`.
pub fn finality_provider(seed: u8, commission_bps: u16) -> FinalityProvider {
    FinalityProvider::new(btc_pk(&keypair(seed)), Address([seed; 20]), commission_bps, 0)
}

/// An already active delegation with placeholder transactions, for
/// voting power tests that never touch signatures.
pub fn active_delegation(
    id: u8,
    staker_address: Address,
    fp_btc_pks: &[BtcPublicKey],
    staking_value_sat: u64,
) -> BtcDelegation {
    let placeholder = SchnorrSignature::from_bytes([0u8; 64]);
    BtcDelegation {
        staking_tx_hash: [id; 32],
        staker_address,
        staker_btc_pk: btc_pk(&keypair(id)),
        fp_btc_pks: fp_btc_pks.to_vec(),
        staking_value_sat,
        start_height: 0,
        end_height: FIXTURE_STAKING_TIME as u64,
        staking_time: FIXTURE_STAKING_TIME,
        unbonding_time: FIXTURE_UNBONDING_TIME,
        unbonding_value_sat: staking_value_sat.saturating_sub(1),
        staking_tx: Vec::new(),
        staking_output_index: 0,
        slashing_tx: Vec::new(),
        delegator_slashing_sig: placeholder,
        unbonding_tx: Vec::new(),
        unbonding_slashing_tx: Vec::new(),
        delegator_unbonding_slashing_sig: placeholder,
        delegator_unbonding_sig: None,
        digests: SpendDigests {
            staking_slashing: [0; 32],
            unbonding: [0; 32],
            unbonding_slashing: [0; 32],
        },
        covenant_sigs: CovenantSignatureSet::default(),
        params_version: 0,
        status: DelegationStatus::Active,
        created_height: 0,
        activated_height: Some(0),
        status_height: 0,
    }
}

fn spend(previous_output: OutPoint, output: TxOut) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![output],
    }
}

/// A delegation with real staking, unbonding and slashing transactions
/// committing to the expected taproot scripts.
#[derive(Debug)]
pub struct DelegationFixture {
    pub staker: SchnorrKeyPair,
    pub staker_btc_pk: BtcPublicKey,
    pub fp_pks: Vec<BtcPublicKey>,
    pub params: Params,
    pub staking_value_sat: u64,
    pub staking_tx: Vec<u8>,
    pub slashing_tx: Vec<u8>,
    pub unbonding_tx: Vec<u8>,
    pub unbonding_slashing_tx: Vec<u8>,
    pub digests: SpendDigests,
}

impl DelegationFixture {
    /// Build a fixture. `nonce` makes otherwise identical staking
    /// transactions distinct.
    pub fn new(
        params: &Params,
        staker_seed: u8,
        fp_seeds: &[u8],
        staking_value_sat: u64,
        nonce: u32,
    ) -> Self {
        let staker = keypair(staker_seed);
        let staker_btc_pk = btc_pk(&staker);
        let fp_pks: Vec<_> = fp_seeds.iter().map(|s| btc_pk(&keypair(*s))).collect();

        let keys = StakingKeys::new(&staker_btc_pk, &fp_pks, params).expect("valid keys");
        let staking_info = StakingInfo::new(&keys, FIXTURE_STAKING_TIME).expect("staking tree");
        let unbonding_info =
            UnbondingInfo::new(&keys, FIXTURE_UNBONDING_TIME).expect("unbonding tree");

        let funding = OutPoint {
            txid: Txid::all_zeros(),
            vout: nonce,
        };
        let staking_out = TxOut {
            value: Amount::from_sat(staking_value_sat),
            script_pubkey: staking_info.script_pubkey.clone(),
        };
        let staking_tx = spend(funding, staking_out.clone());
        let staking_outpoint = OutPoint {
            txid: staking_tx.compute_txid(),
            vout: 0,
        };

        let unbonding_out = TxOut {
            value: Amount::from_sat(staking_value_sat - FIXTURE_UNBONDING_FEE),
            script_pubkey: unbonding_info.script_pubkey.clone(),
        };
        let unbonding_tx = spend(staking_outpoint, unbonding_out.clone());

        let burn = |value: u64| TxOut {
            value: Amount::from_sat(value),
            script_pubkey: ScriptBuf::new(),
        };
        let slashing_tx = spend(staking_outpoint, burn(staking_value_sat / 10));
        let unbonding_slashing_tx = spend(
            OutPoint {
                txid: unbonding_tx.compute_txid(),
                vout: 0,
            },
            burn(staking_value_sat / 10),
        );

        let digests = SpendDigests {
            staking_slashing: spend_digest(&slashing_tx, &staking_out, &staking_info.slashing_leaf)
                .expect("digest"),
            unbonding: spend_digest(&unbonding_tx, &staking_out, &staking_info.unbonding_leaf)
                .expect("digest"),
            unbonding_slashing: spend_digest(
                &unbonding_slashing_tx,
                &unbonding_out,
                &unbonding_info.slashing_leaf,
            )
            .expect("digest"),
        };

        Self {
            staker,
            staker_btc_pk,
            fp_pks,
            params: params.clone(),
            staking_value_sat,
            staking_tx: encode::serialize(&staking_tx),
            slashing_tx: encode::serialize(&slashing_tx),
            unbonding_tx: encode::serialize(&unbonding_tx),
            unbonding_slashing_tx: encode::serialize(&unbonding_slashing_tx),
            digests,
        }
    }

    pub fn staking_keys(&self) -> StakingKeys {
        StakingKeys::new(&self.staker_btc_pk, &self.fp_pks, &self.params).expect("valid keys")
    }

    pub fn bundle(&self) -> StakingTxBundle<'_> {
        StakingTxBundle {
            staking_tx: &self.staking_tx,
            staking_output_index: 0,
            slashing_tx: &self.slashing_tx,
            unbonding_tx: &self.unbonding_tx,
            unbonding_slashing_tx: &self.unbonding_slashing_tx,
        }
    }

    pub fn staking_tx_hash(&self) -> Hash {
        let tx: Transaction = encode::deserialize(&self.staking_tx).expect("fixture tx");
        tx_hash(&tx)
    }

    /// Creation request signed by the staker.
    pub fn create_request(&self, staker_address: Address, start_height: u64) -> CreateDelegationRequest {
        CreateDelegationRequest {
            staker_address,
            staker_btc_pk: self.staker_btc_pk,
            fp_btc_pks: self.fp_pks.clone(),
            staking_value_sat: self.staking_value_sat,
            start_height,
            staking_time: FIXTURE_STAKING_TIME,
            unbonding_time: FIXTURE_UNBONDING_TIME,
            staking_tx: self.staking_tx.clone(),
            staking_output_index: 0,
            slashing_tx: self.slashing_tx.clone(),
            delegator_slashing_sig: self
                .staker
                .sign(&self.digests.staking_slashing)
                .expect("sign"),
            unbonding_tx: self.unbonding_tx.clone(),
            unbonding_slashing_tx: self.unbonding_slashing_tx.clone(),
            delegator_unbonding_slashing_sig: self
                .staker
                .sign(&self.digests.unbonding_slashing)
                .expect("sign"),
        }
    }

    /// Staker signature authorizing the unbonding transaction.
    pub fn unbonding_sig(&self) -> SchnorrSignature {
        self.staker.sign(&self.digests.unbonding).expect("sign")
    }
}

/// Full batch from covenant member `index` covering every fp and path.
pub fn covenant_batch(fixture: &DelegationFixture, index: usize) -> CovenantSignatureBatch {
    let member = covenant_key(index);
    let adaptor = |fp: &BtcPublicKey, digest: &[u8; 32]| {
        let encryption_key = SchnorrPublicKey::from_bytes(fp.0).expect("fp key");
        AdaptorSignature::encrypt_sign(&member, &encryption_key, digest).expect("adaptor sign")
    };

    CovenantSignatureBatch {
        covenant_pk: btc_pk(&member),
        staking_tx_hash: fixture.staking_tx_hash(),
        staking_slashing: fixture
            .fp_pks
            .iter()
            .map(|fp| (*fp, adaptor(fp, &fixture.digests.staking_slashing)))
            .collect(),
        unbonding: Some(member.sign(&fixture.digests.unbonding).expect("sign")),
        unbonding_slashing: fixture
            .fp_pks
            .iter()
            .map(|fp| (*fp, adaptor(fp, &fixture.digests.unbonding_slashing)))
            .collect(),
    }
}

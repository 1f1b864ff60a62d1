//! # Bitcoin Staking Scripts
//!
//! Taproot script trees for the staking and unbonding outputs, and the
//! tapscript sighashes signed on each covenant spend path.
//!
//! ```text
//! staking output (internal key: unspendable NUMS)
//! ├── depth 2: timelock   <staker> CHECKSIGVERIFY <staking_time> CSV
//! ├── depth 2: unbonding  <staker> CHECKSIGVERIFY <covenant multisig>
//! └── depth 1: slashing   <staker> CHECKSIGVERIFY <fp 1-of-n> VERIFY <covenant multisig>
//!
//! unbonding output
//! ├── depth 1: timelock   <staker> CHECKSIGVERIFY <unbonding_time> CSV
//! └── depth 1: slashing   (same leaf as above)
//! ```

use crate::domain::params::Params;
use crate::error::{StakingError, StakingResult};
use bitcoin::consensus::encode;
use bitcoin::hashes::Hash as _;
use bitcoin::opcodes::all::{
    OP_CHECKSIG, OP_CHECKSIGADD, OP_CHECKSIGVERIFY, OP_CSV, OP_GREATERTHANOREQUAL, OP_VERIFY,
};
use bitcoin::script::Builder;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::taproot::{LeafVersion, TapLeafHash, TaprootBuilder, TaprootSpendInfo};
use bitcoin::{OutPoint, ScriptBuf, Transaction, TxOut, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use shared_types::{BtcPublicKey, Hash};
use std::fmt;
use std::str::FromStr;

/// BIP-341 NUMS point with no known discrete log.
pub const UNSPENDABLE_KEY: &str =
    "50929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac0";

/// Covenant spend paths. Each has its own digest; signatures for one path
/// never verify on another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpendPath {
    /// Slashing transaction spending the staking output.
    StakingSlashing,
    /// Unbonding transaction spending the staking output.
    Unbonding,
    /// Slashing transaction spending the unbonding output.
    UnbondingSlashing,
}

impl SpendPath {
    pub const ALL: [SpendPath; 3] = [
        SpendPath::StakingSlashing,
        SpendPath::Unbonding,
        SpendPath::UnbondingSlashing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpendPath::StakingSlashing => "staking_slashing",
            SpendPath::Unbonding => "unbonding",
            SpendPath::UnbondingSlashing => "unbonding_slashing",
        }
    }
}

impl fmt::Display for SpendPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sighashes for the three spend paths of one delegation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendDigests {
    pub staking_slashing: [u8; 32],
    pub unbonding: [u8; 32],
    pub unbonding_slashing: [u8; 32],
}

impl SpendDigests {
    pub fn get(&self, path: SpendPath) -> &[u8; 32] {
        match path {
            SpendPath::StakingSlashing => &self.staking_slashing,
            SpendPath::Unbonding => &self.unbonding,
            SpendPath::UnbondingSlashing => &self.unbonding_slashing,
        }
    }
}

// =============================================================================
// SCRIPTS
// =============================================================================

pub fn to_x_only(pk: &BtcPublicKey) -> StakingResult<XOnlyPublicKey> {
    XOnlyPublicKey::from_slice(pk.as_bytes())
        .map_err(|e| StakingError::script(format!("invalid x-only key {}: {}", pk, e)))
}

fn to_x_only_all(pks: &[BtcPublicKey]) -> StakingResult<Vec<XOnlyPublicKey>> {
    pks.iter().map(to_x_only).collect()
}

pub fn unspendable_key() -> StakingResult<XOnlyPublicKey> {
    XOnlyPublicKey::from_str(UNSPENDABLE_KEY).map_err(StakingError::script)
}

pub fn single_key_script(pk: &XOnlyPublicKey, verify: bool) -> ScriptBuf {
    let op = if verify { OP_CHECKSIGVERIFY } else { OP_CHECKSIG };
    Builder::new().push_x_only_key(pk).push_opcode(op).into_script()
}

/// Sort keys by serialization, rejecting duplicates.
pub fn sort_keys(pks: &[XOnlyPublicKey]) -> StakingResult<Vec<XOnlyPublicKey>> {
    let mut sorted = pks.to_vec();
    sorted.sort_by_key(|pk| pk.serialize());
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return Err(StakingError::script("duplicate key in list of keys"));
    }
    Ok(sorted)
}

/// `threshold`-of-n multisig using `CHECKSIGADD`. A single key degenerates
/// to a plain `CHECKSIG`.
pub fn multisig_script(
    pks: &[XOnlyPublicKey],
    threshold: u32,
    verify: bool,
) -> StakingResult<ScriptBuf> {
    if pks.is_empty() {
        return Err(StakingError::script("no keys provided"));
    }
    if threshold == 0 || threshold as usize > pks.len() {
        return Err(StakingError::script(format!(
            "threshold {} out of range for {} keys",
            threshold,
            pks.len()
        )));
    }
    if pks.len() == 1 {
        return Ok(single_key_script(&pks[0], verify));
    }

    let mut builder = Builder::new();
    for (i, pk) in sort_keys(pks)?.iter().enumerate() {
        let op = if i == 0 { OP_CHECKSIG } else { OP_CHECKSIGADD };
        builder = builder.push_x_only_key(pk).push_opcode(op);
    }
    builder = builder
        .push_int(threshold as i64)
        .push_opcode(OP_GREATERTHANOREQUAL);
    if verify {
        builder = builder.push_opcode(OP_VERIFY);
    }
    Ok(builder.into_script())
}

pub fn timelock_script(pk: &XOnlyPublicKey, timelock: u16) -> ScriptBuf {
    Builder::new()
        .push_x_only_key(pk)
        .push_opcode(OP_CHECKSIGVERIFY)
        .push_int(timelock as i64)
        .push_opcode(OP_CSV)
        .into_script()
}

fn aggregate_scripts(scripts: &[ScriptBuf]) -> ScriptBuf {
    let mut bytes = Vec::new();
    for script in scripts {
        bytes.extend_from_slice(script.as_bytes());
    }
    ScriptBuf::from_bytes(bytes)
}

pub fn unbonding_script(
    staker: &XOnlyPublicKey,
    covenants: &[XOnlyPublicKey],
    quorum: u32,
) -> StakingResult<ScriptBuf> {
    Ok(aggregate_scripts(&[
        single_key_script(staker, true),
        multisig_script(covenants, quorum, false)?,
    ]))
}

pub fn slashing_script(
    staker: &XOnlyPublicKey,
    fps: &[XOnlyPublicKey],
    covenants: &[XOnlyPublicKey],
    quorum: u32,
) -> StakingResult<ScriptBuf> {
    Ok(aggregate_scripts(&[
        single_key_script(staker, true),
        multisig_script(fps, 1, true)?,
        multisig_script(covenants, quorum, false)?,
    ]))
}

fn finalize_tree(builder: TaprootBuilder) -> StakingResult<TaprootSpendInfo> {
    builder
        .finalize(&Secp256k1::verification_only(), unspendable_key()?)
        .map_err(|_| StakingError::script("failed to finalize taproot tree"))
}

/// Keys a staking or unbonding output commits to.
#[derive(Clone, Debug)]
pub struct StakingKeys {
    pub staker: XOnlyPublicKey,
    pub finality_providers: Vec<XOnlyPublicKey>,
    pub covenants: Vec<XOnlyPublicKey>,
    pub covenant_quorum: u32,
}

impl StakingKeys {
    pub fn new(
        staker: &BtcPublicKey,
        finality_providers: &[BtcPublicKey],
        params: &Params,
    ) -> StakingResult<Self> {
        Ok(Self {
            staker: to_x_only(staker)?,
            finality_providers: to_x_only_all(finality_providers)?,
            covenants: to_x_only_all(&params.covenant_pks)?,
            covenant_quorum: params.covenant_quorum,
        })
    }

    fn slashing_script(&self) -> StakingResult<ScriptBuf> {
        slashing_script(
            &self.staker,
            &self.finality_providers,
            &self.covenants,
            self.covenant_quorum,
        )
    }
}

/// Staking output script tree.
#[derive(Clone, Debug)]
pub struct StakingInfo {
    pub script_pubkey: ScriptBuf,
    pub timelock_leaf: ScriptBuf,
    pub unbonding_leaf: ScriptBuf,
    pub slashing_leaf: ScriptBuf,
}

impl StakingInfo {
    pub fn new(keys: &StakingKeys, staking_time: u16) -> StakingResult<Self> {
        let timelock_leaf = timelock_script(&keys.staker, staking_time);
        let unbonding_leaf =
            unbonding_script(&keys.staker, &keys.covenants, keys.covenant_quorum)?;
        let slashing_leaf = keys.slashing_script()?;

        let spend_info = finalize_tree(
            TaprootBuilder::new()
                .add_leaf(2, timelock_leaf.clone())
                .and_then(|b| b.add_leaf(2, unbonding_leaf.clone()))
                .and_then(|b| b.add_leaf(1, slashing_leaf.clone()))
                .map_err(StakingError::script)?,
        )?;

        Ok(Self {
            script_pubkey: ScriptBuf::new_p2tr_tweaked(spend_info.output_key()),
            timelock_leaf,
            unbonding_leaf,
            slashing_leaf,
        })
    }
}

/// Unbonding output script tree.
#[derive(Clone, Debug)]
pub struct UnbondingInfo {
    pub script_pubkey: ScriptBuf,
    pub timelock_leaf: ScriptBuf,
    pub slashing_leaf: ScriptBuf,
}

impl UnbondingInfo {
    pub fn new(keys: &StakingKeys, unbonding_time: u16) -> StakingResult<Self> {
        let timelock_leaf = timelock_script(&keys.staker, unbonding_time);
        let slashing_leaf = keys.slashing_script()?;

        let spend_info = finalize_tree(
            TaprootBuilder::new()
                .add_leaf(1, timelock_leaf.clone())
                .and_then(|b| b.add_leaf(1, slashing_leaf.clone()))
                .map_err(StakingError::script)?,
        )?;

        Ok(Self {
            script_pubkey: ScriptBuf::new_p2tr_tweaked(spend_info.output_key()),
            timelock_leaf,
            slashing_leaf,
        })
    }
}

// =============================================================================
// TRANSACTIONS & DIGESTS
// =============================================================================

pub fn decode_tx(bytes: &[u8], name: &str) -> StakingResult<Transaction> {
    encode::deserialize::<Transaction>(bytes)
        .map_err(|e| StakingError::invalid_tx(format!("cannot decode {}: {}", name, e)))
}

/// Transaction id bytes (internal byte order).
pub fn tx_hash(tx: &Transaction) -> Hash {
    tx.compute_txid().to_byte_array()
}

/// BIP-341 tapscript sighash (`SIGHASH_DEFAULT`) of input 0 of `spending_tx`
/// spending `prevout` through `leaf`.
pub fn spend_digest(
    spending_tx: &Transaction,
    prevout: &TxOut,
    leaf: &ScriptBuf,
) -> StakingResult<[u8; 32]> {
    if spending_tx.input.is_empty() {
        return Err(StakingError::invalid_tx("spending transaction has no inputs"));
    }
    let leaf_hash = TapLeafHash::from_script(leaf, LeafVersion::TapScript);
    let prevouts = [prevout.clone()];
    let mut cache = SighashCache::new(spending_tx);
    let sighash = cache
        .taproot_script_spend_signature_hash(
            0,
            &Prevouts::All(&prevouts),
            leaf_hash,
            TapSighashType::Default,
        )
        .map_err(StakingError::script)?;
    Ok(sighash.to_byte_array())
}

/// Raw transactions submitted with a delegation.
#[derive(Clone, Copy, Debug)]
pub struct StakingTxBundle<'a> {
    pub staking_tx: &'a [u8],
    pub staking_output_index: u32,
    pub slashing_tx: &'a [u8],
    pub unbonding_tx: &'a [u8],
    pub unbonding_slashing_tx: &'a [u8],
}

/// Outcome of checking a [`StakingTxBundle`] against the expected scripts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedStakingTxs {
    pub staking_tx_hash: Hash,
    pub unbonding_value_sat: u64,
    pub digests: SpendDigests,
}

fn expect_spends(tx: &Transaction, outpoint: OutPoint, name: &str) -> StakingResult<()> {
    match tx.input.first() {
        Some(input) if input.previous_output == outpoint => Ok(()),
        _ => Err(StakingError::invalid_tx(format!(
            "{} does not spend {}",
            name, outpoint
        ))),
    }
}

/// Decode the delegation's transactions, check they commit to the expected
/// script trees and derive the three spend path digests.
pub fn verify_staking_txs(
    bundle: StakingTxBundle<'_>,
    keys: &StakingKeys,
    staking_value_sat: u64,
    staking_time: u16,
    unbonding_time: u16,
) -> StakingResult<VerifiedStakingTxs> {
    let staking_tx = decode_tx(bundle.staking_tx, "staking tx")?;
    let slashing_tx = decode_tx(bundle.slashing_tx, "slashing tx")?;
    let unbonding_tx = decode_tx(bundle.unbonding_tx, "unbonding tx")?;
    let unbonding_slashing_tx = decode_tx(bundle.unbonding_slashing_tx, "unbonding slashing tx")?;

    let staking_info = StakingInfo::new(keys, staking_time)?;
    let unbonding_info = UnbondingInfo::new(keys, unbonding_time)?;

    let staking_out = staking_tx
        .output
        .get(bundle.staking_output_index as usize)
        .ok_or_else(|| StakingError::invalid_tx("staking output index out of range"))?;
    if staking_out.script_pubkey != staking_info.script_pubkey {
        return Err(StakingError::invalid_tx(
            "staking output does not match the expected taproot script",
        ));
    }
    if staking_out.value.to_sat() != staking_value_sat {
        return Err(StakingError::invalid_tx(format!(
            "staking output pays {} sat, expected {}",
            staking_out.value.to_sat(),
            staking_value_sat
        )));
    }

    let staking_tx_hash = tx_hash(&staking_tx);
    let staking_outpoint = OutPoint {
        txid: staking_tx.compute_txid(),
        vout: bundle.staking_output_index,
    };

    if unbonding_tx.input.len() != 1 || unbonding_tx.output.len() != 1 {
        return Err(StakingError::invalid_tx(
            "unbonding tx must have exactly one input and one output",
        ));
    }
    expect_spends(&unbonding_tx, staking_outpoint, "unbonding tx")?;
    let unbonding_out = &unbonding_tx.output[0];
    if unbonding_out.script_pubkey != unbonding_info.script_pubkey {
        return Err(StakingError::invalid_tx(
            "unbonding output does not match the expected taproot script",
        ));
    }
    let unbonding_value_sat = unbonding_out.value.to_sat();
    if unbonding_value_sat == 0 || unbonding_value_sat >= staking_value_sat {
        return Err(StakingError::invalid_tx(
            "unbonding value must be positive and below the staking value",
        ));
    }

    expect_spends(&slashing_tx, staking_outpoint, "slashing tx")?;
    let unbonding_outpoint = OutPoint {
        txid: unbonding_tx.compute_txid(),
        vout: 0,
    };
    expect_spends(
        &unbonding_slashing_tx,
        unbonding_outpoint,
        "unbonding slashing tx",
    )?;

    let digests = SpendDigests {
        staking_slashing: spend_digest(&slashing_tx, staking_out, &staking_info.slashing_leaf)?,
        unbonding: spend_digest(&unbonding_tx, staking_out, &staking_info.unbonding_leaf)?,
        unbonding_slashing: spend_digest(
            &unbonding_slashing_tx,
            unbonding_out,
            &unbonding_info.slashing_leaf,
        )?,
    };

    Ok(VerifiedStakingTxs {
        staking_tx_hash,
        unbonding_value_sat,
        digests,
    })
}

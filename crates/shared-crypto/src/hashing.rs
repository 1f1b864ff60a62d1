//! # Tagged Hashing (SHA-256)
//!
//! BIP-340 style domain-separated hashing:
//! `tagged_hash(tag, m) = SHA256(SHA256(tag) || SHA256(tag) || m)`.

use sha2::{Digest, Sha256};

/// BIP-340 auxiliary randomness tag.
pub const TAG_AUX: &str = "BIP0340/aux";
/// BIP-340 nonce tag.
pub const TAG_NONCE: &str = "BIP0340/nonce";
/// BIP-340 challenge tag.
pub const TAG_CHALLENGE: &str = "BIP0340/challenge";
/// Nonce tag for adaptor pre-signatures.
pub const TAG_ADAPTOR_NONCE: &str = "QuantumChain/adaptor/nonce";

/// Plain SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Tagged hash over the concatenation of `chunks`.
pub fn tagged_hash(tag: &str, chunks: &[&[u8]]) -> [u8; 32] {
    let tag_hash = Sha256::digest(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(tag_hash);
    hasher.update(tag_hash);
    for chunk in chunks {
        hasher.update(chunk);
    }
    hasher.finalize().into()
}

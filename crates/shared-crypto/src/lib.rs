//! # Shared Crypto - Bitcoin Signature Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `schnorr` | BIP-340 Schnorr (secp256k1) | Staker and covenant signatures |
//! | `adaptor` | Schnorr adaptor signatures | Covenant slashing pre-signatures |
//! | `hashing` | SHA-256, tagged hashes | Nonce and challenge derivation |
//!
//! ## Security Properties
//!
//! - **BIP-340**: Deterministic nonces, x-only even-Y keys
//! - **Adaptor**: Decryption reveals the encryption secret to the verifier
//! - Secret material is zeroized on drop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adaptor;
pub mod errors;
pub mod hashing;
pub mod schnorr;

// Re-exports
pub use adaptor::{AdaptorSignature, ADAPTOR_SIGNATURE_LEN};
pub use errors::CryptoError;
pub use hashing::{sha256, tagged_hash};
pub use schnorr::{SchnorrKeyPair, SchnorrPublicKey, SchnorrSignature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

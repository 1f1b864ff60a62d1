//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Adaptor signature is not a valid encryption under the given key
    #[error("Adaptor signature verification failed")]
    AdaptorVerificationFailed,

    /// Invalid signature format
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Decryption key does not match the adaptor's encryption key
    #[error("Decryption key does not match encryption key")]
    DecryptionKeyMismatch,

    /// Deterministic nonce derivation produced an unusable nonce
    #[error("Nonce generation failed")]
    NonceGeneration,
}

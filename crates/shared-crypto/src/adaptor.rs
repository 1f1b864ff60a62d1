//! # Schnorr Adaptor Signatures
//!
//! One-time encrypted BIP-340 signatures. A pre-signature is bound to an
//! encryption key `T`; anyone holding the matching secret `t` can decrypt it
//! into a valid BIP-340 signature, and anyone seeing both the pre-signature
//! and the decrypted signature can extract `t`.
//!
//! Covenant members pre-sign slashing transactions encrypted to a finality
//! provider's key, so a slashing transaction only becomes spendable once the
//! finality provider's secret is revealed.
//!
//! ## Wire Format
//!
//! 65 bytes: `R` as a compressed point (33) followed by `s_hat` (32).
//!
//! ```text
//! enc_sign:    R = k·G + T,  s_hat = ±k + e·d
//! enc_verify:  s_hat·G == ±(R - T) + e·P
//! decrypt:     s = s_hat ± t,  sig = (R.x, s)
//! extract:     t = ±(s - s_hat)
//! ```
//!
//! The sign is negative when `R` has odd Y, since BIP-340 implicitly uses
//! the even-Y point with the same x-coordinate.

use crate::hashing::{tagged_hash, TAG_ADAPTOR_NONCE};
use crate::schnorr::{
    challenge, decode_point, encode_point, has_even_y, reduce, scalar_from_canonical,
};
use crate::{CryptoError, SchnorrKeyPair, SchnorrPublicKey, SchnorrSignature};
use k256::elliptic_curve::point::AffineCoordinates;
use k256::{AffinePoint, ProjectivePoint, Scalar};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// Encoded adaptor signature length.
pub const ADAPTOR_SIGNATURE_LEN: usize = 65;

/// Schnorr adaptor signature (pre-signature).
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptorSignature {
    #[serde_as(as = "Bytes")]
    r: [u8; 33],
    s_hat: [u8; 32],
}

impl AdaptorSignature {
    /// Encrypt-sign `message` with `signer`, encrypted to `encryption_key`.
    pub fn encrypt_sign(
        signer: &SchnorrKeyPair,
        encryption_key: &SchnorrPublicKey,
        message: &[u8],
    ) -> Result<Self, CryptoError> {
        let (d, px) = signer.even_secret();
        let t_point = encryption_key.point()?;

        let d_bytes: [u8; 32] = d.to_bytes().into();
        let nonce = tagged_hash(
            TAG_ADAPTOR_NONCE,
            &[&d_bytes, &px, encryption_key.as_bytes(), message],
        );
        let k = reduce(&nonce);
        if k == Scalar::ZERO {
            return Err(CryptoError::NonceGeneration);
        }

        let r = ProjectivePoint::GENERATOR * k + t_point;
        if r == ProjectivePoint::IDENTITY {
            return Err(CryptoError::NonceGeneration);
        }
        let r = r.to_affine();
        let k = if has_even_y(&r) { k } else { -k };

        let e = challenge(&r.x(), &px, message);
        let s_hat = k + e * d;

        Ok(Self {
            r: encode_point(&r),
            s_hat: s_hat.to_bytes().into(),
        })
    }

    /// Verify that this is a valid encryption of a signature by `signer_key`
    /// over `message` under `encryption_key`.
    pub fn encrypt_verify(
        &self,
        signer_key: &SchnorrPublicKey,
        encryption_key: &SchnorrPublicKey,
        message: &[u8],
    ) -> Result<(), CryptoError> {
        let r = self.r_point()?;
        let s_hat = self.s_hat_scalar()?;
        let p = signer_key.point()?;
        let t_point = encryption_key.point()?;

        let e = challenge(&r.x(), signer_key.as_bytes(), message);
        let nonce_point = ProjectivePoint::from(r) - t_point;
        let nonce_point = if has_even_y(&r) {
            nonce_point
        } else {
            -nonce_point
        };

        if ProjectivePoint::GENERATOR * s_hat == nonce_point + p * e {
            Ok(())
        } else {
            Err(CryptoError::AdaptorVerificationFailed)
        }
    }

    /// Decrypt into a BIP-340 signature using the secret behind the
    /// encryption key.
    pub fn decrypt(&self, decryption_key: &SchnorrKeyPair) -> Result<SchnorrSignature, CryptoError> {
        let r = self.r_point()?;
        let s_hat = self.s_hat_scalar()?;
        let (t, _) = decryption_key.even_secret();

        let s = if has_even_y(&r) { s_hat + t } else { s_hat - t };
        Ok(SchnorrSignature::from_parts(&r.x(), &s))
    }

    /// Recover the decryption key from a signature produced by [`decrypt`].
    ///
    /// [`decrypt`]: AdaptorSignature::decrypt
    pub fn extract(
        &self,
        signature: &SchnorrSignature,
        encryption_key: &SchnorrPublicKey,
    ) -> Result<SchnorrKeyPair, CryptoError> {
        let r = self.r_point()?;
        if r.x().as_slice() != &signature.as_bytes()[..32] {
            return Err(CryptoError::DecryptionKeyMismatch);
        }
        let s_hat = self.s_hat_scalar()?;
        let s = signature.s()?;

        let t = if has_even_y(&r) { s - s_hat } else { s_hat - s };
        if ProjectivePoint::GENERATOR * t != encryption_key.point()? {
            return Err(CryptoError::DecryptionKeyMismatch);
        }
        SchnorrKeyPair::from_bytes(t.to_bytes().into())
    }

    /// Encode as 65 bytes.
    pub fn to_bytes(&self) -> [u8; ADAPTOR_SIGNATURE_LEN] {
        let mut out = [0u8; ADAPTOR_SIGNATURE_LEN];
        out[..33].copy_from_slice(&self.r);
        out[33..].copy_from_slice(&self.s_hat);
        out
    }

    /// Decode from 65 bytes, validating the point and scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != ADAPTOR_SIGNATURE_LEN {
            return Err(CryptoError::InvalidSignatureFormat);
        }
        let mut sig = Self {
            r: [0u8; 33],
            s_hat: [0u8; 32],
        };
        sig.r.copy_from_slice(&bytes[..33]);
        sig.s_hat.copy_from_slice(&bytes[33..]);
        sig.r_point().map_err(|_| CryptoError::InvalidSignatureFormat)?;
        sig.s_hat_scalar()?;
        Ok(sig)
    }

    fn r_point(&self) -> Result<AffinePoint, CryptoError> {
        decode_point(&self.r)
    }

    fn s_hat_scalar(&self) -> Result<Scalar, CryptoError> {
        scalar_from_canonical(&self.s_hat).ok_or(CryptoError::InvalidSignatureFormat)
    }
}

//! # BIP-340 Schnorr Signatures (secp256k1)
//!
//! Bitcoin Taproot signatures over x-only public keys.
//!
//! ## Security Properties
//!
//! - Deterministic nonces derived from the secret, auxiliary randomness and
//!   message (BIP-340 nonce derivation)
//! - Implicit even-Y public keys and nonces
//! - Secret key bytes are zeroized on drop
//!
//! ## Use Cases
//!
//! - Covenant signatures on the unbonding path
//! - Staker signatures on slashing and unbonding transactions

use crate::hashing::{tagged_hash, TAG_AUX, TAG_CHALLENGE, TAG_NONCE};
use crate::CryptoError;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::point::AffineCoordinates;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::{Field, PrimeField};
use k256::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar, U256};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// BIP-340 x-only public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchnorrPublicKey([u8; 32]);

impl SchnorrPublicKey {
    /// Create from x-only bytes; fails if no curve point has this x.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        lift_x(&bytes)?;
        Ok(Self(bytes))
    }

    /// Get raw x-only bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Even-Y curve point for this key.
    pub(crate) fn point(&self) -> Result<ProjectivePoint, CryptoError> {
        lift_x(&self.0).map(ProjectivePoint::from)
    }

    /// Verify a BIP-340 signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &SchnorrSignature) -> Result<(), CryptoError> {
        let p = self.point()?;
        let (r_bytes, s_bytes) = signature.0.split_at(32);
        let s = scalar_from_canonical(s_bytes).ok_or(CryptoError::InvalidSignatureFormat)?;
        let e = challenge(r_bytes, &self.0, message);

        let r = ProjectivePoint::GENERATOR * s - p * e;
        if r == ProjectivePoint::IDENTITY {
            return Err(CryptoError::SignatureVerificationFailed);
        }
        let r = r.to_affine();
        if !has_even_y(&r) || r.x().as_slice() != r_bytes {
            return Err(CryptoError::SignatureVerificationFailed);
        }
        Ok(())
    }
}

/// BIP-340 signature (64 bytes, `R.x || s`).
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchnorrSignature(#[serde_as(as = "Bytes")] [u8; 64]);

impl SchnorrSignature {
    /// Create from bytes (64 bytes).
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parse from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Ok(Self(arr))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub(crate) fn from_parts(r_x: &[u8], s: &Scalar) -> Self {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(r_x);
        bytes[32..].copy_from_slice(&s.to_bytes());
        Self(bytes)
    }

    pub(crate) fn s(&self) -> Result<Scalar, CryptoError> {
        scalar_from_canonical(&self.0[32..]).ok_or(CryptoError::InvalidSignatureFormat)
    }
}

/// secp256k1 Schnorr keypair.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SchnorrKeyPair {
    secret: [u8; 32],
}

impl SchnorrKeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let candidate = <Scalar as Field>::random(&mut rng);
            if candidate != Scalar::ZERO {
                return Self {
                    secret: candidate.to_bytes().into(),
                };
            }
        }
    }

    /// Create from secret key bytes (32 bytes, nonzero and below the curve order).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        match scalar_from_canonical(&bytes) {
            Some(s) if s != Scalar::ZERO => Ok(Self { secret: bytes }),
            _ => Err(CryptoError::InvalidPrivateKey),
        }
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.secret
    }

    /// Get the x-only public key.
    pub fn public_key(&self) -> SchnorrPublicKey {
        let (_, x) = self.even_secret();
        SchnorrPublicKey(x)
    }

    /// Secret scalar negated if needed so that its public point has even Y,
    /// together with the x-only public key.
    pub(crate) fn even_secret(&self) -> (Scalar, [u8; 32]) {
        // from_bytes and generate only admit canonical nonzero scalars
        let d0 = scalar_from_canonical(&self.secret).unwrap_or(Scalar::ONE);
        let p = (ProjectivePoint::GENERATOR * d0).to_affine();
        let d = if has_even_y(&p) { d0 } else { -d0 };
        (d, p.x().into())
    }

    /// Sign with BIP-340, mixing `aux_rand` into the nonce.
    pub fn sign_with_aux(
        &self,
        message: &[u8],
        aux_rand: &[u8; 32],
    ) -> Result<SchnorrSignature, CryptoError> {
        let (d, px) = self.even_secret();

        let aux_hash = tagged_hash(TAG_AUX, &[aux_rand]);
        let mut t: [u8; 32] = d.to_bytes().into();
        for (byte, mask) in t.iter_mut().zip(aux_hash.iter()) {
            *byte ^= mask;
        }
        let nonce = tagged_hash(TAG_NONCE, &[&t, &px, message]);
        t.zeroize();

        let k0 = reduce(&nonce);
        if k0 == Scalar::ZERO {
            return Err(CryptoError::NonceGeneration);
        }
        let r = (ProjectivePoint::GENERATOR * k0).to_affine();
        let k = if has_even_y(&r) { k0 } else { -k0 };
        let r_x: [u8; 32] = r.x().into();

        let e = challenge(&r_x, &px, message);
        Ok(SchnorrSignature::from_parts(&r_x, &(k + e * d)))
    }

    /// Sign with BIP-340 using all-zero auxiliary randomness (fully deterministic).
    pub fn sign(&self, message: &[u8]) -> Result<SchnorrSignature, CryptoError> {
        self.sign_with_aux(message, &[0u8; 32])
    }
}

impl std::fmt::Debug for SchnorrKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchnorrKeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// CURVE HELPERS
// =============================================================================

/// BIP-340 `lift_x`: the curve point with x-coordinate `x` and even Y.
pub(crate) fn lift_x(x: &[u8; 32]) -> Result<AffinePoint, CryptoError> {
    let mut compressed = [0u8; 33];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(x);
    decode_point(&compressed)
}

/// Decode a 33-byte SEC1 compressed point.
pub(crate) fn decode_point(bytes: &[u8]) -> Result<AffinePoint, CryptoError> {
    let encoded = EncodedPoint::from_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
    Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or(CryptoError::InvalidPublicKey)
}

/// Encode a point as 33-byte SEC1 compressed bytes.
pub(crate) fn encode_point(point: &AffinePoint) -> [u8; 33] {
    let encoded = point.to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(encoded.as_bytes());
    out
}

pub(crate) fn has_even_y(point: &AffinePoint) -> bool {
    !bool::from(point.y_is_odd())
}

/// Interpret 32 big-endian bytes as a scalar, reducing mod n.
pub(crate) fn reduce(bytes: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce(U256::from_be_slice(bytes))
}

/// Parse a canonical scalar (rejects values >= n).
pub(crate) fn scalar_from_canonical(bytes: &[u8]) -> Option<Scalar> {
    if bytes.len() != 32 {
        return None;
    }
    Option::from(Scalar::from_repr(FieldBytes::clone_from_slice(bytes)))
}

/// BIP-340 challenge `e = H_challenge(R.x || P.x || m) mod n`.
pub(crate) fn challenge(r_x: &[u8], p_x: &[u8; 32], message: &[u8]) -> Scalar {
    reduce(&tagged_hash(TAG_CHALLENGE, &[r_x, p_x, message]))
}

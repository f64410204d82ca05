//! Core types shared by the signing, MuSig and threshold modules

use std::fmt;

use k256::{ProjectivePoint, Scalar};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::curve;
use crate::error::{Error, Result};

/// 32-byte message digest being signed
pub type Message = [u8; 32];

/// Unique identifier for a signing session
pub type SessionId = [u8; 32];

/// BIP340 x-only public key
pub type XOnlyPublicKey = [u8; 32];

/// SEC1 compressed point bytes
pub type CompressedPoint = [u8; 33];

/// Zero-based position of a signer within a fixed participant list
pub type SignerIndex = usize;

/// Private key scalar, guaranteed to lie in `[1, n-1]`.
///
/// Construction is the only place range checks happen; everything
/// downstream can rely on the scalar being a valid private key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    #[zeroize(skip)]
    scalar: Scalar,
}

impl SecretKey {
    /// Wrap an existing scalar, rejecting zero.
    pub fn from_scalar(scalar: Scalar) -> Result<Self> {
        if bool::from(scalar.is_zero()) {
            return Err(Error::OutOfRange { name: "privateKey" });
        }
        Ok(Self { scalar })
    }

    /// Parse from 32 big-endian bytes, rejecting zero and values >= n.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let scalar = curve::private_scalar_from_bytes("privateKey", bytes)?;
        Ok(Self { scalar })
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let decoded = hex::decode(hex_str)
            .map_err(|e| Error::Validation(format!("privateKey is not valid hex: {e}")))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| Error::bad_length("privateKey", None, 32))?;
        Self::from_bytes(&bytes)
    }

    /// Serialize as 32 big-endian bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        curve::scalar_to_bytes(&self.scalar)
    }

    pub(crate) fn scalar(&self) -> &Scalar {
        &self.scalar
    }

    /// The point `d*G`.
    pub fn public_point(&self) -> ProjectivePoint {
        ProjectivePoint::GENERATOR * self.scalar
    }

    /// BIP340 x-only public key of this key.
    pub fn public_key(&self) -> XOnlyPublicKey {
        // d*G with d in [1, n-1] is never the identity
        curve::x_only(&self.public_point()).unwrap_or([0u8; 32])
    }

    /// Whether `d*G` has an even y coordinate.
    pub fn public_key_parity_even(&self) -> bool {
        curve::has_even_y(&self.public_point())
    }

    /// SEC1 compressed encoding of `d*G`.
    pub fn public_key_compressed(&self) -> CompressedPoint {
        curve::point_to_compressed(&self.public_point()).unwrap_or([0u8; 33])
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// BIP340 signature (r, s)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// X coordinate of the nonce point
    pub r: [u8; 32],
    /// Scalar response
    pub s: [u8; 32],
}

impl Signature {
    /// Convert to bytes (r || s)
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..].copy_from_slice(&self.s);
        bytes
    }

    /// Parse from a 64-byte slice. Range checks on r and s happen at
    /// verification time, matching wire-format parsing being shape-only.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 64 {
            return Err(Error::bad_length("signature", None, 64));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(Self { r, s })
    }

    /// Hex encoding of `to_bytes`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse from a 128-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let decoded = hex::decode(hex_str)
            .map_err(|e| Error::Validation(format!("signature is not valid hex: {e}")))?;
        Self::from_bytes(&decoded)
    }
}

//! MuSig key aggregation
//!
//! Combines a fixed, ordered list of x-only public keys into one
//! aggregate key. Each key is weighted by a coefficient derived from
//! the hash of the whole key list, which blocks rogue-key attacks: no
//! participant can choose a key that cancels the others out of the
//! aggregate.

use k256::{elliptic_curve::Group, ProjectivePoint, Scalar};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::curve;
use crate::error::{Error, Result};
use crate::hashes::{self, MUSIG_COEFFICIENT_TAG};
use crate::types::{Message, SecretKey, Signature, XOnlyPublicKey};

/// Aggregate public key together with the y parity of the underlying
/// point, which sessions need for sign corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedPublicKey {
    /// X coordinate of the combined point
    pub x: XOnlyPublicKey,
    /// Whether the combined point has even y
    pub parity_even: bool,
}

impl CombinedPublicKey {
    pub(crate) fn from_point(point: &ProjectivePoint) -> Result<Self> {
        Ok(Self {
            x: curve::x_only(point)?,
            parity_even: curve::has_even_y(point),
        })
    }
}

/// Hash of the ordered public key list, input to every coefficient.
pub fn compute_ell(pub_keys: &[XOnlyPublicKey]) -> Result<[u8; 32]> {
    if pub_keys.is_empty() {
        return Err(Error::empty("pubKeys"));
    }
    let parts: Vec<&[u8]> = pub_keys.iter().map(|pk| pk.as_slice()).collect();
    Ok(hashes::sha256(&parts))
}

/// Per-signer weighting coefficient, bound to the key list through `ell`.
pub fn compute_coefficient(ell: &[u8; 32], idx: usize) -> Scalar {
    let idx_bytes = (idx as u32).to_le_bytes();
    curve::scalar_reduce(&hashes::tagged_hash(MUSIG_COEFFICIENT_TAG, &[ell, &idx_bytes]))
}

/// Combine public keys into the aggregate `sum(a_i * P_i)`.
///
/// Pass `ell` when it has already been computed for the same list;
/// `None` recomputes it. Duplicate keys are rejected since a repeated
/// key breaks the coefficient binding.
#[instrument(skip_all, fields(count = pub_keys.len()))]
pub fn pub_key_combine(
    pub_keys: &[XOnlyPublicKey],
    ell: Option<&[u8; 32]>,
) -> Result<CombinedPublicKey> {
    for (i, pk) in pub_keys.iter().enumerate() {
        if pub_keys[..i].contains(pk) {
            return Err(Error::Validation("pubKeys must not contain duplicates".into()));
        }
    }
    let ell = match ell {
        Some(ell) => *ell,
        None => compute_ell(pub_keys)?,
    };
    let mut combined = ProjectivePoint::IDENTITY;
    for (i, pk) in pub_keys.iter().enumerate() {
        combined += curve::lift_x(pk)? * compute_coefficient(&ell, i);
    }
    if bool::from(combined.is_identity()) {
        return Err(Error::PointAtInfinity);
    }
    CombinedPublicKey::from_point(&combined)
}

/// One-shot aggregate signature from all secret keys in one place.
///
/// This is the legacy derivation kept for compatibility with recorded
/// signatures: untagged `SHA256(d || m)` nonces, `ell` over 33-byte
/// compressed keys, an untagged challenge over the compressed combined
/// key, and nonce correction by the quadratic residuosity of the
/// combined nonce's y rather than its parity. The output does not
/// verify under [`crate::schnorr::verify`]; it satisfies
/// `s*G == R + e*X` with R recovered as the even-or-flipped lift
/// matching the residuosity rule.
#[instrument(skip_all, fields(count = secret_keys.len()))]
pub fn non_interactive(secret_keys: &[SecretKey], message: &Message) -> Result<Signature> {
    if secret_keys.is_empty() {
        return Err(Error::empty("privateKeys"));
    }

    let mut nonces = Vec::with_capacity(secret_keys.len());
    let mut points = Vec::with_capacity(secret_keys.len());
    let mut r_sum = ProjectivePoint::IDENTITY;
    for key in secret_keys {
        let k = curve::scalar_reduce(&hashes::sha256(&[&key.to_bytes(), message]));
        if bool::from(k.is_zero()) {
            return Err(Error::NonceZero);
        }
        r_sum += ProjectivePoint::GENERATOR * k;
        points.push(key.public_point());
        nonces.push(k);
    }

    let mut compressed = Vec::with_capacity(points.len());
    for point in &points {
        compressed.push(curve::point_to_compressed(point)?);
    }
    for (i, pk) in compressed.iter().enumerate() {
        if compressed[..i].contains(pk) {
            return Err(Error::Validation("pubKeys must not contain duplicates".into()));
        }
    }
    let parts: Vec<&[u8]> = compressed.iter().map(|pk| pk.as_slice()).collect();
    let ell = hashes::sha256(&parts);

    let mut combined = ProjectivePoint::IDENTITY;
    let mut coefficients = Vec::with_capacity(points.len());
    for (i, point) in points.iter().enumerate() {
        let coefficient = compute_coefficient(&ell, i);
        combined += *point * coefficient;
        coefficients.push(coefficient);
    }
    if bool::from(combined.is_identity()) || bool::from(r_sum.is_identity()) {
        return Err(Error::PointAtInfinity);
    }

    let rx = curve::x_only(&r_sum)?;
    let e = curve::scalar_reduce(&hashes::sha256(&[
        &rx,
        &curve::point_to_compressed(&combined)?,
        message,
    ]));
    let nonce_is_residue = curve::y_is_quadratic_residue(&r_sum)?;

    let mut s = Scalar::ZERO;
    for ((k, coefficient), key) in nonces.iter().zip(&coefficients).zip(secret_keys) {
        let k = if nonce_is_residue { *k } else { -*k };
        s += k + e * coefficient * key.scalar();
    }
    Ok(Signature {
        r: rx,
        s: curve::scalar_to_bytes(&s),
    })
}

//! secp256k1 point and scalar helpers on top of `k256`
//!
//! All byte-level codecs live here: strict scalar decoding (reject >= n),
//! reducing decoding (mod n), BIP340 x-only lifting, SEC1 compressed
//! encoding, and the field-size range check applied to signature r values.

use k256::{
    elliptic_curve::{
        bigint::{
            modular::runtime_mod::{DynResidue, DynResidueParams},
            U256,
        },
        ops::Reduce,
        point::DecompressPoint,
        sec1::{FromEncodedPoint, ToEncodedPoint},
        PrimeField,
    },
    AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar,
};
use rand_core::RngCore;
use subtle::Choice;

use crate::error::{Error, Result};

/// secp256k1 field size p, big-endian
pub(crate) const FIELD_SIZE: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, 0xff, 0xff,
    0xfc, 0x2f,
];

const FIELD_MODULUS: U256 =
    U256::from_be_hex("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F");

/// (p - 1) / 2, the Euler-criterion exponent
const FIELD_EULER_EXP: U256 =
    U256::from_be_hex("7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF7FFFFE17");

/// Iteration cap for rejection-sampling loops
pub(crate) const MAX_SAMPLING_ITERATIONS: usize = 256;

/// Strict decode of 32 big-endian bytes into a scalar, rejecting zero
/// and values >= n.
pub fn private_scalar_from_bytes(name: &'static str, bytes: &[u8; 32]) -> Result<Scalar> {
    let scalar = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(*bytes)))
        .ok_or(Error::OutOfRange { name })?;
    if bool::from(scalar.is_zero()) {
        return Err(Error::OutOfRange { name });
    }
    Ok(scalar)
}

/// Strict decode of a signature s component: zero is allowed, values
/// >= n are not.
pub fn signature_scalar(bytes: &[u8; 32]) -> Result<Scalar> {
    Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(*bytes)))
        .ok_or(Error::SignatureSOutOfRange)
}

/// Reduce 32 big-endian bytes mod n.
pub fn scalar_reduce(bytes: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&(*bytes).into())
}

/// Serialize a scalar as 32 big-endian bytes.
pub fn scalar_to_bytes(scalar: &Scalar) -> [u8; 32] {
    scalar.to_bytes().into()
}

/// Lift an x-only public key to the curve point with even y.
///
/// Fails with `PointNotOnCurve` when x >= p or x has no curve point.
pub fn lift_x(x: &[u8; 32]) -> Result<ProjectivePoint> {
    let affine =
        Option::<AffinePoint>::from(AffinePoint::decompress(&FieldBytes::from(*x), Choice::from(0)))
            .ok_or(Error::PointNotOnCurve)?;
    Ok(ProjectivePoint::from(affine))
}

/// X coordinate of a point; the identity has none.
pub fn x_only(point: &ProjectivePoint) -> Result<[u8; 32]> {
    let encoded = point.to_affine().to_encoded_point(true);
    let x = encoded.x().ok_or(Error::PointAtInfinity)?;
    Ok((*x).into())
}

/// Whether a non-identity point has an even y coordinate.
pub fn has_even_y(point: &ProjectivePoint) -> bool {
    point.to_affine().to_encoded_point(true).as_bytes()[0] == 0x02
}

/// SEC1 compressed encoding. Fails on the identity.
pub fn point_to_compressed(point: &ProjectivePoint) -> Result<[u8; 33]> {
    let encoded = point.to_affine().to_encoded_point(true);
    encoded
        .as_bytes()
        .try_into()
        .map_err(|_| Error::PointAtInfinity)
}

/// Parse a SEC1 compressed point.
pub fn point_from_compressed(name: &str, bytes: &[u8; 33]) -> Result<ProjectivePoint> {
    let encoded = EncodedPoint::from_bytes(bytes)
        .map_err(|_| Error::Validation(format!("{name} is not a valid compressed point")))?;
    let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or(Error::PointNotOnCurve)?;
    Ok(ProjectivePoint::from(affine))
}

/// Check that 32 big-endian bytes encode a valid field element,
/// as required of the r component of a signature.
pub fn check_signature_r(r: &[u8; 32]) -> Result<()> {
    if r.as_slice() >= FIELD_SIZE.as_slice() {
        return Err(Error::SignatureROutOfRange);
    }
    Ok(())
}

/// Euler criterion on the y coordinate: true when y is a quadratic
/// residue mod p. Used by the legacy non-interactive aggregate, which
/// predates the even-y nonce convention.
pub(crate) fn y_is_quadratic_residue(point: &ProjectivePoint) -> Result<bool> {
    let affine = point.to_affine();
    let encoded = affine.to_encoded_point(false);
    let y = encoded.y().ok_or(Error::PointAtInfinity)?;
    let params = DynResidueParams::new(&FIELD_MODULUS);
    let base = DynResidue::new(&U256::from_be_slice(y), params);
    Ok(base.pow(&FIELD_EULER_EXP).retrieve() == U256::ONE)
}

/// Uniform scalar in [1, n-1] by rejection sampling.
pub(crate) fn random_scalar(rng: &mut impl RngCore) -> Result<Scalar> {
    let mut bytes = [0u8; 32];
    for _ in 0..MAX_SAMPLING_ITERATIONS {
        rng.fill_bytes(&mut bytes);
        if let Ok(scalar) = private_scalar_from_bytes("randomScalar", &bytes) {
            return Ok(scalar);
        }
    }
    Err(Error::Internal(
        "rejection sampling exceeded its iteration cap".into(),
    ))
}

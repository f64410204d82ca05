//! Single-key BIP340 signing, verification and batch verification

use k256::{elliptic_curve::Group, ProjectivePoint, Scalar};
use rand::rngs::OsRng;
use tracing::{debug, instrument};

use crate::curve;
use crate::error::{Error, Result};
use crate::hashes::{self, AUX_TAG, CHALLENGE_TAG, NONCE_TAG};
use crate::types::{Message, SecretKey, Signature, XOnlyPublicKey};

/// Challenge scalar `e = H_tag(challenge, r || p || m) mod n`.
pub(crate) fn challenge(rx: &[u8; 32], px: &[u8; 32], message: &Message) -> Scalar {
    curve::scalar_reduce(&hashes::tagged_hash(CHALLENGE_TAG, &[rx, px, message]))
}

/// The scalar whose point has even y: `s` if `point` does, `-s` otherwise.
pub(crate) fn even_scalar(point: &ProjectivePoint, scalar: &Scalar) -> Scalar {
    if curve::has_even_y(point) {
        *scalar
    } else {
        -*scalar
    }
}

/// Sign a 32-byte message.
///
/// Nonce derivation is deterministic from the key and message; `aux`
/// mixes 32 bytes of auxiliary randomness into the secret key by XOR
/// before the nonce hash, leaving the signature valid under the same
/// public key.
#[instrument(skip(secret_key, aux))]
pub fn sign(secret_key: &SecretKey, message: &Message, aux: Option<&[u8; 32]>) -> Result<Signature> {
    let point = secret_key.public_point();
    let px = curve::x_only(&point)?;
    let d = even_scalar(&point, secret_key.scalar());
    let d_bytes = curve::scalar_to_bytes(&d);

    let nonce_hash = match aux {
        Some(aux) => {
            let mask = hashes::tagged_hash(AUX_TAG, &[aux]);
            let mut masked = d_bytes;
            for (byte, m) in masked.iter_mut().zip(mask.iter()) {
                *byte ^= m;
            }
            hashes::tagged_hash(NONCE_TAG, &[&masked, &px, message])
        }
        None => hashes::tagged_hash(NONCE_TAG, &[&d_bytes, &px, message]),
    };
    let k_prime = curve::scalar_reduce(&nonce_hash);
    if bool::from(k_prime.is_zero()) {
        return Err(Error::NonceZero);
    }

    let r_point = ProjectivePoint::GENERATOR * k_prime;
    let k = even_scalar(&r_point, &k_prime);
    let rx = curve::x_only(&r_point)?;
    let e = challenge(&rx, &px, message);
    let s = k + e * d;
    debug!("produced signature");
    Ok(Signature {
        r: rx,
        s: curve::scalar_to_bytes(&s),
    })
}

/// Verify a signature against an x-only public key.
#[instrument(skip_all)]
pub fn verify(pub_key: &XOnlyPublicKey, message: &Message, signature: &Signature) -> Result<()> {
    curve::check_signature_r(&signature.r)?;
    let s = curve::signature_scalar(&signature.s)?;
    let p = curve::lift_x(pub_key)?;
    let e = challenge(&signature.r, pub_key, message);
    let r_point = ProjectivePoint::GENERATOR * s - p * e;
    if bool::from(r_point.is_identity())
        || !curve::has_even_y(&r_point)
        || curve::x_only(&r_point)? != signature.r
    {
        return Err(Error::VerificationFailed);
    }
    Ok(())
}

/// Verify a batch of signatures in one combined equation.
///
/// Each triple after the first is weighted by a fresh uniform scalar,
/// so a forged member makes the combined check fail except with
/// negligible probability. Accepts exactly when every triple would pass
/// `verify` individually.
#[instrument(skip_all, fields(count = pub_keys.len()))]
pub fn batch_verify(
    pub_keys: &[XOnlyPublicKey],
    messages: &[Message],
    signatures: &[Signature],
) -> Result<()> {
    if pub_keys.is_empty() {
        return Err(Error::empty("pubKeys"));
    }
    if pub_keys.len() != messages.len() || messages.len() != signatures.len() {
        return Err(Error::Validation(
            "pubKeys, messages and signatures must all have the same length".into(),
        ));
    }

    let mut rng = OsRng;
    let mut left = Scalar::ZERO;
    let mut right = ProjectivePoint::IDENTITY;
    for (i, ((pub_key, message), signature)) in
        pub_keys.iter().zip(messages).zip(signatures).enumerate()
    {
        curve::check_signature_r(&signature.r)?;
        let s = curve::signature_scalar(&signature.s)?;
        let p = curve::lift_x(pub_key)?;
        let r_point = curve::lift_x(&signature.r)?;
        let e = challenge(&signature.r, pub_key, message);
        let coefficient = if i == 0 {
            Scalar::ONE
        } else {
            curve::random_scalar(&mut rng)?
        };
        left += coefficient * s;
        right += r_point * coefficient + p * (coefficient * e);
    }
    if ProjectivePoint::GENERATOR * left != right {
        return Err(Error::VerificationFailed);
    }
    Ok(())
}

/// Sum keys and deterministic nonces into one aggregate signature.
///
/// Requires every participant's secret key in one place, so it only
/// serves as a baseline against the MuSig session flow. The plain key
/// sum is open to rogue-key cancellation; MuSig's coefficients exist to
/// close exactly that hole.
#[instrument(skip_all, fields(count = secret_keys.len()))]
pub fn naive_key_aggregation(
    secret_keys: &[SecretKey],
    message: &Message,
) -> Result<(XOnlyPublicKey, Signature)> {
    if secret_keys.is_empty() {
        return Err(Error::empty("privateKeys"));
    }

    let mut nonces = Vec::with_capacity(secret_keys.len());
    let mut r_sum = ProjectivePoint::IDENTITY;
    let mut p_sum = ProjectivePoint::IDENTITY;
    for key in secret_keys {
        let point = key.public_point();
        let px = curve::x_only(&point)?;
        let d = even_scalar(&point, key.scalar());
        let nonce_hash =
            hashes::tagged_hash(NONCE_TAG, &[&curve::scalar_to_bytes(&d), &px, message]);
        let k = curve::scalar_reduce(&nonce_hash);
        if bool::from(k.is_zero()) {
            return Err(Error::NonceZero);
        }
        r_sum += ProjectivePoint::GENERATOR * k;
        p_sum += curve::lift_x(&px)?;
        nonces.push(k);
    }
    if bool::from(r_sum.is_identity()) || bool::from(p_sum.is_identity()) {
        return Err(Error::PointAtInfinity);
    }

    let px = curve::x_only(&p_sum)?;
    let rx = curve::x_only(&r_sum)?;
    let e = challenge(&rx, &px, message);

    let mut d_sum = Scalar::ZERO;
    for key in secret_keys {
        d_sum += even_scalar(&key.public_point(), key.scalar());
    }
    let d_sum = even_scalar(&p_sum, &d_sum);

    let mut k_sum = Scalar::ZERO;
    for k in &nonces {
        k_sum += even_scalar(&r_sum, k);
    }

    let s = k_sum + e * d_sum;
    Ok((
        px,
        Signature {
            r: rx,
            s: curve::scalar_to_bytes(&s),
        },
    ))
}

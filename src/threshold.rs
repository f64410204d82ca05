//! Shamir key splitting, Feldman verification and threshold signing
//!
//! A private key is split into `n` shards of which any `k` reconstruct
//! it (or sign with it) via Lagrange interpolation at zero. Shard `i`
//! is the polynomial evaluated at `i + 1`. The polynomial coefficients
//! come deterministically from the scalar PRF, so the same key and
//! parameters always produce the same shards. Public Feldman
//! commitments let every shard holder check their shard without seeing
//! the polynomial.

use k256::{elliptic_curve::Group, ProjectivePoint, Scalar};
use tracing::{debug, instrument};

use crate::curve;
use crate::error::{Error, Result};
use crate::hashes;
use crate::musig::keyagg::CombinedPublicKey;
use crate::musig::session::{Session, SignerWeights};
use crate::scalar_chacha;
use crate::types::{CompressedPoint, Message, SecretKey, SessionId, SignerIndex};

/// Output of [`key_split`]: one secret shard per holder plus the
/// public commitments to the polynomial coefficients. Slot `j` of
/// `pub_coefficients` commits to the degree-`j` coefficient, so slot 0
/// is the commitment to the key itself.
pub struct KeySplit {
    pub shards: Vec<SecretKey>,
    pub pub_coefficients: Vec<CompressedPoint>,
}

/// Deterministic polynomial coefficients above the constant term,
/// drawn pairwise from the scalar PRF.
fn polynomial_coefficients(secret_key: &SecretKey, threshold: usize, num_shards: usize) -> Result<Vec<Scalar>> {
    let mut params = [0u8; 16];
    params[..8].copy_from_slice(&(threshold as u64).to_le_bytes());
    params[8..].copy_from_slice(&(num_shards as u64).to_le_bytes());
    let seed = hashes::sha256(&[&secret_key.to_bytes(), &params]);

    let mut coefficients = Vec::with_capacity(threshold - 1);
    let mut pair = None;
    for j in 0..threshold - 1 {
        if j % 2 == 0 {
            pair = Some(scalar_chacha::seed_to_scalar_pair(&seed, j as u32)?);
        }
        // pair is always set here; j odd reuses the previous iteration's
        let (first, second) = pair.ok_or_else(|| Error::Internal("coefficient pair missing".into()))?;
        coefficients.push(if j % 2 == 0 { first } else { second });
    }
    Ok(coefficients)
}

/// Split a private key into `num_shards` shards with reconstruction
/// threshold `threshold`.
#[instrument(skip(secret_key))]
pub fn key_split(
    secret_key: &SecretKey,
    threshold: usize,
    num_shards: usize,
) -> Result<KeySplit> {
    if threshold < 1 || threshold > num_shards {
        return Err(Error::Validation(
            "threshold must be between 1 and numShards".into(),
        ));
    }

    let coefficients = polynomial_coefficients(secret_key, threshold, num_shards)?;

    // shard i evaluates the polynomial at i+1 by Horner's rule; the
    // coefficient pushed first ends up with the highest degree
    let mut shards = Vec::with_capacity(num_shards);
    for i in 0..num_shards {
        let at = Scalar::from((i + 1) as u64);
        let mut shard = Scalar::ZERO;
        for coefficient in &coefficients {
            shard = (shard + coefficient) * at;
        }
        shards.push(SecretKey::from_scalar(shard + secret_key.scalar())?);
    }

    let mut pub_coefficients = vec![[0u8; 33]; threshold];
    pub_coefficients[0] = curve::point_to_compressed(&secret_key.public_point())?;
    for (j, coefficient) in coefficients.iter().enumerate() {
        pub_coefficients[threshold - 1 - j] =
            curve::point_to_compressed(&(ProjectivePoint::GENERATOR * coefficient))?;
    }
    debug!(num_shards, threshold, "key split");
    Ok(KeySplit {
        shards,
        pub_coefficients,
    })
}

/// Lagrange coefficient at zero for signer `coefficient_index` within
/// the subset `signer_indices[..num_signers]`. Indices are zero-based;
/// the evaluation points are the indices plus one.
pub fn lagrange_coefficient(
    signer_indices: &[SignerIndex],
    num_signers: usize,
    coefficient_index: SignerIndex,
) -> Result<Scalar> {
    if signer_indices.len() < num_signers {
        return Err(Error::Validation(
            "signerIndices must contain at least numSigners elements".into(),
        ));
    }
    let own_point = Scalar::from((coefficient_index + 1) as u64);
    let mut numerator = Scalar::ONE;
    let mut denominator = Scalar::ONE;
    for &index in &signer_indices[..num_signers] {
        if index == coefficient_index {
            continue;
        }
        let term = -Scalar::from((index + 1) as u64);
        numerator *= term;
        denominator *= term + own_point;
    }
    let inverse = Option::<Scalar>::from(denominator.invert())
        .ok_or_else(|| Error::Validation("signerIndices must be distinct".into()))?;
    Ok(numerator * inverse)
}

/// Feldman check: the shard times G must equal the public polynomial
/// evaluated at `own_index + 1` in the exponent.
#[instrument(skip(shard, pub_coefficients))]
pub fn verify_shard(
    shard: &SecretKey,
    own_index: SignerIndex,
    pub_coefficients: &[CompressedPoint],
) -> Result<()> {
    if pub_coefficients.is_empty() {
        return Err(Error::empty("pubCoefficients"));
    }
    let at = Scalar::from((own_index + 1) as u64);
    let mut expected = ProjectivePoint::IDENTITY;
    let mut power = Scalar::ONE;
    for commitment in pub_coefficients {
        expected += curve::point_from_compressed("pubCoefficient", commitment)? * power;
        power *= at;
    }
    if ProjectivePoint::GENERATOR * shard.scalar() != expected {
        return Err(Error::ShardInvalid { index: own_index });
    }
    Ok(())
}

/// Public key of the shard at `index`, recovered from the Feldman
/// commitments. Lets verifiers check partial signatures without any
/// shard material.
pub fn shard_public_key(
    pub_coefficients: &[CompressedPoint],
    index: SignerIndex,
) -> Result<CompressedPoint> {
    if pub_coefficients.is_empty() {
        return Err(Error::empty("pubCoefficients"));
    }
    let at = Scalar::from((index + 1) as u64);
    let mut point = ProjectivePoint::IDENTITY;
    let mut power = Scalar::ONE;
    for commitment in pub_coefficients {
        point += curve::point_from_compressed("pubCoefficient", commitment)? * power;
        power *= at;
    }
    if bool::from(point.is_identity()) {
        return Err(Error::PointAtInfinity);
    }
    curve::point_to_compressed(&point)
}

/// Start a threshold signing session for the shard holder at `idx`.
///
/// `signer_indices` is the participating subset, `num_signers` the
/// threshold, and `combined_key` the public key of the original
/// unsplit key. The returned session runs the same rounds as a MuSig
/// session; partial verification takes co-signer keys from
/// [`shard_public_key`] as [`crate::musig::CoSignerKey::Compressed`].
#[instrument(skip(session_id, shard, message, combined_key, signer_indices))]
pub fn session_initialize(
    session_id: SessionId,
    shard: &SecretKey,
    message: Message,
    combined_key: CombinedPublicKey,
    signer_indices: &[SignerIndex],
    num_signers: usize,
    idx: SignerIndex,
) -> Result<Session> {
    if !signer_indices.contains(&idx) {
        return Err(Error::Validation(
            "signerIndices must contain the signer's own index".into(),
        ));
    }
    Session::new(
        session_id,
        shard,
        message,
        combined_key,
        SignerWeights::Threshold {
            signer_indices: signer_indices.to_vec(),
            num_signers,
        },
        idx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::musig::{partial_sig_combine, CoSignerKey};
    use crate::schnorr::verify;
    use crate::testutil::{hex32, hex33, key, message, D1, D2};

    fn split_d1() -> KeySplit {
        key_split(&key(D1), 2, 3).unwrap()
    }

    #[test]
    fn split_matches_vectors() {
        let split = split_d1();
        let expected_shards = [
            "d1da54229709a32725d56b2e920860c43387822bfc04d4a8626f1631802b6d01",
            "ebd356e2a3261be38c397ddc871bcdc10427ee48bf54cefa1d59535eaec60a13",
            "05cc59a2af42949ff29d908a7c2f3abf1a197d7ed35c2910187131ff0d2a65e4",
        ];
        for (shard, expected) in split.shards.iter().zip(expected_shards) {
            assert_eq!(shard.to_bytes(), hex32(expected));
        }
        assert_eq!(
            split.pub_coefficients,
            vec![
                hex33("02dff1d77f2a671c5f36183726db2341be58feae1da2deced843240f7b502ba659"),
                hex33("027445d8df2231b5e5eb3c9db9bc60ba524552fbfdacdc779e92220cde0d0f44b6"),
            ]
        );
    }

    #[test]
    fn split_three_of_five_matches_vectors() {
        // threshold 3 exercises the odd coefficient drawn from a held pair
        let split = key_split(&key(D2), 3, 5).unwrap();
        let expected_shards = [
            "ee3b29571597adb5dd22d3c43cad9f2fceb165418b65826b98c71a65995e4269",
            "44ae345640f2804f58f3b0e0f22b55cbcc1581c64c8135abfd58ed2aca06035a",
            "cc68fb9fa3793a013838f9e1a15540a2968c5d642c4c26acaf65f40f6d78ab1c",
            "856b7f333d2bdacb7af2aec64a2b5fb6b8b83e4dcc3514f62f4971f9e349b72d",
            "6fb5bf110e0a62ae2120cf8eecadb306ed480169db84a0c43cd5c576fbaf68ce",
        ];
        for (shard, expected) in split.shards.iter().zip(expected_shards) {
            assert_eq!(shard.to_bytes(), hex32(expected));
        }
        assert_eq!(
            split.pub_coefficients,
            vec![
                hex33("03fac2114c2fbb091527eb7c64ecb11f8021cb45e8e7809d3c0938e4b8c0e5f84b"),
                hex33("033735ab747d33406782ef031cd2fde3e88aba4308bbc8ef99b4252f39fd5fa50f"),
                hex33("037408947aa08b34264779170396820c0ecabe6cfa26eb06b55b1e2c7a3f03df91"),
            ]
        );
    }

    #[test]
    fn split_validates_parameters() {
        assert!(matches!(
            key_split(&key(D1), 0, 3),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            key_split(&key(D1), 4, 3),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn every_shard_passes_feldman_check() {
        let split = key_split(&key(D2), 3, 5).unwrap();
        for (i, shard) in split.shards.iter().enumerate() {
            verify_shard(shard, i, &split.pub_coefficients).unwrap();
        }
    }

    #[test]
    fn feldman_check_rejects_wrong_index_and_tampering() {
        let split = split_d1();
        assert_eq!(
            verify_shard(&split.shards[0], 1, &split.pub_coefficients),
            Err(Error::ShardInvalid { index: 1 })
        );
        let mut bytes = split.shards[0].to_bytes();
        bytes[31] ^= 1;
        let tampered = SecretKey::from_bytes(&bytes).unwrap();
        assert_eq!(
            verify_shard(&tampered, 0, &split.pub_coefficients),
            Err(Error::ShardInvalid { index: 0 })
        );
    }

    #[test]
    fn shard_public_key_matches_shards() {
        let split = key_split(&key(D2), 3, 5).unwrap();
        for (i, shard) in split.shards.iter().enumerate() {
            assert_eq!(
                shard_public_key(&split.pub_coefficients, i).unwrap(),
                shard.public_key_compressed()
            );
        }
    }

    #[test]
    fn lagrange_matches_vectors() {
        assert_eq!(
            curve::scalar_to_bytes(&lagrange_coefficient(&[0, 2], 2, 0).unwrap()),
            hex32("7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a2")
        );
        assert_eq!(
            curve::scalar_to_bytes(&lagrange_coefficient(&[0, 2], 2, 2).unwrap()),
            hex32("7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0")
        );
        assert_eq!(
            curve::scalar_to_bytes(&lagrange_coefficient(&[1, 3, 4], 3, 3).unwrap()),
            hex32("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd036413c")
        );
    }

    #[test]
    fn lagrange_validates_subset_size() {
        assert!(matches!(
            lagrange_coefficient(&[0], 2, 0),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn any_threshold_subset_reconstructs_the_key() {
        let split = split_d1();
        for subset in [[0usize, 1], [0, 2], [1, 2]] {
            let mut reconstructed = Scalar::ZERO;
            for &i in &subset {
                reconstructed +=
                    lagrange_coefficient(&subset, 2, i).unwrap() * split.shards[i].scalar();
            }
            assert_eq!(reconstructed, *key(D1).scalar());
        }
    }

    #[test]
    fn three_of_five_subset_reconstructs_the_key() {
        let split = key_split(&key(D2), 3, 5).unwrap();
        let subset = [1usize, 3, 4];
        let mut reconstructed = Scalar::ZERO;
        for &i in &subset {
            reconstructed +=
                lagrange_coefficient(&subset, 3, i).unwrap() * split.shards[i].scalar();
        }
        assert_eq!(reconstructed, *key(D2).scalar());
    }

    #[test]
    fn two_of_three_signing_ceremony() {
        let owner = key(D1);
        let split = key_split(&owner, 2, 3).unwrap();
        let combined_key = CombinedPublicKey {
            x: owner.public_key(),
            parity_even: owner.public_key_parity_even(),
        };
        let signer_indices = [0usize, 2];

        let mut sessions: Vec<_> = signer_indices
            .iter()
            .map(|&i| {
                session_initialize(
                    [i as u8 + 1; 32],
                    &split.shards[i],
                    message(),
                    combined_key,
                    &signer_indices,
                    2,
                    i,
                )
                .unwrap()
            })
            .collect();

        let nonces: Vec<_> = sessions.iter().map(|s| *s.nonce()).collect();
        let mut combined_nonce = [0u8; 32];
        for session in sessions.iter_mut() {
            combined_nonce = session.combine_nonces(&nonces).unwrap();
        }
        let partial_sigs: Vec<_> = sessions
            .iter_mut()
            .map(|s| s.partial_sign(&combined_nonce).unwrap())
            .collect();

        // cross-verify with shard keys recovered from the commitments
        for session in &sessions {
            for ((&i, partial_sig), nonce) in
                signer_indices.iter().zip(&partial_sigs).zip(&nonces)
            {
                let shard_key = shard_public_key(&split.pub_coefficients, i).unwrap();
                session
                    .partial_sig_verify(
                        partial_sig,
                        &combined_nonce,
                        i,
                        &CoSignerKey::Compressed(shard_key),
                        nonce,
                    )
                    .unwrap();
            }
        }

        let sig = partial_sig_combine(&combined_nonce, &partial_sigs).unwrap();
        assert_eq!(
            sig.to_hex(),
            "131051f2e63a8956bd5358425463856c2775cc68b016b75f948add65bcd59ef5\
             e4de69a27c7a21f10d2136e726f848e0ebce63f07874f41442376ac22bf6fe46"
        );
        verify(&owner.public_key(), &message(), &sig).unwrap();
    }

    #[test]
    fn session_requires_own_index_in_subset() {
        let owner = key(D1);
        let split = split_d1();
        let combined_key = CombinedPublicKey {
            x: owner.public_key(),
            parity_even: owner.public_key_parity_even(),
        };
        assert!(matches!(
            session_initialize(
                [1u8; 32],
                &split.shards[1],
                message(),
                combined_key,
                &[0, 2],
                2,
                1,
            ),
            Err(Error::Validation(_))
        ));
    }
}

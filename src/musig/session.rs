//! Interactive multi-signing sessions
//!
//! One `Session` holds a single signer's state across the three rounds
//! of a signing ceremony: commitment exchange, nonce exchange and
//! partial signature exchange. The same state machine drives both
//! MuSig ceremonies (coefficients from the key-list hash) and threshold
//! ceremonies (Lagrange coefficients over a signer subset); only the
//! weighting and the sign-correction rule differ.

use k256::{elliptic_curve::Group, ProjectivePoint, Scalar};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::curve;
use crate::error::{Error, Result};
use crate::hashes;
use crate::musig::keyagg::{self, CombinedPublicKey};
use crate::schnorr;
use crate::threshold;
use crate::types::{
    CompressedPoint, Message, SecretKey, SessionId, Signature, SignerIndex, XOnlyPublicKey,
};

/// A co-signer's partial signature scalar, exchanged in round three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialSignature(pub [u8; 32]);

/// A co-signer's public key as needed for partial verification.
///
/// MuSig co-signers are identified by x-only keys; threshold co-signers
/// by the compressed shard keys recovered from Feldman commitments,
/// since shard points carry no even-y convention.
#[derive(Debug, Clone, Copy)]
pub enum CoSignerKey {
    XOnly(XOnlyPublicKey),
    Compressed(CompressedPoint),
}

impl CoSignerKey {
    fn point(&self) -> Result<ProjectivePoint> {
        match self {
            CoSignerKey::XOnly(x) => curve::lift_x(x),
            CoSignerKey::Compressed(bytes) => curve::point_from_compressed("pubKey", bytes),
        }
    }
}

/// How a session weights its secret and corrects signs.
#[derive(Debug, Clone)]
pub(crate) enum SignerWeights {
    /// MuSig coefficient from the key-list hash; each signer corrects
    /// by its own key parity against the combined key's.
    MuSig { ell: [u8; 32] },
    /// Lagrange coefficient for a signer subset; shares are corrected
    /// uniformly by the combined key parity, since per-share parity is
    /// meaningless under Shamir splitting.
    Threshold {
        signer_indices: Vec<SignerIndex>,
        num_signers: usize,
    },
}

impl SignerWeights {
    fn coefficient(&self, idx: SignerIndex) -> Result<Scalar> {
        match self {
            SignerWeights::MuSig { ell } => Ok(keyagg::compute_coefficient(ell, idx)),
            SignerWeights::Threshold {
                signer_indices,
                num_signers,
            } => threshold::lagrange_coefficient(signer_indices, *num_signers, idx),
        }
    }

    fn uniform_negation(&self) -> bool {
        matches!(self, SignerWeights::Threshold { .. })
    }
}

/// Per-signer state for one signing ceremony.
///
/// Rounds must run in order: nonces are combined before partial
/// signatures are produced or verified. Out-of-order calls fail with
/// [`Error::Protocol`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Session {
    session_id: SessionId,
    message: Message,
    #[zeroize(skip)]
    combined_key: CombinedPublicKey,
    #[zeroize(skip)]
    weights: SignerWeights,
    idx: SignerIndex,
    #[zeroize(skip)]
    secret_key: Scalar,
    #[zeroize(skip)]
    secret_nonce: Scalar,
    nonce: XOnlyPublicKey,
    nonce_parity: bool,
    commitment: [u8; 32],
    combined_nonce_parity: Option<bool>,
    #[zeroize(skip)]
    partial_signature: Option<Scalar>,
}

/// Round-one commitment to a public nonce.
pub fn nonce_commitment(nonce: &XOnlyPublicKey) -> [u8; 32] {
    hashes::sha256(&[nonce])
}

impl Session {
    /// Start a MuSig session for signer `idx` of the key list hashed
    /// into `ell`.
    #[instrument(skip(session_id, secret_key, message, combined_key, ell))]
    pub fn initialize(
        session_id: SessionId,
        secret_key: &SecretKey,
        message: Message,
        combined_key: CombinedPublicKey,
        ell: &[u8; 32],
        idx: SignerIndex,
    ) -> Result<Self> {
        Self::new(
            session_id,
            secret_key,
            message,
            combined_key,
            SignerWeights::MuSig { ell: *ell },
            idx,
        )
    }

    pub(crate) fn new(
        session_id: SessionId,
        secret_key: &SecretKey,
        message: Message,
        combined_key: CombinedPublicKey,
        weights: SignerWeights,
        idx: SignerIndex,
    ) -> Result<Self> {
        let coefficient = weights.coefficient(idx)?;
        let mut weighted = *secret_key.scalar() * coefficient;
        let negate = if weights.uniform_negation() {
            !combined_key.parity_even
        } else {
            secret_key.public_key_parity_even() != combined_key.parity_even
        };
        if negate {
            weighted = -weighted;
        }

        // deterministic secret nonce bound to session, message and key
        let nonce_hash = hashes::sha256(&[
            &session_id,
            &message,
            &combined_key.x,
            &secret_key.to_bytes(),
        ]);
        let secret_nonce = curve::private_scalar_from_bytes("sessionNonce", &nonce_hash)
            .map_err(|_| Error::NonceOutOfRange)?;
        let nonce_point = ProjectivePoint::GENERATOR * secret_nonce;
        let nonce = curve::x_only(&nonce_point)?;
        debug!("session initialized");

        Ok(Self {
            session_id,
            message,
            combined_key,
            weights,
            idx,
            secret_key: weighted,
            secret_nonce,
            nonce,
            nonce_parity: curve::has_even_y(&nonce_point),
            commitment: nonce_commitment(&nonce),
            combined_nonce_parity: None,
            partial_signature: None,
        })
    }

    /// This signer's public nonce, exchanged in round two.
    pub fn nonce(&self) -> &XOnlyPublicKey {
        &self.nonce
    }

    /// Commitment to the nonce, exchanged in round one.
    pub fn commitment(&self) -> &[u8; 32] {
        &self.commitment
    }

    /// Check a co-signer's revealed nonce against its commitment.
    pub fn verify_commitment(nonce: &XOnlyPublicKey, commitment: &[u8; 32]) -> bool {
        nonce_commitment(nonce) == *commitment
    }

    pub fn signer_index(&self) -> SignerIndex {
        self.idx
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn combined_key(&self) -> &CombinedPublicKey {
        &self.combined_key
    }

    /// This signer's partial signature, once produced.
    pub fn partial_signature(&self) -> Option<PartialSignature> {
        self.partial_signature
            .map(|s| PartialSignature(curve::scalar_to_bytes(&s)))
    }

    /// Sum all exchanged nonces into the combined nonce point and
    /// record its parity for the signing round.
    #[instrument(skip_all, fields(count = nonces.len()))]
    pub fn combine_nonces(&mut self, nonces: &[XOnlyPublicKey]) -> Result<XOnlyPublicKey> {
        if nonces.is_empty() {
            return Err(Error::empty("nonces"));
        }
        let mut combined = ProjectivePoint::IDENTITY;
        for nonce in nonces {
            combined += curve::lift_x(nonce)?;
        }
        if bool::from(combined.is_identity()) {
            return Err(Error::PointAtInfinity);
        }
        self.combined_nonce_parity = Some(curve::has_even_y(&combined));
        curve::x_only(&combined)
    }

    /// Produce this signer's partial signature over the combined nonce.
    #[instrument(skip(self))]
    pub fn partial_sign(&mut self, combined_nonce: &XOnlyPublicKey) -> Result<PartialSignature> {
        let combined_parity = self.combined_nonce_parity.ok_or_else(|| {
            Error::Protocol("nonces must be combined before signing".into())
        })?;
        let e = schnorr::challenge(combined_nonce, &self.combined_key.x, &self.message);
        let k = if self.nonce_parity == combined_parity {
            self.secret_nonce
        } else {
            -self.secret_nonce
        };
        let s = self.secret_key * e + k;
        self.partial_signature = Some(s);
        Ok(PartialSignature(curve::scalar_to_bytes(&s)))
    }

    /// Verify co-signer `idx`'s partial signature against its public
    /// key and exchanged nonce.
    #[instrument(skip_all, fields(idx = idx))]
    pub fn partial_sig_verify(
        &self,
        partial_sig: &PartialSignature,
        combined_nonce: &XOnlyPublicKey,
        idx: SignerIndex,
        pub_key: &CoSignerKey,
        nonce: &XOnlyPublicKey,
    ) -> Result<()> {
        let combined_parity = self.combined_nonce_parity.ok_or_else(|| {
            Error::Protocol("nonces must be combined before verifying partial signatures".into())
        })?;
        let s = curve::signature_scalar(&partial_sig.0)?;
        let e = schnorr::challenge(combined_nonce, &self.combined_key.x, &self.message);
        let coefficient = self.weights.coefficient(idx)?;
        let nonce_point = curve::lift_x(nonce)?;

        let mut weighted_e = e * coefficient;
        if !self.combined_key.parity_even {
            weighted_e = -weighted_e;
        }
        let mut expected = pub_key.point()? * weighted_e;
        expected += if combined_parity {
            nonce_point
        } else {
            -nonce_point
        };
        if ProjectivePoint::GENERATOR * s != expected {
            return Err(Error::PartialSigInvalid);
        }
        Ok(())
    }
}

/// Sum partial signatures into the final signature over the combined
/// nonce. The result verifies under [`crate::schnorr::verify`] against
/// the combined key exactly when every partial signature is honest.
pub fn partial_sig_combine(
    combined_nonce: &XOnlyPublicKey,
    partial_sigs: &[PartialSignature],
) -> Result<Signature> {
    if partial_sigs.is_empty() {
        return Err(Error::empty("partialSigs"));
    }
    let mut s = Scalar::ZERO;
    for partial_sig in partial_sigs {
        s += curve::signature_scalar(&partial_sig.0)?;
    }
    Ok(Signature {
        r: *combined_nonce,
        s: curve::scalar_to_bytes(&s),
    })
}

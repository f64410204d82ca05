//! MuSig multi-signatures
//!
//! [`keyagg`] aggregates a fixed key list into one x-only key with
//! rogue-key-resistant coefficients; [`session`] runs the interactive
//! commitment / nonce / partial-signature rounds that produce an
//! ordinary BIP340 signature under the aggregate key.

pub mod keyagg;
pub mod session;

pub use keyagg::{
    compute_coefficient, compute_ell, non_interactive, pub_key_combine, CombinedPublicKey,
};
pub use session::{
    nonce_commitment, partial_sig_combine, CoSignerKey, PartialSignature, Session,
};

//! BIP340 Schnorr signatures over secp256k1, with multi-party and
//! threshold extensions.
//!
//! - [`schnorr`]: single-key signing, verification and batch
//!   verification with tagged hashes and x-only public keys
//! - [`musig`]: rogue-key-resistant key aggregation and interactive
//!   multi-signing sessions producing ordinary BIP340 signatures
//! - [`threshold`]: deterministic Shamir key splitting with Feldman
//!   commitments and k-of-n signing sessions
//! - [`taproot`]: output key construction from an internal key and an
//!   optional script tree commitment
//! - [`scalar_chacha`]: the deterministic scalar PRF behind key
//!   splitting
//!
//! All public keys are 32-byte x-only values lifted to even-y points;
//! all signatures are 64-byte (r, s) pairs.

pub mod curve;
pub mod error;
pub mod hashes;
pub mod musig;
pub mod scalar_chacha;
pub mod schnorr;
pub mod taproot;
pub mod threshold;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    CompressedPoint, Message, SecretKey, SessionId, Signature, SignerIndex, XOnlyPublicKey,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

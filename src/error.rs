//! Error types for all signing and aggregation operations

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by signing, verification and protocol operations.
///
/// Every variant is raised synchronously at the point of detection and
/// carries enough context (field name, optional array index) to localize
/// the fault without exposing secret material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Wrong shape of an input: bad length, empty list, mismatched
    /// parallel arrays, duplicate public keys, malformed hex.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Scalar outside the valid private range [1, n-1].
    #[error("{name} must be an integer in the range 1..n-1")]
    OutOfRange { name: &'static str },

    /// Signature r component is not a valid field element.
    #[error("r is larger than or equal to the field size")]
    SignatureROutOfRange,

    /// Signature s component is not a valid scalar.
    #[error("s is larger than or equal to the curve order")]
    SignatureSOutOfRange,

    /// An x coordinate has no square root on the curve.
    #[error("point is not on the curve")]
    PointNotOnCurve,

    /// A computed point degenerated to the identity.
    #[error("point is at infinity")]
    PointAtInfinity,

    /// Final or batch signature check failed.
    #[error("signature verification failed")]
    VerificationFailed,

    /// A co-signer's partial signature does not satisfy its point equation.
    #[error("partial signature verification failed")]
    PartialSigInvalid,

    /// Feldman commitment check of a secret shard failed.
    #[error("shard verification failed for index {index}")]
    ShardInvalid { index: usize },

    /// The derived signing nonce reduced to zero.
    #[error("derived nonce is zero")]
    NonceZero,

    /// A derived session nonce fell outside [1, n-1].
    #[error("secret nonce must be an integer in the range 1..n-1")]
    NonceOutOfRange,

    /// A session operation was invoked out of round order.
    #[error("protocol state error: {0}")]
    Protocol(String),

    /// Internal invariant failure, e.g. a rejection-sampling loop
    /// exceeding its iteration cap.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shape error for an element of a parallel array input.
    pub(crate) fn bad_length(name: &str, index: Option<usize>, expected: usize) -> Self {
        match index {
            Some(i) => Error::Validation(format!("{name}[{i}] must be {expected} bytes long")),
            None => Error::Validation(format!("{name} must be {expected} bytes long")),
        }
    }

    /// Shape error for an empty required list.
    pub(crate) fn empty(name: &str) -> Self {
        Error::Validation(format!("{name} must have one or more elements"))
    }
}

//! Taproot output key construction

use k256::{elliptic_curve::Group, ProjectivePoint};
use tracing::instrument;

use crate::curve;
use crate::error::{Error, Result};
use crate::hashes::{self, TAP_TWEAK_TAG};
use crate::types::{CompressedPoint, XOnlyPublicKey};

/// Tweak an internal key into the x-only output key
/// `Q = P + H_tag(TapTweak, P_x || merkle_root) * G`.
///
/// With no scripts, `merkle_root` is `None` and the tweak commits to
/// the bare internal key; the internal key is used x-only, so its
/// compressed parity byte does not influence the result.
#[instrument(skip_all)]
pub fn taproot_construct(
    internal_key: &CompressedPoint,
    merkle_root: Option<&[u8; 32]>,
) -> Result<XOnlyPublicKey> {
    let point = curve::point_from_compressed("pubKey", internal_key)?;
    let px = curve::x_only(&point)?;
    let commitment: &[u8] = merkle_root.map(|root| root.as_slice()).unwrap_or(&[]);
    let tweak = curve::scalar_reduce(&hashes::tagged_hash(TAP_TWEAK_TAG, &[&px, commitment]));
    let output = curve::lift_x(&px)? + ProjectivePoint::GENERATOR * tweak;
    if bool::from(output.is_identity()) {
        return Err(Error::PointAtInfinity);
    }
    curve::x_only(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{hex32, hex33};

    // BIP86 account 0 keys and their P2TR output keys
    #[test]
    fn bip86_derivation_vectors() {
        let cases = [
            (
                "03cc8a4bc64d897bddc5fbc2f670f7a8ba0b386779106cf1223c6fc5d7cd6fc115",
                "a60869f0dbcf1dc659c9cecbaf8050135ea9e8cdc487053f1dc6880949dc684c",
            ),
            (
                "0283dfe85a3151d2517290da461fe2815591ef69f2b18a2ce63f01697a8b313145",
                "a82f29944d65b86ae6b5e5cc75e294ead6c59391a1edc5e016e3498c67fc7bbb",
            ),
            (
                "02399f1b2f4393f29a18c937859c5dd8a77350103157eb880f02e8c08214277cef",
                "882d74e5d0572d5a816cef0041a96b6c1de832f6f9676d9605c44d5e9a97d3dc",
            ),
        ];
        for (internal, output) in cases {
            assert_eq!(
                taproot_construct(&hex33(internal), None).unwrap(),
                hex32(output)
            );
        }
    }

    #[test]
    fn parity_byte_does_not_change_output() {
        let mut internal =
            hex33("03cc8a4bc64d897bddc5fbc2f670f7a8ba0b386779106cf1223c6fc5d7cd6fc115");
        let even_parity = taproot_construct(&internal, None).unwrap();
        internal[0] = 0x02;
        assert_eq!(taproot_construct(&internal, None).unwrap(), even_parity);
    }

    #[test]
    fn merkle_root_changes_output() {
        let internal =
            hex33("03cc8a4bc64d897bddc5fbc2f670f7a8ba0b386779106cf1223c6fc5d7cd6fc115");
        let bare = taproot_construct(&internal, None).unwrap();
        let committed = taproot_construct(&internal, Some(&[0u8; 32])).unwrap();
        assert_ne!(bare, committed);
    }

    #[test]
    fn rejects_invalid_internal_key() {
        // x = 5 has no curve point
        let mut garbage = [0u8; 33];
        garbage[0] = 0x02;
        garbage[32] = 0x05;
        assert!(taproot_construct(&garbage, None).is_err());
    }
}

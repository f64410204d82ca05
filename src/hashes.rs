//! SHA-256 helpers and BIP340 tagged hashing

use sha2::{Digest, Sha256};

pub(crate) const AUX_TAG: &str = "BIP0340/aux";
pub(crate) const NONCE_TAG: &str = "BIP0340/nonce";
pub(crate) const CHALLENGE_TAG: &str = "BIP0340/challenge";
pub(crate) const MUSIG_COEFFICIENT_TAG: &str = "MuSig coefficient";
pub(crate) const TAP_TWEAK_TAG: &str = "TapTweak";

/// SHA-256 over the concatenation of `parts`.
pub fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// BIP340 tagged hash: `SHA256(SHA256(tag) || SHA256(tag) || data)`.
pub fn tagged_hash(tag: &str, parts: &[&[u8]]) -> [u8; 32] {
    let tag_hash = Sha256::digest(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(tag_hash);
    hasher.update(tag_hash);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_concatenates_parts() {
        assert_eq!(sha256(&[b"ab", b"c"]), sha256(&[b"abc"]));
        // SHA256("abc")
        assert_eq!(
            hex::encode(sha256(&[b"abc"])),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn tagged_hash_differs_per_tag() {
        let msg = [0u8; 32];
        assert_ne!(
            tagged_hash(CHALLENGE_TAG, &[&msg]),
            tagged_hash(NONCE_TAG, &[&msg])
        );
    }

    #[test]
    fn tagged_hash_matches_manual_construction() {
        let data = b"hello";
        let tag_hash = sha256(&[AUX_TAG.as_bytes()]);
        let expected = sha256(&[&tag_hash, &tag_hash, data]);
        assert_eq!(tagged_hash(AUX_TAG, &[data]), expected);
    }
}

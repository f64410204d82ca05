//! Deterministic scalar PRF built on a single ChaCha20 block
//!
//! One block keyed by a 32-byte seed yields two candidate scalars per
//! index. The block layout is fixed: the four ChaCha constants, eight
//! little-endian seed words, the index in word 12, zeros in words 13-14
//! and a retry counter in word 15. Output words are serialized
//! big-endian, so this is a PRF with ChaCha20's permutation rather than
//! the stream cipher itself. Either candidate being zero or >= n bumps
//! the retry counter and regenerates both.

use k256::Scalar;

use crate::curve;
use crate::error::{Error, Result};

const CHACHA_CONSTANTS: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

fn quarter_round(state: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    state[a] = state[a].wrapping_add(state[b]);
    state[d] = (state[d] ^ state[a]).rotate_left(16);
    state[c] = state[c].wrapping_add(state[d]);
    state[b] = (state[b] ^ state[c]).rotate_left(12);
    state[a] = state[a].wrapping_add(state[b]);
    state[d] = (state[d] ^ state[a]).rotate_left(8);
    state[c] = state[c].wrapping_add(state[d]);
    state[b] = (state[b] ^ state[c]).rotate_left(7);
}

/// One ChaCha20 block, serialized big-endian word by word.
pub(crate) fn block(seed: &[u8; 32], idx: u32, overflow: u32) -> [u8; 64] {
    let mut input = [0u32; 16];
    input[..4].copy_from_slice(&CHACHA_CONSTANTS);
    for (i, word) in input[4..12].iter_mut().enumerate() {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&seed[i * 4..i * 4 + 4]);
        *word = u32::from_le_bytes(bytes);
    }
    input[12] = idx;
    input[15] = overflow;

    let mut state = input;
    for _ in 0..10 {
        quarter_round(&mut state, 0, 4, 8, 12);
        quarter_round(&mut state, 1, 5, 9, 13);
        quarter_round(&mut state, 2, 6, 10, 14);
        quarter_round(&mut state, 3, 7, 11, 15);
        quarter_round(&mut state, 0, 5, 10, 15);
        quarter_round(&mut state, 1, 6, 11, 12);
        quarter_round(&mut state, 2, 7, 8, 13);
        quarter_round(&mut state, 3, 4, 9, 14);
    }

    let mut out = [0u8; 64];
    for (i, (word, init)) in state.iter().zip(input.iter()).enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(&word.wrapping_add(*init).to_be_bytes());
    }
    out
}

/// Derive the pair of scalars for `idx` from `seed`.
///
/// Both scalars are guaranteed to lie in `[1, n-1]`; out-of-range block
/// output is retried with an incremented counter. The retry probability
/// is about 2^-128 per candidate, so the iteration cap is unreachable
/// in practice.
pub fn seed_to_scalar_pair(seed: &[u8; 32], idx: u32) -> Result<(Scalar, Scalar)> {
    for overflow in 0..curve::MAX_SAMPLING_ITERATIONS as u32 {
        let out = block(seed, idx, overflow);
        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        first.copy_from_slice(&out[..32]);
        second.copy_from_slice(&out[32..]);
        let first = curve::private_scalar_from_bytes("scalarPrf", &first);
        let second = curve::private_scalar_from_bytes("scalarPrf", &second);
        if let (Ok(first), Ok(second)) = (first, second) {
            return Ok((first, second));
        }
    }
    Err(Error::Internal(
        "scalar PRF exceeded its retry cap".into(),
    ))
}

//! Bit-string helpers: character ⇄ binary, hex readouts, random bits.
//!
//! Bit strings are plain `String`s of `'0'`/`'1'`, most-significant bit first,
//! eight bits per character.

#![allow(missing_docs)]

use rand::{Rng, RngCore};

use crate::core::errors::{Result, SavError};

/// Width of one encoded character.
pub const BITS_PER_CHAR: usize = 8;

/// Encode a character as its 8-bit code, MSB first.
///
/// Code points above `0xFF` keep only their low byte.
#[must_use]
pub fn char_to_binary(ch: char) -> String {
    let byte = (u32::from(ch) & 0xFF) as u8;
    format!("{byte:08b}")
}

/// Concatenate the 8-bit codes of every character in `text`.
#[must_use]
pub fn string_to_binary(text: &str) -> String {
    text.chars().map(char_to_binary).collect()
}

/// Right-pad `bits` with `'0'` (or truncate) to exactly `len` characters.
#[must_use]
pub fn fit_bits(mut bits: String, len: usize) -> String {
    if bits.len() < len {
        bits.extend(std::iter::repeat_n('0', len - bits.len()));
    } else {
        bits.truncate(len);
    }
    bits
}

/// `count` independent uniformly random bits.
pub fn random_bits(rng: &mut dyn RngCore, count: usize) -> String {
    (0..count)
        .map(|_| if rng.random::<bool>() { '1' } else { '0' })
        .collect()
}

/// Validate a user-supplied bit string and return one byte per bit.
pub fn parse_bits(raw: &str) -> Result<Vec<u8>> {
    raw.chars()
        .enumerate()
        .map(|(offset, ch)| match ch {
            '0' => Ok(0),
            '1' => Ok(1),
            found => Err(SavError::InvalidBits { offset, found }),
        })
        .collect()
}

fn byte_chunks(bits: &str) -> impl Iterator<Item = u8> + '_ {
    bits.as_bytes().chunks(BITS_PER_CHAR).map(|chunk| {
        let mut value = 0u8;
        for i in 0..BITS_PER_CHAR {
            value <<= 1;
            if chunk.get(i) == Some(&b'1') {
                value |= 1;
            }
        }
        value
    })
}

/// Hex dump of a bit string, one uppercase byte per group: `"48 45"`.
///
/// A trailing partial group is zero-filled on the right; any character other
/// than `'1'` counts as zero.
#[must_use]
pub fn binary_to_hex(bits: &str) -> String {
    byte_chunks(bits)
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode a bit string back into Latin-1 characters.
#[must_use]
pub fn binary_to_string(bits: &str) -> String {
    byte_chunks(bits).map(char::from).collect()
}

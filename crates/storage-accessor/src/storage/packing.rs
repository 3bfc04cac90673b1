//! Bit-level editing of packed storage words.
//!
//! Solidity packs value types narrower than a word right-aligned within their
//! byte range. Offsets count bytes from the least significant end of the word,
//! so offset 0 is the rightmost byte.

use alloy_primitives::U256;

use crate::error::{AccessorError, Result};

/// Mask with the low `bytes * 8` bits set.
#[inline]
pub fn field_mask(bytes: usize) -> U256 {
    if bytes >= 32 {
        U256::MAX
    } else {
        (U256::from(1) << (bytes * 8)) - U256::from(1)
    }
}

#[inline]
fn check_range(offset: usize, bytes: usize) -> Result<()> {
    if bytes == 0 || offset + bytes > 32 {
        return Err(AccessorError::RangeOutOfSlot { offset, bytes });
    }
    Ok(())
}

/// Extract the right-aligned field stored at `offset` in `word`.
#[inline]
pub fn extract_packed_value(word: U256, offset: usize, bytes: usize) -> Result<U256> {
    check_range(offset, bytes)?;
    Ok((word >> (offset * 8)) & field_mask(bytes))
}

/// Replace the field at `offset` in `current` with `value`, leaving every
/// other bit of the word as it was.
///
/// Bits of `value` above the field width are discarded.
#[inline]
pub fn insert_packed_value(current: U256, value: U256, offset: usize, bytes: usize) -> Result<U256> {
    check_range(offset, bytes)?;

    let shift_bits = offset * 8;
    let mask = field_mask(bytes);

    let cleared = current & !(mask << shift_bits);
    Ok(cleared | ((value & mask) << shift_bits))
}

/// Builds a word from hex fragments, concatenated left to right and
/// left-padded to 32 bytes.
#[cfg(test)]
pub(crate) fn gen_slot_from(values: &[&str]) -> U256 {
    let mut bytes = Vec::new();
    for value in values {
        let decoded = const_hex::decode(value)
            .unwrap_or_else(|e| panic!("invalid hex in '{value}': {e}"));
        bytes.extend_from_slice(&decoded);
    }
    assert!(
        bytes.len() <= 32,
        "total bytes ({}) exceed 32-byte slot limit",
        bytes.len()
    );

    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    U256::from_be_bytes(word)
}

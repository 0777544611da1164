//! Exclusive scan boundaries.
//!
//! Stores scan `[start, end)`, so resuming strictly after a key needs the
//! smallest key that sorts after it. Appending the lowest byte value gives
//! exactly that among keys extending the original.
//!
//! Constraint: `0x00` is reserved. If some writer stored `key + 0x00` as a
//! row of its own, `next_key(key)` would land on that row and a resumed scan
//! would deliver it even though it was never the cursor. Codec tags reject
//! the byte and encoded digits never contain it; raw keys written by other
//! means must not end in it.

/// Byte appended by [`next_key`]; never part of an encoded key.
pub const PAD_BYTE: u8 = 0x00;

/// Smallest byte string strictly greater than `key` that has `key` as a prefix.
pub fn next_key(key: &[u8]) -> Vec<u8> {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(PAD_BYTE);
    next
}

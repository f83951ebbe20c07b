//! Packed (length-encoded) integers.
//!
//! Binlog events store counts and lengths in a variable-width form where the
//! first byte selects the width:
//! - `0..=250`: the value itself
//! - `252`: two little-endian bytes follow
//! - `253`: three little-endian bytes follow
//! - `254`: eight little-endian bytes follow
//!
//! `251` marks a NULL in result sets and `255` is unused; neither is a valid
//! count in a table map.

/// Decode a packed integer.
///
/// Returns the decoded value and number of bytes consumed, or `None` if the
/// input is empty, truncated, or starts with an invalid marker.
#[must_use]
pub(crate) fn decode_packed(data: &[u8]) -> Option<(u64, usize)> {
    let (&first, rest) = data.split_first()?;
    let width = match first {
        0..=250 => return Some((u64::from(first), 1)),
        252 => 2,
        253 => 3,
        254 => 8,
        _ => return None,
    };
    let bytes = rest.get(..width)?;
    let value = bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    Some((value, 1 + width))
}

//! Length arithmetic shared by field sizing and conversion checks.

use super::FieldType;

/// Decimal digits packed into one 4-byte word.
const DIGITS_PER_WORD: usize = 9;

/// Bytes needed for 0..=8 leftover decimal digits.
const DIGITS_TO_BYTES: [usize; DIGITS_PER_WORD + 1] = [0, 1, 1, 2, 2, 3, 3, 4, 4, 4];

/// Size in bytes of a binary-packed `DECIMAL(precision, scale)`.
///
/// Integer and fractional parts are packed separately, nine digits per
/// four-byte word, with a partial word for the leftover digits.
#[must_use]
pub fn decimal_binary_size(precision: u8, scale: u8) -> usize {
    let scale = usize::from(scale);
    let integral = usize::from(precision).saturating_sub(scale);
    (integral / DIGITS_PER_WORD) * 4
        + DIGITS_TO_BYTES[integral % DIGITS_PER_WORD]
        + (scale / DIGITS_PER_WORD) * 4
        + DIGITS_TO_BYTES[scale % DIGITS_PER_WORD]
}

/// Bytes used by the fractional part of a temporal value of precision `dec`.
#[inline]
fn fractional_bytes(dec: u16) -> usize {
    (usize::from(dec.min(6)) + 1) / 2
}

/// Size of a `TIME(dec)` value in the fractional-seconds encoding.
#[must_use]
pub fn time2_binary_length(dec: u16) -> usize {
    3 + fractional_bytes(dec)
}

/// Size of a `TIMESTAMP(dec)` value in the fractional-seconds encoding.
#[must_use]
pub fn timestamp2_binary_length(dec: u16) -> usize {
    4 + fractional_bytes(dec)
}

/// Size of a `DATETIME(dec)` value in the fractional-seconds encoding.
#[must_use]
pub fn datetime2_binary_length(dec: u16) -> usize {
    5 + fractional_bytes(dec)
}

/// Declared maximum length of a `CHAR` column from its table map metadata.
///
/// Lengths above 255 store their two high bits inverted in bits 4-5 of the
/// high metadata byte.
#[must_use]
pub fn string_max_length(metadata: u16) -> u32 {
    ((u32::from(metadata >> 4) & 0x300) ^ 0x300) + u32::from(metadata & 0xff)
}

/// All ones in the low `bytes * 8` bits.
fn max_for_bytes(bytes: u16) -> u32 {
    match bytes {
        0 => 0,
        1..=3 => (1u32 << (8 * u32::from(bytes))) - 1,
        _ => u32::MAX,
    }
}

/// Maximum display length of a column, used to rank conversions.
///
/// `field_type` must already be normalized. Types without a meaningful
/// width return `u32::MAX`.
#[must_use]
pub fn max_display_length(field_type: FieldType, metadata: u16) -> u32 {
    match field_type {
        FieldType::NewDecimal | FieldType::Decimal => u32::from(metadata >> 8),
        FieldType::Float => 12,
        FieldType::Double => 22,
        FieldType::Set | FieldType::Enum => u32::from(metadata & 0xff),
        FieldType::String => {
            if matches!(
                FieldType::from(metadata.to_be_bytes()[0]),
                FieldType::Enum | FieldType::Set
            ) {
                u32::from(metadata & 0xff)
            } else {
                string_max_length(metadata)
            }
        }
        FieldType::Year | FieldType::Tiny => 4,
        FieldType::Short => 6,
        FieldType::Int24 => 9,
        FieldType::Long => 11,
        FieldType::LongLong => 20,
        FieldType::Null => 0,
        FieldType::NewDate | FieldType::Date | FieldType::Time | FieldType::Time2 => 3,
        FieldType::Timestamp | FieldType::Timestamp2 => 4,
        FieldType::DateTime | FieldType::DateTime2 => 8,
        FieldType::Bit => 8 * u32::from(metadata >> 8) + u32::from(metadata & 0xff),
        FieldType::VarString | FieldType::VarChar => u32::from(metadata),
        FieldType::TinyBlob => max_for_bytes(1),
        FieldType::MediumBlob => max_for_bytes(3),
        FieldType::Blob => max_for_bytes(metadata),
        FieldType::LongBlob | FieldType::Geometry | FieldType::Json => max_for_bytes(4),
        FieldType::Unknown(_) => u32::MAX,
    }
}

//! Wire-format constants shared by the decoder and encoder.
//!
//! CBOR initial bytes are `(major << 5) | additional_info`; the constants
//! here are the prefixes and fully-formed bytes both halves of the codec
//! need.

/// Major type 0: unsigned integer.
pub(crate) const MAJOR_INT_POS: u8 = 0;
/// Major type 1: negative integer (`-1 - n`).
pub(crate) const MAJOR_INT_NEG: u8 = 1;
/// Major type 2: byte string.
pub(crate) const MAJOR_BYTES: u8 = 2;
/// Major type 3: text string.
pub(crate) const MAJOR_TEXT: u8 = 3;
/// Major type 4: array.
pub(crate) const MAJOR_ARRAY: u8 = 4;
/// Major type 5: map.
pub(crate) const MAJOR_OBJECT: u8 = 5;
/// Major type 6: tag.
pub(crate) const MAJOR_TAG: u8 = 6;
/// Major type 7: simple values and floats.
pub(crate) const MAJOR_SIMPLE: u8 = 7;

pub(crate) const PREFIX_INT_POS: u8 = MAJOR_INT_POS << 5;
pub(crate) const PREFIX_INT_NEG: u8 = MAJOR_INT_NEG << 5;
pub(crate) const PREFIX_BYTES: u8 = MAJOR_BYTES << 5;
pub(crate) const PREFIX_TEXT: u8 = MAJOR_TEXT << 5;
pub(crate) const PREFIX_ARRAY: u8 = MAJOR_ARRAY << 5;
pub(crate) const PREFIX_OBJECT: u8 = MAJOR_OBJECT << 5;
pub(crate) const PREFIX_TAG: u8 = MAJOR_TAG << 5;

/// Additional-info value marking an indefinite length (or, in major 7,
/// the break byte).
pub(crate) const SUFFIX_INDEFINITE: u8 = 0x1F;

pub(crate) const BYTE_ARRAY_INDEFINITE: u8 = PREFIX_ARRAY | SUFFIX_INDEFINITE;
pub(crate) const BYTE_OBJECT_INDEFINITE: u8 = PREFIX_OBJECT | SUFFIX_INDEFINITE;

pub(crate) const BYTE_FALSE: u8 = (MAJOR_SIMPLE << 5) | 20;
pub(crate) const BYTE_TRUE: u8 = (MAJOR_SIMPLE << 5) | 21;
pub(crate) const BYTE_NULL: u8 = (MAJOR_SIMPLE << 5) | 22;

pub(crate) const BYTE_FLOAT32: u8 = (MAJOR_SIMPLE << 5) | 26;
pub(crate) const BYTE_FLOAT64: u8 = (MAJOR_SIMPLE << 5) | 27;

/// Terminator for indefinite-length containers and chunked strings.
pub(crate) const BYTE_BREAK: u8 = 0xFF;

/// Tag 2: positive bignum (magnitude as a big-endian byte string).
pub(crate) const TAG_BIGNUM_POS: u64 = 2;
/// Tag 3: negative bignum (`-1 - magnitude`).
pub(crate) const TAG_BIGNUM_NEG: u64 = 3;
/// Tag 4: decimal fraction, a 2-element array of scale and unscaled value.
pub(crate) const TAG_DECIMAL_FRACTION: u64 = 4;

//! Token events produced by the decoder.
//!
//! The vocabulary is deliberately the same shape a streaming JSON parser
//! produces, so tree builders and data binders written against that
//! vocabulary consume CBOR unchanged. Events carry no payloads; scalar
//! values, names and binary data are read through the decoder's accessor
//! methods while the event is current.
//!
//! # Examples
//!
//! ```
//! use cbormodem::{CborFactory, Event};
//!
//! let factory = CborFactory::new();
//! let mut dec = factory.decoder_for_slice(&[0x9F, 0x01, 0xFF]);
//! assert_eq!(dec.next_token().unwrap(), Some(Event::StartArray));
//! assert_eq!(dec.next_token().unwrap(), Some(Event::Int));
//! assert_eq!(dec.get_int().unwrap(), 1);
//! assert_eq!(dec.next_token().unwrap(), Some(Event::EndArray));
//! assert_eq!(dec.next_token().unwrap(), None);
//! ```

/// A structural or scalar token event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Opens an array; closed by the matching [`Event::EndArray`].
    StartArray,
    /// Closes the innermost open array.
    EndArray,
    /// Opens an object; closed by the matching [`Event::EndObject`].
    StartObject,
    /// Closes the innermost open object.
    EndObject,
    /// An object key; the text is available via `current_name`.
    FieldName,
    /// A text string value, materialized lazily via `get_text`.
    Text,
    /// A byte string value, materialized lazily via `get_binary` or
    /// streamed with `read_binary`.
    EmbeddedBinary,
    /// An integer value; its natural width is reported by
    /// `get_number_type`.
    Int,
    /// A floating-point (or decimal-fraction) value.
    Float,
    /// `true` or `false`.
    Bool(bool),
    /// The `null` simple value.
    Null,
}

impl Event {
    /// Returns `true` for events that open or close a container.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Event::StartArray | Event::EndArray | Event::StartObject | Event::EndObject
        )
    }

    /// Returns `true` for scalar value events (everything except
    /// structural events and field names).
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        !self.is_structural() && !matches!(self, Event::FieldName)
    }

    /// Returns `true` for the two numeric events.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Event::Int | Event::Float)
    }
}

/// The natural representation a numeric value decoded into.
///
/// Accessors may widen freely; narrowing past the natural width is
/// range-checked and fails with `CborError::NumberOverflow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberType {
    /// Fits in `i32`.
    Int,
    /// Fits in `i64` but not `i32`.
    Long,
    /// Requires an arbitrary-precision integer (tags 2/3, or a 64-bit
    /// unsigned value past `i64::MAX`).
    BigInteger,
    /// Single-precision wire value.
    Float,
    /// Double-precision wire value (including expanded half-floats).
    Double,
    /// Decimal fraction (tag 4).
    BigDecimal,
}

/// Strength of a format-detection probe, computed from leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrength {
    /// The bytes cannot begin a CBOR document.
    NoMatch,
    /// A valid initial byte, but one many formats share.
    WeakMatch,
    /// A structural opening (array or map initial byte).
    SolidMatch,
    /// The self-describe tag prefix `D9 D9 F7`.
    FullMatch,
}

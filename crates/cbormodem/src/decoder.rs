//! The streaming CBOR decoder.
//!
//! [`Decoder`] pulls typed events out of a byte stream one
//! [`Decoder::next_token`] call at a time. Text and binary payloads are
//! lazy: the event is returned as soon as the header is read, and the
//! payload is materialized on the first accessor or skipped when the
//! next token is requested.
//!
//! # Examples
//!
//! ```rust
//! use cbormodem::{Decoder, DecoderOptions, Event};
//!
//! // {"a": 1}
//! let data: &[u8] = &[0xBF, 0x61, 0x61, 0x01, 0xFF];
//! let mut dec = Decoder::new(data, DecoderOptions::default());
//! assert_eq!(dec.next_token().unwrap(), Some(Event::StartObject));
//! assert_eq!(dec.next_token().unwrap(), Some(Event::FieldName));
//! assert_eq!(dec.current_name(), Some("a"));
//! assert_eq!(dec.next_token().unwrap(), Some(Event::Int));
//! assert_eq!(dec.get_int().unwrap(), 1);
//! assert_eq!(dec.next_token().unwrap(), Some(Event::EndObject));
//! assert_eq!(dec.next_token().unwrap(), None);
//! ```
#![allow(clippy::enum_glob_use)]

use std::io::{Read, Write};
use std::sync::Arc;

use num_bigint::BigInt;

use crate::consts::*;
use crate::context::{ContextKind, ReadContext};
use crate::error::{CborError, Result};
use crate::event::{Event, NumberType};
use crate::io::ByteInput;
use crate::numbers::{bigint_from_magnitude, Decimal};
use crate::options::DecoderOptions;
use crate::symbols::{pack_quads, SymbolTable};
use crate::utf8;

/// A text or binary payload whose header has been read but whose bytes
/// have not been consumed yet. `None` length means chunked (indefinite).
#[derive(Debug, Clone, Copy)]
enum PendingPayload {
    Text(Option<u64>),
    Binary(Option<u64>),
}

/// Cached numeric representations of the current token. The natural
/// width is fixed at decode time; the other slots fill in lazily as
/// accessors request them.
#[derive(Debug, Default)]
struct NumberState {
    natural: Option<NumberType>,
    int: Option<i32>,
    long: Option<i64>,
    big: Option<BigInt>,
    float: Option<f32>,
    double: Option<f64>,
    decimal: Option<Decimal>,
}

impl NumberState {
    fn set_unsigned(&mut self, n: u64) {
        if n <= i32::MAX as u64 {
            self.natural = Some(NumberType::Int);
            self.int = Some(n as i32);
        } else if n <= i64::MAX as u64 {
            self.natural = Some(NumberType::Long);
            self.long = Some(n as i64);
        } else {
            self.natural = Some(NumberType::BigInteger);
            self.big = Some(BigInt::from(n));
        }
    }

    /// The encoded value is `-1 - n`.
    fn set_negative(&mut self, n: u64) {
        if n <= i32::MAX as u64 {
            self.natural = Some(NumberType::Int);
            self.int = Some((-1i64 - n as i64) as i32);
        } else if n <= i64::MAX as u64 {
            self.natural = Some(NumberType::Long);
            self.long = Some(-1i64 - n as i64);
        } else {
            self.natural = Some(NumberType::BigInteger);
            self.big = Some(-BigInt::from(n) - 1);
        }
    }

    fn set_float(&mut self, v: f32) {
        self.natural = Some(NumberType::Float);
        self.float = Some(v);
        self.double = Some(f64::from(v));
    }

    fn set_double(&mut self, v: f64) {
        self.natural = Some(NumberType::Double);
        self.double = Some(v);
    }

    fn set_big(&mut self, v: BigInt) {
        self.natural = Some(NumberType::BigInteger);
        self.big = Some(v);
    }

    fn set_decimal(&mut self, v: Decimal) {
        self.natural = Some(NumberType::BigDecimal);
        self.decimal = Some(v);
    }
}

/// The pull-style CBOR decoder.
pub struct Decoder<R: Read> {
    input: ByteInput<R>,
    options: DecoderOptions,
    symbols: Arc<SymbolTable>,
    context: ReadContext,
    current: Option<Event>,
    closed: bool,
    pending: Option<PendingPayload>,
    /// Accumulator for decoded text values.
    text: String,
    /// Materialized binary payload, kept for the duration of the event.
    binary: Option<Vec<u8>>,
    number: NumberState,
    /// Scratch for packing field-name bytes into lookup quads.
    quad_scratch: Vec<u32>,
    /// Tags recorded in front of the current value, outermost first.
    tags: Vec<u64>,
}

impl<R: Read> Decoder<R> {
    /// Creates a decoder with a private symbol table.
    pub fn new(source: R, options: DecoderOptions) -> Self {
        Self::with_symbols(source, options, Arc::new(SymbolTable::new()))
    }

    /// Creates a decoder sharing `symbols` with other decoders, the way
    /// the factory wires its instances.
    pub fn with_symbols(source: R, options: DecoderOptions, symbols: Arc<SymbolTable>) -> Self {
        Self {
            input: ByteInput::new(source),
            options,
            symbols,
            context: ReadContext::new(options.strict_duplicate_detection),
            current: None,
            closed: false,
            pending: None,
            text: String::new(),
            binary: None,
            number: NumberState::default(),
            quad_scratch: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// The event most recently returned by [`Decoder::next_token`].
    #[must_use]
    pub fn current_token(&self) -> Option<Event> {
        self.current
    }

    /// Tags recorded in front of the current value, outermost first.
    /// Empty for untagged values.
    #[must_use]
    pub fn current_tags(&self) -> &[u64] {
        &self.tags
    }

    /// Advances to the next event, or `None` at end of input.
    ///
    /// End of input is only legal at a root boundary; inside a container
    /// it surfaces as `CborError::Malformed`. Reaching it closes the
    /// decoder (and, with `auto_close_source`, drops the source).
    pub fn next_token(&mut self) -> Result<Option<Event>> {
        self.number = NumberState::default();
        if let Some(p) = self.pending.take() {
            self.skip_pending(p)?;
        }
        self.binary = None;
        self.tags.clear();

        if self.closed {
            self.current = None;
            return Ok(None);
        }

        let event = if self.context.in_object() && self.current != Some(Event::FieldName) {
            self.decode_field_name_or_end()?
        } else {
            self.decode_value_or_end()?
        };
        self.current = event;
        Ok(event)
    }

    /// Releases buffers and optionally the source. Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.input.release(self.options.auto_close_source);
        }
    }

    /// Whether the decoder has been closed (explicitly or by reaching
    /// end of input at a root boundary).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Hands unread buffered bytes to `out`, for callers that switch
    /// formats mid-stream.
    pub fn release_buffered(&mut self, out: &mut dyn Write) -> Result<usize> {
        self.input.release_buffered(out)
    }

    // -----------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------

    fn decode_field_name_or_end(&mut self) -> Result<Option<Event>> {
        if !self.context.expect_more_values() {
            self.context.exit();
            return Ok(Some(Event::EndObject));
        }
        if !self.context.has_expected_length() && self.input.peek_byte()? == BYTE_BREAK {
            self.input.advance(1);
            self.context.exit();
            return Ok(Some(Event::EndObject));
        }
        self.context.record_entry();
        let b = self.input.next_byte()?;
        let name = self.decode_name(b)?;
        self.context.set_current_name(name)?;
        Ok(Some(Event::FieldName))
    }

    fn decode_value_or_end(&mut self) -> Result<Option<Event>> {
        match self.context.kind() {
            ContextKind::Root => {
                if !self.input.has_byte() && !self.input.load_more()? {
                    // Hard EOF at a root boundary: not an error.
                    self.close();
                    return Ok(None);
                }
            }
            ContextKind::Array => {
                if !self.context.expect_more_values() {
                    self.context.exit();
                    return Ok(Some(Event::EndArray));
                }
                if !self.context.has_expected_length() && self.input.peek_byte()? == BYTE_BREAK {
                    self.input.advance(1);
                    self.context.exit();
                    return Ok(Some(Event::EndArray));
                }
                self.context.record_entry();
            }
            // A value directly following a field name; no end marker can
            // legally begin here.
            ContextKind::Object => {}
        }
        let b = self.input.next_byte()?;
        self.decode_value(b).map(Some)
    }

    fn decode_value(&mut self, initial: u8) -> Result<Event> {
        let mut b = initial;
        while b >> 5 == MAJOR_TAG {
            let tag = self.read_uint_suffix(b & 0x1F)?;
            self.tags.push(tag);
            b = self.input.next_byte()?;
        }

        // Tag-directed decoding for the tags the encoder emits, so its
        // own output round-trips through typed accessors.
        if let Some(&tag) = self.tags.last() {
            match tag {
                TAG_BIGNUM_POS | TAG_BIGNUM_NEG if b >> 5 == MAJOR_BYTES => {
                    return self.decode_bignum(tag == TAG_BIGNUM_NEG, b & 0x1F);
                }
                TAG_DECIMAL_FRACTION if b >> 5 == MAJOR_ARRAY => {
                    return self.decode_decimal(b & 0x1F);
                }
                _ => {}
            }
        }

        let info = b & 0x1F;
        match b >> 5 {
            MAJOR_INT_POS => {
                let n = self.read_uint_suffix(info)?;
                self.number.set_unsigned(n);
                Ok(Event::Int)
            }
            MAJOR_INT_NEG => {
                let n = self.read_uint_suffix(info)?;
                self.number.set_negative(n);
                Ok(Event::Int)
            }
            MAJOR_BYTES => {
                let len = self.read_len_or_indefinite(info)?;
                self.pending = Some(PendingPayload::Binary(len));
                Ok(Event::EmbeddedBinary)
            }
            MAJOR_TEXT => {
                let len = self.read_len_or_indefinite(info)?;
                self.pending = Some(PendingPayload::Text(len));
                Ok(Event::Text)
            }
            MAJOR_ARRAY => {
                let len = self.read_len_or_indefinite(info)?;
                self.context.enter_array(len);
                Ok(Event::StartArray)
            }
            MAJOR_OBJECT => {
                let len = self.read_len_or_indefinite(info)?;
                self.context.enter_object(len);
                Ok(Event::StartObject)
            }
            _ => self.decode_simple(info),
        }
    }

    fn decode_simple(&mut self, info: u8) -> Result<Event> {
        match info {
            20 => Ok(Event::Bool(false)),
            21 => Ok(Event::Bool(true)),
            22 => Ok(Event::Null),
            25 => {
                self.input.ensure(2)?;
                let w = self.input.window();
                let half = half::f16::from_be_bytes([w[0], w[1]]);
                self.input.advance(2);
                self.number.set_double(f64::from(half));
                Ok(Event::Float)
            }
            26 => {
                self.input.ensure(4)?;
                let w = self.input.window();
                let v = f32::from_be_bytes([w[0], w[1], w[2], w[3]]);
                self.input.advance(4);
                self.number.set_float(v);
                Ok(Event::Float)
            }
            27 => {
                self.input.ensure(8)?;
                let w = self.input.window();
                let v = f64::from_be_bytes([w[0], w[1], w[2], w[3], w[4], w[5], w[6], w[7]]);
                self.input.advance(8);
                self.number.set_double(v);
                Ok(Event::Float)
            }
            31 => Err(self.malformed_here(
                "break byte outside an indefinite-length container".to_string(),
            )),
            _ => Err(self.malformed_here(format!(
                "invalid additional info {info} for major type 7"
            ))),
        }
    }

    fn decode_bignum(&mut self, negative: bool, info: u8) -> Result<Event> {
        let len = self.read_len_or_indefinite(info)?;
        let magnitude = self.materialize_binary_payload(len)?;
        self.number
            .set_big(bigint_from_magnitude(negative, &magnitude));
        Ok(Event::Int)
    }

    fn decode_decimal(&mut self, info: u8) -> Result<Event> {
        let len = self.read_len_or_indefinite(info)?;
        if let Some(n) = len {
            if n != 2 {
                return Err(self.malformed_here(format!(
                    "decimal fraction array has {n} elements, expected 2"
                )));
            }
        }
        let scale = self.read_integer_item("decimal fraction scale")?;
        let unscaled = self.read_bigint_item("decimal fraction unscaled value")?;
        if len.is_none() {
            let b = self.input.next_byte()?;
            if b != BYTE_BREAK {
                return Err(
                    self.malformed_here("decimal fraction array not closed by break".to_string())
                );
            }
        }
        self.number.set_decimal(Decimal::new(unscaled, scale));
        Ok(Event::Float)
    }

    /// One plain integer item, for the scale slot of a decimal fraction.
    fn read_integer_item(&mut self, what: &str) -> Result<i64> {
        let b = self.input.next_byte()?;
        let info = b & 0x1F;
        match b >> 5 {
            MAJOR_INT_POS => {
                let n = self.read_uint_suffix(info)?;
                i64::try_from(n)
                    .map_err(|_| CborError::NumberOverflow(format!("{what} {n} exceeds i64")))
            }
            MAJOR_INT_NEG => {
                let n = self.read_uint_suffix(info)?;
                if n <= i64::MAX as u64 {
                    Ok(-1i64 - n as i64)
                } else {
                    Err(CborError::NumberOverflow(format!(
                        "{what} -1-{n} exceeds i64"
                    )))
                }
            }
            _ => Err(self.malformed_here(format!("{what} must be an integer"))),
        }
    }

    /// One integer-or-bignum item, for the unscaled slot of a decimal
    /// fraction.
    fn read_bigint_item(&mut self, what: &str) -> Result<BigInt> {
        let b = self.input.next_byte()?;
        let info = b & 0x1F;
        match b >> 5 {
            MAJOR_INT_POS => Ok(BigInt::from(self.read_uint_suffix(info)?)),
            MAJOR_INT_NEG => Ok(-BigInt::from(self.read_uint_suffix(info)?) - 1),
            MAJOR_TAG => {
                let tag = self.read_uint_suffix(info)?;
                if tag != TAG_BIGNUM_POS && tag != TAG_BIGNUM_NEG {
                    return Err(self.malformed_here(format!("{what} tagged with {tag}")));
                }
                let b = self.input.next_byte()?;
                if b >> 5 != MAJOR_BYTES {
                    return Err(self.malformed_here(format!("{what} bignum without byte string")));
                }
                let len = self.read_len_or_indefinite(b & 0x1F)?;
                let magnitude = self.materialize_binary_payload(len)?;
                Ok(bigint_from_magnitude(tag == TAG_BIGNUM_NEG, &magnitude))
            }
            _ => Err(self.malformed_here(format!("{what} must be an integer or bignum"))),
        }
    }

    // -----------------------------------------------------------------
    // Headers
    // -----------------------------------------------------------------

    fn read_uint_suffix(&mut self, info: u8) -> Result<u64> {
        match info {
            0..=23 => Ok(u64::from(info)),
            24 => {
                self.input.ensure(1)?;
                let v = self.input.window()[0];
                self.input.advance(1);
                Ok(u64::from(v))
            }
            25 => {
                self.input.ensure(2)?;
                let w = self.input.window();
                let v = u16::from_be_bytes([w[0], w[1]]);
                self.input.advance(2);
                Ok(u64::from(v))
            }
            26 => {
                self.input.ensure(4)?;
                let w = self.input.window();
                let v = u32::from_be_bytes([w[0], w[1], w[2], w[3]]);
                self.input.advance(4);
                Ok(u64::from(v))
            }
            27 => {
                self.input.ensure(8)?;
                let w = self.input.window();
                let v = u64::from_be_bytes([w[0], w[1], w[2], w[3], w[4], w[5], w[6], w[7]]);
                self.input.advance(8);
                Ok(v)
            }
            _ => Err(self.malformed_here(format!("invalid additional info {info}"))),
        }
    }

    /// Declared length, or `None` for the indefinite marker. Declared
    /// lengths are capped at `i32::MAX` like every other narrowing.
    fn read_len_or_indefinite(&mut self, info: u8) -> Result<Option<u64>> {
        if info == SUFFIX_INDEFINITE {
            return Ok(None);
        }
        let len = self.read_uint_suffix(info)?;
        if len > i32::MAX as u64 {
            return Err(CborError::NumberOverflow(format!(
                "declared length {len} exceeds i32"
            )));
        }
        Ok(Some(len))
    }

    // -----------------------------------------------------------------
    // Field names
    // -----------------------------------------------------------------

    fn decode_name(&mut self, b: u8) -> Result<Arc<str>> {
        let info = b & 0x1F;
        match b >> 5 {
            // Text keys are the norm; byte-string keys occur in the wild
            // (Perl emitters) and are accepted when they hold UTF-8.
            MAJOR_TEXT | MAJOR_BYTES => match self.read_len_or_indefinite(info)? {
                Some(0) => Ok(Arc::from("")),
                Some(n) if (n as usize) <= self.input.capacity() => {
                    self.decode_short_name(n as usize)
                }
                Some(n) => {
                    self.text.clear();
                    self.decode_text_segment(n)?;
                    Ok(Arc::from(self.text.as_str()))
                }
                None => {
                    self.text.clear();
                    self.decode_chunked_text(b >> 5)?;
                    Ok(Arc::from(self.text.as_str()))
                }
            },
            MAJOR_INT_POS => {
                let n = self.read_uint_suffix(info)?;
                Ok(Arc::from(n.to_string().as_str()))
            }
            MAJOR_INT_NEG => {
                let n = self.read_uint_suffix(info)?;
                let value = -1i128 - i128::from(n);
                Ok(Arc::from(value.to_string().as_str()))
            }
            major => Err(self.malformed_here(format!(
                "unsupported major type {major} for object key"
            ))),
        }
    }

    /// Keys that fit the buffer are probed in the symbol table as packed
    /// quads before any UTF-8 work; a hit skips decoding entirely.
    fn decode_short_name(&mut self, len: usize) -> Result<Arc<str>> {
        self.input.ensure(len)?;
        let offset = self.input.offset();
        {
            let bytes = &self.input.window()[..len];
            pack_quads(bytes, &mut self.quad_scratch);
        }
        if self.options.intern_field_names {
            if let Some(name) = self.symbols.find(&self.quad_scratch, len) {
                self.input.advance(len);
                return Ok(name);
            }
        }
        self.text.clear();
        {
            let bytes = &self.input.window()[..len];
            decode_utf8_slice(&mut self.text, bytes)
                .map_err(|(pos, msg)| CborError::malformed(msg, offset + pos as u64))?;
        }
        self.input.advance(len);
        if self.options.intern_field_names {
            Ok(self.symbols.intern(&self.text, &self.quad_scratch))
        } else {
            Ok(Arc::from(self.text.as_str()))
        }
    }

    /// Name associated with the current event: the key itself for
    /// `FieldName` and scalar values, the enclosing key for container
    /// starts.
    #[must_use]
    pub fn current_name(&self) -> Option<&str> {
        match self.current {
            Some(Event::StartArray | Event::StartObject) => {
                self.context.parent_name().map(|n| &**n)
            }
            _ => self.context.current_name().map(|n| &**n),
        }
    }

    // -----------------------------------------------------------------
    // Lazy payloads
    // -----------------------------------------------------------------

    fn finish_pending(&mut self) -> Result<()> {
        match self.pending.take() {
            None => Ok(()),
            Some(PendingPayload::Text(len)) => {
                self.text.clear();
                match len {
                    Some(n) => self.decode_text_segment(n),
                    None => self.decode_chunked_text(MAJOR_TEXT),
                }
            }
            Some(PendingPayload::Binary(len)) => {
                let bytes = self.materialize_binary_payload(len)?;
                self.binary = Some(bytes);
                Ok(())
            }
        }
    }

    fn skip_pending(&mut self, pending: PendingPayload) -> Result<()> {
        let (major, len) = match pending {
            PendingPayload::Text(len) => (MAJOR_TEXT, len),
            PendingPayload::Binary(len) => (MAJOR_BYTES, len),
        };
        match len {
            Some(n) => self.input.skip_bytes(n),
            None => loop {
                let b = self.input.next_byte()?;
                if b == BYTE_BREAK {
                    return Ok(());
                }
                if b >> 5 != major {
                    return Err(self.chunk_type_mismatch(major, b));
                }
                let n = self.read_chunk_len(b & 0x1F)?;
                self.input.skip_bytes(n)?;
            },
        }
    }

    fn read_chunk_len(&mut self, info: u8) -> Result<u64> {
        if info == SUFFIX_INDEFINITE {
            return Err(
                self.malformed_here("chunk inside a chunked string is itself indefinite".into())
            );
        }
        self.read_uint_suffix(info)
    }

    fn chunk_type_mismatch(&self, major: u8, found: u8) -> CborError {
        CborError::malformed(
            format!(
                "chunk of major type {} inside chunked string of major type {major}",
                found >> 5
            ),
            self.input.offset(),
        )
    }

    /// Decodes exactly `len` UTF-8 bytes into the text accumulator,
    /// choosing the in-buffer path when the payload fits.
    fn decode_text_segment(&mut self, len: u64) -> Result<()> {
        let len = len as usize; // bounded by the i32::MAX length check
        if len <= self.input.capacity() {
            self.input.ensure(len)?;
            let offset = self.input.offset();
            {
                let bytes = &self.input.window()[..len];
                decode_utf8_slice(&mut self.text, bytes)
                    .map_err(|(pos, msg)| CborError::malformed(msg, offset + pos as u64))?;
            }
            self.input.advance(len);
            Ok(())
        } else {
            self.decode_text_streaming(len as u64)
        }
    }

    /// Byte-at-a-time decode for payloads larger than the input buffer.
    fn decode_text_streaming(&mut self, len: u64) -> Result<()> {
        let mut remaining = len;
        while remaining > 0 {
            let b0 = self.input.next_byte()?;
            remaining -= 1;
            if b0 < 0x80 {
                self.text.push(b0 as char);
                continue;
            }
            let extra = utf8::cont_len(b0);
            if extra < 0 {
                return Err(self.malformed_here(format!("invalid UTF-8 start byte 0x{b0:02X}")));
            }
            let extra = extra as u64;
            if extra > remaining {
                return Err(
                    self.malformed_here("UTF-8 sequence crosses end of text payload".into())
                );
            }
            let mut cont = [0u8; 3];
            for slot in cont.iter_mut().take(extra as usize) {
                let b = self.input.next_byte()?;
                if !utf8::is_cont(b) {
                    return Err(
                        self.malformed_here(format!("invalid UTF-8 middle byte 0x{b:02X}"))
                    );
                }
                *slot = b;
            }
            remaining -= extra;
            let (code_point, min) = match extra {
                1 => (utf8::combine2(b0, cont[0]), 0x80),
                2 => (utf8::combine3(b0, cont[0], cont[1]), 0x800),
                _ => (utf8::combine4(b0, cont[0], cont[1], cont[2]), 0x1_0000),
            };
            if code_point < min {
                return Err(self.malformed_here("overlong UTF-8 sequence".into()));
            }
            match char::from_u32(code_point) {
                Some(c) => self.text.push(c),
                None => {
                    return Err(self.malformed_here(format!(
                        "illegal code point U+{code_point:04X} in text payload"
                    )))
                }
            }
        }
        Ok(())
    }

    fn decode_chunked_text(&mut self, major: u8) -> Result<()> {
        loop {
            let b = self.input.next_byte()?;
            if b == BYTE_BREAK {
                return Ok(());
            }
            if b >> 5 != major {
                return Err(self.chunk_type_mismatch(major, b));
            }
            let n = self.read_chunk_len(b & 0x1F)?;
            self.decode_text_segment(n)?;
        }
    }

    fn materialize_binary_payload(&mut self, len: Option<u64>) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match len {
            Some(n) => self.read_binary_segment(n, &mut out)?,
            None => loop {
                let b = self.input.next_byte()?;
                if b == BYTE_BREAK {
                    break;
                }
                if b >> 5 != MAJOR_BYTES {
                    return Err(self.chunk_type_mismatch(MAJOR_BYTES, b));
                }
                let n = self.read_chunk_len(b & 0x1F)?;
                self.read_binary_segment(n, &mut out)?;
            },
        }
        Ok(out)
    }

    fn read_binary_segment(&mut self, len: u64, out: &mut Vec<u8>) -> Result<()> {
        let mut remaining = len as usize;
        out.reserve(remaining);
        loop {
            let step = remaining.min(self.input.available());
            out.extend_from_slice(&self.input.window()[..step]);
            self.input.advance(step);
            remaining -= step;
            if remaining == 0 {
                return Ok(());
            }
            self.input.load_more_guaranteed()?;
        }
    }

    // -----------------------------------------------------------------
    // Accessors: text and binary
    // -----------------------------------------------------------------

    /// Textual form of the current event: the string itself for text
    /// values, the key for field names, the decimal rendering for
    /// numbers, and the literal form for booleans and null.
    pub fn get_text(&mut self) -> Result<String> {
        self.finish_pending()?;
        match self.current {
            Some(Event::Text) => Ok(self.text.clone()),
            Some(Event::FieldName) => Ok(self
                .context
                .current_name()
                .map(|n| n.to_string())
                .unwrap_or_default()),
            Some(Event::Int | Event::Float) => Ok(self.number_to_string()),
            Some(Event::Bool(true)) => Ok("true".to_string()),
            Some(Event::Bool(false)) => Ok("false".to_string()),
            Some(Event::Null) => Ok("null".to_string()),
            Some(Event::StartArray) => Ok("[".to_string()),
            Some(Event::EndArray) => Ok("]".to_string()),
            Some(Event::StartObject) => Ok("{".to_string()),
            Some(Event::EndObject) => Ok("}".to_string()),
            Some(Event::EmbeddedBinary) | None => {
                Err(self.malformed_here("no text for current event".into()))
            }
        }
    }

    /// Character count of [`Decoder::get_text`].
    pub fn get_text_length(&mut self) -> Result<usize> {
        if matches!(self.current, Some(Event::Text)) {
            self.finish_pending()?;
            return Ok(self.text.chars().count());
        }
        Ok(self.get_text()?.chars().count())
    }

    /// Whether the current text payload is already materialized and can
    /// be handed out without further input work.
    #[must_use]
    pub fn has_text_characters(&self) -> bool {
        matches!(self.current, Some(Event::Text)) && self.pending.is_none()
    }

    /// The current binary payload, materializing it on first access.
    pub fn get_binary(&mut self) -> Result<&[u8]> {
        if self.current != Some(Event::EmbeddedBinary) {
            return Err(self.malformed_here(
                "current event is not a byte string, can not access as binary".into(),
            ));
        }
        self.finish_pending()?;
        Ok(self.binary.as_deref().unwrap_or(&[]))
    }

    /// Streams the current binary payload into `out` without holding it
    /// in memory, returning the byte count. If the payload was already
    /// materialized it is written from the cached copy.
    pub fn read_binary(&mut self, out: &mut dyn Write) -> Result<u64> {
        if self.current != Some(Event::EmbeddedBinary) {
            return Err(self.malformed_here(
                "current event is not a byte string, can not access as binary".into(),
            ));
        }
        if let Some(bytes) = self.binary.as_deref() {
            out.write_all(bytes)?;
            return Ok(bytes.len() as u64);
        }
        match self.pending.take() {
            None => Ok(0),
            Some(PendingPayload::Binary(Some(n))) => {
                self.copy_bytes_to(n, out)?;
                Ok(n)
            }
            Some(PendingPayload::Binary(None)) => {
                let mut total = 0u64;
                loop {
                    let b = self.input.next_byte()?;
                    if b == BYTE_BREAK {
                        return Ok(total);
                    }
                    if b >> 5 != MAJOR_BYTES {
                        return Err(self.chunk_type_mismatch(MAJOR_BYTES, b));
                    }
                    let n = self.read_chunk_len(b & 0x1F)?;
                    self.copy_bytes_to(n, out)?;
                    total += n;
                }
            }
            Some(other @ PendingPayload::Text(_)) => {
                self.pending = Some(other);
                Err(self.malformed_here("pending payload is text, not binary".into()))
            }
        }
    }

    fn copy_bytes_to(&mut self, len: u64, out: &mut dyn Write) -> Result<()> {
        let mut remaining = len;
        loop {
            let step = remaining.min(self.input.available() as u64) as usize;
            out.write_all(&self.input.window()[..step])?;
            self.input.advance(step);
            remaining -= step as u64;
            if remaining == 0 {
                return Ok(());
            }
            self.input.load_more_guaranteed()?;
        }
    }

    // -----------------------------------------------------------------
    // Accessors: numbers
    // -----------------------------------------------------------------

    /// The natural representation the current number decoded into.
    pub fn get_number_type(&self) -> Result<NumberType> {
        self.number
            .natural
            .ok_or_else(|| self.not_numeric())
    }

    pub fn get_int(&mut self) -> Result<i32> {
        self.check_numeric()?;
        if let Some(v) = self.number.int {
            return Ok(v);
        }
        let v = if let Some(l) = self.number.long {
            i32::try_from(l)
                .map_err(|_| CborError::NumberOverflow(format!("{l} out of range of i32")))?
        } else if let Some(b) = self.number.big.as_ref() {
            i32::try_from(b)
                .map_err(|_| CborError::NumberOverflow(format!("{b} out of range of i32")))?
        } else if let Some(dec) = self.number.decimal.as_ref() {
            let truncated = dec.to_bigint_truncated();
            i32::try_from(&truncated).map_err(|_| {
                CborError::NumberOverflow(format!("{truncated} out of range of i32"))
            })?
        } else if let Some(d) = self.number.double {
            if d < f64::from(i32::MIN) || d > f64::from(i32::MAX) {
                return Err(CborError::NumberOverflow(format!(
                    "{d} out of range of i32"
                )));
            }
            d as i32
        } else {
            return Err(self.not_numeric());
        };
        self.number.int = Some(v);
        Ok(v)
    }

    pub fn get_long(&mut self) -> Result<i64> {
        self.check_numeric()?;
        if let Some(v) = self.number.long {
            return Ok(v);
        }
        let v = if let Some(i) = self.number.int {
            i64::from(i)
        } else if let Some(b) = self.number.big.as_ref() {
            i64::try_from(b)
                .map_err(|_| CborError::NumberOverflow(format!("{b} out of range of i64")))?
        } else if let Some(dec) = self.number.decimal.as_ref() {
            let truncated = dec.to_bigint_truncated();
            i64::try_from(&truncated).map_err(|_| {
                CborError::NumberOverflow(format!("{truncated} out of range of i64"))
            })?
        } else if let Some(d) = self.number.double {
            if d < i64::MIN as f64 || d > i64::MAX as f64 {
                return Err(CborError::NumberOverflow(format!(
                    "{d} out of range of i64"
                )));
            }
            d as i64
        } else {
            return Err(self.not_numeric());
        };
        self.number.long = Some(v);
        Ok(v)
    }

    pub fn get_big_integer(&mut self) -> Result<BigInt> {
        self.check_numeric()?;
        if let Some(b) = self.number.big.as_ref() {
            return Ok(b.clone());
        }
        let v = if let Some(dec) = self.number.decimal.as_ref() {
            dec.to_bigint_truncated()
        } else if let Some(l) = self.number.long {
            BigInt::from(l)
        } else if let Some(i) = self.number.int {
            BigInt::from(i)
        } else if let Some(d) = self.number.double {
            Decimal::try_from_f64(d)?.to_bigint_truncated()
        } else {
            return Err(self.not_numeric());
        };
        self.number.big = Some(v.clone());
        Ok(v)
    }

    pub fn get_double(&mut self) -> Result<f64> {
        self.check_numeric()?;
        if let Some(v) = self.number.double {
            return Ok(v);
        }
        // Start from the most accurate representation present.
        let v = if let Some(dec) = self.number.decimal.as_ref() {
            dec.to_f64()
        } else if let Some(b) = self.number.big.as_ref() {
            b.to_string().parse::<f64>().unwrap_or(f64::INFINITY)
        } else if let Some(l) = self.number.long {
            l as f64
        } else if let Some(i) = self.number.int {
            f64::from(i)
        } else {
            return Err(self.not_numeric());
        };
        self.number.double = Some(v);
        Ok(v)
    }

    pub fn get_float(&mut self) -> Result<f32> {
        if let Some(v) = self.number.float {
            return Ok(v);
        }
        Ok(self.get_double()? as f32)
    }

    pub fn get_big_decimal(&mut self) -> Result<Decimal> {
        self.check_numeric()?;
        if let Some(dec) = self.number.decimal.as_ref() {
            return Ok(dec.clone());
        }
        let v = if let Some(d) = self.number.double {
            Decimal::try_from_f64(d)?
        } else if let Some(b) = self.number.big.as_ref() {
            Decimal::new(b.clone(), 0)
        } else if let Some(l) = self.number.long {
            Decimal::new(BigInt::from(l), 0)
        } else if let Some(i) = self.number.int {
            Decimal::new(BigInt::from(i), 0)
        } else {
            return Err(self.not_numeric());
        };
        self.number.decimal = Some(v.clone());
        Ok(v)
    }

    fn check_numeric(&self) -> Result<()> {
        if matches!(self.current, Some(Event::Int | Event::Float)) {
            Ok(())
        } else {
            Err(self.not_numeric())
        }
    }

    fn not_numeric(&self) -> CborError {
        self.malformed_here(format!(
            "current event {:?} is not numeric, can not use numeric accessors",
            self.current
        ))
    }

    fn number_to_string(&self) -> String {
        match self.number.natural {
            Some(NumberType::Int) => self.number.int.unwrap_or_default().to_string(),
            Some(NumberType::Long) => self.number.long.unwrap_or_default().to_string(),
            Some(NumberType::BigInteger) => self
                .number
                .big
                .as_ref()
                .map(BigInt::to_string)
                .unwrap_or_default(),
            Some(NumberType::Float) => self.number.float.unwrap_or_default().to_string(),
            Some(NumberType::Double) => self.number.double.unwrap_or_default().to_string(),
            Some(NumberType::BigDecimal) => self
                .number
                .decimal
                .as_ref()
                .map(Decimal::to_string)
                .unwrap_or_default(),
            None => String::new(),
        }
    }

    // -----------------------------------------------------------------
    // Errors
    // -----------------------------------------------------------------

    fn malformed_here(&self, msg: String) -> CborError {
        CborError::malformed(msg, self.input.offset())
    }
}

impl<R: Read> Drop for Decoder<R> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Strict UTF-8 decode of a fully buffered payload: an ASCII fast run,
/// then per-character multi-byte decoding via the class table. Errors
/// report the byte position within `bytes`.
fn decode_utf8_slice(
    text: &mut String,
    bytes: &[u8],
) -> core::result::Result<(), (usize, String)> {
    let mut i = 0;
    while i < bytes.len() {
        let run_start = i;
        while i < bytes.len() && bytes[i] < 0x80 {
            i += 1;
        }
        if i > run_start {
            // The run is pure ASCII, so this cannot fail.
            if let Ok(run) = core::str::from_utf8(&bytes[run_start..i]) {
                text.push_str(run);
            }
            if i >= bytes.len() {
                break;
            }
        }
        let b0 = bytes[i];
        let extra = utf8::cont_len(b0);
        if extra < 0 {
            return Err((i, format!("invalid UTF-8 start byte 0x{b0:02X}")));
        }
        let extra = extra as usize;
        if i + extra >= bytes.len() {
            return Err((i, "truncated UTF-8 sequence in text payload".to_string()));
        }
        for k in 1..=extra {
            if !utf8::is_cont(bytes[i + k]) {
                return Err((
                    i + k,
                    format!("invalid UTF-8 middle byte 0x{:02X}", bytes[i + k]),
                ));
            }
        }
        let (code_point, min) = match extra {
            1 => (utf8::combine2(b0, bytes[i + 1]), 0x80),
            2 => (utf8::combine3(b0, bytes[i + 1], bytes[i + 2]), 0x800),
            _ => (
                utf8::combine4(b0, bytes[i + 1], bytes[i + 2], bytes[i + 3]),
                0x1_0000,
            ),
        };
        if code_point < min {
            return Err((i, "overlong UTF-8 sequence".to_string()));
        }
        match char::from_u32(code_point) {
            Some(c) => text.push(c),
            None => {
                return Err((
                    i,
                    format!("illegal code point U+{code_point:04X} in text payload"),
                ))
            }
        }
        i += extra + 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_slice_ascii_and_multibyte() {
        let mut s = String::new();
        decode_utf8_slice(&mut s, "héllo 👍".as_bytes()).unwrap();
        assert_eq!(s, "héllo 👍");
    }

    #[test]
    fn utf8_slice_rejects_bad_start() {
        let mut s = String::new();
        let err = decode_utf8_slice(&mut s, &[0x61, 0xFF, 0x61]).unwrap_err();
        assert_eq!(err.0, 1);
    }

    #[test]
    fn utf8_slice_rejects_truncated() {
        let mut s = String::new();
        assert!(decode_utf8_slice(&mut s, &[0xC3]).is_err());
    }

    #[test]
    fn utf8_slice_rejects_overlong() {
        let mut s = String::new();
        assert!(decode_utf8_slice(&mut s, &[0xC0, 0x80]).is_err());
    }

    #[test]
    fn utf8_slice_rejects_surrogates() {
        // 0xED 0xA0 0x80 encodes U+D800.
        let mut s = String::new();
        assert!(decode_utf8_slice(&mut s, &[0xED, 0xA0, 0x80]).is_err());
    }
}

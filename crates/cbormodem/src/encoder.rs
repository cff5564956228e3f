//! The push-style CBOR encoder.
//!
//! [`Encoder`] turns a sequence of write calls into RFC 7049 bytes with
//! minimal-width headers. Containers are written indefinite-length by
//! default (`9F`/`BF` … `FF`); the definite-length forms used by the
//! sizing wrapper are available through the `_sized` variants.
//!
//! # Examples
//!
//! ```rust
//! use cbormodem::{Encoder, EncoderOptions};
//!
//! let mut enc = Encoder::new(Vec::new(), EncoderOptions::default());
//! enc.write_start_array().unwrap();
//! enc.write_i32(1).unwrap();
//! enc.write_end_array().unwrap();
//! assert_eq!(enc.finish().unwrap(), vec![0x9F, 0x01, 0xFF]);
//! ```

use std::io::{Read, Write};

use num_bigint::BigInt;

use crate::consts::*;
use crate::context::{ContextKind, WriteContext};
use crate::error::{CborError, Result};
use crate::io::ByteOutput;
use crate::numbers::{magnitude_from_bigint, Decimal};
use crate::options::EncoderOptions;

/// Room the integer paths reserve: initial byte plus an 8-byte suffix.
const MAX_HEADER_LEN: usize = 9;

/// The push-style CBOR encoder.
pub struct Encoder<W: Write> {
    out: ByteOutput<W>,
    context: WriteContext,
    options: EncoderOptions,
    closed: bool,
}

impl<W: Write> Encoder<W> {
    pub fn new(sink: W, options: EncoderOptions) -> Self {
        Self {
            out: ByteOutput::new(sink),
            context: WriteContext::new(options.strict_duplicate_detection),
            options,
            closed: false,
        }
    }

    /// Binary values are written natively as byte strings; no base-64
    /// expansion ever happens.
    #[must_use]
    pub fn writes_binary_natively(&self) -> bool {
        true
    }

    /// Total bytes handed to the underlying sink so far (excludes the
    /// buffered tail).
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.out.bytes_written()
    }

    // -----------------------------------------------------------------
    // Structural
    // -----------------------------------------------------------------

    pub fn write_start_array(&mut self) -> Result<()> {
        self.context.write_value("start an array")?;
        self.context.enter_array(false);
        self.out.write_byte(BYTE_ARRAY_INDEFINITE)
    }

    /// Definite-length array opening; the caller commits to exactly
    /// `len` elements and the matching end emits no break byte.
    pub fn write_start_array_sized(&mut self, len: u64) -> Result<()> {
        self.context.write_value("start an array")?;
        self.context.enter_array(true);
        self.write_type_and_uint(PREFIX_ARRAY, len)
    }

    pub fn write_end_array(&mut self) -> Result<()> {
        let definite = self.context.exit(ContextKind::Array)?;
        if definite {
            return Ok(());
        }
        self.out.write_byte(BYTE_BREAK)
    }

    pub fn write_start_object(&mut self) -> Result<()> {
        self.context.write_value("start an object")?;
        self.context.enter_object(false);
        self.out.write_byte(BYTE_OBJECT_INDEFINITE)
    }

    /// Definite-length object opening; `len` counts pairs.
    pub fn write_start_object_sized(&mut self, len: u64) -> Result<()> {
        self.context.write_value("start an object")?;
        self.context.enter_object(true);
        self.write_type_and_uint(PREFIX_OBJECT, len)
    }

    pub fn write_end_object(&mut self) -> Result<()> {
        let definite = self.context.exit(ContextKind::Object)?;
        if definite {
            return Ok(());
        }
        self.out.write_byte(BYTE_BREAK)
    }

    pub fn write_field_name(&mut self, name: &str) -> Result<()> {
        self.context.write_field_name(name)?;
        self.write_text_payload(name)
    }

    /// Convenience for the name/value pair of a string field.
    pub fn write_string_field(&mut self, name: &str, value: &str) -> Result<()> {
        self.write_field_name(name)?;
        self.write_string(value)
    }

    // -----------------------------------------------------------------
    // Scalars
    // -----------------------------------------------------------------

    pub fn write_string(&mut self, text: &str) -> Result<()> {
        self.context.write_value("write a string value")?;
        self.write_text_payload(text)
    }

    pub fn write_binary(&mut self, data: &[u8]) -> Result<()> {
        self.context.write_value("write a binary value")?;
        self.write_type_and_uint(PREFIX_BYTES, data.len() as u64)?;
        self.out.write_bytes(data)
    }

    /// Streams `len` bytes out of `data` as a definite-length byte
    /// string. The length must be known up front because the header is
    /// length-prefixed; running short is an error.
    pub fn write_binary_from(&mut self, data: &mut dyn Read, len: u64) -> Result<()> {
        self.context.write_value("write a binary value")?;
        self.write_type_and_uint(PREFIX_BYTES, len)?;
        let mut remaining = len;
        let mut chunk = [0u8; 4096];
        while remaining > 0 {
            let want = remaining.min(chunk.len() as u64) as usize;
            let got = data.read(&mut chunk[..want])?;
            if got == 0 {
                return Err(CborError::malformed(
                    format!("binary source ended with {remaining} bytes missing"),
                    self.out.bytes_written(),
                ));
            }
            self.out.write_bytes(&chunk[..got])?;
            remaining -= got as u64;
        }
        Ok(())
    }

    pub fn write_bool(&mut self, state: bool) -> Result<()> {
        self.context.write_value("write a boolean value")?;
        self.out
            .write_byte(if state { BYTE_TRUE } else { BYTE_FALSE })
    }

    pub fn write_null(&mut self) -> Result<()> {
        self.context.write_value("write a null value")?;
        self.out.write_byte(BYTE_NULL)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.context.write_value("write a number")?;
        self.write_int_value(i64::from(value))
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.context.write_value("write a number")?;
        // Values in i32 range take the same path and the same bytes.
        self.write_int_value(value)
    }

    /// Unsigned values, including the top half that does not fit `i64`.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.context.write_value("write a number")?;
        self.write_type_and_uint(PREFIX_INT_POS, value)
    }

    pub fn write_big_integer(&mut self, value: &BigInt) -> Result<()> {
        self.context.write_value("write a number")?;
        let (negative, magnitude) = magnitude_from_bigint(value);
        self.write_type_and_uint(
            PREFIX_TAG,
            if negative { TAG_BIGNUM_NEG } else { TAG_BIGNUM_POS },
        )?;
        self.write_type_and_uint(PREFIX_BYTES, magnitude.len() as u64)?;
        self.out.write_bytes(&magnitude)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.context.write_value("write a number")?;
        self.out.ensure_room(5)?;
        self.out.push(BYTE_FLOAT32);
        self.out.append(&value.to_be_bytes());
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.context.write_value("write a number")?;
        self.out.ensure_room(9)?;
        self.out.push(BYTE_FLOAT64);
        self.out.append(&value.to_be_bytes());
        Ok(())
    }

    /// Decimal fraction: tag 4 and a 2-element array of scale and
    /// unscaled value, the unscaled slot using the narrowest of plain
    /// integer or bignum encodings.
    pub fn write_decimal(&mut self, value: &Decimal) -> Result<()> {
        self.context.write_value("write a number")?;
        self.write_type_and_uint(PREFIX_TAG, TAG_DECIMAL_FRACTION)?;
        self.write_type_and_uint(PREFIX_ARRAY, 2)?;
        self.write_int_value(value.scale())?;
        match i64::try_from(value.unscaled()) {
            Ok(unscaled) => self.write_int_value(unscaled)?,
            Err(_) => {
                let (negative, magnitude) = magnitude_from_bigint(value.unscaled());
                self.write_type_and_uint(
                    PREFIX_TAG,
                    if negative { TAG_BIGNUM_NEG } else { TAG_BIGNUM_POS },
                )?;
                self.write_type_and_uint(PREFIX_BYTES, magnitude.len() as u64)?;
                self.out.write_bytes(&magnitude)?;
            }
        }
        Ok(())
    }

    /// Writes a tag in front of the next value. Tags do not count as
    /// values themselves.
    pub fn write_tag(&mut self, tag: u64) -> Result<()> {
        self.write_type_and_uint(PREFIX_TAG, tag)
    }

    // -----------------------------------------------------------------
    // Raw escape hatch
    // -----------------------------------------------------------------

    /// Inserts one raw byte, bypassing framing and context checks.
    pub fn write_raw_byte(&mut self, b: u8) -> Result<()> {
        self.out.write_byte(b)
    }

    /// Inserts raw bytes, bypassing framing and context checks.
    pub fn write_raw_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.out.write_bytes(data)
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Drains the internal buffer and, per `flush_passed_to_stream`,
    /// flushes the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush(self.options.flush_passed_to_stream)
    }

    /// Closes the encoder: with `auto_close_content`, every still-open
    /// container gets its end marker first; then the buffer drains and,
    /// with `auto_close_target`, the sink is dropped.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.close_content()?;
        self.out.flush_buffer()?;
        if self.options.auto_close_target {
            self.out.release(true);
        } else {
            // We keep the sink open, so at least push our bytes through.
            self.out.flush(true)?;
            self.out.release(false);
        }
        Ok(())
    }

    /// Closes open content, drains the buffer and hands back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.close_content()?;
        self.closed = true;
        self.out.flush(self.options.flush_passed_to_stream)?;
        self.out.release(false);
        self.out
            .take_sink()
            .ok_or_else(|| CborError::Unsupported("encoder sink already taken"))
    }

    fn close_content(&mut self) -> Result<()> {
        if !self.options.auto_close_content {
            return Ok(());
        }
        while !self.context.in_root() {
            match self.context.kind() {
                ContextKind::Array => self.write_end_array()?,
                ContextKind::Object => self.write_end_object()?,
                ContextKind::Root => break,
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Framing
    // -----------------------------------------------------------------

    /// Signed integer with minimal-width header, splitting the sign into
    /// major type 0 or 1.
    fn write_int_value(&mut self, value: i64) -> Result<()> {
        if value < 0 {
            // -1 - value, computed without overflowing at i64::MIN.
            let magnitude = !(value as u64);
            self.write_type_and_uint(PREFIX_INT_NEG, magnitude)
        } else {
            self.write_type_and_uint(PREFIX_INT_POS, value as u64)
        }
    }

    /// Initial byte plus minimal-length suffix: inline below 24, else
    /// the narrowest of 1/2/4/8 bytes.
    fn write_type_and_uint(&mut self, prefix: u8, value: u64) -> Result<()> {
        self.out.ensure_room(MAX_HEADER_LEN)?;
        if value < 24 {
            self.out.push(prefix + value as u8);
        } else if value <= u64::from(u8::MAX) {
            self.out.push(prefix + 24);
            self.out.push(value as u8);
        } else if value <= u64::from(u16::MAX) {
            self.out.push(prefix + 25);
            self.out.append(&(value as u16).to_be_bytes());
        } else if value <= u64::from(u32::MAX) {
            self.out.push(prefix + 26);
            self.out.append(&(value as u32).to_be_bytes());
        } else {
            self.out.push(prefix + 27);
            self.out.append(&value.to_be_bytes());
        }
        Ok(())
    }

    /// Text framing. The byte length of a `&str` is known up front, so
    /// both the short regime (inline length, one header byte) and the
    /// long regime (1/2/4/8-byte length suffix) emit the exact
    /// definite-length header and then the UTF-8 bytes; oversized
    /// payloads drain through the buffer in chunks.
    fn write_text_payload(&mut self, text: &str) -> Result<()> {
        let bytes = text.as_bytes();
        self.write_type_and_uint(PREFIX_TEXT, bytes.len() as u64)?;
        self.out.write_bytes(bytes)
    }
}

impl<W: Write> Drop for Encoder<W> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

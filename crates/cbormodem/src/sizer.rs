//! Definite-length sizing wrapper around [`Encoder`].
//!
//! [`SizingEncoder`] buffers every event written inside an open
//! container; when the outermost container closes it replays the whole
//! run against the inner encoder, opening each container with its now
//! known element count. The output is byte-identical to a one-pass
//! definite-length encoding.
//!
//! The price is memory proportional to the event count of the largest
//! enclosing container, so this wrapper suits documents, not unbounded
//! streams.
//!
//! # Examples
//!
//! ```rust
//! use cbormodem::{EncoderOptions, SizingEncoder};
//!
//! let mut enc = SizingEncoder::new(Vec::new(), EncoderOptions::default());
//! enc.write_start_array().unwrap();
//! for v in [1, 2, 3] {
//!     enc.write_i32(v).unwrap();
//! }
//! enc.write_end_array().unwrap();
//! assert_eq!(enc.finish().unwrap(), vec![0x83, 0x01, 0x02, 0x03]);
//! ```

use std::io::Write;

use num_bigint::BigInt;

use crate::context::{ContextKind, WriteContext};
use crate::encoder::Encoder;
use crate::error::Result;
use crate::numbers::Decimal;
use crate::options::EncoderOptions;

/// One buffered write. Scalars live inline; a finished container
/// becomes a [`DeferredEvent::Run`] appended to its parent's queue.
#[derive(Debug)]
enum DeferredEvent {
    FieldName(String),
    Text(String),
    Binary(Vec<u8>),
    Int(i64),
    UInt(u64),
    Big(BigInt),
    F32(f32),
    F64(f64),
    Dec(Decimal),
    Bool(bool),
    Null,
    Tag(u64),
    Raw(Vec<u8>),
    Run {
        object: bool,
        events: Vec<DeferredEvent>,
    },
}

/// Number of values a run holds at its own level: tags and field names
/// frame values rather than count as them.
fn value_count(events: &[DeferredEvent]) -> u64 {
    events
        .iter()
        .filter(|e| !matches!(e, DeferredEvent::Tag(_) | DeferredEvent::FieldName(_)))
        .count() as u64
}

fn name_count(events: &[DeferredEvent]) -> u64 {
    events
        .iter()
        .filter(|e| matches!(e, DeferredEvent::FieldName(_)))
        .count() as u64
}

fn replay<W: Write>(inner: &mut Encoder<W>, events: &[DeferredEvent]) -> Result<()> {
    for event in events {
        match event {
            DeferredEvent::FieldName(name) => inner.write_field_name(name)?,
            DeferredEvent::Text(text) => inner.write_string(text)?,
            DeferredEvent::Binary(data) => inner.write_binary(data)?,
            DeferredEvent::Int(v) => inner.write_i64(*v)?,
            DeferredEvent::UInt(v) => inner.write_u64(*v)?,
            DeferredEvent::Big(v) => inner.write_big_integer(v)?,
            DeferredEvent::F32(v) => inner.write_f32(*v)?,
            DeferredEvent::F64(v) => inner.write_f64(*v)?,
            DeferredEvent::Dec(v) => inner.write_decimal(v)?,
            DeferredEvent::Bool(v) => inner.write_bool(*v)?,
            DeferredEvent::Null => inner.write_null()?,
            DeferredEvent::Tag(tag) => inner.write_tag(*tag)?,
            DeferredEvent::Raw(data) => inner.write_raw_bytes(data)?,
            DeferredEvent::Run { object, events } => {
                if *object {
                    inner.write_start_object_sized(name_count(events))?;
                } else {
                    inner.write_start_array_sized(value_count(events))?;
                }
                replay(inner, events)?;
                if *object {
                    inner.write_end_object()?;
                } else {
                    inner.write_end_array()?;
                }
            }
        }
    }
    Ok(())
}

/// Encoder decorator producing definite-length arrays and maps.
pub struct SizingEncoder<W: Write> {
    inner: Encoder<W>,
    /// Mirror of the inner write context so misuse surfaces at call
    /// time, not at replay.
    context: WriteContext,
    /// Events of the innermost open container.
    queue: Vec<DeferredEvent>,
    /// Queues of the enclosing containers, outermost first.
    stack: Vec<Vec<DeferredEvent>>,
}

impl<W: Write> SizingEncoder<W> {
    pub fn new(sink: W, options: EncoderOptions) -> Self {
        Self {
            inner: Encoder::new(sink, options),
            context: WriteContext::new(options.strict_duplicate_detection),
            queue: Vec::new(),
            stack: Vec::new(),
        }
    }

    #[must_use]
    pub fn writes_binary_natively(&self) -> bool {
        self.inner.writes_binary_natively()
    }

    fn queuing(&self) -> bool {
        !self.context.in_root()
    }

    fn enqueue(&mut self, event: DeferredEvent) {
        self.queue.push(event);
    }

    // -----------------------------------------------------------------
    // Structural
    // -----------------------------------------------------------------

    pub fn write_start_array(&mut self) -> Result<()> {
        self.context.write_value("start an array")?;
        self.context.enter_array(true);
        self.stack.push(core::mem::take(&mut self.queue));
        Ok(())
    }

    pub fn write_end_array(&mut self) -> Result<()> {
        self.context.exit(ContextKind::Array)?;
        self.finish_container(false)
    }

    pub fn write_start_object(&mut self) -> Result<()> {
        self.context.write_value("start an object")?;
        self.context.enter_object(true);
        self.stack.push(core::mem::take(&mut self.queue));
        Ok(())
    }

    pub fn write_end_object(&mut self) -> Result<()> {
        self.context.exit(ContextKind::Object)?;
        self.finish_container(true)
    }

    fn finish_container(&mut self, object: bool) -> Result<()> {
        let events = core::mem::replace(
            &mut self.queue,
            self.stack.pop().unwrap_or_default(),
        );
        let run = DeferredEvent::Run { object, events };
        self.queue.push(run);
        if self.context.in_root() {
            let top_level = core::mem::take(&mut self.queue);
            replay(&mut self.inner, &top_level)?;
        }
        Ok(())
    }

    pub fn write_field_name(&mut self, name: &str) -> Result<()> {
        self.context.write_field_name(name)?;
        self.enqueue(DeferredEvent::FieldName(name.to_string()));
        Ok(())
    }

    pub fn write_string_field(&mut self, name: &str, value: &str) -> Result<()> {
        self.write_field_name(name)?;
        self.write_string(value)
    }

    // -----------------------------------------------------------------
    // Scalars: buffered while a container is open, passed straight
    // through at the root.
    // -----------------------------------------------------------------

    pub fn write_string(&mut self, text: &str) -> Result<()> {
        self.context.write_value("write a string value")?;
        if self.queuing() {
            self.enqueue(DeferredEvent::Text(text.to_string()));
            Ok(())
        } else {
            self.inner.write_string(text)
        }
    }

    pub fn write_binary(&mut self, data: &[u8]) -> Result<()> {
        self.context.write_value("write a binary value")?;
        if self.queuing() {
            self.enqueue(DeferredEvent::Binary(data.to_vec()));
            Ok(())
        } else {
            self.inner.write_binary(data)
        }
    }

    pub fn write_bool(&mut self, state: bool) -> Result<()> {
        self.context.write_value("write a boolean value")?;
        if self.queuing() {
            self.enqueue(DeferredEvent::Bool(state));
            Ok(())
        } else {
            self.inner.write_bool(state)
        }
    }

    pub fn write_null(&mut self) -> Result<()> {
        self.context.write_value("write a null value")?;
        if self.queuing() {
            self.enqueue(DeferredEvent::Null);
            Ok(())
        } else {
            self.inner.write_null()
        }
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_i64(i64::from(value))
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.context.write_value("write a number")?;
        if self.queuing() {
            self.enqueue(DeferredEvent::Int(value));
            Ok(())
        } else {
            self.inner.write_i64(value)
        }
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.context.write_value("write a number")?;
        if self.queuing() {
            self.enqueue(DeferredEvent::UInt(value));
            Ok(())
        } else {
            self.inner.write_u64(value)
        }
    }

    pub fn write_big_integer(&mut self, value: &BigInt) -> Result<()> {
        self.context.write_value("write a number")?;
        if self.queuing() {
            self.enqueue(DeferredEvent::Big(value.clone()));
            Ok(())
        } else {
            self.inner.write_big_integer(value)
        }
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.context.write_value("write a number")?;
        if self.queuing() {
            self.enqueue(DeferredEvent::F32(value));
            Ok(())
        } else {
            self.inner.write_f32(value)
        }
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.context.write_value("write a number")?;
        if self.queuing() {
            self.enqueue(DeferredEvent::F64(value));
            Ok(())
        } else {
            self.inner.write_f64(value)
        }
    }

    pub fn write_decimal(&mut self, value: &Decimal) -> Result<()> {
        self.context.write_value("write a number")?;
        if self.queuing() {
            self.enqueue(DeferredEvent::Dec(value.clone()));
            Ok(())
        } else {
            self.inner.write_decimal(value)
        }
    }

    pub fn write_tag(&mut self, tag: u64) -> Result<()> {
        if self.queuing() {
            self.enqueue(DeferredEvent::Tag(tag));
            Ok(())
        } else {
            self.inner.write_tag(tag)
        }
    }

    /// Raw bytes, bypassing framing. Counted as one value when sizing.
    pub fn write_raw_bytes(&mut self, data: &[u8]) -> Result<()> {
        if self.queuing() {
            self.enqueue(DeferredEvent::Raw(data.to_vec()));
            Ok(())
        } else {
            self.inner.write_raw_bytes(data)
        }
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Flushes bytes already handed to the inner encoder. Buffered
    /// events stay buffered; they have no byte form until their
    /// container closes.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    pub fn close(&mut self) -> Result<()> {
        self.close_content()?;
        self.inner.close()
    }

    /// Closes open content and hands back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.close_content()?;
        self.inner.finish()
    }

    fn close_content(&mut self) -> Result<()> {
        while !self.context.in_root() {
            match self.context.kind() {
                ContextKind::Array => self.write_end_array()?,
                ContextKind::Object => self.write_end_object()?,
                ContextKind::Root => break,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizer() -> SizingEncoder<Vec<u8>> {
        SizingEncoder::new(Vec::new(), EncoderOptions::default())
    }

    #[test]
    fn scalar_at_root_passes_through() {
        let mut enc = sizer();
        enc.write_bool(true).unwrap();
        assert_eq!(enc.finish().unwrap(), vec![0xF5]);
    }

    #[test]
    fn empty_containers_are_definite() {
        let mut enc = sizer();
        enc.write_start_array().unwrap();
        enc.write_end_array().unwrap();
        assert_eq!(enc.finish().unwrap(), vec![0x80]);

        let mut enc = sizer();
        enc.write_start_object().unwrap();
        enc.write_end_object().unwrap();
        assert_eq!(enc.finish().unwrap(), vec![0xA0]);
    }

    #[test]
    fn nested_runs_count_as_single_elements() {
        // [1, [2, 3]] => 82 01 82 02 03
        let mut enc = sizer();
        enc.write_start_array().unwrap();
        enc.write_i32(1).unwrap();
        enc.write_start_array().unwrap();
        enc.write_i32(2).unwrap();
        enc.write_i32(3).unwrap();
        enc.write_end_array().unwrap();
        enc.write_end_array().unwrap();
        assert_eq!(
            enc.finish().unwrap(),
            vec![0x82, 0x01, 0x82, 0x02, 0x03]
        );
    }

    #[test]
    fn object_counts_pairs() {
        // {"a": 1, "b": [true]} => A2 61 61 01 61 62 81 F5
        let mut enc = sizer();
        enc.write_start_object().unwrap();
        enc.write_field_name("a").unwrap();
        enc.write_i32(1).unwrap();
        enc.write_field_name("b").unwrap();
        enc.write_start_array().unwrap();
        enc.write_bool(true).unwrap();
        enc.write_end_array().unwrap();
        enc.write_end_object().unwrap();
        assert_eq!(
            enc.finish().unwrap(),
            vec![0xA2, 0x61, 0x61, 0x01, 0x61, 0x62, 0x81, 0xF5]
        );
    }

    #[test]
    fn tags_do_not_inflate_counts() {
        // [tag(2) bignum would be odd here; use a tagged int]
        let mut enc = sizer();
        enc.write_start_array().unwrap();
        enc.write_tag(1).unwrap();
        enc.write_i32(0).unwrap();
        enc.write_end_array().unwrap();
        assert_eq!(enc.finish().unwrap(), vec![0x81, 0xC1, 0x00]);
    }

    #[test]
    fn misuse_surfaces_before_replay() {
        let mut enc = sizer();
        enc.write_start_object().unwrap();
        assert!(enc.write_i32(1).is_err());
    }
}

//! A streaming CBOR (RFC 7049) codec: a pull-style decoder producing
//! JSON-shaped token events, and a push-style encoder (with a
//! definite-length sizing wrapper) consuming them.
//!
//! ```
//! use cbormodem::{CborFactory, Event};
//!
//! let factory = CborFactory::new();
//!
//! let mut enc = factory.encoder(Vec::new());
//! enc.write_start_object().unwrap();
//! enc.write_field_name("answer").unwrap();
//! enc.write_i32(42).unwrap();
//! enc.write_end_object().unwrap();
//! let bytes = enc.finish().unwrap();
//!
//! let mut dec = factory.decoder_for_slice(&bytes);
//! assert_eq!(dec.next_token().unwrap(), Some(Event::StartObject));
//! assert_eq!(dec.next_token().unwrap(), Some(Event::FieldName));
//! assert_eq!(dec.current_name(), Some("answer"));
//! assert_eq!(dec.next_token().unwrap(), Some(Event::Int));
//! assert_eq!(dec.get_int().unwrap(), 42);
//! assert_eq!(dec.next_token().unwrap(), Some(Event::EndObject));
//! ```

mod consts;
mod context;
mod decoder;
mod encoder;
mod error;
mod event;
mod factory;
mod io;
mod numbers;
mod options;
mod sizer;
mod symbols;
mod utf8;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{CborError, Result};
pub use event::{Event, MatchStrength, NumberType};
pub use factory::CborFactory;
pub use numbers::Decimal;
pub use options::{DecoderOptions, EncoderOptions};
pub use sizer::SizingEncoder;
pub use symbols::SymbolTable;

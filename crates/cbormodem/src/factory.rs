//! The factory pairing byte sources and sinks with codec instances.
//!
//! A [`CborFactory`] carries the decoder/encoder options and owns the
//! root symbol table, which every decoder it creates shares; a document
//! stream with a stable vocabulary pays the field-name decode cost only
//! once across parser lifetimes.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::consts::{MAJOR_ARRAY, MAJOR_OBJECT, MAJOR_SIMPLE, MAJOR_TAG};
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::event::MatchStrength;
use crate::options::{DecoderOptions, EncoderOptions};
use crate::sizer::SizingEncoder;
use crate::symbols::SymbolTable;

/// Factory for decoders and encoders sharing one configuration and one
/// symbol table.
///
/// # Examples
///
/// ```rust
/// use cbormodem::{CborFactory, Event};
///
/// let factory = CborFactory::new();
/// let mut enc = factory.encoder(Vec::new());
/// enc.write_string("hi").unwrap();
/// let bytes = enc.finish().unwrap();
///
/// let mut dec = factory.decoder_for_slice(&bytes);
/// assert_eq!(dec.next_token().unwrap(), Some(Event::Text));
/// assert_eq!(dec.get_text().unwrap(), "hi");
/// ```
pub struct CborFactory {
    decoder_options: DecoderOptions,
    encoder_options: EncoderOptions,
    symbols: Arc<SymbolTable>,
}

impl Default for CborFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CborFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(DecoderOptions::default(), EncoderOptions::default())
    }

    #[must_use]
    pub fn with_options(decoder: DecoderOptions, encoder: EncoderOptions) -> Self {
        Self {
            decoder_options: decoder,
            encoder_options: encoder,
            symbols: Arc::new(SymbolTable::new()),
        }
    }

    #[must_use]
    pub fn decoder_options(&self) -> DecoderOptions {
        self.decoder_options
    }

    #[must_use]
    pub fn encoder_options(&self) -> EncoderOptions {
        self.encoder_options
    }

    /// The shared field-name symbol table.
    #[must_use]
    pub fn symbol_table(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    /// A decoder over any byte source.
    pub fn decoder<R: Read>(&self, source: R) -> Decoder<R> {
        Decoder::with_symbols(source, self.decoder_options, Arc::clone(&self.symbols))
    }

    /// A decoder over an in-memory slice.
    pub fn decoder_for_slice<'a>(&self, data: &'a [u8]) -> Decoder<&'a [u8]> {
        self.decoder(data)
    }

    /// An indefinite-length (streaming) encoder over any byte sink.
    pub fn encoder<W: Write>(&self, sink: W) -> Encoder<W> {
        Encoder::new(sink, self.encoder_options)
    }

    /// A definite-length encoder; see [`SizingEncoder`] for the
    /// memory/latency trade it makes.
    pub fn sizing_encoder<W: Write>(&self, sink: W) -> SizingEncoder<W> {
        SizingEncoder::new(sink, self.encoder_options)
    }

    /// Probes leading bytes for CBOR. The self-describe prefix
    /// `D9 D9 F7` is conclusive; a structural opening is a solid match;
    /// any other valid initial byte is weak evidence at best, since
    /// plenty of formats share those byte values.
    #[must_use]
    pub fn has_format(&self, input: &[u8]) -> MatchStrength {
        let Some(&first) = input.first() else {
            return MatchStrength::NoMatch;
        };
        if first == 0xD9 {
            return if input.len() >= 3 && input[1] == 0xD9 && input[2] == 0xF7 {
                MatchStrength::FullMatch
            } else {
                MatchStrength::WeakMatch
            };
        }
        let major = first >> 5;
        let info = first & 0x1F;
        if info > 27 && info != 31 {
            return MatchStrength::NoMatch;
        }
        match major {
            MAJOR_ARRAY | MAJOR_OBJECT => MatchStrength::SolidMatch,
            MAJOR_SIMPLE => match info {
                20..=22 | 25..=27 => MatchStrength::WeakMatch,
                _ => MatchStrength::NoMatch,
            },
            MAJOR_TAG => MatchStrength::WeakMatch,
            _ => MatchStrength::WeakMatch,
        }
    }
}

/// Configuration options for [`crate::Decoder`].
///
/// # Examples
///
/// ```rust
/// use cbormodem::DecoderOptions;
///
/// let options = DecoderOptions {
///     strict_duplicate_detection: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DecoderOptions {
    /// Whether decoded field names are canonicalized through the shared
    /// symbol table, so that repeated keys across a document (and across
    /// decoders created by the same factory) resolve to one shared
    /// allocation.
    ///
    /// # Default
    ///
    /// `true`
    pub intern_field_names: bool,

    /// Whether a repeated field name within a single object scope is
    /// rejected with `CborError::DuplicateField`.
    ///
    /// # Default
    ///
    /// `false`
    pub strict_duplicate_detection: bool,

    /// Whether the underlying source is dropped when the decoder closes,
    /// either explicitly or on hard end-of-input at a root boundary.
    ///
    /// # Default
    ///
    /// `true`
    pub auto_close_source: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            intern_field_names: true,
            strict_duplicate_detection: false,
            auto_close_source: true,
        }
    }
}

/// Configuration options for [`crate::Encoder`] and
/// [`crate::SizingEncoder`].
#[derive(Debug, Clone, Copy)]
pub struct EncoderOptions {
    /// Whether writing the same field name twice in one object scope is
    /// rejected with `CborError::DuplicateField`.
    ///
    /// # Default
    ///
    /// `false`
    pub strict_duplicate_detection: bool,

    /// Whether `close` synthesizes the matching end event for every
    /// still-open container before flushing.
    ///
    /// # Default
    ///
    /// `true`
    pub auto_close_content: bool,

    /// Whether the underlying sink is dropped (and thereby closed) when
    /// the encoder closes.
    ///
    /// # Default
    ///
    /// `true`
    pub auto_close_target: bool,

    /// Whether `flush` is forwarded to the underlying sink after the
    /// internal buffer drains.
    ///
    /// # Default
    ///
    /// `true`
    pub flush_passed_to_stream: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            strict_duplicate_detection: false,
            auto_close_content: true,
            auto_close_target: true,
            flush_passed_to_stream: true,
        }
    }
}

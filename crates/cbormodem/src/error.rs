use thiserror::Error;

/// Convenience alias used by every fallible codec operation.
pub type Result<T> = core::result::Result<T, CborError>;

/// Errors surfaced by the decoder, encoder and sizing wrapper.
///
/// All errors are synchronous and leave the codec instance open; the
/// caller decides whether to `close` it. The only self-closing condition
/// is a hard end-of-input at a root boundary, which is not an error.
#[derive(Error, Debug)]
pub enum CborError {
    /// Structurally invalid CBOR: bad initial byte, truncated header,
    /// misplaced break, mismatched chunk type, invalid UTF-8, or an
    /// unexpected end of input in the middle of a token.
    #[error("malformed input at byte {offset}: {msg}")]
    Malformed { msg: String, offset: u64 },

    /// An explicit narrowing (`get_int`, `get_long`, declared container
    /// or payload length) found a value outside the target range.
    #[error("numeric value out of range: {0}")]
    NumberOverflow(String),

    /// A value was written where a field name was expected, an `end_*`
    /// call did not match the open container, or similar misuse of the
    /// write API.
    #[error("write context violation: {0}")]
    WriteContextViolation(String),

    /// The same field name was written or decoded twice in one object
    /// scope while strict duplicate detection is enabled.
    #[error("duplicate field name {0:?}")]
    DuplicateField(String),

    /// Operation the byte-oriented codec cannot express, such as raw
    /// text passthrough.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Error bubbled up from the underlying source or sink.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CborError {
    pub(crate) fn malformed(msg: impl Into<String>, offset: u64) -> Self {
        CborError::Malformed {
            msg: msg.into(),
            offset,
        }
    }

    pub(crate) fn unexpected_eof(offset: u64) -> Self {
        CborError::malformed("unexpected end of input", offset)
    }
}

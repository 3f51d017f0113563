use super::object::ObjRef;
use thiserror::Error;

/// Structural errors surfaced while parsing a PDF file.
///
/// Every variant is fatal for the parse of that file except the
/// missing-object condition, which is handled inside the resolver by
/// substituting a null value (dangling references are common in real
/// files and do not abort the parse).
#[derive(Debug, Error)]
pub enum ParseError {
    /// The cross-reference machinery is broken: missing or invalid
    /// `startxref`, `xref` or `trailer` keywords, non-numeric counts or
    /// offsets, or a missing `%%EOF` marker.
    #[error("malformed xref: {0}")]
    MalformedXref(String),

    /// An xref offset does not point at a header matching the expected
    /// object and generation numbers.
    #[error("object {expected} not found at offset {offset}: {found}")]
    CorruptOffset {
        offset: usize,
        expected: ObjRef,
        found: String,
    },

    /// A stream body could not be delimited: bad line terminator after
    /// `stream`, payload past end of file, or a trailing keyword sequence
    /// other than `endstream endobj`. The offset is where the body starts.
    #[error("malformed stream at offset {offset}: {reason}")]
    MalformedStream { offset: usize, reason: String },

    /// A page tree node lacks the expected type tag or `Kids` array.
    #[error("malformed page tree: {0}")]
    MalformedPageTree(String),

    /// The token stream did not match the grammar at this point.
    #[error("unexpected token at offset {offset}: expected {expected}, found {found}")]
    UnexpectedToken {
        offset: usize,
        expected: &'static str,
        found: String,
    },

    /// Ran off the end of the byte buffer.
    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// Document-level structure is unusable (no Root, Root is not a
    /// dictionary, and the like).
    #[error("invalid document structure: {0}")]
    Structure(String),

    /// The filter pipeline reported corrupt data during the decode pre-pass.
    #[error("stream decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced by the stream filter pipeline.
///
/// An unsupported filter is distinct from corrupt data: the former leaves
/// the raw payload in place, the latter aborts the parse.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported filter: {0}")]
    Unsupported(String),

    #[error("corrupt stream data: {0}")]
    Corrupt(String),
}

/// Result type alias for PDF parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

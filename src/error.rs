//! Error types for the tabrw library

use std::io;

/// Library error type for tabrw operations
#[derive(Debug, thiserror::Error)]
pub enum TabError {
    /// Input ended before a record could be fully read
    #[error("truncated input at byte {offset}")]
    TruncatedInput { offset: usize },

    /// Text could not be represented in the windows-1252 charset
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The leading version field is not a known tablature signature
    #[error("unrecognized format: {0:?}")]
    UnrecognizedFormat(String),

    /// The signature is recognized but the revision is not supported
    #[error("unsupported version: {0:?}")]
    UnsupportedVersion(String),

    /// A count or flag field is inconsistent with the surrounding record
    #[error("malformed record at byte {offset}: {reason}")]
    MalformedRecord { offset: usize, reason: String },

    /// A tick count no symbolic duration can reproduce
    #[error("no representable duration for {0} ticks")]
    UnrepresentableDuration(i64),

    /// The song uses a construct the target dialect cannot express
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<io::Error> for TabError {
    fn from(error: io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

//! Error types for the name registry core.

use thiserror::Error;

/// Core errors that can occur while encoding or decoding registry data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("unknown event kind: {0}")]
    UnknownEventKind(u16),

    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Validation errors for labels, durations, and configuration.
///
/// These are always checked before any registry state is read or written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("label is empty")]
    EmptyLabel,

    #[error("label length {len} is outside the allowed range {min}..={max}")]
    LabelLength { len: usize, min: usize, max: usize },

    #[error("label contains invalid character {ch:?} at position {index}")]
    InvalidCharacter { ch: char, index: usize },

    #[error("label must not start or end with a hyphen")]
    EdgeHyphen,

    #[error("duration {duration} is outside the allowed range 1..={max}")]
    InvalidDuration { duration: u32, max: u32 },

    #[error("fee computation overflowed")]
    FeeOverflow,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

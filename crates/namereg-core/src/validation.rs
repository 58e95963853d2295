//! Label and duration validation.
//!
//! The registry is the authority on what a valid label is. Front ends may
//! pre-check with the same rules, but every state-changing operation
//! re-validates here before touching state.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::Label;

/// Shortest label the default policy accepts.
pub const MIN_LABEL_LENGTH: usize = 3;

/// Longest label the default policy accepts (one DNS label).
pub const MAX_LABEL_LENGTH: usize = 63;

/// Length and character rules for labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPolicy {
    /// Minimum length in characters (inclusive).
    pub min_length: usize,
    /// Maximum length in characters (inclusive).
    pub max_length: usize,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            min_length: MIN_LABEL_LENGTH,
            max_length: MAX_LABEL_LENGTH,
        }
    }
}

/// Validate a raw label against a policy.
///
/// This performs:
/// - Empty check
/// - Length bounds (in characters)
/// - Character set: `a-z`, `0-9`, `-`
/// - No leading or trailing hyphen
pub fn validate_label(raw: &str, policy: &LabelPolicy) -> Result<Label, ValidationError> {
    check_characters(raw)?;

    // All characters are ASCII past this point, so bytes == chars.
    let len = raw.len();
    if len < policy.min_length || len > policy.max_length {
        return Err(ValidationError::LabelLength {
            len,
            min: policy.min_length,
            max: policy.max_length,
        });
    }

    check_hyphens(raw)?;
    Ok(Label::from_validated(raw.to_owned()))
}

/// Validate a label's characters and hyphen placement, ignoring length.
///
/// Labels read back from a journal or decoded with serde go through this:
/// the length bounds are registry configuration, and a label accepted under
/// one policy must stay readable under any other.
pub fn validate_label_form(raw: &str) -> Result<Label, ValidationError> {
    check_characters(raw)?;
    check_hyphens(raw)?;
    Ok(Label::from_validated(raw.to_owned()))
}

fn check_characters(raw: &str) -> Result<(), ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::EmptyLabel);
    }
    for (index, ch) in raw.chars().enumerate() {
        if !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-') {
            return Err(ValidationError::InvalidCharacter { ch, index });
        }
    }
    Ok(())
}

fn check_hyphens(raw: &str) -> Result<(), ValidationError> {
    if raw.starts_with('-') || raw.ends_with('-') {
        return Err(ValidationError::EdgeHyphen);
    }
    Ok(())
}

/// Validate a duration, in whole periods, against the configured maximum.
pub fn validate_duration(duration: u32, max: u32) -> Result<(), ValidationError> {
    if duration == 0 || duration > max {
        return Err(ValidationError::InvalidDuration { duration, max });
    }
    Ok(())
}

//! Strong type definitions for the name registry.
//!
//! Identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds since the Unix epoch, as read from the execution environment's clock.
pub type Timestamp = u64;

/// An amount of the registry's payment unit.
pub type Amount = u128;

/// A validated, human-readable name, excluding any suffix.
///
/// Construct with [`crate::validate_label`], [`Label::parse`] or
/// [`Label::parse_with`], which enforce the character rules and a length
/// policy. Deserializing checks the character rules only, so labels
/// registered under a non-default policy remain readable.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label(String);

impl Label {
    /// Parse a label using the default [`crate::LabelPolicy`].
    pub fn parse(s: &str) -> Result<Self, crate::ValidationError> {
        crate::validation::validate_label(s, &crate::LabelPolicy::default())
    }

    /// Parse a label against `policy`.
    pub fn parse_with(s: &str, policy: &crate::LabelPolicy) -> Result<Self, crate::ValidationError> {
        crate::validation::validate_label(s, policy)
    }

    /// Wrap a string that has already passed validation.
    pub(crate) fn from_validated(s: String) -> Self {
        Self(s)
    }

    /// The label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters. This is the length the pricing table is keyed by.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({})", self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Label {
    type Error = crate::ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        crate::validation::validate_label_form(&s)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.0
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The ownership token minted by a successful registration.
///
/// Token ids are never reused: re-registering a label after it lapses mints
/// a new token and supersedes the old one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u64);

impl TokenId {
    /// The first token id minted by a fresh registry.
    pub const FIRST: Self = Self(1);

    /// The id after this one, or `None` if the space is exhausted.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.0)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

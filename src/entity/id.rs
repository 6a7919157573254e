use std::fmt;

use super::NoteId;
use crate::error::{NoteError, Result};

/// Identifiers that look like ids but are reserved by the UI.
const SENTINELS: &[&str] = &["undefined", "null", "new"];

/// An identifier as handed over by a caller, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawId<'a> {
    Number(NoteId),
    Text(&'a str),
    Missing,
}

impl RawId<'_> {
    /// Integer coercion without sentinel checks, for cache lookups.
    pub fn coerce(&self) -> Option<NoteId> {
        match self {
            RawId::Number(id) => Some(*id),
            RawId::Text(s) => s.trim().parse().ok(),
            RawId::Missing => None,
        }
    }
}

impl fmt::Display for RawId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Number(id) => write!(f, "{}", id),
            RawId::Text(s) => write!(f, "{}", s),
            RawId::Missing => write!(f, "<missing>"),
        }
    }
}

impl From<NoteId> for RawId<'_> {
    fn from(id: NoteId) -> Self {
        RawId::Number(id)
    }
}

impl<'a> From<&'a str> for RawId<'a> {
    fn from(s: &'a str) -> Self {
        RawId::Text(s)
    }
}

impl<'a> From<&'a String> for RawId<'a> {
    fn from(s: &'a String) -> Self {
        RawId::Text(s.as_str())
    }
}

impl<'a, T: Into<RawId<'a>>> From<Option<T>> for RawId<'a> {
    fn from(id: Option<T>) -> Self {
        id.map(Into::into).unwrap_or(RawId::Missing)
    }
}

/// Reject missing, sentinel and non-integer ids before anything goes on the wire.
pub fn validate_id<'a>(raw: impl Into<RawId<'a>>) -> Result<NoteId> {
    match raw.into() {
        RawId::Number(id) => Ok(id),
        RawId::Missing => Err(NoteError::Validation("missing note id".to_string())),
        RawId::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Err(NoteError::Validation("missing note id".to_string()));
            }
            if SENTINELS.contains(&trimmed) {
                return Err(NoteError::Validation(format!(
                    "'{}' is not a note id",
                    trimmed
                )));
            }
            trimmed.parse::<NoteId>().map_err(|_| {
                NoteError::Validation(format!("'{}' is not an integer", trimmed))
            })
        }
    }
}

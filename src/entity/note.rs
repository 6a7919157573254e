// src/entity/note.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::fields;

pub type NoteId = i64;

pub const DEFAULT_TITLE: &str = "Untitled";

/// A note as confirmed by the backend. Always carries a server-assigned `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(deserialize_with = "fields::lenient_id")]
    pub id: NoteId,
    #[serde(default, deserialize_with = "fields::nullable_string")]
    pub title: String,
    #[serde(default, deserialize_with = "fields::nullable_string")]
    pub content: String,
    #[serde(default, deserialize_with = "fields::lenient_tags")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "fields::lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "fields::lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    /// Case-insensitive substring match on title, content or any tag.
    /// `needle` must already be lowercased.
    pub(crate) fn matches_query(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Input for create/update. Absent fields are filled in by [`NoteDraft::into_payload`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
            tags: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Apply the defensive defaults: blank title becomes "Untitled", blank
    /// content becomes "", missing tags become an empty list.
    pub fn into_payload(self) -> NotePayload {
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let content = self
            .content
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        NotePayload {
            title,
            content,
            tags: self.tags.unwrap_or_default(),
        }
    }
}

/// Request body sent on POST/PUT.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotePayload {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Partial field changes for optimistic, local-only updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NoteChanges {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.updated_at.is_none()
    }

    pub fn apply_to(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
        if let Some(tags) = &self.tags {
            note.tags = tags.clone();
        }
        if let Some(updated_at) = self.updated_at {
            note.updated_at = Some(updated_at);
        }
    }
}

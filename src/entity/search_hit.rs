use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::NoteId;
use crate::normalize::fields;

/// One record returned by a search. May be a full note or only part of one;
/// unknown fields (scores, snippets) are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default, deserialize_with = "fields::lenient_opt_id")]
    pub id: Option<NoteId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "fields::lenient_tags")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchHit {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(super::note::DEFAULT_TITLE)
    }
}

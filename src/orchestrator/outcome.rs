use serde::{Deserialize, Serialize};

use crate::entity::Note;

/// Result of the secondary index rebuild. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum ReindexOutcome {
    Completed,
    Failed(String),
}

impl ReindexOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ReindexOutcome::Completed)
    }
}

/// A durably created note plus what happened to the follow-up reindex.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Created {
    pub note: Note,
    pub reindex: ReindexOutcome,
}

/// Backend verdict on a draft that was checked but not saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftCheck {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Tags the backend would extract from the content
    #[serde(default)]
    pub auto_tags: Vec<String>,
}

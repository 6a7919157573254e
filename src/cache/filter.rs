use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::entity::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Title,
    CreatedAt,
    #[default]
    UpdatedAt,
}

impl std::fmt::Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortField::Title => write!(f, "title"),
            SortField::CreatedAt => write!(f, "created_at"),
            SortField::UpdatedAt => write!(f, "updated_at"),
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "title" => Ok(SortField::Title),
            "created_at" | "created" => Ok(SortField::CreatedAt),
            "updated_at" | "updated" => Ok(SortField::UpdatedAt),
            _ => Err(format!("Invalid sort field: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(format!("Invalid sort order: {}", s)),
        }
    }
}

/// Projection settings for [`super::NoteCache::filtered_notes`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheFilter {
    /// Case-insensitive substring over title, content and tags
    pub search_query: String,
    /// Exact tag match
    pub tag: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

/// Partial filter change; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct FilterUpdate {
    pub search_query: Option<String>,
    pub tag: Option<Option<String>>, // Some(None) to clear, Some(Some(t)) to set
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
}

impl CacheFilter {
    pub fn merge(&mut self, update: FilterUpdate) {
        if let Some(query) = update.search_query {
            self.search_query = query;
        }
        if let Some(tag) = update.tag {
            self.tag = tag;
        }
        if let Some(sort_by) = update.sort_by {
            self.sort_by = sort_by;
        }
        if let Some(sort_order) = update.sort_order {
            self.sort_order = sort_order;
        }
    }

    /// Filter and stably sort. Equal keys keep their input order.
    pub fn apply<'a>(&self, notes: impl IntoIterator<Item = &'a Note>) -> Vec<&'a Note> {
        let needle = self.search_query.to_lowercase();
        let mut selected: Vec<&Note> = notes
            .into_iter()
            .filter(|note| needle.is_empty() || note.matches_query(&needle))
            .filter(|note| self.tag.as_deref().map_or(true, |tag| note.has_tag(tag)))
            .collect();

        selected.sort_by(|a, b| {
            let ordering = compare(a, b, self.sort_by);
            match self.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        selected
    }
}

fn compare(a: &Note, b: &Note, field: SortField) -> Ordering {
    match field {
        SortField::Title => collate(&a.title, &b.title),
        // Missing timestamps sort before any present one
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

/// Case-insensitive collation; strings equal ignoring case put lowercase first.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

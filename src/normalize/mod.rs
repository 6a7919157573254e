//! Envelope normalization for backend responses.
//!
//! The backend has wrapped its payloads differently across revisions
//! (`{data: {note}}`, `{note}`, the bare note, paginated `{data: {items}}` ...).
//! Each expected shape owns an ordered list of candidate paths; extraction
//! walks the list and takes the first candidate that looks right. Supporting
//! a new envelope is a single entry in one of the lists below.
//!
//! This is the only module that knows about envelope layouts. Everything
//! past it works with [`Note`], [`SearchHit`] and tag strings.

pub mod fields;

use serde_json::Value;
use tracing::{debug, warn};

use crate::entity::{Note, SearchHit};
use crate::error::{NoteError, Result};

/// A candidate extraction path: pure lookup, no side effects.
type Candidate = fn(&Value) -> Option<&Value>;

/// The payload a caller expects from a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    SingleNote,
    NoteList,
    TagList,
    SearchResultList,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::SingleNote => write!(f, "single-note"),
            Shape::NoteList => write!(f, "note-list"),
            Shape::TagList => write!(f, "tag-list"),
            Shape::SearchResultList => write!(f, "search-result-list"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Note(Note),
    Notes(Vec<Note>),
    Tags(Vec<String>),
    SearchResults(Vec<SearchHit>),
}

fn data(body: &Value) -> Option<&Value> {
    body.get("data")
}

fn data_note(body: &Value) -> Option<&Value> {
    body.get("data")?.get("note")
}

fn flat_note(body: &Value) -> Option<&Value> {
    body.get("note")
}

fn data_notes(body: &Value) -> Option<&Value> {
    body.get("data")?.get("notes")
}

fn flat_notes(body: &Value) -> Option<&Value> {
    body.get("notes")
}

fn data_items(body: &Value) -> Option<&Value> {
    body.get("data")?.get("items")
}

fn data_tags(body: &Value) -> Option<&Value> {
    body.get("data")?.get("tags")
}

fn flat_tags(body: &Value) -> Option<&Value> {
    body.get("tags")
}

fn data_results(body: &Value) -> Option<&Value> {
    body.get("data")?.get("results")
}

fn flat_results(body: &Value) -> Option<&Value> {
    body.get("results")
}

fn whole_body(body: &Value) -> Option<&Value> {
    Some(body)
}

const NOTE_PATHS: &[(&str, Candidate)] = &[
    ("data.note", data_note),
    ("note", flat_note),
    ("data", data),
    ("<body>", whole_body),
];

const NOTE_LIST_PATHS: &[(&str, Candidate)] = &[
    ("data.notes", data_notes),
    ("notes", flat_notes),
    ("data.items", data_items),
    ("data", data),
    ("<body>", whole_body),
];

const TAG_LIST_PATHS: &[(&str, Candidate)] = &[
    ("data.tags", data_tags),
    ("tags", flat_tags),
    ("data", data),
    ("<body>", whole_body),
];

const SEARCH_PATHS: &[(&str, Candidate)] = &[
    ("data.results", data_results),
    ("results", flat_results),
    ("data.notes", data_notes),
    ("notes", flat_notes),
    ("data", data),
    ("<body>", whole_body),
];

fn first_match<'a>(
    body: &'a Value,
    paths: &[(&'static str, Candidate)],
    accept: impl Fn(&Value) -> bool,
) -> Option<(&'static str, &'a Value)> {
    paths
        .iter()
        .find_map(|(name, path)| path(body).filter(|v| accept(v)).map(|v| (*name, v)))
}

fn has_id(value: &Value) -> bool {
    value.get("id").map(|id| !id.is_null()).unwrap_or(false)
}

/// Extract a single note. Candidates are tried in order and the first one
/// that carries an `id` and deserializes wins. Fails with `ShapeError` when
/// none does.
pub fn extract_note(body: &Value) -> Result<Note> {
    let mut rejected = None;
    for &(path, candidate) in NOTE_PATHS {
        let Some(raw) = candidate(body).filter(|v| has_id(v)) else {
            continue;
        };
        match serde_json::from_value::<Note>(raw.clone()) {
            Ok(note) => {
                debug!(path, "extracted note");
                return Ok(note);
            }
            Err(e) => {
                debug!(path, error = %e, "candidate note did not deserialize");
                if rejected.is_none() {
                    rejected = Some(format!("malformed note at '{}': {}", path, e));
                }
            }
        }
    }

    Err(NoteError::Shape(rejected.unwrap_or_else(|| {
        "no note with an id found in response".to_string()
    })))
}

/// Extract a note list. Unrecognized shapes yield an empty list, and list
/// items without a usable `id` are dropped so they never reach the cache.
pub fn extract_notes(body: &Value) -> Vec<Note> {
    let Some((path, raw)) = first_match(body, NOTE_LIST_PATHS, Value::is_array) else {
        warn!(body = %body, "unrecognized note list response, treating as empty");
        return Vec::new();
    };
    debug!(path, "extracted note list");

    let items = raw.as_array().map(Vec::as_slice).unwrap_or_default();
    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<Note>(item.clone()) {
            Ok(note) => Some(note),
            Err(e) => {
                warn!(error = %e, "dropping note without a usable id");
                None
            }
        })
        .collect()
}

/// Extract the tag list, skipping non-string entries and duplicates.
pub fn extract_tags(body: &Value) -> Vec<String> {
    let Some((path, raw)) = first_match(body, TAG_LIST_PATHS, Value::is_array) else {
        warn!(body = %body, "unrecognized tag list response, treating as empty");
        return Vec::new();
    };
    debug!(path, "extracted tag list");

    let mut tags: Vec<String> = Vec::new();
    for tag in raw.as_array().into_iter().flatten().filter_map(Value::as_str) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Extract search results. Partial records are accepted; non-object entries are skipped.
pub fn extract_search_results(body: &Value) -> Vec<SearchHit> {
    let Some((path, raw)) = first_match(body, SEARCH_PATHS, Value::is_array) else {
        warn!(body = %body, "unrecognized search response, treating as empty");
        return Vec::new();
    };
    debug!(path, "extracted search results");

    raw.as_array()
        .into_iter()
        .flatten()
        .filter(|item| item.is_object())
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}

/// Backend statistics are passed through untouched, unwrapped from `data` if present.
pub fn extract_stats(body: &Value) -> Value {
    match body.get("data") {
        Some(inner) if inner.is_object() => inner.clone(),
        _ => body.clone(),
    }
}

/// Dispatch on the expected shape.
pub fn normalize(body: &Value, shape: Shape) -> Result<Payload> {
    Ok(match shape {
        Shape::SingleNote => Payload::Note(extract_note(body)?),
        Shape::NoteList => Payload::Notes(extract_notes(body)),
        Shape::TagList => Payload::Tags(extract_tags(body)),
        Shape::SearchResultList => Payload::SearchResults(extract_search_results(body)),
    })
}

/// True when a response body declares itself failed despite a 2xx status.
pub fn is_error_envelope(body: &Value) -> bool {
    body.get("success") == Some(&Value::Bool(false))
}

/// Human-readable failure message from an error body: `message`, then `error`.
pub fn error_message(body: &Value) -> Option<String> {
    fn text(value: Option<&Value>) -> Option<String> {
        match value? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Object(map) => text(map.get("message")),
            _ => None,
        }
    }

    text(body.get("message")).or_else(|| text(body.get("error")))
}

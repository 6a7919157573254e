use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::warn;

use super::filter::{CacheFilter, FilterUpdate};
use crate::entity::{Note, NoteChanges, NoteId, RawId, SearchHit};

/// The one cache of a client session, shared by the orchestrator and readers.
///
/// Lock it briefly and never hold the guard across a network call.
pub type SharedCache = Arc<Mutex<NoteCache>>;

/// Per-id lifecycle of a write: `Idle -> Pending -> Committed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteState {
    Idle,
    Pending,
    Committed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoteStats {
    pub total: usize,
    pub tag_count: usize,
    pub recently_updated: usize,
}

/// Client-side note state.
///
/// Each note is stored once in `records`; the ordered list and the current
/// selection are ids into it, so an optimistic edit is visible through both.
#[derive(Debug)]
pub struct NoteCache {
    records: HashMap<NoteId, Note>,
    order: Vec<NoteId>,
    current: Option<NoteId>,
    tags: Vec<String>,
    search_results: Vec<SearchHit>,
    loading: bool,
    error: Option<String>,
    filter: CacheFilter,
    writes: HashMap<NoteId, WriteState>,
    revision: watch::Sender<u64>,
}

impl Default for NoteCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteCache {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            records: HashMap::new(),
            order: Vec::new(),
            current: None,
            tags: Vec::new(),
            search_results: Vec::new(),
            loading: false,
            error: None,
            filter: CacheFilter::default(),
            writes: HashMap::new(),
            revision,
        }
    }

    /// Wrap a fresh cache for sharing across the session.
    pub fn shared() -> SharedCache {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Receiver that observes a revision counter bumped on every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn touch(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    // ------------------------------------------------------------------
    // Read accessors (no I/O)
    // ------------------------------------------------------------------

    /// Listed notes in load order.
    pub fn notes(&self) -> Vec<&Note> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    pub fn note_count(&self) -> usize {
        self.order.len()
    }

    pub fn current_note(&self) -> Option<&Note> {
        self.current.and_then(|id| self.records.get(&id))
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn search_results(&self) -> &[SearchHit] {
        &self.search_results
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn filter(&self) -> &CacheFilter {
        &self.filter
    }

    pub fn write_state(&self, id: NoteId) -> WriteState {
        self.writes.get(&id).copied().unwrap_or(WriteState::Idle)
    }

    /// Listed notes after the current filter: query, then tag, then stable sort.
    pub fn filtered_notes(&self) -> Vec<&Note> {
        self.filter.apply(self.notes())
    }

    pub fn note_stats(&self) -> NoteStats {
        self.note_stats_at(Utc::now())
    }

    /// Stats with `recently_updated` counted against the 24 hours before `now`.
    pub fn note_stats_at(&self, now: DateTime<Utc>) -> NoteStats {
        let cutoff = now - Duration::hours(24);
        NoteStats {
            total: self.order.len(),
            tag_count: self.tags.len(),
            recently_updated: self
                .notes()
                .into_iter()
                .filter(|n| n.updated_at.map_or(false, |t| t > cutoff))
                .count(),
        }
    }

    pub fn tag_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for note in self.notes() {
            for tag in &note.tags {
                *counts.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Look up a listed note, coercing `id` to an integer.
    pub fn get_cached_note<'a>(&self, id: impl Into<RawId<'a>>) -> Option<&Note> {
        let id = id.into().coerce()?;
        if self.order.contains(&id) {
            self.records.get(&id)
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------

    /// Replace the listed notes wholesale, keeping the current selection's record.
    pub fn replace_all(&mut self, notes: Vec<Note>) {
        let kept_current = self
            .current
            .filter(|id| !notes.iter().any(|n| n.id == *id))
            .and_then(|id| self.records.remove(&id));

        self.records.clear();
        self.order.clear();
        for note in notes {
            if self.records.contains_key(&note.id) {
                warn!(note_id = note.id, "duplicate note id in list, keeping first");
                continue;
            }
            self.order.push(note.id);
            self.records.insert(note.id, note);
        }
        if let Some(note) = kept_current {
            self.records.insert(note.id, note);
        }
        let records = &self.records;
        self.writes
            .retain(|id, state| *state != WriteState::Committed && records.contains_key(id));
        self.touch();
    }

    /// Replace a listed note in place, or insert it at the front.
    pub fn upsert(&mut self, note: Note) {
        if !self.order.contains(&note.id) {
            self.order.insert(0, note.id);
        }
        self.records.insert(note.id, note);
        self.touch();
    }

    /// Drop a note; clears the selection if it pointed at `id`.
    pub fn remove(&mut self, id: NoteId) -> bool {
        let listed = self.order.contains(&id);
        self.order.retain(|existing| *existing != id);
        self.records.remove(&id);
        self.writes.remove(&id);
        if self.current == Some(id) {
            self.current = None;
        }
        self.touch();
        listed
    }

    /// Optimistic local edit. Touches the single record behind both the list
    /// entry and the selection; performs no I/O.
    pub fn update_in_place(&mut self, id: NoteId, changes: &NoteChanges) -> bool {
        let Some(note) = self.records.get_mut(&id) else {
            return false;
        };
        changes.apply_to(note);
        self.touch();
        true
    }

    /// Set (or clear) the selection. A listed copy of the same id is refreshed.
    pub fn set_current_note(&mut self, note: Option<Note>) {
        if let Some(previous) = self.current.take() {
            if !self.order.contains(&previous) {
                self.records.remove(&previous);
            }
        }
        if let Some(note) = note {
            self.current = Some(note.id);
            self.records.insert(note.id, note);
        }
        self.touch();
    }

    /// Select an already cached note by id.
    pub fn select(&mut self, id: NoteId) -> bool {
        if !self.records.contains_key(&id) {
            return false;
        }
        if let Some(previous) = self.current {
            if previous != id && !self.order.contains(&previous) {
                self.records.remove(&previous);
            }
        }
        self.current = Some(id);
        self.touch();
        true
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = tags;
        self.touch();
    }

    pub fn set_search_results(&mut self, results: Vec<SearchHit>) {
        self.search_results = results;
        self.touch();
    }

    pub fn clear_search_results(&mut self) {
        self.set_search_results(Vec::new());
    }

    pub fn set_filter(&mut self, update: FilterUpdate) {
        self.filter.merge(update);
        self.touch();
    }

    pub fn clear_error(&mut self) {
        self.error = None;
        self.touch();
    }

    /// Enter an operation: `loading` on, previous error cleared.
    pub(crate) fn begin_operation(&mut self) {
        self.loading = true;
        self.error = None;
        self.touch();
    }

    /// Leave an operation: `loading` off, `error` written only on failure.
    /// A success leaves an error recorded by an overlapping operation alone.
    pub(crate) fn end_operation(&mut self, error: Option<String>) {
        self.loading = false;
        if let Some(error) = error {
            self.error = Some(error);
        }
        self.touch();
    }

    /// Record a write's state. A committed write to a note that is no longer
    /// cached (a delete) leaves nothing to track.
    pub(crate) fn set_write_state(&mut self, id: NoteId, state: WriteState) {
        if state == WriteState::Committed && !self.records.contains_key(&id) {
            self.writes.remove(&id);
        } else {
            self.writes.insert(id, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{SortField, SortOrder};
    use serde_json::json;

    fn note(id: i64, title: &str, tags: &[&str], updated: &str) -> Note {
        serde_json::from_value(json!({
            "id": id,
            "title": title,
            "content": format!("content of {}", title),
            "tags": tags,
            "created_at": updated,
            "updated_at": updated
        }))
        .unwrap()
    }

    fn fruit_cache() -> NoteCache {
        let mut cache = NoteCache::new();
        cache.replace_all(vec![
            note(1, "Banana", &["fruit"], "2025-01-02T00:00:00"),
            note(2, "apple", &["fruit", "red"], "2025-01-03T00:00:00"),
            note(3, "Cherry", &["red"], "2025-01-01T00:00:00"),
        ]);
        cache
    }

    fn titles(notes: &[&Note]) -> Vec<String> {
        notes.iter().map(|n| n.title.clone()).collect()
    }

    #[test]
    fn test_title_sort_locale_order() {
        let mut cache = fruit_cache();
        cache.set_filter(FilterUpdate {
            sort_by: Some(SortField::Title),
            sort_order: Some(SortOrder::Asc),
            ..FilterUpdate::default()
        });
        assert_eq!(titles(&cache.filtered_notes()), vec!["apple", "Banana", "Cherry"]);

        cache.set_filter(FilterUpdate {
            sort_order: Some(SortOrder::Desc),
            ..FilterUpdate::default()
        });
        assert_eq!(titles(&cache.filtered_notes()), vec!["Cherry", "Banana", "apple"]);
    }

    #[test]
    fn test_default_sort_is_updated_desc() {
        let cache = fruit_cache();
        assert_eq!(titles(&cache.filtered_notes()), vec!["apple", "Banana", "Cherry"]);
    }

    #[test]
    fn test_query_and_tag_filters() {
        let mut cache = fruit_cache();
        cache.set_filter(FilterUpdate {
            search_query: Some("RED".to_string()),
            ..FilterUpdate::default()
        });
        assert_eq!(cache.filtered_notes().len(), 2);

        cache.set_filter(FilterUpdate {
            search_query: Some("content of b".to_string()),
            ..FilterUpdate::default()
        });
        assert_eq!(titles(&cache.filtered_notes()), vec!["Banana"]);

        cache.set_filter(FilterUpdate {
            search_query: Some(String::new()),
            tag: Some(Some("fruit".to_string())),
            ..FilterUpdate::default()
        });
        let ids: Vec<i64> = cache.filtered_notes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 1]);

        // Exact match only
        cache.set_filter(FilterUpdate {
            tag: Some(Some("fru".to_string())),
            ..FilterUpdate::default()
        });
        assert!(cache.filtered_notes().is_empty());
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let mut cache = NoteCache::new();
        cache.replace_all(vec![
            note(10, "same", &[], "2025-01-01T00:00:00"),
            note(11, "Same", &[], "2025-01-01T00:00:00"),
            note(12, "same", &[], "2025-01-01T00:00:00"),
        ]);
        // updated_at all equal: load order is kept in both directions
        let ids: Vec<i64> = cache.filtered_notes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![10, 11, 12]);

        cache.set_filter(FilterUpdate {
            sort_by: Some(SortField::Title),
            sort_order: Some(SortOrder::Asc),
            ..FilterUpdate::default()
        });
        let ids: Vec<i64> = cache.filtered_notes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![10, 12, 11]);
    }

    #[test]
    fn test_filtered_notes_idempotent() {
        let mut cache = fruit_cache();
        cache.set_filter(FilterUpdate {
            search_query: Some("e".to_string()),
            sort_by: Some(SortField::Title),
            ..FilterUpdate::default()
        });
        let once: Vec<Note> = cache.filtered_notes().into_iter().cloned().collect();
        let twice: Vec<&Note> = cache.filter().apply(once.iter());
        assert_eq!(twice.into_iter().cloned().collect::<Vec<_>>(), once);
        assert_eq!(
            cache.filtered_notes().into_iter().cloned().collect::<Vec<_>>(),
            once
        );
    }

    #[test]
    fn test_note_stats_and_tag_counts() {
        let mut cache = fruit_cache();
        cache.set_tags(vec!["fruit".to_string(), "red".to_string()]);
        let now = "2025-01-03T12:00:00Z".parse::<DateTime<Utc>>().unwrap();

        let stats = cache.note_stats_at(now);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.tag_count, 2);
        assert_eq!(stats.recently_updated, 1);

        let counts = cache.tag_counts();
        assert_eq!(counts.get("fruit"), Some(&2));
        assert_eq!(counts.get("red"), Some(&2));
    }

    #[test]
    fn test_get_cached_note_coerces() {
        let cache = fruit_cache();
        assert_eq!(cache.get_cached_note("2").unwrap().title, "apple");
        assert_eq!(cache.get_cached_note(3_i64).unwrap().title, "Cherry");
        assert!(cache.get_cached_note("99").is_none());
        assert!(cache.get_cached_note("new").is_none());
    }

    #[test]
    fn test_upsert_front_and_in_place() {
        let mut cache = fruit_cache();
        cache.upsert(note(4, "Date", &[], "2025-01-04T00:00:00"));
        assert_eq!(cache.notes()[0].id, 4);

        cache.upsert(note(2, "apricot", &[], "2025-01-05T00:00:00"));
        let ids: Vec<i64> = cache.notes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![4, 1, 2, 3]);
        assert_eq!(cache.get_cached_note(2_i64).unwrap().title, "apricot");
    }

    #[test]
    fn test_update_in_place_aliases_current() {
        let mut cache = fruit_cache();
        assert!(cache.select(1));
        assert!(cache.update_in_place(1, &NoteChanges::title("Plantain")));

        assert_eq!(cache.current_note().unwrap().title, "Plantain");
        assert_eq!(cache.get_cached_note(1_i64).unwrap().title, "Plantain");
        assert!(!cache.update_in_place(42, &NoteChanges::title("nope")));
    }

    #[test]
    fn test_remove_clears_matching_selection_only() {
        let mut cache = fruit_cache();
        cache.select(1);
        cache.remove(2);
        assert_eq!(cache.current_note().unwrap().id, 1);

        cache.remove(1);
        assert!(cache.current_note().is_none());
        assert_eq!(cache.note_count(), 1);
    }

    #[test]
    fn test_replace_all_keeps_unlisted_selection() {
        let mut cache = NoteCache::new();
        cache.set_current_note(Some(note(9, "detail", &[], "2025-01-01T00:00:00")));
        cache.replace_all(vec![note(1, "a", &[], "2025-01-01T00:00:00")]);

        assert_eq!(cache.current_note().unwrap().id, 9);
        assert!(cache.get_cached_note(9_i64).is_none());
        assert_eq!(cache.note_count(), 1);
    }

    #[test]
    fn test_replace_all_skips_duplicates() {
        let mut cache = NoteCache::new();
        cache.replace_all(vec![
            note(1, "first", &[], "2025-01-01T00:00:00"),
            note(1, "second", &[], "2025-01-01T00:00:00"),
        ]);
        assert_eq!(cache.note_count(), 1);
        assert_eq!(cache.notes()[0].title, "first");
    }

    #[test]
    fn test_operation_flags() {
        let mut cache = NoteCache::new();
        cache.end_operation(Some("boom".to_string()));
        assert!(cache.has_error());

        cache.begin_operation();
        assert!(cache.is_loading());
        assert!(!cache.has_error());

        cache.end_operation(None);
        assert!(!cache.is_loading());
        assert_eq!(cache.error(), None);
        assert_eq!(cache.write_state(5), WriteState::Idle);
    }

    #[test]
    fn test_success_keeps_overlapping_failure() {
        let mut cache = NoteCache::new();
        cache.begin_operation();
        cache.begin_operation();
        cache.end_operation(Some("db down".to_string()));
        cache.end_operation(None);
        assert_eq!(cache.error(), Some("db down"));
        assert!(!cache.is_loading());
    }

    #[test]
    fn test_write_states_are_pruned() {
        let mut cache = NoteCache::new();
        cache.upsert(note(1, "a", &[], "2025-01-01T00:00:00"));
        cache.upsert(note(2, "b", &[], "2025-01-01T00:00:00"));
        cache.set_write_state(1, WriteState::Committed);
        cache.set_write_state(2, WriteState::Failed);

        cache.remove(2);
        assert_eq!(cache.write_state(2), WriteState::Idle);
        cache.set_write_state(2, WriteState::Committed);
        assert_eq!(cache.write_state(2), WriteState::Idle);

        cache.set_write_state(3, WriteState::Failed);
        cache.replace_all(vec![note(1, "a", &[], "2025-01-01T00:00:00")]);
        assert_eq!(cache.write_state(1), WriteState::Idle);
        assert_eq!(cache.write_state(3), WriteState::Idle);
        assert!(cache.writes.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_revisions() {
        let mut cache = NoteCache::new();
        let mut rx = cache.subscribe();
        let before = cache.revision();

        cache.upsert(note(1, "a", &[], "2025-01-01T00:00:00"));
        rx.changed().await.unwrap();
        assert!(*rx.borrow() > before);
    }
}

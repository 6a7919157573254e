//! Note reads and writes against the backend, reconciled into the cache.
//!
//! Every operation raises `loading` on entry and clears any previous `error`;
//! on exit `loading` drops and `error` is written only if the operation failed.
//! Errors are always returned to the caller as well.
//!
//! Writes are not serialized. Two updates to the same id that are in flight
//! at once both reconcile via `upsert`, and whichever response arrives last
//! wins. The data model has no version field to detect this.

mod outcome;

use std::future::Future;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

pub use outcome::{Created, DraftCheck, ReindexOutcome};

use crate::cache::{SharedCache, WriteState};
use crate::config::ClientConfig;
use crate::entity::{validate_id, Note, NoteChanges, NoteDraft, NoteId, RawId, SearchHit};
use crate::error::{NoteError, Result};
use crate::normalize;
use crate::transport::{Method, RawResponse, RequestOptions, Transport};

pub struct NoteOrchestrator {
    transport: Arc<dyn Transport>,
    cache: SharedCache,
    config: ClientConfig,
}

impl NoteOrchestrator {
    pub fn new(transport: Arc<dyn Transport>, cache: SharedCache, config: ClientConfig) -> Self {
        Self {
            transport,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    async fn send(
        &self,
        method: Method,
        resource: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<RawResponse> {
        let path = self.config.api_path(resource);
        self.transport.send(method, &path, body, options).await
    }

    /// Run `op` between `begin_operation` and `end_operation`. When `write` is
    /// set, the id's write state moves Pending -> Committed | Failed.
    async fn tracked<T, F>(&self, write: Option<NoteId>, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        {
            let mut cache = self.cache.lock().await;
            cache.begin_operation();
            if let Some(id) = write {
                cache.set_write_state(id, WriteState::Pending);
            }
        }

        let result = op.await;

        let mut cache = self.cache.lock().await;
        if let Some(id) = write {
            let state = if result.is_ok() {
                WriteState::Committed
            } else {
                WriteState::Failed
            };
            cache.set_write_state(id, state);
        }
        cache.end_operation(result.as_ref().err().map(NoteError::message));
        result
    }

    /// Fetch all notes and replace the cached list. On failure the list is emptied.
    pub async fn list(&self) -> Result<Vec<Note>> {
        self.tracked(None, async {
            match self
                .send(Method::GET, "notes", None, RequestOptions::new())
                .await
            {
                Ok(response) => {
                    let notes = normalize::extract_notes(&response.body);
                    info!(count = notes.len(), "loaded notes");
                    self.cache.lock().await.replace_all(notes.clone());
                    Ok(notes)
                }
                Err(err) => {
                    self.cache.lock().await.replace_all(Vec::new());
                    Err(err)
                }
            }
        })
        .await
    }

    /// Fetch one note and make it the current selection.
    pub async fn get<'a>(&self, id: impl Into<RawId<'a>>) -> Result<Note> {
        let id = validate_id(id)?;
        self.tracked(None, async {
            let response = self
                .send(Method::GET, &format!("notes/{}", id), None, RequestOptions::new())
                .await?;
            let note = normalize::extract_note(&response.body)?;
            self.cache.lock().await.set_current_note(Some(note.clone()));
            Ok(note)
        })
        .await
    }

    /// Create a note, then ask the backend to rebuild its search index.
    ///
    /// The rebuild is best effort: its failure is logged and reported in
    /// [`Created::reindex`] but never fails or rolls back the create.
    pub async fn create(&self, draft: NoteDraft) -> Result<Created> {
        let payload = serde_json::to_value(draft.into_payload())?;
        self.tracked(None, async {
            let response = self
                .send(Method::POST, "notes", Some(payload), RequestOptions::new())
                .await?;
            let note = normalize::extract_note(&response.body)?;
            info!(note_id = note.id, title = %note.title, "created note");

            {
                let mut cache = self.cache.lock().await;
                cache.upsert(note.clone());
                cache.select(note.id);
                cache.set_write_state(note.id, WriteState::Committed);
            }

            let reindex = self.reindex().await;
            Ok(Created { note, reindex })
        })
        .await
    }

    /// Trigger a RAG index rebuild. Never fails; the outcome is informational.
    pub async fn reindex(&self) -> ReindexOutcome {
        match self
            .send(Method::POST, "rag/rebuild", None, RequestOptions::new())
            .await
        {
            Ok(_) => {
                info!("search index rebuild triggered");
                ReindexOutcome::Completed
            }
            Err(err) => {
                warn!(error = %err, "search index rebuild failed, note is still saved");
                ReindexOutcome::Failed(err.message())
            }
        }
    }

    /// Replace a note's fields on the backend and in the cache.
    pub async fn update<'a>(&self, id: impl Into<RawId<'a>>, draft: NoteDraft) -> Result<Note> {
        let id = validate_id(id)?;
        let payload = serde_json::to_value(draft.into_payload())?;
        self.tracked(Some(id), async {
            let response = self
                .send(
                    Method::PUT,
                    &format!("notes/{}", id),
                    Some(payload),
                    RequestOptions::new(),
                )
                .await?;
            let note = normalize::extract_note(&response.body)?;
            if note.id != id {
                warn!(requested = id, returned = note.id, "backend returned a different note id");
            }
            info!(note_id = note.id, "updated note");

            let mut cache = self.cache.lock().await;
            cache.upsert(note.clone());
            cache.select(note.id);
            Ok(note)
        })
        .await
    }

    /// Delete a note; the selection is cleared if it was the deleted note.
    pub async fn delete<'a>(&self, id: impl Into<RawId<'a>>) -> Result<()> {
        let id = validate_id(id)?;
        self.tracked(Some(id), async {
            self.send(
                Method::DELETE,
                &format!("notes/{}", id),
                None,
                RequestOptions::new(),
            )
            .await?;
            self.cache.lock().await.remove(id);
            info!(note_id = id, "deleted note");
            Ok(())
        })
        .await
    }

    /// Search notes. A blank query yields no results without a request.
    pub async fn search(&self, query: &str, use_rag: bool) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            self.cache.lock().await.clear_search_results();
            return Ok(Vec::new());
        }

        let body = json!({
            "query": query,
            "limit": self.config.search_limit,
            "use_rag": use_rag,
        });
        self.tracked(None, async {
            match self
                .send(Method::POST, "notes/search", Some(body), RequestOptions::new())
                .await
            {
                Ok(response) => {
                    let results = normalize::extract_search_results(&response.body);
                    info!(query, count = results.len(), use_rag, "search complete");
                    self.cache.lock().await.set_search_results(results.clone());
                    Ok(results)
                }
                Err(err) => {
                    self.cache.lock().await.clear_search_results();
                    Err(err)
                }
            }
        })
        .await
    }

    /// Fetch the backend tag list into the cache. On failure the tags are cleared.
    pub async fn fetch_tags(&self) -> Result<Vec<String>> {
        match self
            .send(Method::GET, "notes/tags", None, RequestOptions::new())
            .await
        {
            Ok(response) => {
                let tags = normalize::extract_tags(&response.body);
                self.cache.lock().await.set_tags(tags.clone());
                Ok(tags)
            }
            Err(err) => {
                self.cache.lock().await.set_tags(Vec::new());
                Err(err)
            }
        }
    }

    /// Backend-computed statistics, passed through as JSON.
    pub async fn fetch_stats(&self) -> Result<Value> {
        let response = self
            .send(Method::GET, "notes/stats", None, RequestOptions::new())
            .await?;
        Ok(normalize::extract_stats(&response.body))
    }

    /// Notes carrying `tag`, straight from the backend. The cache is not touched.
    pub async fn list_by_tag(&self, tag: &str) -> Result<Vec<Note>> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(NoteError::Validation("tag must not be empty".to_string()));
        }
        let resource = format!("notes/tags/{}", urlencoding::encode(tag));
        let response = self
            .send(Method::GET, &resource, None, RequestOptions::new())
            .await?;
        Ok(normalize::extract_notes(&response.body))
    }

    /// The `limit` most recent notes. The cache is not touched.
    pub async fn recent(&self, limit: usize) -> Result<Vec<Note>> {
        let response = self
            .send(
                Method::GET,
                "notes/recent",
                None,
                RequestOptions::new().query("limit", limit),
            )
            .await?;
        Ok(normalize::extract_notes(&response.body))
    }

    /// Ask the backend to check a draft without saving it.
    pub async fn validate(&self, draft: NoteDraft) -> Result<DraftCheck> {
        let payload = serde_json::to_value(draft.into_payload())?;
        let response = self
            .send(Method::POST, "notes/validate", Some(payload), RequestOptions::new())
            .await?;
        serde_json::from_value(normalize::extract_stats(&response.body))
            .map_err(|e| NoteError::Shape(format!("malformed validation result: {}", e)))
    }

    /// Optimistic local edit; no request is made.
    pub async fn update_local<'a>(&self, id: impl Into<RawId<'a>>, changes: &NoteChanges) -> bool {
        match id.into().coerce() {
            Some(id) => self.cache.lock().await.update_in_place(id, changes),
            None => false,
        }
    }
}

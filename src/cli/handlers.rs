use std::io::{self, Read};

use serde_json::{json, Value};

use crate::cache::{FilterUpdate, SortField, SortOrder};
use crate::entity::{Note, NoteDraft, SearchHit};
use crate::error::{NoteError, Result, TransportCause};
use crate::session::Session;
use crate::transport::NO_RESPONSE_MESSAGE;

fn read_stdin() -> Result<String> {
    let mut content = String::new();
    io::stdin().read_to_string(&mut content)?;
    Ok(content)
}

fn resolve_content(content: Option<String>, stdin: bool) -> Result<Option<String>> {
    if stdin {
        Ok(Some(read_stdin()?))
    } else {
        Ok(content)
    }
}

fn print_note_line(note: &Note) {
    let updated = note
        .updated_at
        .map(|t| t.format(" (%Y-%m-%d %H:%M)").to_string())
        .unwrap_or_default();
    println!("  {:>4} {}{}", note.id, note.title, updated);
    if !note.tags.is_empty() {
        println!("       tags: {}", note.tags.join(", "));
    }
}

fn print_note(note: &Note) {
    println!("Note {}", note.id);
    println!("Title: {}", note.title);
    if let Some(created) = note.created_at {
        println!("Created: {}", created.format("%Y-%m-%d %H:%M"));
    }
    if let Some(updated) = note.updated_at {
        println!("Updated: {}", updated.format("%Y-%m-%d %H:%M"));
    }
    if !note.tags.is_empty() {
        println!("Tags: {}", note.tags.join(", "));
    }
    if !note.content.is_empty() {
        println!("\n{}", note.content);
    }
}

fn print_hit(hit: &SearchHit) {
    let id = hit.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
    println!("  {:>4} {}", id, hit.display_title());
    if !hit.tags.is_empty() {
        println!("       tags: {}", hit.tags.join(", "));
    }
}

fn offline() -> NoteError {
    NoteError::Transport {
        cause: TransportCause::Network,
        message: NO_RESPONSE_MESSAGE.to_string(),
    }
}

pub async fn handle_list(
    session: &Session,
    query: Option<String>,
    tag: Option<String>,
    sort: SortField,
    order: SortOrder,
    json: bool,
) -> Result<()> {
    session
        .retry_policy()
        .retry(|| session.notes().list())
        .await?;

    let mut cache = session.cache().lock().await;
    cache.set_filter(FilterUpdate {
        search_query: query,
        tag: Some(tag),
        sort_by: Some(sort),
        sort_order: Some(order),
    });
    let notes = cache.filtered_notes();

    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else if notes.is_empty() {
        println!("No notes found.");
    } else {
        println!("Notes ({} of {}):\n", notes.len(), cache.note_count());
        for note in notes {
            print_note_line(note);
        }
    }

    Ok(())
}

pub async fn handle_get(session: &Session, id: String, json: bool) -> Result<()> {
    let note = session
        .retry_policy()
        .retry(|| session.notes().get(id.as_str()))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        print_note(&note);
    }

    Ok(())
}

pub async fn handle_create(
    session: &Session,
    title: Option<String>,
    content: Option<String>,
    stdin: bool,
    tags: Vec<String>,
    json: bool,
) -> Result<()> {
    let draft = NoteDraft {
        title,
        content: resolve_content(content, stdin)?,
        tags: (!tags.is_empty()).then_some(tags),
    };

    let created = session.notes().create(draft).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        println!("Created note {}: {}", created.note.id, created.note.title);
        if let crate::orchestrator::ReindexOutcome::Failed(message) = &created.reindex {
            eprintln!("Warning: search index rebuild failed: {}", message);
        }
    }

    Ok(())
}

pub async fn handle_update(
    session: &Session,
    id: String,
    title: Option<String>,
    content: Option<String>,
    stdin: bool,
    tags: Vec<String>,
    json: bool,
) -> Result<()> {
    let content = resolve_content(content, stdin)?;

    // The backend replaces every field, so start from the stored note
    let existing = session
        .retry_policy()
        .retry(|| session.notes().get(id.as_str()))
        .await?;

    let draft = NoteDraft {
        title: Some(title.unwrap_or(existing.title)),
        content: Some(content.unwrap_or(existing.content)),
        tags: Some(if tags.is_empty() { existing.tags } else { tags }),
    };

    let note = session.notes().update(existing.id, draft).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!("Updated note {}: {}", note.id, note.title);
    }

    Ok(())
}

pub async fn handle_delete(session: &Session, id: String, json: bool) -> Result<()> {
    session.notes().delete(id.as_str()).await?;
    let id = id.trim();

    if json {
        println!("{}", serde_json::to_string_pretty(&json!({ "deleted": id }))?);
    } else {
        println!("Deleted note {}.", id);
    }

    Ok(())
}

pub async fn handle_search(session: &Session, query: String, rag: bool, json: bool) -> Result<()> {
    let hits = session
        .retry_policy()
        .retry(|| session.notes().search(&query, rag))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        println!("No results found for '{}'.", query);
    } else {
        println!("Search results for '{}':\n", query);
        for hit in &hits {
            print_hit(hit);
        }
    }

    Ok(())
}

pub async fn handle_tags(session: &Session, tag: Option<String>, json: bool) -> Result<()> {
    if let Some(tag) = tag {
        let notes = session
            .retry_policy()
            .retry(|| session.notes().list_by_tag(&tag))
            .await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&notes)?);
        } else if notes.is_empty() {
            println!("No notes tagged '{}'.", tag);
        } else {
            println!("Notes tagged '{}':\n", tag);
            for note in &notes {
                print_note_line(note);
            }
        }
        return Ok(());
    }

    let tags = session
        .retry_policy()
        .retry(|| session.notes().fetch_tags())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
    } else if tags.is_empty() {
        println!("No tags found.");
    } else {
        for tag in tags {
            println!("  {}", tag);
        }
    }

    Ok(())
}

pub async fn handle_recent(session: &Session, limit: usize, json: bool) -> Result<()> {
    let notes = session
        .retry_policy()
        .retry(|| session.notes().recent(limit))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else if notes.is_empty() {
        println!("No notes found.");
    } else {
        println!("Recent notes:\n");
        for note in &notes {
            print_note_line(note);
        }
    }

    Ok(())
}

pub async fn handle_validate(
    session: &Session,
    title: Option<String>,
    content: Option<String>,
    stdin: bool,
    tags: Vec<String>,
    json: bool,
) -> Result<()> {
    let draft = NoteDraft {
        title,
        content: resolve_content(content, stdin)?,
        tags: (!tags.is_empty()).then_some(tags),
    };

    let check = session
        .retry_policy()
        .retry(|| session.notes().validate(draft.clone()))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&check)?);
        return Ok(());
    }

    println!("{}", if check.valid { "Valid" } else { "Invalid" });
    for error in &check.errors {
        println!("  error: {}", error);
    }
    for warning in &check.warnings {
        println!("  warning: {}", warning);
    }
    if !check.auto_tags.is_empty() {
        println!("  suggested tags: {}", check.auto_tags.join(", "));
    }

    Ok(())
}

pub async fn handle_stats(session: &Session, json: bool) -> Result<()> {
    let backend = session
        .retry_policy()
        .retry(|| session.notes().fetch_stats())
        .await?;
    session
        .retry_policy()
        .retry(|| session.notes().list())
        .await?;
    session
        .retry_policy()
        .retry(|| session.notes().fetch_tags())
        .await?;

    let cache = session.cache().lock().await;
    let local = cache.note_stats();

    if json {
        let report = json!({ "backend": backend, "local": local, "tags": cache.tag_counts() });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Notes: {}", local.total);
    println!("Distinct tags: {}", local.tag_count);
    println!("Updated in the last 24 hours: {}", local.recently_updated);
    if let Value::Object(fields) = &backend {
        if !fields.is_empty() {
            println!("\nBackend:");
            for (key, value) in fields {
                println!("  {}: {}", key, value);
            }
        }
    }

    Ok(())
}

pub async fn handle_health(session: &Session, full: bool, json: bool) -> Result<()> {
    if !full {
        let online = session.health().check_connection().await;
        if json {
            println!("{}", serde_json::to_string_pretty(&json!({ "backend": online }))?);
        } else {
            println!("Backend: {}", if online { "online" } else { "offline" });
        }
        return if online { Ok(()) } else { Err(offline()) };
    }

    let health = session
        .health()
        .check_system_health()
        .await
        .ok_or_else(offline)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&health)?);
    } else {
        let status = |ok: bool| if ok { "ok" } else { "down" };
        println!("Backend:   {}", status(health.backend));
        println!("Database:  {}", status(health.database));
        println!("Assistant: {}", status(health.assistant));
        println!("RAG:       {}", status(health.rag));
        println!("Endpoints: {}", status(health.endpoints.is_some()));
    }

    if health.backend {
        Ok(())
    } else {
        Err(offline())
    }
}

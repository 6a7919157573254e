mod filter;
mod note_cache;

pub use filter::{collate, CacheFilter, FilterUpdate, SortField, SortOrder};
pub use note_cache::{NoteCache, NoteStats, SharedCache, WriteState};

mod id;
mod note;
mod search_hit;

pub use id::{validate_id, RawId};
pub use note::{Note, NoteChanges, NoteDraft, NoteId, NotePayload, DEFAULT_TITLE};
pub use search_hit::SearchHit;

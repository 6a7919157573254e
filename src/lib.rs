pub mod cache;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod health;
pub mod normalize;
pub mod orchestrator;
pub mod retry;
pub mod session;
pub mod transport;

pub use cache::{NoteCache, SharedCache};
pub use config::ClientConfig;
pub use error::{NoteError, Result};
pub use orchestrator::NoteOrchestrator;
pub use session::Session;

use thiserror::Error;

/// Why a request produced no response at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCause {
    /// The overall request timeout expired.
    Timeout,
    /// Connection refused, DNS failure, reset, and similar.
    Network,
}

/// Failure taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Application,
    Shape,
    Config,
}

#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Invalid note id: {0}")]
    Validation(String),

    #[error("{message}")]
    Transport {
        cause: TransportCause,
        message: String,
    },

    #[error("{message}")]
    Application {
        status: Option<u16>,
        message: String,
    },

    #[error("Unexpected response shape: {0}")]
    Shape(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl NoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NoteError::Validation(_) => ErrorKind::Validation,
            NoteError::Transport { .. } => ErrorKind::Transport,
            NoteError::Application { .. } => ErrorKind::Application,
            NoteError::Shape(_) => ErrorKind::Shape,
            NoteError::Config(_) | NoteError::Io(_) | NoteError::Json(_) | NoteError::Yaml(_) => {
                ErrorKind::Config
            }
        }
    }

    /// Stable name of the error variant, used in `--json` error output.
    pub fn error_type(&self) -> &'static str {
        match self {
            NoteError::Validation(_) => "ValidationError",
            NoteError::Transport { .. } => "TransportError",
            NoteError::Application { .. } => "ApplicationError",
            NoteError::Shape(_) => "ShapeError",
            NoteError::Config(_) => "ConfigError",
            NoteError::Io(_) => "IoError",
            NoteError::Json(_) => "JsonError",
            NoteError::Yaml(_) => "YamlError",
        }
    }

    /// Normalized human-readable message, as recorded in the cache's `error` field.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Only failures that reached (or tried to reach) the backend can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NoteError::Transport { .. } | NoteError::Application { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            NoteError::Transport {
                cause: TransportCause::Timeout,
                ..
            }
        )
    }

    /// HTTP status of an application failure, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            NoteError::Application { status, .. } => *status,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, NoteError>;

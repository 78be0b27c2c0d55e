use thiserror::Error;

/// Input problems reported to the user before anything is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message body is empty")]
    EmptyBody,

    #[error("no conversation selected")]
    NoConversation,

    #[error("local profile has not been discovered yet")]
    NoProfile,

    #[error("no file selected")]
    NoFile,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{action} returned HTTP {status}: {message}")]
    Status {
        action: &'static str,
        status: u16,
        message: String,
    },

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("state store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("state store lock poisoned")]
    StorePoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed media payload: {0}")]
    Media(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Validation failures block a submission; everything else is a transport
    /// or local failure that leaves the view stale but usable.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Admin spec rejected before any mutation.
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    /// The store already holds users; bootstrap is single-shot.
    #[error("system is already initialized")]
    AlreadyInitialized,

    /// Force re-init was requested on a system that was never initialized.
    #[error("system is not initialized yet; run first-time setup instead")]
    NotInitialized,

    /// A uniqueness constraint rejected the write (concurrent bootstrap or
    /// duplicate username).
    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("database unreachable: {source}")]
    BackendUnreachable {
        #[source]
        source: agentdesk_store::Error,
    },

    /// The initialization check could not reach the store.
    #[error("initialization check failed: {message}")]
    Detection { message: String },

    #[error(transparent)]
    Store(agentdesk_store::Error),

    #[error("failed to access flag record {path}: {source}")]
    FlagIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed flag record {path}: {source}")]
    FlagParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode flag record {path}: {source}")]
    FlagEncode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

impl Error {
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// HTTP status for this error when surfaced by a route.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::AlreadyInitialized | Self::NotInitialized => 400,
            Self::Conflict { .. } => 409,
            _ => 500,
        }
    }
}

impl From<agentdesk_store::Error> for Error {
    fn from(source: agentdesk_store::Error) -> Self {
        match source {
            agentdesk_store::Error::Conflict { message } => Self::Conflict { message },
            source if source.is_unavailable() => Self::BackendUnreachable { source },
            source => Self::Store(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

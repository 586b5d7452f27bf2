#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The database could not be reached or the pool is gone.
    #[error("database unavailable: {source}")]
    Unavailable {
        #[source]
        source: sqlx::Error,
    },

    #[error("database error: {source}")]
    Database {
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    InvalidId(#[from] agentdesk_common::Error),

    #[error("company {id} still has dependent rows")]
    CompanyInUse { id: String },

    #[error("malformed row in {table}: {message}")]
    InvalidRow {
        table: &'static str,
        message: String,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_row(table: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidRow {
            table,
            message: message.into(),
        }
    }

    /// Whether the error means the backend itself is unreachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<sqlx::Error> for Error {
    fn from(source: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &source
            && db.is_unique_violation()
        {
            return Self::Conflict {
                message: db.message().to_string(),
            };
        }
        if is_connectivity_error(&source) {
            Self::Unavailable { source }
        } else {
            Self::Database { source }
        }
    }
}

fn is_connectivity_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

pub type Result<T> = std::result::Result<T, Error>;

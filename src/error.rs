//! Typed errors for config loading, data access, and action dispatch.
//!
//! The service layer is the only place these are classified into HTTP-style
//! statuses; nothing here implements a response conversion.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("yaml parse: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid entity config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("unsafe identifier: {0}")]
    UnsafeIdentifier(String),
    #[error("record with {pk_name}={pk} not found")]
    RecordNotFound {
        pk_name: String,
        pk: serde_json::Value,
    },
    #[error("no fields to save")]
    NoFieldsToSave,
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

impl RepoError {
    /// Pool exhaustion, acquire timeout, or a connection-level failure:
    /// the request could have succeeded against a healthy pool.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RepoError::Db(sqlx::Error::PoolTimedOut)
                | RepoError::Db(sqlx::Error::PoolClosed)
                | RepoError::Db(sqlx::Error::Io(_))
        )
    }
}

/// Error type action handlers return. Repo errors keep their transient
/// classification when a handler touches the database.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

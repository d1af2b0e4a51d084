use thiserror::Error;

use crate::error::{ErrorKind, Kind};

/// Errors surfaced by a [`super::PersistenceAdapter`] implementation. In the shape of a
/// `RepositoryError` covering redis/in-memory backends, generalized from a position-repository
/// contract to a whole-snapshot key/value one.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("persistence I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot (de)serialization failure: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(String),

    #[error("row for namespace '{namespace}' snapshot '{snapshot_id}' is under contention")]
    Conflict { namespace: String, snapshot_id: String },
}

impl ErrorKind for PersistenceError {
    fn kind(&self) -> Kind {
        match self {
            PersistenceError::Io(_) => Kind::Internal,
            PersistenceError::Serde(_) => Kind::Internal,
            PersistenceError::Database(_) => Kind::Internal,
            PersistenceError::Conflict { .. } => Kind::Conflict,
        }
    }
}

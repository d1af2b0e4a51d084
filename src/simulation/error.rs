use thiserror::Error;

use crate::error::{ErrorKind, Kind};

/// Errors surfaced by [`super::SimulationManager`] operations. Per §7, simulation-facing
/// operations always return a `Result<T, SimulationError>` with a stable [`ErrorKind`].
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("simulation '{id}' not found")]
    NotFound { id: String },

    #[error("simulation '{id}' is disabled")]
    Disabled { id: String },

    #[error(transparent)]
    Persistence(#[from] crate::persistence::PersistenceError),
}

impl ErrorKind for SimulationError {
    fn kind(&self) -> Kind {
        match self {
            SimulationError::NotFound { .. } => Kind::NotFound,
            SimulationError::Disabled { .. } => Kind::Forbidden,
            SimulationError::Persistence(err) => err.kind(),
        }
    }
}

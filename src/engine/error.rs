use thiserror::Error;

use crate::error::{ErrorKind, Kind};

/// Errors surfaced by the engine's top-level transitions. Per §4.4, almost
/// every failure mode inside a transition (a missing price, a timed-out advisor call, an
/// insufficient-cash trade) is handled internally and recorded rather than propagated — this
/// enum only covers the cases that genuinely abort a transition before it produces a snapshot.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("simulation '{simulation_id}' has no agents configured")]
    NoAgents { simulation_id: String },

    #[error("engine transition panicked: {reason}")]
    TransitionPanicked { reason: String },
}

impl ErrorKind for EngineError {
    fn kind(&self) -> Kind {
        match self {
            EngineError::NoAgents { .. } => Kind::InvalidArgument,
            EngineError::TransitionPanicked { .. } => Kind::Internal,
        }
    }
}

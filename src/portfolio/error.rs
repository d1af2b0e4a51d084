use thiserror::Error;

use crate::error::{ErrorKind, Kind};

/// Errors generated by the portfolio module. Narrower than a `PortfolioError` that covers short
/// positions and a pluggable repository, since this portfolio never shorts and persistence
/// errors live in [`crate::persistence`].
#[derive(Error, Debug, Clone)]
pub enum PortfolioError {
    #[error("Insufficient cash: need ${need:.2} including fees, have ${have:.2}")]
    InsufficientCash { have: f64, need: f64 },

    #[error("no open position in '{symbol}' to sell")]
    NoPosition { symbol: String },

    #[error("no current price for symbol '{symbol}'")]
    MissingPrice { symbol: String },

    #[error("trade quantity must be positive, got {quantity}")]
    NonPositiveQuantity { quantity: f64 },
}

impl ErrorKind for PortfolioError {
    fn kind(&self) -> Kind {
        match self {
            PortfolioError::InsufficientCash { .. } => Kind::InvalidArgument,
            PortfolioError::NoPosition { .. } => Kind::NotFound,
            PortfolioError::MissingPrice { .. } => Kind::NotFound,
            PortfolioError::NonPositiveQuantity { .. } => Kind::InvalidArgument,
        }
    }
}

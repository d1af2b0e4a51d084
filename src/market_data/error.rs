use thiserror::Error;

use crate::error::{ErrorKind, Kind};

/// Errors produced while sourcing, caching or rate-limiting market data. In the shape of a
/// `DataError`, widened with the rate-limit and cascade-exhaustion cases §4.2 requires.
#[derive(Error, Debug, Clone)]
pub enum MarketDataError {
    #[error("no configured quote source returned data for '{symbol}'")]
    AllSourcesExhausted { symbol: String },

    #[error("source '{source}' is rate limited, retry after {retry_after_secs}s")]
    RateLimited { source: String, retry_after_secs: u64 },

    #[error("source '{source}' returned an invalid quote for '{symbol}': {reason}")]
    InvalidQuote {
        source: String,
        symbol: String,
        reason: String,
    },

    #[error("source '{source}' request failed: {reason}")]
    SourceUnavailable { source: String, reason: String },

    #[error("unknown ticker symbol '{symbol}'")]
    UnknownSymbol { symbol: String },
}

impl ErrorKind for MarketDataError {
    fn kind(&self) -> Kind {
        match self {
            MarketDataError::AllSourcesExhausted { .. } => Kind::UpstreamUnavailable,
            MarketDataError::RateLimited { .. } => Kind::UpstreamUnavailable,
            MarketDataError::InvalidQuote { .. } => Kind::UpstreamUnavailable,
            MarketDataError::SourceUnavailable { .. } => Kind::UpstreamUnavailable,
            MarketDataError::UnknownSymbol { .. } => Kind::NotFound,
        }
    }
}

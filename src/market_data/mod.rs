//! Market-data layer: a cascade of upstream quote sources behind a shared TTL cache, each
//! source independently rate limited. See §4.2.

pub mod cache;
pub mod error;
pub mod provider;
pub mod ratelimit;
pub mod source;
pub mod types;

pub use error::MarketDataError;
pub use provider::MarketDataProvider;
pub use source::{HttpQuoteSource, QuoteSource, SyntheticSource};
pub use types::{Fundamentals, MarketData, PrefetchBudget, PrefetchOutcome, TickerSnapshot};

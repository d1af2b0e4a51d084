use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Optional descriptive fundamentals attached to a [`TickerSnapshot`]. Modeled as a plain
/// `struct` of `Option<T>` fields rather than an untyped map, per §9.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub pe_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub sector: Option<String>,
}

/// A single ticker's market snapshot. Invariant: `price` is finite and positive (enforced by
/// [`TickerSnapshot::validate`], not by the type itself, since upstream sources are untrusted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    pub symbol: String,
    pub price: f64,
    pub daily_change: f64,
    pub daily_change_percent: f64,
    pub fundamentals: Option<Fundamentals>,
}

impl TickerSnapshot {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            daily_change: 0.0,
            daily_change_percent: 0.0,
            fundamentals: None,
        }
    }

    /// True if `price` is finite, positive and at most the $100,000 sanity ceiling from
    /// §4.2. A large `|daily_change_percent|` is flagged via
    /// [`TickerSnapshot::is_large_move`] but never rejected.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0 && self.price <= 100_000.0
    }

    /// True if the daily change magnitude exceeds the 0.5 (50%) flag threshold.
    pub fn is_large_move(&self) -> bool {
        self.daily_change_percent.abs() > 0.5
    }
}

/// Mapping from ticker symbol to its current [`TickerSnapshot`]. Insertion order is irrelevant,
/// so this is a thin `HashMap` newtype rather than an order-preserving map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData(pub HashMap<String, TickerSnapshot>);

impl MarketData {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn get(&self, symbol: &str) -> Option<&TickerSnapshot> {
        self.0.get(symbol)
    }

    pub fn insert(&mut self, snapshot: TickerSnapshot) {
        self.0.insert(snapshot.symbol.clone(), snapshot);
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.0.get(symbol).map(|t| t.price)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.0.contains_key(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|s| s.as_str())
    }

    /// Iterates every `(symbol, snapshot)` pair, used by the day-to-day and intraday market-data
    /// transitions to carry forward a previous tick's snapshots symbol-by-symbol.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TickerSnapshot)> {
        self.0.iter().map(|(symbol, snapshot)| (symbol.as_str(), snapshot))
    }

    pub fn merge(&mut self, other: MarketData) {
        self.0.extend(other.0);
    }
}

/// Budget for [`super::provider::MarketDataProvider::prefetch`] (§4.2 `Prefetch`): the wall-clock
/// window it must try to stay within, a safety guard subtracted off that window, the concurrent
/// batch size, and a floor on the inter-batch pause.
#[derive(Debug, Clone, Copy)]
pub struct PrefetchBudget {
    pub interval: Duration,
    pub guard: Duration,
    pub batch_size: usize,
    pub min_pause: Duration,
}

impl Default for PrefetchBudget {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10 * 60),
            guard: Duration::from_secs(5),
            batch_size: 10,
            min_pause: Duration::from_millis(200),
        }
    }
}

/// Result of one [`super::provider::MarketDataProvider::prefetch`] call.
#[derive(Debug, Clone)]
pub struct PrefetchOutcome {
    pub market_data: MarketData,
    pub missing_tickers: Vec<String>,
    pub duration: Duration,
}

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, warn};

use super::cache::TickerCache;
use super::error::MarketDataError;
use super::ratelimit::RollingWindowLimiter;
use super::source::QuoteSource;
use super::types::{MarketData, PrefetchBudget, PrefetchOutcome, TickerSnapshot};
use crate::simulation::{HistoricalPeriod, Mode};

/// One entry in the provider's configured cascade: a source plus its own rolling-window limiter.
struct CascadeEntry {
    source: Arc<dyn QuoteSource>,
    limiter: RollingWindowLimiter,
}

/// Five trading days' worth of cached daily closes for one historical-mode run, plus the index
/// into that window the simulation has currently advanced to.
#[derive(Debug, Default)]
struct HistoricalWindow {
    day_index: usize,
    closes: HashMap<String, Vec<f64>>,
}

/// Known large-cap symbols' expected trading ranges, consulted by [`expected_range`] when seeding
/// simulated-mode prices; anything not listed here gets the default $50–$300 range.
const KNOWN_RANGES: &[(&str, f64, f64)] = &[
    ("AAPL", 150.0, 220.0),
    ("MSFT", 300.0, 450.0),
    ("GOOGL", 100.0, 180.0),
    ("AMZN", 130.0, 200.0),
    ("NVDA", 400.0, 1000.0),
    ("SPY", 400.0, 600.0),
];

fn expected_range(symbol: &str) -> (f64, f64) {
    KNOWN_RANGES
        .iter()
        .find(|(known, ..)| *known == symbol)
        .map(|(_, lo, hi)| (*lo, *hi))
        .unwrap_or((50.0, 300.0))
}

/// Builds a 5-trading-day window of daily closes anchored at `anchor`, each day drifting from the
/// previous by up to 2%.
fn historical_window(anchor: f64) -> Vec<f64> {
    let mut window = Vec::with_capacity(5);
    let mut price = anchor;
    window.push(price);
    for _ in 1..5 {
        let drift = rand::rng().random_range(-0.02..=0.02);
        price = (price * (1.0 + drift)).max(1.0);
        window.push(price);
    }
    window
}

/// Orchestrates the source cascade, TTL cache and rate limiting described in
/// §4.2, in a `HistoricDataLego`/`Continuer`-style composition — a small struct holding injected
/// trait objects, consulted in a fixed priority order — generalized here from "replay one
/// historical feed" to "fall through N live feeds, then synthesize".
pub struct MarketDataProvider {
    cascade: Vec<CascadeEntry>,
    cache: TickerCache,
    ttl: Duration,
    historical: Mutex<HistoricalWindow>,
}

impl MarketDataProvider {
    /// `sources` are tried in order; a typical configuration is
    /// `[primary, secondary, tertiary, synthetic fallback]`. Each source gets its own
    /// `max_requests_per_window` budget — the primary source is expected to be the tightest.
    pub fn new(
        sources: Vec<(Arc<dyn QuoteSource>, usize, Duration)>,
        cache_ttl: Duration,
    ) -> Self {
        let cascade = sources
            .into_iter()
            .map(|(source, max_requests, window)| CascadeEntry {
                source,
                limiter: RollingWindowLimiter::new(max_requests, window),
            })
            .collect();

        Self {
            cascade,
            cache: TickerCache::new(cache_ttl),
            ttl: cache_ttl,
            historical: Mutex::new(HistoricalWindow::default()),
        }
    }

    /// Fetches `symbol`'s current snapshot, consulting the cache first, then the cascade in
    /// priority order, validating each candidate snapshot before accepting it. Emits
    /// `throttle.blocked` when a source's rolling window is exhausted, `fetch.source` on every
    /// successful fetch, and `fetch.cascade_fallback` when the winning source wasn't the primary.
    pub async fn quote(&self, symbol: &str) -> Result<TickerSnapshot, MarketDataError> {
        self.quote_inner(symbol, true).await
    }

    /// Like [`Self::quote`] but bypasses the TTL cache on the way in — the source cascade is
    /// still consulted and the cache is still updated on success. Used by the realtime variants
    /// of the day/intraday transitions, which must never read a stale cached price.
    pub async fn quote_live(&self, symbol: &str) -> Result<TickerSnapshot, MarketDataError> {
        self.quote_inner(symbol, false).await
    }

    async fn quote_inner(&self, symbol: &str, use_cache: bool) -> Result<TickerSnapshot, MarketDataError> {
        if use_cache {
            if let Some(cached) = self.cache.get(symbol) {
                return Ok(cached);
            }
        }

        for (idx, entry) in self.cascade.iter().enumerate() {
            if let Err(retry_after) = entry.limiter.try_acquire() {
                debug!(
                    target: "throttle.blocked",
                    source = entry.source.name(),
                    retry_after_secs = retry_after.as_secs(),
                    "source rate limited, trying next in cascade"
                );
                continue;
            }

            match entry.source.fetch(symbol).await {
                Ok(snapshot) if snapshot.is_valid() => {
                    debug!(target: "fetch.source", source = entry.source.name(), symbol, price = snapshot.price);
                    if idx > 0 {
                        debug!(
                            target: "fetch.cascade_fallback",
                            source = entry.source.name(),
                            symbol,
                            fallback_depth = idx,
                            "served by a non-primary source in the cascade"
                        );
                    }
                    self.cache.put(snapshot.clone());
                    return Ok(snapshot);
                }
                Ok(invalid) => {
                    warn!(
                        source = entry.source.name(),
                        symbol,
                        price = invalid.price,
                        "source returned an out-of-range quote, trying next in cascade"
                    );
                }
                Err(err) => {
                    warn!(source = entry.source.name(), symbol, error = %err, "source fetch failed");
                }
            }
        }

        Err(MarketDataError::AllSourcesExhausted {
            symbol: symbol.to_string(),
        })
    }

    /// Fetches every symbol in `symbols`, continuing past individual failures and logging them,
    /// so one unreachable ticker never blocks the rest of a simulation's price tick.
    pub async fn quotes(&self, symbols: &[String]) -> MarketData {
        let mut data = MarketData::new();
        for symbol in symbols {
            match self.quote(symbol).await {
                Ok(snapshot) => data.insert(snapshot),
                Err(err) => warn!(symbol, error = %err, "dropping symbol from this tick"),
            }
        }
        data
    }

    /// `Prefetch(symbols, budget) → {marketData, missingTickers, durationMs}` (§4.2): refreshes
    /// the cache for `symbols` ahead of need, so a subsequent [`Self::quote`] call is a cache hit
    /// rather than a cascade round-trip. Splits `symbols` into `budget.batch_size`-sized batches,
    /// fetches each batch concurrently, and paces itself between batches by
    /// `max(min_pause, (interval − guard − elapsed) / remaining_batches)` so the whole call tries
    /// to land within `budget.interval`. Never aborts to stay inside that budget — it only warns
    /// (`prefetch.budget_exceeded`) if it runs over.
    pub async fn prefetch(&self, symbols: &[String], budget: PrefetchBudget) -> PrefetchOutcome {
        let started = Instant::now();
        self.cache.evict_expired();

        let mut market_data = MarketData::new();
        let mut missing_tickers = Vec::new();
        let batch_size = budget.batch_size.max(1);
        let batches: Vec<&[String]> = symbols.chunks(batch_size).collect();
        let batch_count = batches.len();

        for (i, batch) in batches.into_iter().enumerate() {
            let results = join_all(batch.iter().map(|symbol| self.quote(symbol))).await;
            for (symbol, result) in batch.iter().zip(results) {
                match result {
                    Ok(snapshot) => market_data.insert(snapshot),
                    Err(err) => {
                        warn!(symbol, error = %err, "prefetch failed for symbol");
                        missing_tickers.push(symbol.clone());
                    }
                }
            }

            let remaining_batches = batch_count - (i + 1);
            if remaining_batches == 0 {
                continue;
            }

            let elapsed = started.elapsed();
            let remaining_budget = budget
                .interval
                .checked_sub(budget.guard)
                .and_then(|guarded| guarded.checked_sub(elapsed))
                .unwrap_or(Duration::ZERO);
            let pause = (remaining_budget / remaining_batches as u32).max(budget.min_pause);
            tokio::time::sleep(pause).await;
        }

        let duration = started.elapsed();
        if duration > budget.interval {
            warn!(
                target: "prefetch.budget_exceeded",
                duration_ms = duration.as_millis() as u64,
                budget_ms = budget.interval.as_millis() as u64,
                tracked = symbols.len(),
                "prefetch exceeded its wall-clock budget"
            );
        }

        PrefetchOutcome {
            market_data,
            missing_tickers,
            duration,
        }
    }

    /// `InitialMarketData(symbols) → MarketData` (§4.2): the one-time seed fetched at process
    /// startup for a fresh simulation instance, mode-dependent per §4.2.
    pub async fn initial_market_data(
        &self,
        symbols: &[String],
        mode: Mode,
        historical_period: Option<&HistoricalPeriod>,
        index_symbol: &str,
    ) -> MarketData {
        match mode {
            Mode::Historical => self.initial_historical(symbols, historical_period, index_symbol).await,
            Mode::Realtime => self.quotes(symbols).await,
            Mode::Simulated | Mode::Hybrid => self.initial_synthetic(symbols, index_symbol).await,
        }
    }

    async fn initial_synthetic(&self, symbols: &[String], index_symbol: &str) -> MarketData {
        let mut data = MarketData::new();
        for symbol in symbols {
            let (lo, hi) = expected_range(symbol);
            data.insert(TickerSnapshot::new(symbol, rand::rng().random_range(lo..=hi)));
        }

        if !data.contains(index_symbol) {
            let price = match self.quote(index_symbol).await {
                Ok(snapshot) => snapshot.price,
                Err(_) => {
                    let (lo, hi) = expected_range(index_symbol);
                    rand::rng().random_range(lo..=hi)
                }
            };
            data.insert(TickerSnapshot::new(index_symbol, price));
        }

        data
    }

    async fn initial_historical(
        &self,
        symbols: &[String],
        historical_period: Option<&HistoricalPeriod>,
        index_symbol: &str,
    ) -> MarketData {
        if let Some(period) = historical_period {
            debug!(start = %period.start_date, end = %period.end_date, "preloading historical window");
        }

        let mut all_symbols: Vec<String> = symbols.to_vec();
        if !all_symbols.iter().any(|symbol| symbol == index_symbol) {
            all_symbols.push(index_symbol.to_string());
        }

        let mut data = MarketData::new();
        let mut closes: HashMap<String, Vec<f64>> = HashMap::new();

        for symbol in &all_symbols {
            let anchor = match self.quote(symbol).await {
                Ok(snapshot) => snapshot.price,
                Err(_) => {
                    let (lo, hi) = expected_range(symbol);
                    (lo + hi) / 2.0
                }
            };
            let window = historical_window(anchor);
            data.insert(TickerSnapshot::new(symbol, window[0]));
            closes.insert(symbol.clone(), window);
        }

        *self.historical.lock() = HistoricalWindow { day_index: 0, closes };
        data
    }

    /// `NextIntradayMarketData(prev, day, intradayHour, prefetched?) → MarketData` (§4.2).
    pub async fn next_intraday_market_data(
        &self,
        prev: &MarketData,
        day: u64,
        intraday_hour: f64,
        prefetched: Option<MarketData>,
        mode: Mode,
        index_symbol: &str,
    ) -> MarketData {
        debug!(day, intraday_hour, "advancing intraday market data");
        match mode {
            Mode::Historical => self.next_intraday_historical(intraday_hour),
            Mode::Realtime => self.next_intraday_realtime(prev, prefetched).await,
            Mode::Simulated | Mode::Hybrid => self.next_intraday_simulated(prev, index_symbol).await,
        }
    }

    async fn next_intraday_simulated(&self, prev: &MarketData, index_symbol: &str) -> MarketData {
        let mut data = MarketData::new();
        for (symbol, snapshot) in prev.iter() {
            if symbol == index_symbol {
                continue;
            }
            let drift = rand::rng().random_range(-0.005..=0.005);
            let price = (snapshot.price * (1.0 + drift)).max(0.01);
            data.insert(daily_change_snapshot(symbol, snapshot.price, price, snapshot));
        }

        let index_price = match self.quote(index_symbol).await {
            Ok(snapshot) => snapshot.price,
            Err(_) => prev.price(index_symbol).unwrap_or_else(|| expected_range(index_symbol).0),
        };
        let previous_index_price = prev.price(index_symbol).unwrap_or(index_price);
        let previous_fundamentals = prev.get(index_symbol).and_then(|snapshot| snapshot.fundamentals.clone());
        let daily_change = index_price - previous_index_price;
        let daily_change_percent = if previous_index_price.abs() > f64::EPSILON {
            daily_change / previous_index_price
        } else {
            0.0
        };
        data.insert(TickerSnapshot {
            symbol: index_symbol.to_string(),
            price: index_price,
            daily_change,
            daily_change_percent,
            fundamentals: previous_fundamentals,
        });
        data
    }

    fn next_intraday_historical(&self, intraday_hour: f64) -> MarketData {
        let state = self.historical.lock();
        let fraction = (intraday_hour / 6.0).clamp(0.0, 1.0);
        let mut data = MarketData::new();

        for (symbol, window) in state.closes.iter() {
            let today = window[state.day_index.min(window.len() - 1)];
            let tomorrow = window[(state.day_index + 1).min(window.len() - 1)];
            let base = today + (tomorrow - today) * fraction;
            let drift = rand::rng().random_range(-0.002..=0.002);
            let price = (base * (1.0 + drift)).max(0.01);
            data.insert(TickerSnapshot::new(symbol, price));
        }

        data
    }

    async fn next_intraday_realtime(&self, prev: &MarketData, prefetched: Option<MarketData>) -> MarketData {
        let mut data = prefetched.unwrap_or_default();
        let missing: Vec<String> = prev
            .symbols()
            .filter(|symbol| !data.contains(symbol))
            .map(|symbol| symbol.to_string())
            .collect();

        if !missing.is_empty() {
            data.merge(self.quotes(&missing).await);
        }

        data
    }

    /// `NextDayMarketData(prev) → MarketData` (§4.2).
    pub async fn next_day_market_data(&self, prev: &MarketData, mode: Mode, index_symbol: &str) -> MarketData {
        match mode {
            Mode::Historical => self.next_day_historical(),
            Mode::Realtime => self.next_day_realtime(prev).await,
            Mode::Simulated | Mode::Hybrid => self.next_day_simulated(prev, index_symbol),
        }
    }

    fn next_day_historical(&self) -> MarketData {
        let mut state = self.historical.lock();
        if !state.closes.is_empty() {
            let max_index = state.closes.values().map(|window| window.len() - 1).max().unwrap_or(0);
            state.day_index = (state.day_index + 1).min(max_index);
        }

        let mut data = MarketData::new();
        for (symbol, window) in state.closes.iter() {
            let idx = state.day_index.min(window.len() - 1);
            data.insert(TickerSnapshot::new(symbol, window[idx]));
        }
        data
    }

    fn next_day_simulated(&self, prev: &MarketData, index_symbol: &str) -> MarketData {
        const TREND: f64 = 0.0005;
        const VOLATILITY: f64 = 0.035;

        let mut data = MarketData::new();
        for (symbol, snapshot) in prev.iter() {
            if symbol == index_symbol {
                continue;
            }
            let mut rng = rand::rng();
            let shock: f64 = (0..3).map(|_| rng.random_range(-1.0..=1.0)).sum::<f64>() / 3.0 * VOLATILITY;
            let price = (snapshot.price * (1.0 + TREND + shock)).max(1.0);
            data.insert(daily_change_snapshot(symbol, snapshot.price, price, snapshot));
        }
        data
    }

    async fn next_day_realtime(&self, prev: &MarketData) -> MarketData {
        let mut data = MarketData::new();
        for symbol in prev.symbols() {
            match self.quote_live(symbol).await {
                Ok(snapshot) => data.insert(snapshot),
                Err(err) => warn!(symbol, error = %err, "dropping symbol from day-advance refresh"),
            }
        }
        data
    }

    pub fn cache_ttl(&self) -> Duration {
        self.ttl
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

/// Builds a [`TickerSnapshot`] carrying `previous`'s fundamentals forward, with `daily_change`
/// and `daily_change_percent` recomputed from the price move.
fn daily_change_snapshot(symbol: &str, previous_price: f64, price: f64, previous: &TickerSnapshot) -> TickerSnapshot {
    let daily_change = price - previous_price;
    let daily_change_percent = if previous_price.abs() > f64::EPSILON {
        daily_change / previous_price
    } else {
        0.0
    };
    TickerSnapshot {
        symbol: symbol.to_string(),
        price,
        daily_change,
        daily_change_percent,
        fundamentals: previous.fundamentals.clone(),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct FakeSource {
        name: String,
        calls: AtomicUsize,
        price: f64,
        fail: bool,
    }

    #[async_trait]
    impl QuoteSource for FakeSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(&self, symbol: &str) -> Result<TickerSnapshot, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MarketDataError::SourceUnavailable {
                    source: self.name.clone(),
                    reason: "forced failure".to_string(),
                });
            }
            Ok(TickerSnapshot::new(symbol, self.price))
        }
    }

    fn fake(name: &str, price: f64, fail: bool) -> Arc<FakeSource> {
        Arc::new(FakeSource {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            price,
            fail,
        })
    }

    #[tokio::test]
    async fn falls_through_to_secondary_when_primary_fails() {
        let primary = fake("primary", 100.0, true);
        let secondary = fake("secondary", 200.0, false);
        let provider = MarketDataProvider::new(
            vec![
                (primary.clone() as Arc<dyn QuoteSource>, 100, Duration::from_secs(60)),
                (secondary.clone() as Arc<dyn QuoteSource>, 100, Duration::from_secs(60)),
            ],
            Duration::from_secs(30),
        );

        let snapshot = provider.quote("AAPL").await.unwrap();
        assert_eq!(snapshot.price, 200.0);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn returns_error_when_every_source_is_exhausted() {
        let only = fake("only", 100.0, true);
        let provider = MarketDataProvider::new(
            vec![(only as Arc<dyn QuoteSource>, 100, Duration::from_secs(60))],
            Duration::from_secs(30),
        );

        assert!(provider.quote("AAPL").await.is_err());
    }

    #[tokio::test]
    async fn cache_hit_skips_the_cascade_entirely() {
        let primary = fake("primary", 100.0, false);
        let provider = MarketDataProvider::new(
            vec![(primary.clone() as Arc<dyn QuoteSource>, 100, Duration::from_secs(60))],
            Duration::from_secs(30),
        );

        provider.quote("AAPL").await.unwrap();
        provider.quote("AAPL").await.unwrap();
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_rate_limit_falls_through_cascade() {
        let primary = fake("primary", 100.0, false);
        let secondary = fake("secondary", 200.0, false);
        let provider = MarketDataProvider::new(
            vec![
                (primary.clone() as Arc<dyn QuoteSource>, 0, Duration::from_secs(60)),
                (secondary.clone() as Arc<dyn QuoteSource>, 100, Duration::from_secs(60)),
            ],
            Duration::from_secs(30),
        );

        let snapshot = provider.quote("AAPL").await.unwrap();
        assert_eq!(snapshot.price, 200.0);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn quotes_skips_unresolvable_symbols_without_failing() {
        let source = fake("only", 100.0, false);
        let provider = MarketDataProvider::new(
            vec![(source as Arc<dyn QuoteSource>, 100, Duration::from_secs(60))],
            Duration::from_secs(30),
        );

        let symbols = vec!["AAPL".to_string(), "MSFT".to_string()];
        let data = provider.quotes(&symbols).await;
        assert_eq!(data.symbols().count(), 2);
    }

    #[tokio::test]
    async fn initial_market_data_simulated_always_includes_the_index_symbol() {
        let provider = MarketDataProvider::new(vec![], Duration::from_secs(30));
        let symbols = vec!["AAA".to_string(), "BBB".to_string()];
        let data = provider
            .initial_market_data(&symbols, Mode::Simulated, None, "SPY")
            .await;
        assert!(data.contains("SPY"));
        assert!(data.contains("AAA"));
        assert!(data.contains("BBB"));
    }

    #[tokio::test]
    async fn initial_market_data_historical_seeds_a_five_day_window() {
        let source = fake("only", 150.0, false);
        let provider = MarketDataProvider::new(
            vec![(source as Arc<dyn QuoteSource>, 100, Duration::from_secs(60))],
            Duration::from_secs(30),
        );
        let symbols = vec!["AAA".to_string()];
        provider.initial_market_data(&symbols, Mode::Historical, None, "SPY").await;
        assert_eq!(provider.historical.lock().closes.get("AAA").unwrap().len(), 5);
    }

    #[tokio::test]
    async fn next_day_historical_advances_the_cached_day_index() {
        let source = fake("only", 150.0, false);
        let provider = MarketDataProvider::new(
            vec![(source as Arc<dyn QuoteSource>, 100, Duration::from_secs(60))],
            Duration::from_secs(30),
        );
        let symbols = vec!["AAA".to_string()];
        let prev = provider.initial_market_data(&symbols, Mode::Historical, None, "AAA").await;
        assert_eq!(provider.historical.lock().day_index, 0);

        let next = provider.next_day_market_data(&prev, Mode::Historical, "AAA").await;
        assert_eq!(provider.historical.lock().day_index, 1);
        assert!(next.contains("AAA"));
    }

    #[tokio::test]
    async fn next_day_simulated_leaves_the_index_symbol_untouched() {
        let provider = MarketDataProvider::new(vec![], Duration::from_secs(30));
        let mut prev = MarketData::new();
        prev.insert(TickerSnapshot::new("SPY", 500.0));
        prev.insert(TickerSnapshot::new("AAA", 100.0));

        let next = provider.next_day_market_data(&prev, Mode::Simulated, "SPY").await;
        assert!(!next.contains("SPY"));
        assert!(next.contains("AAA"));
    }

    #[tokio::test]
    async fn prefetch_batches_symbols_and_reports_missing_tickers() {
        let good = fake("good", 100.0, false);
        let provider = MarketDataProvider::new(
            vec![(good as Arc<dyn QuoteSource>, 100, Duration::from_secs(60))],
            Duration::from_secs(30),
        );

        let symbols = vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()];
        let budget = PrefetchBudget {
            interval: Duration::from_secs(1),
            guard: Duration::ZERO,
            batch_size: 2,
            min_pause: Duration::from_millis(1),
        };

        let outcome = provider.prefetch(&symbols, budget).await;
        assert_eq!(outcome.market_data.symbols().count(), 3);
        assert!(outcome.missing_tickers.is_empty());
    }
}

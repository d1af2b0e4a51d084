use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout, Instant};

/// Governs how agent advisory calls within one trade window are fanned out: strictly serially
/// with a fixed per-step sleep, or through a bounded worker pool.
#[derive(Debug, Clone, Copy)]
pub struct PacingConfig {
    pub request_spacing: Option<Duration>,
    pub max_concurrent: Option<usize>,
    pub call_timeout: Duration,
}

impl PacingConfig {
    /// `⌊tickInterval / agentCount⌋`, the auto-derived spacing when none is manually configured.
    pub fn auto_spacing(tick_interval: Duration, agent_count: usize) -> Duration {
        if agent_count == 0 {
            Duration::ZERO
        } else {
            tick_interval / agent_count as u32
        }
    }
}

/// Runs `call(i)` for every `i` in `0..count`, honoring `config.call_timeout` per call and
/// preserving input order in the returned `Vec`. A `None` entry means that call's 60-second
/// timeout elapsed — the caller treats that identically to an empty advisor decision.
///
/// When `request_spacing` is set, calls run strictly serially (mirroring a
/// `Trader::run` sequential event loop, generalized here to optionally rate-limit rather than
/// simply iterate). Otherwise, up to `max_concurrent` calls (default: unlimited) run at once via
/// a `tokio::sync::Semaphore`, with results joined through `futures::future::join_all`.
pub async fn dispatch<T, F, Fut>(count: usize, config: &PacingConfig, call: F) -> Vec<Option<T>>
where
    F: Fn(usize) -> Fut,
    Fut: std::future::Future<Output = T>,
{
    if let Some(spacing) = config.request_spacing.filter(|s| *s > Duration::ZERO) {
        let mut results = Vec::with_capacity(count);
        for index in 0..count {
            let start = Instant::now();
            results.push(timeout(config.call_timeout, call(index)).await.ok());
            let elapsed = start.elapsed();
            if elapsed < spacing {
                sleep(spacing - elapsed).await;
            }
        }
        return results;
    }

    let limit = config.max_concurrent.unwrap_or(count.max(1));
    let semaphore = Arc::new(Semaphore::new(limit));
    let call_timeout = config.call_timeout;

    let futures = (0..count).map(|index| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = semaphore.acquire().await.expect("semaphore is never closed");
            timeout(call_timeout, call(index)).await.ok()
        }
    });

    join_all(futures).await
}

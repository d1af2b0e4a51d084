use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use super::command::SchedulerCommand;
use super::config::{AdvisorPacingPolicy, SchedulerConfig};
use super::timer::TimerService;
use crate::calendar;
use crate::chat::round::SessionKind;
use crate::engine::{day_advance, price_step, trade_window, PacingConfig, TradeAdvisor};
use crate::market_data::{MarketData, MarketDataProvider, PrefetchOutcome};
use crate::persistence::PersistenceAdapter;
use crate::simulation::{Mode, SimulationManager};

/// Drives every [`crate::simulation::SimulationInstance`] tracked by a [`SimulationManager`]
/// through the two cooperating loops described in §4.6: a price-tick loop and a
/// (realtime-only) trade-window loop. Mirrors a `Trader`-style run loop in spirit — polling a
/// remote command channel each iteration before doing work — generalized from one market pair
/// to every configured simulation instance, fanned out per tick via `join_all`.
pub struct MultiSimScheduler<A, P>
where
    A: TradeAdvisor + 'static,
    P: PersistenceAdapter + 'static,
{
    manager: Arc<Mutex<SimulationManager>>,
    provider: Arc<MarketDataProvider>,
    advisor: Arc<A>,
    persistence: Arc<P>,
    config: SchedulerConfig,
    pacing_policy: AdvisorPacingPolicy,
    mode: Mode,
}

impl<A, P> MultiSimScheduler<A, P>
where
    A: TradeAdvisor + 'static,
    P: PersistenceAdapter + 'static,
{
    pub fn new(
        manager: Arc<Mutex<SimulationManager>>,
        provider: Arc<MarketDataProvider>,
        advisor: Arc<A>,
        persistence: Arc<P>,
        config: SchedulerConfig,
        pacing_policy: AdvisorPacingPolicy,
        mode: Mode,
    ) -> Arc<Self> {
        Arc::new(Self {
            manager,
            provider,
            advisor,
            persistence,
            config,
            pacing_policy,
            mode,
        })
    }

    async fn instance_ids(&self) -> Vec<String> {
        self.manager.lock().await.ids().cloned().collect()
    }

    async fn tracked_symbols(&self) -> Vec<String> {
        let manager = self.manager.lock().await;
        let mut symbols: Vec<String> = manager.shared_market_data().symbols().map(|s| s.to_string()).collect();
        if !symbols.iter().any(|s| s == &self.config.index_symbol) {
            symbols.push(self.config.index_symbol.clone());
        }
        symbols
    }

    async fn shared_market_data(&self) -> MarketData {
        self.manager.lock().await.shared_market_data().clone()
    }

    async fn set_shared_market_data(&self, market_data: MarketData) {
        self.manager.lock().await.set_shared_market_data(market_data);
    }

    /// Applies `priceStep` to every tracked instance concurrently (§5: "operations for distinct
    /// instances within the same tick run concurrently"). A panic inside one instance's
    /// transition is caught via the `tokio::spawn` JoinHandle and logged; that instance's
    /// previous snapshot is retained.
    async fn apply_price_step_all(&self, market_data: MarketData) {
        let ids = self.instance_ids().await;
        let index_symbol = self.config.index_symbol.clone();

        let handles = ids.into_iter().map(|id| {
            let manager = Arc::clone(&self.manager);
            let market_data = market_data.clone();
            let index_symbol = index_symbol.clone();
            let persistence = Arc::clone(&self.persistence);

            tokio::spawn(async move {
                let handle = {
                    let manager = manager.lock().await;
                    manager.get(&id)
                };
                let Some(handle) = handle else { return };
                let mut instance = handle.lock().await;
                let next = price_step(instance.snapshot(), market_data, &index_symbol);
                instance.replace_snapshot(next);
                let snapshot = instance.snapshot().clone();
                drop(instance);
                if let Err(err) = persistence.save(&id, &snapshot).await {
                    error!(simulation_id = %id, error = %err, "failed to persist snapshot after price step");
                }
            })
        });

        for handle in handles {
            if let Err(err) = handle.await {
                error!(error = %err, "price step tick panicked for an instance; previous snapshot retained");
            }
        }
    }

    async fn apply_trade_window_all(&self) {
        let ids = self.instance_ids().await;

        let handles = ids.into_iter().map(|id| {
            let manager = Arc::clone(&self.manager);
            let advisor = Arc::clone(&self.advisor);
            let persistence = Arc::clone(&self.persistence);
            let pacing_policy = self.pacing_policy;
            let realtime_spacing = self.config.realtime.sim_interval;

            tokio::spawn(async move {
                let handle = {
                    let manager = manager.lock().await;
                    manager.get(&id)
                };
                let Some(handle) = handle else { return };
                let mut instance = handle.lock().await;
                let agent_count = instance.snapshot().agents.len();
                let pacing = pacing_config(&pacing_policy, agent_count, realtime_spacing);
                let next = trade_window(instance.snapshot(), advisor.as_ref(), &pacing).await;
                instance.replace_snapshot(next);
                let snapshot = instance.snapshot().clone();
                drop(instance);
                if let Err(err) = persistence.save(&id, &snapshot).await {
                    error!(simulation_id = %id, error = %err, "failed to persist snapshot after trade window");
                }
            })
        });

        for handle in handles {
            if let Err(err) = handle.await {
                error!(error = %err, "trade window tick panicked for an instance; previous snapshot retained");
            }
        }
    }

    async fn apply_day_advance_all(&self) {
        let ids = self.instance_ids().await;
        let index_symbol = self.config.index_symbol.clone();
        let mode = self.mode;

        let handles = ids.into_iter().map(|id| {
            let manager = Arc::clone(&self.manager);
            let advisor = Arc::clone(&self.advisor);
            let persistence = Arc::clone(&self.persistence);
            let provider = Arc::clone(&self.provider);
            let pacing_policy = self.pacing_policy;
            let sim_spacing = self.config.simulated.sim_interval;
            let index_symbol = index_symbol.clone();

            tokio::spawn(async move {
                let handle = {
                    let manager = manager.lock().await;
                    manager.get(&id)
                };
                let Some(handle) = handle else { return };
                let mut instance = handle.lock().await;
                let agent_count = instance.snapshot().agents.len();
                let pacing = pacing_config(&pacing_policy, agent_count, sim_spacing);
                let prev_market_data = instance.snapshot().market_data.clone();
                let new_market_data = provider.next_day_market_data(&prev_market_data, mode, &index_symbol).await;
                let next = day_advance(instance.snapshot(), new_market_data, &index_symbol, advisor.as_ref(), &pacing).await;
                instance.replace_snapshot(next);
                let snapshot = instance.snapshot().clone();
                drop(instance);
                if let Err(err) = persistence.save(&id, &snapshot).await {
                    error!(simulation_id = %id, error = %err, "failed to persist snapshot after day advance");
                }
            })
        });

        for handle in handles {
            if let Err(err) = handle.await {
                error!(error = %err, "day advance tick panicked for an instance; previous snapshot retained");
            }
        }
    }

    /// Price-tick loop (§4.6). Realtime (or hybrid post-transition): pipelined prefetch, market
    /// hours gating. Simulated/historical (or hybrid pre-transition): fixed-interval timer that
    /// advances `intradayHour`, triggers `dayAdvance` at session end, and triggers `tradeWindow`
    /// at configured cadence boundaries.
    pub async fn run_price_tick_loop(self: Arc<Self>, mut commands: mpsc::Receiver<SchedulerCommand>) {
        let mut running = true;
        let mut hybrid_transitioned = false;
        let mut pending_prefetch: Option<tokio::task::JoinHandle<PrefetchOutcome>> = None;

        loop {
            while let Ok(command) = commands.try_recv() {
                match command {
                    SchedulerCommand::Start => running = true,
                    SchedulerCommand::Stop => running = false,
                    SchedulerCommand::HybridRestart => {
                        hybrid_transitioned = true;
                        info!("hybrid transition: price-tick loop switching to realtime intervals");
                    }
                }
            }

            if !running {
                sleep(Duration::from_millis(250)).await;
                continue;
            }

            let realtime_clocked =
                matches!(self.mode, Mode::Realtime) || (matches!(self.mode, Mode::Hybrid) && hybrid_transitioned);
            let intervals = self.config.intervals_for(self.mode, hybrid_transitioned);

            if realtime_clocked {
                let now = chrono::Utc::now();
                if !calendar::is_market_open(now) {
                    let next_open = calendar::next_market_open(now);
                    let wait = (next_open - now)
                        .to_std()
                        .unwrap_or(Duration::from_secs(60))
                        .min(Duration::from_secs(60));
                    debug!(wait_secs = wait.as_secs(), "market closed, sleeping until next check");
                    sleep(wait).await;
                    continue;
                }

                let tick_started = tokio::time::Instant::now();

                let prefetched = if let Some(handle) = pending_prefetch.take() {
                    match timeout(intervals.sim_interval, handle).await {
                        Ok(Ok(outcome)) => {
                            if !outcome.missing_tickers.is_empty() {
                                warn!(missing = ?outcome.missing_tickers, "prefetch could not resolve some symbols");
                            }
                            Some(outcome.market_data)
                        }
                        Ok(Err(err)) => {
                            error!(error = %err, "prefetch task panicked");
                            None
                        }
                        Err(_) => {
                            warn!("prefetch did not complete within the tick interval budget");
                            None
                        }
                    }
                } else {
                    None
                };

                let symbols = self.tracked_symbols().await;
                let prev_market_data = self.shared_market_data().await;
                let market_data = self
                    .provider
                    .next_intraday_market_data(&prev_market_data, 0, 0.0, prefetched, self.mode, &self.config.index_symbol)
                    .await;
                self.apply_price_step_all(market_data.clone()).await;
                self.set_shared_market_data(market_data).await;

                let provider = Arc::clone(&self.provider);
                let budget = self.config.prefetch;
                pending_prefetch = Some(tokio::spawn(async move { provider.prefetch(&symbols, budget).await }));

                let elapsed = tick_started.elapsed();
                if elapsed < intervals.sim_interval {
                    sleep(intervals.sim_interval - elapsed).await;
                }
            } else {
                sleep(intervals.sim_interval).await;

                let ids = self.instance_ids().await;
                for id in ids {
                    let handle = {
                        let manager = self.manager.lock().await;
                        manager.get(&id)
                    };
                    let Some(handle) = handle else { continue };

                    let (day, next_hour, crossed_session_end) = {
                        let instance = handle.lock().await;
                        let snapshot = instance.snapshot();
                        let candidate = snapshot.intraday_hour + intervals.minutes_per_tick / 60.0;
                        (snapshot.day, candidate, candidate >= 6.5)
                    };

                    if crossed_session_end {
                        if TimerService::is_historical_complete(day + 1, self.config.max_simulation_days)
                            && matches!(self.mode, Mode::Historical)
                            || (matches!(self.mode, Mode::Hybrid)
                                && !hybrid_transitioned
                                && TimerService::is_historical_complete(day + 1, self.config.max_simulation_days))
                        {
                            info!(simulation_id = %id, day, "historical simulation window complete, stopping");
                            running = false;
                            continue;
                        }
                    } else {
                        let prev_market_data = handle.lock().await.snapshot().market_data.clone();
                        let market_data = self
                            .provider
                            .next_intraday_market_data(
                                &prev_market_data,
                                day,
                                next_hour,
                                None,
                                self.mode,
                                &self.config.index_symbol,
                            )
                            .await;
                        let mut instance = handle.lock().await;
                        let next = price_step(instance.snapshot(), market_data, &self.config.index_symbol);
                        instance.replace_snapshot(next);
                        instance.snapshot_mut().intraday_hour = next_hour;
                    }
                }

                if crossed_session_end_any(&self, &self.instance_ids().await, 6.5).await {
                    self.apply_day_advance_all().await;
                } else {
                    let fired = self.maybe_fire_embedded_trade_windows(intervals.trade_interval_hours()).await;
                    if fired {
                        self.apply_trade_window_all().await;
                    }
                }

                if matches!(self.mode, Mode::Hybrid) && !hybrid_transitioned {
                    let now = chrono::Utc::now();
                    if let Some(instant) = self.earliest_simulated_instant().await {
                        if TimerService::should_hybrid_transition(instant, now) {
                            hybrid_transitioned = true;
                            info!("hybrid transition triggered: simulated clock has caught up to wall clock");
                        }
                    }
                }
            }
        }
    }

    async fn earliest_simulated_instant(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let ids = self.instance_ids().await;
        let mut earliest = None;
        for id in ids {
            let handle = {
                let manager = self.manager.lock().await;
                manager.get(&id)
            };
            let Some(handle) = handle else { continue };
            let instant = handle.lock().await.snapshot().current_date;
            earliest = Some(match earliest {
                Some(existing) if existing < instant => existing,
                _ => instant,
            });
        }
        earliest
    }

    /// In simulated/historical modes, a trade window fires inside the price-tick loop once
    /// `intradayHour` has crossed a multiple of the trade-interval cadence (§4.6: "first trade at
    /// `tradeInterval` hours into the session; subsequent windows at multiples thereof").
    async fn maybe_fire_embedded_trade_windows(&self, trade_interval_hours: f64) -> bool {
        if trade_interval_hours <= 0.0 {
            return false;
        }
        let ids = self.instance_ids().await;
        for id in ids {
            let handle = {
                let manager = self.manager.lock().await;
                manager.get(&id)
            };
            let Some(handle) = handle else { continue };
            let hour = handle.lock().await.snapshot().intraday_hour;
            let remainder = hour % trade_interval_hours;
            if remainder.abs() < 1e-6 && hour > 0.0 {
                return true;
            }
        }
        false
    }

    /// Trade-window loop (§4.6), realtime only: a fixed-interval timer gated on market hours.
    pub async fn run_trade_window_loop(self: Arc<Self>, mut commands: mpsc::Receiver<SchedulerCommand>) {
        let mut running = true;
        let mut hybrid_transitioned = false;

        loop {
            while let Ok(command) = commands.try_recv() {
                match command {
                    SchedulerCommand::Start => running = true,
                    SchedulerCommand::Stop => running = false,
                    SchedulerCommand::HybridRestart => hybrid_transitioned = true,
                }
            }

            let realtime_clocked =
                matches!(self.mode, Mode::Realtime) || (matches!(self.mode, Mode::Hybrid) && hybrid_transitioned);
            if !realtime_clocked {
                // Trade windows are embedded in the price-tick loop outside realtime (§4.6).
                sleep(Duration::from_secs(5)).await;
                continue;
            }

            let intervals = self.config.intervals_for(self.mode, hybrid_transitioned);
            sleep(intervals.trade_interval).await;

            if !running {
                continue;
            }

            let now = chrono::Utc::now();
            if !calendar::is_market_open(now) {
                debug!("market closed, skipping this trade window firing");
                continue;
            }

            self.apply_trade_window_all().await;
        }
    }

    /// A transient autosave task (§5, §6: default 15-minute cadence) that periodically persists
    /// every tracked instance regardless of tick activity.
    pub async fn run_autosave_loop(self: Arc<Self>) {
        loop {
            sleep(self.config.autosave_interval).await;
            let ids = self.instance_ids().await;
            for id in ids {
                let handle = {
                    let manager = self.manager.lock().await;
                    manager.get(&id)
                };
                let Some(handle) = handle else { continue };
                let snapshot = handle.lock().await.snapshot().clone();
                if let Err(err) = self.persistence.save(&id, &snapshot).await {
                    error!(simulation_id = %id, error = %err, "autosave failed");
                }
            }
            debug!("autosave tick complete");
        }
    }

    /// Graceful shutdown (§5: SIGINT/SIGTERM): persists every instance's current snapshot.
    pub async fn shutdown(&self) {
        info!("scheduler shutting down, saving every tracked instance");
        let ids = self.instance_ids().await;
        for id in ids {
            let handle = {
                let manager = self.manager.lock().await;
                manager.get(&id)
            };
            let Some(handle) = handle else { continue };
            let snapshot = handle.lock().await.snapshot().clone();
            if let Err(err) = self.persistence.save(&id, &snapshot).await {
                error!(simulation_id = %id, error = %err, "failed to save snapshot during shutdown");
            }
        }
    }

    pub fn session_kind(&self) -> SessionKind {
        match self.mode {
            Mode::Realtime => SessionKind::Realtime,
            _ => SessionKind::Simulated,
        }
    }
}

fn pacing_config(policy: &AdvisorPacingPolicy, agent_count: usize, tick_interval: Duration) -> PacingConfig {
    let request_spacing = if policy.auto_spacing {
        Some(PacingConfig::auto_spacing(tick_interval, agent_count).max(policy.min_request_spacing))
    } else {
        policy.request_spacing
    };

    PacingConfig {
        request_spacing,
        max_concurrent: policy.max_concurrent,
        call_timeout: policy.call_timeout,
    }
}

async fn crossed_session_end_any<A, P>(scheduler: &MultiSimScheduler<A, P>, ids: &[String], threshold: f64) -> bool
where
    A: TradeAdvisor + 'static,
    P: PersistenceAdapter + 'static,
{
    for id in ids {
        let handle = {
            let manager = scheduler.manager.lock().await;
            manager.get(id)
        };
        let Some(handle) = handle else { continue };
        if handle.lock().await.snapshot().intraday_hour >= threshold {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::TraderConfig;
    use crate::engine::StubAdvisor;
    use crate::persistence::PersistenceError;
    use crate::simulation::{ChatPolicy, ClockPolicy, SimulationSnapshot, SimulationType};

    struct NullPersistence;

    #[async_trait::async_trait]
    impl PersistenceAdapter for NullPersistence {
        async fn load(&self, _id: &str) -> Result<Option<SimulationSnapshot>, PersistenceError> {
            Ok(None)
        }
        async fn save(&self, _id: &str, _snapshot: &SimulationSnapshot) -> Result<(), PersistenceError> {
            Ok(())
        }
        async fn delete(&self, _id: &str) -> Result<(), PersistenceError> {
            Ok(())
        }
    }

    fn empty_provider() -> Arc<MarketDataProvider> {
        Arc::new(MarketDataProvider::new(vec![], Duration::from_secs(30)))
    }

    async fn manager_with_one_instance() -> Arc<Mutex<SimulationManager>> {
        let mut manager = SimulationManager::new();
        let simulation_type = SimulationType {
            id: "sim-1".to_string(),
            name: "Sim One".to_string(),
            description: "".to_string(),
            trader_configs: vec![TraderConfig {
                id: "agent-1".to_string(),
                name: "Agent One".to_string(),
                model: "gpt-test".to_string(),
                system_prompt: None,
                color: None,
                image: None,
            }],
            chat_enabled: true,
            show_model_names: true,
            enabled: true,
        };
        let persistence = NullPersistence;
        manager
            .initialize_all(
                vec![simulation_type],
                MarketData::new(),
                &persistence,
                Mode::Simulated,
                None,
                ChatPolicy {
                    max_messages_per_agent: 5,
                    max_messages_per_user: 3,
                    max_message_length: 200,
                },
                ClockPolicy {
                    now: chrono::Utc::now(),
                    delay_minutes: 0,
                    configured_start: None,
                },
                false,
            )
            .await
            .unwrap();
        Arc::new(Mutex::new(manager))
    }

    #[tokio::test]
    async fn apply_price_step_all_updates_every_instance() {
        let manager = manager_with_one_instance().await;
        let scheduler = MultiSimScheduler::new(
            Arc::clone(&manager),
            empty_provider(),
            Arc::new(StubAdvisor::empty()),
            Arc::new(NullPersistence),
            SchedulerConfig::default(),
            AdvisorPacingPolicy::default(),
            Mode::Simulated,
        );

        let mut market = MarketData::new();
        market.insert(crate::market_data::TickerSnapshot::new("SPY", 420.0));
        scheduler.apply_price_step_all(market).await;

        let manager = manager.lock().await;
        let handle = manager.get("sim-1").unwrap();
        let instance = handle.lock().await;
        assert_eq!(instance.snapshot().agents[0].performance_history.len(), 2);
    }

    #[tokio::test]
    async fn apply_trade_window_all_persists_without_panicking() {
        let manager = manager_with_one_instance().await;
        let scheduler = MultiSimScheduler::new(
            Arc::clone(&manager),
            empty_provider(),
            Arc::new(StubAdvisor::empty()),
            Arc::new(NullPersistence),
            SchedulerConfig::default(),
            AdvisorPacingPolicy::default(),
            Mode::Simulated,
        );

        scheduler.apply_trade_window_all().await;

        let manager = manager.lock().await;
        let handle = manager.get("sim-1").unwrap();
        assert_eq!(handle.lock().await.snapshot().agents[0].trade_history.len(), 0);
    }
}

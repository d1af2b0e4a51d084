use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use chrono_tz::America::New_York;

use super::types::{HistoricalPeriod, Mode, SimulationSnapshot, SimulationType};
use crate::agent::Agent;
use crate::benchmark::Benchmark;
use crate::calendar;
use crate::chat::ChatState;
use crate::engine::price_step::{BENCHMARK_INDEX_ID, BENCHMARK_MANAGERS_ID};
use crate::market_data::MarketData;
use crate::portfolio::metrics::compute_metrics;
use crate::portfolio::INITIAL_CASH;

/// Chat policy environment-configured options are resolved into (§6: `CHAT_*`), handed to
/// [`SimulationInstance::initialize`] rather than read from the environment directly.
#[derive(Debug, Clone, Copy)]
pub struct ChatPolicy {
    pub max_messages_per_agent: usize,
    pub max_messages_per_user: usize,
    pub max_message_length: usize,
}

/// How `startDate`/`currentDate` are chosen for a freshly initialized instance (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct ClockPolicy {
    pub now: DateTime<Utc>,
    pub delay_minutes: i64,
    pub configured_start: Option<NaiveDate>,
}

fn resolve_start_date(mode: Mode, historical_period: Option<&HistoricalPeriod>, clock: ClockPolicy) -> DateTime<Utc> {
    match mode {
        Mode::Realtime => clock.now - ChronoDuration::minutes(clock.delay_minutes.max(0)),
        Mode::Historical => historical_period
            .map(|period| calendar::to_market_open_et(period.start_date))
            .unwrap_or(clock.now),
        Mode::Simulated | Mode::Hybrid => {
            let date = clock
                .configured_start
                .unwrap_or_else(|| clock.now.with_timezone(&New_York).date_naive());
            let midnight = New_York
                .from_local_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is always valid"))
                .earliest()
                .expect("midnight is never in a DST gap")
                .with_timezone(&Utc);
            calendar::next_market_open(midnight)
        }
    }
}

/// One running simulation: its static [`SimulationType`] plus the single [`SimulationSnapshot`]
/// that evolves under engine transitions. Pairs fixed identity with mutable owned state, the
/// same shape as a per-market `Trader` pairing a `Market` with its own `Portfolio` share.
#[derive(Debug, Clone)]
pub struct SimulationInstance {
    simulation_type: SimulationType,
    snapshot: SimulationSnapshot,
}

impl SimulationInstance {
    /// `SimulationInstance.Initialize(marketData, snapshot?)` (§4.5). Loads `persisted` verbatim
    /// if supplied (reconstructing chat config from `chat_policy`); otherwise builds a fresh
    /// snapshot: agents with `cash = INITIAL_CASH`, a seeded performance snapshot at
    /// `timestamp = 0`, the equity-index benchmark, and — only when the simulation type has more
    /// than one agent — the "managers index" benchmark.
    pub fn initialize(
        simulation_type: SimulationType,
        market_data: MarketData,
        persisted: Option<SimulationSnapshot>,
        mode: Mode,
        historical_period: Option<HistoricalPeriod>,
        chat_policy: ChatPolicy,
        clock: ClockPolicy,
    ) -> Self {
        let snapshot = match persisted {
            Some(mut snapshot) => {
                snapshot.chat.enabled = simulation_type.chat_enabled;
                snapshot.chat.max_messages_per_agent = chat_policy.max_messages_per_agent;
                snapshot.chat.max_messages_per_user = chat_policy.max_messages_per_user;
                snapshot.chat.max_message_length = chat_policy.max_message_length;
                snapshot
            }
            None => Self::fresh_snapshot(&simulation_type, market_data, mode, historical_period, chat_policy, clock),
        };

        Self { simulation_type, snapshot }
    }

    fn fresh_snapshot(
        simulation_type: &SimulationType,
        market_data: MarketData,
        mode: Mode,
        historical_period: Option<HistoricalPeriod>,
        chat_policy: ChatPolicy,
        clock: ClockPolicy,
    ) -> SimulationSnapshot {
        let agents = simulation_type
            .trader_configs
            .iter()
            .map(|config| {
                let mut agent = Agent::new(config, INITIAL_CASH);
                let metrics = compute_metrics(&agent.portfolio, &market_data, &[], 0.0, 0.0, &[]);
                agent.performance_history.push(metrics);
                agent
            })
            .collect();

        let mut benchmarks = vec![Benchmark::new(BENCHMARK_INDEX_ID, "Equity Index", None)];
        if simulation_type.has_managers_benchmark() {
            benchmarks.push(Benchmark::new(BENCHMARK_MANAGERS_ID, "Managers Index", None));
        }

        let start_date = resolve_start_date(mode, historical_period.as_ref(), clock);

        SimulationSnapshot {
            simulation_id: simulation_type.id.clone(),
            day: 0,
            intraday_hour: 0.0,
            market_data,
            agents,
            benchmarks,
            mode,
            historical_period,
            start_date,
            current_date: start_date,
            current_timestamp: matches!(mode, Mode::Realtime).then_some(start_date),
            chat: ChatState::new(
                simulation_type.chat_enabled,
                chat_policy.max_messages_per_agent,
                chat_policy.max_messages_per_user,
                chat_policy.max_message_length,
            ),
            last_updated: clock.now,
            hybrid_transitioned: false,
        }
    }

    pub fn simulation_type(&self) -> &SimulationType {
        &self.simulation_type
    }

    pub fn snapshot(&self) -> &SimulationSnapshot {
        &self.snapshot
    }

    pub fn snapshot_mut(&mut self) -> &mut SimulationSnapshot {
        &mut self.snapshot
    }

    pub fn replace_snapshot(&mut self, snapshot: SimulationSnapshot) {
        self.snapshot = snapshot;
    }
}

use std::time::Duration;

use chrono::NaiveDate;

use crate::market_data::PrefetchBudget;
use crate::simulation::Mode;

/// Timing parameters for one [`Mode`] (§4.6 "Mode-dependent interval defaults").
#[derive(Debug, Clone, Copy)]
pub struct ModeIntervals {
    /// Period of the price-tick loop.
    pub sim_interval: Duration,
    /// Period of the trade-window loop (realtime), or the intraday-hour cadence trade windows
    /// are triggered at inside the price-tick loop (simulated/historical).
    pub trade_interval: Duration,
    /// Market-minutes advanced per price tick (simulated/historical only; realtime ticks
    /// represent a fixed 10 market-minutes per §4.6).
    pub minutes_per_tick: f64,
}

impl ModeIntervals {
    pub const fn simulated_default() -> Self {
        Self {
            sim_interval: Duration::from_secs(30),
            trade_interval: Duration::from_secs(2 * 60 * 60),
            minutes_per_tick: 30.0,
        }
    }

    pub const fn realtime_default() -> Self {
        Self {
            sim_interval: Duration::from_secs(10 * 60),
            trade_interval: Duration::from_secs(30 * 60),
            minutes_per_tick: 10.0,
        }
    }

    /// Hours-per-tick, derived from `minutes_per_tick` — used by the round-id/day-rollover math
    /// in [`crate::chat::round`].
    pub fn trade_interval_hours(&self) -> f64 {
        self.trade_interval.as_secs_f64() / 3600.0
    }
}

/// Pacing controls for agent LLM calls (`LLM_*` options, §6), resolved into a
/// [`crate::engine::PacingConfig`] by the scheduler per tick (spacing may be auto-derived from
/// the tick interval and current agent count).
#[derive(Debug, Clone, Copy)]
pub struct AdvisorPacingPolicy {
    pub max_concurrent: Option<usize>,
    pub request_spacing: Option<Duration>,
    pub auto_spacing: bool,
    pub min_request_spacing: Duration,
    pub call_timeout: Duration,
}

impl Default for AdvisorPacingPolicy {
    fn default() -> Self {
        Self {
            max_concurrent: None,
            request_spacing: None,
            auto_spacing: false,
            min_request_spacing: Duration::ZERO,
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// Aggregate scheduler configuration: one [`ModeIntervals`] per accelerated/realtime regime,
/// historical-window bounds, autosave cadence, and the delayed-data shift (§6 environment
/// table — parsed upstream by the out-of-scope loader, handed in here already typed).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub simulated: ModeIntervals,
    pub realtime: ModeIntervals,
    pub historical_start_date: Option<NaiveDate>,
    pub max_simulation_days: Option<u64>,
    pub use_delayed_data: bool,
    pub data_delay_minutes: i64,
    pub autosave_interval: Duration,
    pub prefetch: PrefetchBudget,
    pub index_symbol: String,
}

impl SchedulerConfig {
    /// The [`ModeIntervals`] governing a given [`Mode`] at this moment; `hybrid_transitioned`
    /// selects realtime cadence for a hybrid instance that has already crossed over.
    pub fn intervals_for(&self, mode: Mode, hybrid_transitioned: bool) -> ModeIntervals {
        match mode {
            Mode::Realtime => self.realtime,
            Mode::Simulated | Mode::Historical => self.simulated,
            Mode::Hybrid => {
                if hybrid_transitioned {
                    self.realtime
                } else {
                    self.simulated
                }
            }
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            simulated: ModeIntervals::simulated_default(),
            realtime: ModeIntervals::realtime_default(),
            historical_start_date: None,
            max_simulation_days: None,
            use_delayed_data: false,
            data_delay_minutes: 0,
            autosave_interval: Duration::from_secs(15 * 60),
            prefetch: PrefetchBudget::default(),
            index_symbol: "SPY".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hybrid_uses_simulated_intervals_before_transition() {
        let config = SchedulerConfig::default();
        let intervals = config.intervals_for(Mode::Hybrid, false);
        assert_eq!(intervals.sim_interval, config.simulated.sim_interval);
    }

    #[test]
    fn hybrid_uses_realtime_intervals_after_transition() {
        let config = SchedulerConfig::default();
        let intervals = config.intervals_for(Mode::Hybrid, true);
        assert_eq!(intervals.sim_interval, config.realtime.sim_interval);
    }

    #[test]
    fn trade_interval_hours_converts_from_duration() {
        let intervals = ModeIntervals::simulated_default();
        assert_eq!(intervals.trade_interval_hours(), 2.0);
    }
}

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use super::config::SchedulerConfig;
use crate::simulation::{Mode, SimulationSnapshot};

/// Read-only answer to `GET /api/timer` (§6): how long until the next trade window fires, and
/// when that is. Never negative (§7: "the timer never returns negative countdowns").
#[derive(Debug, Clone, Copy)]
pub struct TimerStatus {
    pub countdown_seconds: f64,
    pub next_trade_window_timestamp: DateTime<Utc>,
}

impl TimerStatus {
    pub fn next_trade_window_iso(&self) -> String {
        self.next_trade_window_timestamp.to_rfc3339()
    }
}

/// Queries a [`SimulationSnapshot`] for scheduling facts without mutating it — the read-only
/// counterpart to [`super::multi_sim::MultiSimScheduler`], grounded in the separation
/// of a `Trader`'s mutating run loop from plain query helpers on its state.
pub struct TimerService;

impl TimerService {
    /// Next wall-clock instant a trade window is expected to fire for `snapshot`, given `now`.
    pub fn next_trade_window(snapshot: &SimulationSnapshot, config: &SchedulerConfig, now: DateTime<Utc>) -> TimerStatus {
        let intervals = config.intervals_for(snapshot.mode, snapshot.hybrid_transitioned);
        let realtime_clocked = matches!(snapshot.mode, Mode::Realtime)
            || (matches!(snapshot.mode, Mode::Hybrid) && snapshot.hybrid_transitioned);

        if realtime_clocked {
            Self::next_realtime_window(snapshot.start_date, intervals.trade_interval, now)
        } else {
            Self::next_simulated_window(snapshot, intervals, now)
        }
    }

    fn next_realtime_window(anchor: DateTime<Utc>, trade_interval: std::time::Duration, now: DateTime<Utc>) -> TimerStatus {
        let interval_secs = trade_interval.as_secs_f64().max(1.0);
        let elapsed = (now - anchor).num_milliseconds() as f64 / 1000.0;
        let elapsed = elapsed.max(0.0);
        let periods_elapsed = (elapsed / interval_secs).floor();
        let next_boundary_secs = (periods_elapsed + 1.0) * interval_secs;
        let next_trade_window_timestamp = anchor + ChronoDuration::milliseconds((next_boundary_secs * 1000.0) as i64);
        let countdown_seconds = (next_trade_window_timestamp - now).num_milliseconds() as f64 / 1000.0;

        TimerStatus {
            countdown_seconds: countdown_seconds.max(0.0),
            next_trade_window_timestamp,
        }
    }

    fn next_simulated_window(
        snapshot: &SimulationSnapshot,
        intervals: super::config::ModeIntervals,
        now: DateTime<Utc>,
    ) -> TimerStatus {
        let trade_interval_hours = intervals.trade_interval_hours();
        let hours_per_tick = intervals.minutes_per_tick / 60.0;

        let next_boundary_hours = if trade_interval_hours <= 0.0 {
            snapshot.intraday_hour
        } else {
            (((snapshot.intraday_hour / trade_interval_hours).floor()) + 1.0) * trade_interval_hours
        };
        let remaining_hours = (next_boundary_hours - snapshot.intraday_hour).max(0.0);
        let ticks_remaining = if hours_per_tick > 0.0 {
            (remaining_hours / hours_per_tick).ceil().max(0.0)
        } else {
            0.0
        };
        let countdown_seconds = ticks_remaining * intervals.sim_interval.as_secs_f64();

        TimerStatus {
            countdown_seconds: countdown_seconds.max(0.0),
            next_trade_window_timestamp: now + ChronoDuration::milliseconds((countdown_seconds * 1000.0) as i64),
        }
    }

    /// `isHistoricalSimulationComplete(day)` (§4.6): true once `day` has advanced past the
    /// configured maximum, under historical (or hybrid-before-transition) modes.
    pub fn is_historical_complete(day: u64, max_simulation_days: Option<u64>) -> bool {
        matches!(max_simulation_days, Some(max) if day > max)
    }

    /// `shouldHybridModeTransition` (§4.6 / scenario 6): true once the simulated clock's current
    /// instant falls within 5 minutes of (or past) wall-clock `now`.
    pub fn should_hybrid_transition(simulated_instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        simulated_instant > now - ChronoDuration::minutes(5) && simulated_instant <= now
    }
}

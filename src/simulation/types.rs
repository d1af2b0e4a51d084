use serde::{Deserialize, Serialize};

use crate::agent::{Agent, TraderConfig};
use crate::benchmark::Benchmark;
use crate::chat::ChatState;
use crate::market_data::MarketData;

/// Which clock drives a simulation instance's scheduler loops (§4.6).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Simulated,
    Realtime,
    Historical,
    Hybrid,
}

impl Mode {
    /// True for the modes in which the price-tick loop drives trade windows internally rather
    /// than via a separate fixed-interval timer (§4.6).
    pub fn trade_windows_are_embedded(self) -> bool {
        matches!(self, Mode::Simulated | Mode::Historical)
    }
}

/// Declared historical replay window, present only when `mode == Historical` (or `Hybrid` before
/// its realtime transition).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalPeriod {
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
}

/// Static configuration for one simulation, analogous to a per-market `ExchangeConfig`/engine
/// config struct: a fixed roster of [`TraderConfig`]s plus feature toggles, constructed once at
/// process startup and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationType {
    pub id: String,
    pub name: String,
    pub description: String,
    pub trader_configs: Vec<TraderConfig>,
    pub chat_enabled: bool,
    pub show_model_names: bool,
    pub enabled: bool,
}

impl SimulationType {
    /// True when more than one agent trades in this simulation type — the multi-agent
    /// "managers index" benchmark (§4.5) is only constructed for these.
    pub fn has_managers_benchmark(&self) -> bool {
        self.trader_configs.len() > 1
    }
}

/// The complete, (de)serializable state of one running simulation. Every field here is either
/// copied wholesale on owner handoff or replaced wholesale by an engine transition — there is no
/// in-place mutation of sub-fields from outside [`crate::engine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub simulation_id: String,
    pub day: u64,
    pub intraday_hour: f64,
    pub market_data: MarketData,
    pub agents: Vec<Agent>,
    pub benchmarks: Vec<Benchmark>,
    pub mode: Mode,
    pub historical_period: Option<HistoricalPeriod>,
    pub start_date: chrono::DateTime<chrono::Utc>,
    pub current_date: chrono::DateTime<chrono::Utc>,
    pub current_timestamp: Option<chrono::DateTime<chrono::Utc>>,
    pub chat: ChatState,
    pub last_updated: chrono::DateTime<chrono::Utc>,
    pub hybrid_transitioned: bool,
}

impl SimulationSnapshot {
    pub fn agent_mut(&mut self, agent_id: &str) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|agent| agent.id == agent_id)
    }

    pub fn benchmark_mut(&mut self, benchmark_id: &str) -> Option<&mut Benchmark> {
        self.benchmarks.iter_mut().find(|benchmark| benchmark.id == benchmark_id)
    }

    fn is_realtime_clocked(&self) -> bool {
        matches!(self.mode, Mode::Realtime) || (matches!(self.mode, Mode::Hybrid) && self.hybrid_transitioned)
    }

    /// The engine-internal notion of "now" used to stamp trades and performance metrics: real
    /// seconds-since-epoch once realtime-clocked (realtime mode, or hybrid post-transition), or
    /// `day + intradayHour / 10.0` otherwise (§9).
    pub fn logical_timestamp(&self) -> f64 {
        if self.is_realtime_clocked() {
            self.current_timestamp.unwrap_or(self.current_date).timestamp() as f64
        } else {
            self.day as f64 + self.intraday_hour / 10.0
        }
    }

    /// Tolerance for matching a trade's timestamp against [`Self::logical_timestamp`] when
    /// recomputing post-trade metrics (§4.4 step 7): `< 0.01` in discrete modes, `< 60` seconds
    /// once realtime-clocked.
    pub fn timestamp_tolerance(&self) -> f64 {
        if self.is_realtime_clocked() {
            60.0
        } else {
            0.01
        }
    }
}

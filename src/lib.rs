//! # trading-arena
//!
//! A backend that runs several long-lived market-trading simulations side by side. Each
//! simulation holds a roster of LLM-backed trader agents competing against one another (and
//! against benchmark tracks) inside a shared or independent market-data feed.
//!
//! It is organized around a small set of de-coupled components:
//!
//! * **Market data**: [`market_data::MarketDataProvider`] sources ticker quotes through a
//!   priority-ordered cascade of upstreams, each independently rate-limited and backed by a
//!   synthetic fallback so a simulation never halts purely because a live feed is unavailable.
//! * **Engine**: [`engine`] holds the three pure state-transition functions that move a
//!   [`simulation::SimulationSnapshot`] forward — `price_step`, `trade_window`, `day_advance` —
//!   plus the [`engine::TradeAdvisor`] seam an LLM-backed (or stub) agent decision-maker plugs
//!   into, and the pacing policy that bounds how those calls fan out.
//! * **Simulation**: [`simulation::SimulationInstance`] pairs a fixed [`simulation::SimulationType`]
//!   identity with the single mutable snapshot it evolves; [`simulation::SimulationManager`] owns
//!   the whole `{simId → instance}` map and the market data shared across them.
//! * **Scheduler**: [`scheduler::MultiSimScheduler`] drives every tracked instance through its
//!   mode-dependent price-tick and trade-window loops, each polling a
//!   [`scheduler::SchedulerCommand`] channel rather than relying on external task cancellation.
//! * **Agent & benchmark**: [`agent::Agent`] is one trading participant — identity, portfolio,
//!   bounded rolling memory; [`benchmark::Benchmark`] is a reference series a simulation's agents
//!   are compared against.
//! * **Portfolio**: [`portfolio`] is the cash-equity, no-shorting holdings model and the trade
//!   execution rules that move money between cash and [`portfolio::Position`]s.
//! * **Chat**: [`chat`] sanitizes and quota-checks user messages, assigns them to the trade
//!   round they'll be delivered on, and reconciles the single reply each agent may post back.
//! * **Persistence**: [`persistence::PersistenceAdapter`] is the storage seam a simulation
//!   snapshot is saved to and loaded from; [`persistence::JsonFileAdapter`] and
//!   [`persistence::RelationalAdapter`] are the two shipped implementations.
//! * **Calendar**: [`calendar`] is pure US equity market-hours, holiday and Eastern-Time
//!   conversion logic, used to gate realtime ticking.
//!
//! ## Getting started
//!
//! Constructing a scheduler means wiring a [`simulation::SimulationManager`], a
//! [`market_data::MarketDataProvider`], a [`engine::TradeAdvisor`] implementation and a
//! [`persistence::PersistenceAdapter`] together:
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use tokio::sync::{mpsc, Mutex};
//!
//! use trading_arena::engine::StubAdvisor;
//! use trading_arena::market_data::MarketDataProvider;
//! use trading_arena::persistence::JsonFileAdapter;
//! use trading_arena::scheduler::{AdvisorPacingPolicy, MultiSimScheduler, SchedulerConfig};
//! use trading_arena::simulation::{Mode, SimulationManager};
//!
//! # async fn run() {
//! let manager = Arc::new(Mutex::new(SimulationManager::new()));
//! let provider = Arc::new(MarketDataProvider::new(vec![], Duration::from_secs(30)));
//! let advisor = Arc::new(StubAdvisor::empty());
//! let persistence = Arc::new(JsonFileAdapter::new("./data", "default"));
//!
//! let scheduler = MultiSimScheduler::new(
//!     manager,
//!     provider,
//!     advisor,
//!     persistence,
//!     SchedulerConfig::default(),
//!     AdvisorPacingPolicy::default(),
//!     Mode::Simulated,
//! );
//!
//! let (_tx, rx) = mpsc::channel(8);
//! tokio::spawn(scheduler.run_price_tick_loop(rx));
//! # }
//! ```

#![warn(
// missing_debug_implementations,
missing_copy_implementations,
// rust_2018_idioms,
// missing_docs
)]

/// Coarse error classification shared across every module-level `thiserror` enum in this crate.
pub mod error;

/// Pure functions over instants: US equity market hours, holidays & Eastern-Time conversion.
pub mod calendar;

/// Sources, caches and rate-limits ticker quotes through a cascade of upstreams.
pub mod market_data;

/// One-pass statistical primitives shared by the portfolio math module.
pub mod statistic;

/// Portfolio state and trade execution rules.
pub mod portfolio;

/// LLM-backed trading agent: identity, portfolio, and bounded rolling memory.
pub mod agent;

/// Benchmark tracks each simulation's agents are compared against.
pub mod benchmark;

/// Chat subsystem: sanitized, quota-checked user messages and agent replies.
pub mod chat;

/// The pure state-transition engine (`price_step`, `trade_window`, `day_advance`) and the
/// advisor/pacing abstractions they share.
pub mod engine;

/// Simulation state and its owners: [`simulation::SimulationSnapshot`],
/// [`simulation::SimulationInstance`] and [`simulation::SimulationManager`].
pub mod simulation;

/// Storage seam for simulation snapshots, plus JSON-file and relational drivers.
pub mod persistence;

/// Drives tracked simulation instances through their mode-dependent tick loops.
pub mod scheduler;

pub use error::{ErrorKind, Kind};

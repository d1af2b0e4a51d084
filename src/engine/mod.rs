//! Pure state-transition engine: the three transitions that move a
//! [`crate::simulation::SimulationSnapshot`] forward (`priceStep`, `tradeWindow`, `dayAdvance`),
//! plus the advisor abstraction and pacing policy they share. Grounded in a
//! `engine::Engine::run` event-processing loop, generalized from "fold one `Event` at a time"
//! to "fold one whole-round transition at a time" (§4.4).

pub mod advisor;
pub mod day_advance;
pub mod error;
pub mod pacing;
pub mod price_step;
pub mod trade_window;

pub use advisor::{AdvisorDecision, ChatContext, StubAdvisor, TradeAdvisor};
pub use day_advance::day_advance;
pub use error::EngineError;
pub use pacing::PacingConfig;
pub use price_step::{price_step, BENCHMARK_INDEX_ID, BENCHMARK_MANAGERS_ID};
pub use trade_window::trade_window;

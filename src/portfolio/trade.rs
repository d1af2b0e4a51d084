use serde::{Deserialize, Serialize};

/// Buy or sell side of a [`Trade`]. Unlike a `Decision` enum that distinguishes entries from
/// exits across both Long and Short directions, this model only ever buys or sells an existing
/// or new long holding.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// An immutable record of one executed trade. Once appended to an agent's trade history, a
/// `Trade` is never mutated — corrections happen by appending an offsetting trade, never by
/// editing history in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub execution_price: f64,
    pub timestamp: f64,
    pub fee: f64,
    pub fair_value: Option<f64>,
    pub top_of_box: Option<f64>,
    pub bottom_of_box: Option<f64>,
    pub justification: Option<String>,
}

impl Trade {
    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.execution_price
    }
}

/// A trade decision requested by an agent's [`crate::engine::advisor::TradeAdvisor`], before
/// execution validates and caps it against the agent's actual portfolio state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub fair_value: Option<f64>,
    pub top_of_box: Option<f64>,
    pub bottom_of_box: Option<f64>,
    pub justification: Option<String>,
}

/// A trade that could not be executed this round, carried into the agent's memory so the next
/// round's [`crate::engine::advisor::TradeAdvisor`] call can see why it failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTrade {
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub reason: String,
}

//! Portfolio state and trade execution rules. Keeps the familiar `portfolio` module shape
//! (`Position`, a `*Error` enum, pure builder-constructed value types) but generalized from
//! margin/derivatives long-or-short exposure to a cash-equity, no-shorting model.

pub mod error;
pub mod metrics;
pub mod position;
pub mod trade;

use indexmap::IndexMap;

pub use error::PortfolioError;
pub use metrics::PerformanceMetrics;
pub use position::Position;
pub use trade::{FailedTrade, Side, Trade, TradeRequest};

use crate::market_data::MarketData;

/// Proportional fee applied to every executed trade's notional.
pub const FEE_RATE: f64 = 0.0005;
/// Fee floor: every trade costs at least this much regardless of notional.
pub const MIN_FEE: f64 = 0.25;
/// Starting cash for every freshly initialized agent.
pub const INITIAL_CASH: f64 = 10_000.0;

fn fee_for(notional: f64) -> f64 {
    (notional * FEE_RATE).max(MIN_FEE)
}

/// An agent's cash and holdings. Invariant: `cash >= 0`; every [`Position`] has `quantity > 0`
/// (a position that reaches zero quantity is removed, never left as a zero-quantity entry).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Portfolio {
    pub cash: f64,
    pub positions: IndexMap<String, Position>,
}

impl Portfolio {
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            positions: IndexMap::new(),
        }
    }

    /// `portfolioValue(P, M)`: cash plus the mark-to-market value of every held position.
    pub fn total_value(&self, market: &MarketData) -> f64 {
        self.cash
            + self
                .positions
                .values()
                .filter_map(|position| {
                    market.price(&position.symbol).map(|price| position.market_value(price))
                })
                .sum::<f64>()
    }

    /// Executes a buy of `quantity` shares of `symbol` at `price`, debiting cash and merging
    /// into (or creating) the held [`Position`]. Returns [`PortfolioError::InsufficientCash`]
    /// without mutating state if `cash < notional + fee` — callers convert this into a
    /// [`FailedTrade`] rather than aborting the round.
    #[allow(clippy::too_many_arguments)]
    pub fn execute_buy(
        &mut self,
        symbol: &str,
        quantity: u64,
        price: f64,
        timestamp: f64,
        fair_value: Option<f64>,
        top_of_box: Option<f64>,
        bottom_of_box: Option<f64>,
        justification: Option<String>,
    ) -> Result<Trade, PortfolioError> {
        if quantity == 0 {
            return Err(PortfolioError::NonPositiveQuantity { quantity: 0.0 });
        }

        let notional = quantity as f64 * price;
        let fee = fee_for(notional);
        let total_cost = notional + fee;

        if self.cash < total_cost {
            return Err(PortfolioError::InsufficientCash {
                have: self.cash,
                need: total_cost,
            });
        }

        self.cash -= total_cost;
        self.positions
            .entry(symbol.to_string())
            .and_modify(|position| position.merge_buy(quantity, notional))
            .or_insert_with(|| Position::new(symbol, quantity, price));

        if let Some(position) = self.positions.get_mut(symbol) {
            position.last_fair_value = fair_value.or(position.last_fair_value);
            position.last_top_of_box = top_of_box.or(position.last_top_of_box);
            position.last_bottom_of_box = bottom_of_box.or(position.last_bottom_of_box);
        }

        Ok(Trade {
            symbol: symbol.to_string(),
            side: Side::Buy,
            quantity,
            execution_price: price,
            timestamp,
            fee,
            fair_value,
            top_of_box,
            bottom_of_box,
            justification,
        })
    }

    /// Executes a sell of up to `quantity` shares of `symbol`, capping at the currently held
    /// quantity (never overshooting into a short). Returns [`PortfolioError::NoPosition`] if the
    /// symbol is not held or the held quantity is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn execute_sell(
        &mut self,
        symbol: &str,
        quantity: u64,
        price: f64,
        timestamp: f64,
        fair_value: Option<f64>,
        top_of_box: Option<f64>,
        bottom_of_box: Option<f64>,
        justification: Option<String>,
    ) -> Result<Trade, PortfolioError> {
        if quantity == 0 {
            return Err(PortfolioError::NonPositiveQuantity { quantity: 0.0 });
        }

        let held = self
            .positions
            .get(symbol)
            .map(|position| position.quantity)
            .unwrap_or(0);

        if held == 0 {
            return Err(PortfolioError::NoPosition {
                symbol: symbol.to_string(),
            });
        }

        let qty_exec = quantity.min(held);
        let notional = qty_exec as f64 * price;
        let fee = fee_for(notional);

        self.cash += notional - fee;

        let remaining = self
            .positions
            .get_mut(symbol)
            .expect("checked held > 0 above")
            .reduce(qty_exec);

        if remaining == 0 {
            self.positions.shift_remove(symbol);
        }

        Ok(Trade {
            symbol: symbol.to_string(),
            side: Side::Sell,
            quantity: qty_exec,
            execution_price: price,
            timestamp,
            fee,
            fair_value,
            top_of_box,
            bottom_of_box,
            justification,
        })
    }
}

use serde::{Deserialize, Serialize};

/// A single open holding in an agent's [`crate::portfolio::Portfolio`]. Unlike a `Position` that
/// models long/short derivatives exposure with entry/exit fee tracking, this Position only ever
/// represents a long, whole-share cash-equity holding — there is no `Direction` because shorting
/// is disallowed outright, not just by convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: u64,
    pub average_cost: f64,
    pub last_fair_value: Option<f64>,
    pub last_top_of_box: Option<f64>,
    pub last_bottom_of_box: Option<f64>,
}

impl Position {
    pub fn new(symbol: impl Into<String>, quantity: u64, average_cost: f64) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            average_cost,
            last_fair_value: None,
            last_top_of_box: None,
            last_bottom_of_box: None,
        }
    }

    /// Returns a [`PositionBuilder`] instance.
    pub fn builder() -> PositionBuilder {
        PositionBuilder::new()
    }

    /// Merges an additional buy of `quantity` shares at `notional` total cost into this position,
    /// value-weighting `average_cost` across the old and new holdings.
    pub fn merge_buy(&mut self, quantity: u64, notional: f64) {
        let old_value = self.average_cost * self.quantity as f64;
        let new_quantity = self.quantity + quantity;
        self.average_cost = (old_value + notional) / new_quantity as f64;
        self.quantity = new_quantity;
    }

    /// Reduces this position by `quantity` shares, returning the remaining quantity. Does not
    /// alter `average_cost` — cost basis of the remaining shares is unchanged by a partial sale.
    pub fn reduce(&mut self, quantity: u64) -> u64 {
        self.quantity = self.quantity.saturating_sub(quantity);
        self.quantity
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn cost_basis(&self) -> f64 {
        self.quantity as f64 * self.average_cost
    }

    pub fn unrealized_profit_loss(&self, price: f64) -> f64 {
        self.market_value(price) - self.cost_basis()
    }
}

/// Builder to construct [`Position`] instances, in the style of a `PositionBuilder`.
pub struct PositionBuilder {
    pub symbol: Option<String>,
    pub quantity: Option<u64>,
    pub average_cost: Option<f64>,
    pub last_fair_value: Option<f64>,
    pub last_top_of_box: Option<f64>,
    pub last_bottom_of_box: Option<f64>,
}

impl PositionBuilder {
    pub fn new() -> Self {
        Self {
            symbol: None,
            quantity: None,
            average_cost: None,
            last_fair_value: None,
            last_top_of_box: None,
            last_bottom_of_box: None,
        }
    }

    pub fn symbol(mut self, value: impl Into<String>) -> Self {
        self.symbol = Some(value.into());
        self
    }

    pub fn quantity(mut self, value: u64) -> Self {
        self.quantity = Some(value);
        self
    }

    pub fn average_cost(mut self, value: f64) -> Self {
        self.average_cost = Some(value);
        self
    }

    pub fn last_fair_value(mut self, value: f64) -> Self {
        self.last_fair_value = Some(value);
        self
    }

    pub fn last_top_of_box(mut self, value: f64) -> Self {
        self.last_top_of_box = Some(value);
        self
    }

    pub fn last_bottom_of_box(mut self, value: f64) -> Self {
        self.last_bottom_of_box = Some(value);
        self
    }

    pub fn build(self) -> Position {
        Position {
            symbol: self.symbol.unwrap_or_default(),
            quantity: self.quantity.unwrap_or(0),
            average_cost: self.average_cost.unwrap_or(0.0),
            last_fair_value: self.last_fair_value,
            last_top_of_box: self.last_top_of_box,
            last_bottom_of_box: self.last_bottom_of_box,
        }
    }
}

impl Default for PositionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_buy_value_weights_average_cost() {
        let mut position = Position::new("AAA", 10, 100.0);
        position.merge_buy(10, 1_200.0);
        assert_eq!(position.quantity, 20);
        assert_eq!(position.average_cost, 110.0);
    }

    #[test]
    fn reduce_caps_at_zero() {
        let mut position = Position::new("AAA", 10, 100.0);
        assert_eq!(position.reduce(15), 0);
    }

    #[test]
    fn market_value_and_unrealized_pnl() {
        let position = Position::new("AAA", 10, 100.0);
        assert_eq!(position.market_value(120.0), 1_200.0);
        assert_eq!(position.unrealized_profit_loss(120.0), 200.0);
    }

    #[test]
    fn builder_defaults_quantity_and_cost_to_zero() {
        let position = Position::builder().symbol("AAA").build();
        assert_eq!(position.quantity, 0);
        assert_eq!(position.average_cost, 0.0);
    }
}

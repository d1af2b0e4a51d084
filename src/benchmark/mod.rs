//! Benchmark tracks: a reference series (the equity index, or an average of all agents) each
//! simulation compares its agents against.

use serde::{Deserialize, Serialize};

use crate::portfolio::metrics::compute_metrics_from_total_value;
use crate::portfolio::PerformanceMetrics;

/// One benchmark track within a [`crate::simulation::SimulationSnapshot`]. The equity-index
/// benchmark evolves by compounding the underlying index's own return; the "managers" benchmark
/// (present only for multi-agent simulation types) evolves as the simple mean of agent totals —
/// see [`Benchmark::step_index`] and [`Benchmark::step_managers_average`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benchmark {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub performance_history: Vec<PerformanceMetrics>,
    pub last_index_price: Option<f64>,
}

impl Benchmark {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color,
            performance_history: Vec::new(),
            last_index_price: None,
        }
    }

    fn last_total_value(&self) -> f64 {
        self.performance_history
            .last()
            .map(|metrics| metrics.total_value)
            .unwrap_or(0.0)
    }

    /// Advances the equity-index benchmark: multiplies its last total value by the index's
    /// fractional price change since the previous tick, unless either price is non-positive (in
    /// which case the value is carried forward unchanged).
    pub fn step_index(&mut self, index_price_now: f64, timestamp: f64, intraday_hour: f64) {
        let previous_value = self.last_total_value();
        let new_value = match self.last_index_price {
            Some(last_price) if last_price > 0.0 && index_price_now > 0.0 => {
                previous_value * (index_price_now - last_price) / last_price + previous_value
            }
            _ => previous_value,
        };

        self.last_index_price = Some(index_price_now);
        self.push_value(new_value, timestamp, intraday_hour);
    }

    /// Advances the "managers index" benchmark: the simple arithmetic mean of every agent's
    /// current total value.
    pub fn step_managers_average(&mut self, agent_total_values: &[f64], timestamp: f64, intraday_hour: f64) {
        let average = if agent_total_values.is_empty() {
            self.last_total_value()
        } else {
            agent_total_values.iter().sum::<f64>() / agent_total_values.len() as f64
        };
        self.push_value(average, timestamp, intraday_hour);
    }

    /// Recomputes this benchmark's full [`PerformanceMetrics`] (§4.3) and appends it, keeping
    /// benchmarks and agents on the same metrics computation rather than a value-only shortcut.
    fn push_value(&mut self, total_value: f64, timestamp: f64, intraday_hour: f64) {
        let history: Vec<f64> = self.performance_history.iter().map(|m| m.total_value).collect();
        let metrics = compute_metrics_from_total_value(total_value, &history, timestamp, intraday_hour, &[]);
        self.performance_history.push(metrics);
    }
}

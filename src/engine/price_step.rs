use chrono::Utc;

use crate::market_data::MarketData;
use crate::portfolio::metrics::compute_metrics;
use crate::simulation::SimulationSnapshot;

/// Stable benchmark id for the equity-index track, constructed for every simulation type.
pub const BENCHMARK_INDEX_ID: &str = "equity-index";
/// Stable benchmark id for the "managers index" track, constructed only for multi-agent
/// simulation types (§4.5).
pub const BENCHMARK_MANAGERS_ID: &str = "managers-index";

/// `priceStep(snapshot, newMarketData) → snapshot'` (§4.4). A pure transition: replaces market
/// data, appends a fresh [`crate::portfolio::PerformanceMetrics`] per agent against the new
/// prices (no trades occur), and advances every benchmark. Never touches chat.
pub fn price_step(snapshot: &SimulationSnapshot, new_market_data: MarketData, index_symbol: &str) -> SimulationSnapshot {
    let mut next = snapshot.clone();
    next.market_data = new_market_data;
    next.last_updated = Utc::now();

    let timestamp = next.logical_timestamp();
    let intraday_hour = next.intraday_hour;

    for agent in next.agents.iter_mut() {
        let history: Vec<f64> = agent.performance_history.iter().map(|m| m.total_value).collect();
        let metrics = compute_metrics(&agent.portfolio, &next.market_data, &history, timestamp, intraday_hour, &[]);
        agent.performance_history.push(metrics);
    }

    let agent_total_values: Vec<f64> = next
        .agents
        .iter()
        .map(|agent| agent.portfolio.total_value(&next.market_data))
        .collect();
    let index_price_now = next.market_data.price(index_symbol).unwrap_or(0.0);

    for benchmark in next.benchmarks.iter_mut() {
        if benchmark.id == BENCHMARK_INDEX_ID {
            benchmark.step_index(index_price_now, timestamp, intraday_hour);
        } else if benchmark.id == BENCHMARK_MANAGERS_ID {
            benchmark.step_managers_average(&agent_total_values, timestamp, intraday_hour);
        }
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, TraderConfig};
    use crate::benchmark::Benchmark;
    use crate::chat::ChatState;
    use crate::market_data::TickerSnapshot;
    use crate::simulation::Mode;
    use chrono::Utc;

    fn base_snapshot() -> SimulationSnapshot {
        let config = TraderConfig {
            id: "agent-1".to_string(),
            name: "Agent One".to_string(),
            model: "gpt-test".to_string(),
            system_prompt: None,
            color: None,
            image: None,
        };
        let agent = Agent::new(&config, 10_000.0);

        SimulationSnapshot {
            simulation_id: "sim-1".to_string(),
            day: 0,
            intraday_hour: 0.0,
            market_data: MarketData::new(),
            agents: vec![agent],
            benchmarks: vec![
                Benchmark::new(BENCHMARK_INDEX_ID, "Equity Index", None),
                Benchmark::new(BENCHMARK_MANAGERS_ID, "Managers Index", None),
            ],
            mode: Mode::Simulated,
            historical_period: None,
            start_date: Utc::now(),
            current_date: Utc::now(),
            current_timestamp: None,
            chat: ChatState::new(true, 5, 3, 200),
            last_updated: Utc::now(),
            hybrid_transitioned: false,
        }
    }

    #[test]
    fn price_step_appends_performance_metrics_per_agent() {
        let snapshot = base_snapshot();
        let mut market = MarketData::new();
        market.insert(TickerSnapshot::new("SPY", 400.0));

        let next = price_step(&snapshot, market, "SPY");
        assert_eq!(next.agents[0].performance_history.len(), 1);
        assert_eq!(next.agents[0].performance_history[0].total_value, 10_000.0);
    }

    #[test]
    fn price_step_never_mutates_chat() {
        let mut snapshot = base_snapshot();
        snapshot.chat.messages.push(crate::chat::ChatMessage::new_user(
            "alice", None, None, "hi", "0-0.000", Utc::now(),
        ));
        let next = price_step(&snapshot, MarketData::new(), "SPY");
        assert_eq!(next.chat.messages.len(), 1);
        assert_eq!(next.chat.messages[0].round_id, "0-0.000");
    }

    #[test]
    fn price_step_advances_managers_benchmark_as_agent_average() {
        let snapshot = base_snapshot();
        let next = price_step(&snapshot, MarketData::new(), "SPY");
        let managers = next
            .benchmarks
            .iter()
            .find(|b| b.id == BENCHMARK_MANAGERS_ID)
            .unwrap();
        assert_eq!(managers.performance_history[0].total_value, 10_000.0);
    }
}

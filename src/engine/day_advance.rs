use super::advisor::{AdvisorDecision, TradeAdvisor};
use super::pacing::{self, PacingConfig};
use super::price_step::{BENCHMARK_INDEX_ID, BENCHMARK_MANAGERS_ID};
use crate::market_data::MarketData;
use crate::portfolio::metrics::compute_metrics;
use crate::portfolio::{FailedTrade, Side, Trade};
use crate::simulation::SimulationSnapshot;
use std::sync::Arc;

/// `dayAdvance(snapshot, newMarketData) → snapshot'` (§4.4): the same per-agent
/// advisory/execution core as [`super::trade_window::trade_window`], but rolls the calendar
/// forward (`day += 1`, `intradayHour = 0.0`) instead of staying within the current day, applies
/// `newMarketData` fetched via [`crate::market_data::MarketDataProvider::next_day_market_data`]
/// before agents decide, and never touches chat — day boundaries are not chat rounds.
pub async fn day_advance<A: TradeAdvisor>(
    snapshot: &SimulationSnapshot,
    new_market_data: MarketData,
    index_symbol: &str,
    advisor: &A,
    pacing: &PacingConfig,
) -> SimulationSnapshot {
    let mut next = snapshot.clone();
    next.day += 1;
    next.intraday_hour = 0.0;
    next.market_data = new_market_data;

    let agents_snapshot = next.agents.clone();
    let market_data = Arc::new(next.market_data.clone());
    let day = next.day;

    let failed_trades_per_agent: Vec<Vec<FailedTrade>> = agents_snapshot
        .iter()
        .map(|agent| agent.memory.failed_trades.clone())
        .collect();

    let decisions = pacing::dispatch(agents_snapshot.len(), pacing, |i| {
        let agent = agents_snapshot[i].clone();
        let failed = failed_trades_per_agent[i].clone();
        let market_data = Arc::clone(&market_data);
        async move { advisor.decide(&agent, &market_data, day, None, &failed).await }
    })
    .await;

    let timestamp = next.logical_timestamp();
    let intraday_hour = next.intraday_hour;
    let tolerance = next.timestamp_tolerance();

    for (i, agent) in next.agents.iter_mut().enumerate() {
        let decision = decisions[i].clone().unwrap_or_else(|| AdvisorDecision {
            trades: Vec::new(),
            rationale: "agent call timed out or errored".to_string(),
            reply: None,
        });

        let mut requests = decision.trades.clone();
        requests.sort_by_key(|request| match request.side {
            Side::Sell => 0,
            Side::Buy => 1,
        });

        let mut executed_trades = Vec::new();
        let mut failed = Vec::new();

        for request in requests {
            let Some(price) = market_data.price(&request.symbol) else {
                continue;
            };

            let result = match request.side {
                Side::Buy => agent.portfolio.execute_buy(
                    &request.symbol,
                    request.quantity,
                    price,
                    timestamp,
                    request.fair_value,
                    request.top_of_box,
                    request.bottom_of_box,
                    request.justification.clone(),
                ),
                Side::Sell => agent.portfolio.execute_sell(
                    &request.symbol,
                    request.quantity,
                    price,
                    timestamp,
                    request.fair_value,
                    request.top_of_box,
                    request.bottom_of_box,
                    request.justification.clone(),
                ),
            };

            match result {
                Ok(trade) => executed_trades.push(trade),
                Err(err) => failed.push(FailedTrade {
                    symbol: request.symbol.clone(),
                    side: request.side,
                    quantity: request.quantity,
                    reason: err.to_string(),
                }),
            }
        }

        let daily_trades: Vec<Trade> = executed_trades
            .iter()
            .filter(|trade| (trade.timestamp - timestamp).abs() < tolerance)
            .cloned()
            .collect();

        let history: Vec<f64> = agent.performance_history.iter().map(|m| m.total_value).collect();
        let metrics = compute_metrics(&agent.portfolio, &market_data, &history, timestamp, intraday_hour, &daily_trades);

        agent.record_round(day, executed_trades, decision.rationale.clone(), metrics);
        agent.memory.set_failed_trades(failed);
    }

    let agent_total_values: Vec<f64> = next
        .agents
        .iter()
        .map(|agent| agent.portfolio.total_value(&market_data))
        .collect();
    let index_price_now = market_data.price(index_symbol).unwrap_or(0.0);

    for benchmark in next.benchmarks.iter_mut() {
        if benchmark.id == BENCHMARK_INDEX_ID {
            benchmark.step_index(index_price_now, timestamp, intraday_hour);
        } else if benchmark.id == BENCHMARK_MANAGERS_ID {
            benchmark.step_managers_average(&agent_total_values, timestamp, intraday_hour);
        }
    }

    next
}

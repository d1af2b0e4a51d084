use std::sync::Arc;

use chrono::Utc;

use super::advisor::{AdvisorDecision, ChatContext, TradeAdvisor};
use super::pacing::{self, PacingConfig};
use super::price_step::BENCHMARK_MANAGERS_ID;
use crate::chat;
use crate::chat::round::format_round_id;
use crate::portfolio::metrics::compute_metrics;
use crate::portfolio::{FailedTrade, Side, Trade};
use crate::simulation::{Mode, SimulationSnapshot};

/// `tradeWindow(snapshot) → snapshot'` (§4.4): the hard subsystem. Delivers pending chat
/// messages, fans out one advisory call per agent with [`PacingConfig`]-governed pacing,
/// executes the resulting trade decisions (sells before buys), recomputes each agent's
/// performance metrics, updates memory, and reconciles chat replies.
pub async fn trade_window<A: TradeAdvisor>(
    snapshot: &SimulationSnapshot,
    advisor: &A,
    pacing: &PacingConfig,
) -> SimulationSnapshot {
    let mut next = snapshot.clone();
    let round_id = format_round_id(next.day, next.intraday_hour);
    chat::deliver_pending(&mut next.chat, &round_id);

    let agents_snapshot = next.agents.clone();
    let market_data = Arc::new(next.market_data.clone());
    let chat_enabled = next.chat.enabled;
    let max_reply_length = next.chat.max_message_length;
    let day = next.day;
    let historical_mode = matches!(next.mode, Mode::Historical);

    let messages_per_agent: Vec<Vec<chat::ChatMessage>> = agents_snapshot
        .iter()
        .map(|agent| chat::messages_for_agent(&next.chat, &agent.id, &round_id))
        .collect();
    let failed_trades_per_agent: Vec<Vec<FailedTrade>> = agents_snapshot
        .iter()
        .map(|agent| agent.memory.failed_trades.clone())
        .collect();

    let decisions = pacing::dispatch(agents_snapshot.len(), pacing, |i| {
        let agent = agents_snapshot[i].clone();
        let messages = messages_per_agent[i].clone();
        let failed = failed_trades_per_agent[i].clone();
        let market_data = Arc::clone(&market_data);
        let chat_context = chat_enabled.then(|| ChatContext {
            enabled: true,
            messages,
            max_reply_length,
        });

        async move {
            advisor
                .decide(&agent, &market_data, day, chat_context.as_ref(), &failed)
                .await
        }
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

        let unique_senders = chat::unique_senders_for(&next.chat, &agent.id, &round_id);
        let received_user_message = !unique_senders.is_empty();
        let may_reply = chat_enabled && (received_user_message || historical_mode);

        let replied = may_reply
            && decision.reply.as_deref().is_some_and(|raw| {
                match chat::prepare_agent_reply(&next.chat, raw, &unique_senders) {
                    Some(prepared) => {
                        chat::upsert_agent_reply(&mut next.chat, &agent.id, &agent.name, prepared, &round_id, Utc::now());
                        true
                    }
                    None => false,
                }
            });

        chat::mark_user_messages(&mut next.chat, &agent.id, &round_id, replied);
    }

    let agent_total_values: Vec<f64> = next
        .agents
        .iter()
        .map(|agent| agent.portfolio.total_value(&market_data))
        .collect();
    if let Some(benchmark) = next.benchmark_mut(BENCHMARK_MANAGERS_ID) {
        benchmark.step_managers_average(&agent_total_values, timestamp, intraday_hour);
    }

    next
}

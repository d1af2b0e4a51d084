//! LLM-backed trading agent: identity, portfolio, and the bounded rolling memory passed back
//! into its next [`crate::engine::advisor::TradeAdvisor`] call.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::portfolio::{FailedTrade, PerformanceMetrics, Portfolio, Trade};

const TRADE_MEMORY_LEN: usize = 10;
const RATIONALE_MEMORY_LEN: usize = 5;
const PERFORMANCE_MEMORY_LEN: usize = 10;

/// Static configuration for one agent within a [`crate::simulation::SimulationType`]. Grounded
/// in a `TraderBuilder`/lego pattern of assembling a runnable agent from a small,
/// mostly-optional config struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderConfig {
    pub id: String,
    pub name: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub color: Option<String>,
    pub image: Option<String>,
}

/// Bounded rolling context handed back to the agent's next advisory call: the last few trades,
/// rationales, and performance snapshots, plus any trades that failed execution last round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMemory {
    pub recent_trades: VecDeque<Trade>,
    pub recent_rationales: VecDeque<String>,
    pub recent_performance: VecDeque<PerformanceMetrics>,
    pub failed_trades: Vec<FailedTrade>,
}

impl AgentMemory {
    pub fn record_trades(&mut self, trades: impl IntoIterator<Item = Trade>) {
        for trade in trades {
            if self.recent_trades.len() == TRADE_MEMORY_LEN {
                self.recent_trades.pop_front();
            }
            self.recent_trades.push_back(trade);
        }
    }

    pub fn record_rationale(&mut self, rationale: String) {
        if self.recent_rationales.len() == RATIONALE_MEMORY_LEN {
            self.recent_rationales.pop_front();
        }
        self.recent_rationales.push_back(rationale);
    }

    pub fn record_performance(&mut self, metrics: PerformanceMetrics) {
        if self.recent_performance.len() == PERFORMANCE_MEMORY_LEN {
            self.recent_performance.pop_front();
        }
        self.recent_performance.push_back(metrics);
    }

    pub fn set_failed_trades(&mut self, failed: Vec<FailedTrade>) {
        self.failed_trades = failed;
    }
}

/// A single LLM-backed trader participating in a simulation. Identity fields never change after
/// construction; `portfolio`, the three histories, and `memory` evolve every tick/trade window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub model: String,
    pub color: Option<String>,
    pub image: Option<String>,
    pub system_prompt: Option<String>,

    pub portfolio: Portfolio,
    pub trade_history: Vec<Trade>,
    pub performance_history: Vec<PerformanceMetrics>,
    pub rationale_history: indexmap::IndexMap<u64, String>,
    pub memory: AgentMemory,
}

impl Agent {
    pub fn new(config: &TraderConfig, starting_cash: f64) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            model: config.model.clone(),
            color: config.color.clone(),
            image: config.image.clone(),
            system_prompt: config.system_prompt.clone(),
            portfolio: Portfolio::new(starting_cash),
            trade_history: Vec::new(),
            performance_history: Vec::new(),
            rationale_history: indexmap::IndexMap::new(),
            memory: AgentMemory::default(),
        }
    }

    pub fn record_round(&mut self, day: u64, trades: Vec<Trade>, rationale: String, metrics: PerformanceMetrics) {
        self.memory.record_trades(trades.clone());
        self.trade_history.extend(trades);
        self.memory.record_rationale(rationale.clone());
        self.rationale_history.insert(day, rationale);
        self.memory.record_performance(metrics);
        self.performance_history.push(metrics);
    }
}

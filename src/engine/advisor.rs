use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::chat::ChatMessage;
use crate::market_data::MarketData;
use crate::portfolio::{FailedTrade, TradeRequest};

/// Chat context handed to an agent's advisory call: the messages directed at it this round plus
/// the reply-length budget it must respect.
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    pub enabled: bool,
    pub messages: Vec<ChatMessage>,
    pub max_reply_length: usize,
}

/// The decision an agent's [`TradeAdvisor`] call returns: zero or more trade requests, a
/// free-text rationale, and — only when chat is active and the agent has messages to respond
/// to (or the simulation is historical) — a reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisorDecision {
    pub trades: Vec<TradeRequest>,
    pub rationale: String,
    pub reply: Option<String>,
}

/// The (out-of-scope) LLM façade this crate calls into once per agent per trade window.
/// Mirrors a `Strategy: SignalGenerator`-style injected-capability bound on `Trader` —
/// generalized from "emit a trading Signal from market data" to "decide trades and optionally
/// reply in chat, given a full chat/portfolio context and a prior-failure memory". Implementors
/// must never panic or block past their timeout; the engine enforces the 60-second hard limit
/// externally via `tokio::time::timeout`, not inside this trait.
#[async_trait]
pub trait TradeAdvisor: Send + Sync {
    async fn decide(
        &self,
        agent: &Agent,
        market: &MarketData,
        day: u64,
        chat: Option<&ChatContext>,
        previous_failed_trades: &[FailedTrade],
    ) -> AdvisorDecision;
}

/// Deterministic in-memory stub used only by tests: always returns the same canned decision
/// regardless of input, so engine-level tests can assert on execution/chat logic without
/// depending on any real advisor implementation.
pub struct StubAdvisor {
    pub decision: AdvisorDecision,
}

impl StubAdvisor {
    pub fn new(decision: AdvisorDecision) -> Self {
        Self { decision }
    }

    pub fn empty() -> Self {
        Self {
            decision: AdvisorDecision {
                trades: Vec::new(),
                rationale: "no-op".to_string(),
                reply: None,
            },
        }
    }
}

#[async_trait]
impl TradeAdvisor for StubAdvisor {
    async fn decide(
        &self,
        _agent: &Agent,
        _market: &MarketData,
        _day: u64,
        _chat: Option<&ChatContext>,
        _previous_failed_trades: &[FailedTrade],
    ) -> AdvisorDecision {
        self.decision.clone()
    }
}

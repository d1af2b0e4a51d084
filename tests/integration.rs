use std::time::Duration;

use chrono::Utc;

use trading_arena::agent::TraderConfig;
use trading_arena::chat;
use trading_arena::chat::SessionKind;
use trading_arena::engine::{trade_window, AdvisorDecision, PacingConfig, StubAdvisor};
use trading_arena::market_data::{MarketData, TickerSnapshot};
use trading_arena::persistence::{JsonFileAdapter, PersistenceAdapter};
use trading_arena::portfolio::{Side, TradeRequest};
use trading_arena::scheduler::{SchedulerConfig, TimerService};
use trading_arena::simulation::{ChatPolicy, ClockPolicy, Mode, SimulationManager, SimulationType};

fn trader_configs(ids: &[&str]) -> Vec<TraderConfig> {
    ids.iter()
        .map(|id| TraderConfig {
            id: id.to_string(),
            name: id.to_string(),
            model: "gpt-test".to_string(),
            system_prompt: None,
            color: None,
            image: None,
        })
        .collect()
}

fn chat_policy() -> ChatPolicy {
    ChatPolicy {
        max_messages_per_agent: 5,
        max_messages_per_user: 3,
        max_message_length: 200,
    }
}

fn clock() -> ClockPolicy {
    ClockPolicy {
        now: Utc::now(),
        delay_minutes: 0,
        configured_start: None,
    }
}

struct NullPersistence;

#[async_trait::async_trait]
impl PersistenceAdapter for NullPersistence {
    async fn load(&self, _id: &str) -> Result<Option<trading_arena::simulation::SimulationSnapshot>, trading_arena::persistence::PersistenceError> {
        Ok(None)
    }
    async fn save(&self, _id: &str, _snapshot: &trading_arena::simulation::SimulationSnapshot) -> Result<(), trading_arena::persistence::PersistenceError> {
        Ok(())
    }
    async fn delete(&self, _id: &str) -> Result<(), trading_arena::persistence::PersistenceError> {
        Ok(())
    }
}

/// A trade window executes a buy decision end to end, against a real market snapshot built
/// through the manager, and the resulting portfolio change is visible via the manager's handle.
#[tokio::test]
async fn buy_decision_executes_through_a_real_trade_window() {
    let mut manager = SimulationManager::new();
    let mut market = MarketData::new();
    market.insert(TickerSnapshot::new("AAA", 100.0));

    let simulation_type = SimulationType {
        id: "sim-buy".to_string(),
        name: "Buy Test".to_string(),
        description: String::new(),
        trader_configs: trader_configs(&["agent-1"]),
        chat_enabled: false,
        show_model_names: true,
        enabled: true,
    };

    let persistence = NullPersistence;
    manager
        .initialize_all(
            vec![simulation_type],
            market,
            &persistence,
            Mode::Simulated,
            None,
            chat_policy(),
            clock(),
            false,
        )
        .await
        .unwrap();

    let advisor = StubAdvisor::new(AdvisorDecision {
        trades: vec![TradeRequest {
            symbol: "AAA".to_string(),
            side: Side::Buy,
            quantity: 50,
            fair_value: None,
            top_of_box: None,
            bottom_of_box: None,
            justification: None,
        }],
        rationale: "accumulating".to_string(),
        reply: None,
    });

    let handle = manager.get("sim-buy").unwrap();
    let pacing = PacingConfig {
        request_spacing: None,
        max_concurrent: None,
        call_timeout: Duration::from_secs(5),
    };

    let next = {
        let instance = handle.lock().await;
        trade_window(instance.snapshot(), &advisor, &pacing).await
    };
    handle.lock().await.replace_snapshot(next);

    let snapshot = handle.lock().await.snapshot().clone();
    let agent = &snapshot.agents[0];
    assert_eq!(agent.portfolio.cash, 10_000.0 - 5_000.0 - 2.50);
    assert_eq!(agent.portfolio.positions.get("AAA").unwrap().quantity, 50);
    assert_eq!(agent.trade_history.len(), 1);
}

/// A user message submitted near a round boundary is pushed to the next round (the 60-second
/// safety buffer), and the agent's reply to it is delivered and marked responded within that
/// same trade window.
#[tokio::test]
async fn chat_message_is_delivered_and_answered_in_its_assigned_round() {
    let mut manager = SimulationManager::new();
    let mut market = MarketData::new();
    market.insert(TickerSnapshot::new("AAA", 100.0));

    let simulation_type = SimulationType {
        id: "sim-chat".to_string(),
        name: "Chat Test".to_string(),
        description: String::new(),
        trader_configs: trader_configs(&["agent-1"]),
        chat_enabled: true,
        show_model_names: true,
        enabled: true,
    };

    let persistence = NullPersistence;
    manager
        .initialize_all(
            vec![simulation_type],
            market,
            &persistence,
            Mode::Simulated,
            None,
            chat_policy(),
            clock(),
            false,
        )
        .await
        .unwrap();

    let handle = manager.get("sim-chat").unwrap();

    // 45 seconds until the next round: inside the 60-second safety buffer, so the message is
    // pushed one round further out than it would otherwise land.
    let expected_round = chat::round::assign_target_round(1, 1.0, 2.0, 45.0, SessionKind::Simulated);
    let message = {
        let mut instance = handle.lock().await;
        let snapshot = instance.snapshot_mut();
        chat::submit_message(
            &mut snapshot.chat,
            "alice",
            Some("agent-1".to_string()),
            Some("Agent One".to_string()),
            "what's your thesis on AAA?",
            1,
            1.0,
            2.0,
            45.0,
            SessionKind::Simulated,
            Utc::now(),
        )
        .unwrap()
    };
    assert_eq!(message.round_id, chat::round::format_round_id(expected_round.0, expected_round.1));
    assert_eq!(message.round_id, "1-5.000");

    // Advance the snapshot's clock to that round and run a trade window with an advisor that replies.
    {
        let mut instance = handle.lock().await;
        let snapshot = instance.snapshot_mut();
        snapshot.day = expected_round.0;
        snapshot.intraday_hour = expected_round.1;
    }

    let advisor = StubAdvisor::new(AdvisorDecision {
        trades: vec![],
        rationale: "holding".to_string(),
        reply: Some("still bullish on AAA".to_string()),
    });
    let pacing = PacingConfig {
        request_spacing: None,
        max_concurrent: None,
        call_timeout: Duration::from_secs(5),
    };

    let next = {
        let instance = handle.lock().await;
        trade_window(instance.snapshot(), &advisor, &pacing).await
    };
    handle.lock().await.replace_snapshot(next);

    let snapshot = handle.lock().await.snapshot().clone();
    let user_message = snapshot.chat.messages.iter().find(|m| m.id == message.id).unwrap();
    assert_eq!(user_message.status, Some(trading_arena::chat::MessageStatus::Responded));

    let replies: Vec<_> = snapshot
        .chat
        .messages
        .iter()
        .filter(|m| m.sender_type == trading_arena::chat::SenderType::Agent && m.round_id == message.round_id)
        .collect();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].content.contains("bullish"));
}

/// Saving and loading a snapshot through the filesystem driver round-trips every field that
/// matters for resuming a simulation.
#[tokio::test]
async fn persistence_round_trip_survives_a_manager_initialized_snapshot() {
    let mut manager = SimulationManager::new();
    let simulation_type = SimulationType {
        id: "sim-persist".to_string(),
        name: "Persist Test".to_string(),
        description: String::new(),
        trader_configs: trader_configs(&["agent-1", "agent-2"]),
        chat_enabled: true,
        show_model_names: true,
        enabled: true,
    };

    let dir = std::env::temp_dir().join(format!("trading-arena-integration-{}", uuid::Uuid::new_v4()));
    let persistence = JsonFileAdapter::new(dir.join("state"), "default");

    manager
        .initialize_all(
            vec![simulation_type],
            MarketData::new(),
            &persistence,
            Mode::Simulated,
            None,
            chat_policy(),
            clock(),
            false,
        )
        .await
        .unwrap();

    let original = manager.get("sim-persist").unwrap().lock().await.snapshot().clone();
    let loaded = persistence.load("sim-persist").await.unwrap().expect("snapshot was saved during initialize_all");

    assert_eq!(loaded.simulation_id, original.simulation_id);
    assert_eq!(loaded.agents.len(), 2);
    assert_eq!(loaded.benchmarks.len(), original.benchmarks.len());
    assert_eq!(loaded.day, original.day);
}

/// Historical completion: once the day counter passes the configured maximum, the scheduler's
/// timer reports the simulation as complete.
#[test]
fn historical_simulation_completes_after_max_day() {
    assert!(!TimerService::is_historical_complete(3, Some(3)));
    assert!(TimerService::is_historical_complete(4, Some(3)));
}

/// Hybrid transition boundary: a simulated clock that has caught up to within five minutes of
/// wall-clock now triggers the one-time switch to realtime intervals.
#[test]
fn hybrid_mode_transitions_once_the_simulated_clock_catches_up() {
    let now = Utc::now();
    let config = SchedulerConfig::default();
    assert_eq!(config.intervals_for(Mode::Hybrid, false).sim_interval, config.simulated.sim_interval);

    let almost_caught_up = now - chrono::Duration::minutes(3);
    assert!(TimerService::should_hybrid_transition(almost_caught_up, now));
    assert_eq!(config.intervals_for(Mode::Hybrid, true).sim_interval, config.realtime.sim_interval);
}

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::Mutex;

use super::error::SimulationError;
use super::instance::{ChatPolicy, ClockPolicy, SimulationInstance};
use super::types::{HistoricalPeriod, Mode, SimulationType};
use crate::market_data::MarketData;
use crate::persistence::PersistenceAdapter;

/// Owns the `{simId → SimulationInstance}` map and the shared [`MarketData`] slot (§4.5). Each
/// instance is held behind its own `tokio::sync::Mutex` (§5: "at most one engine operation runs
/// on a given instance at a time"), like an `Arc<Mutex<Portfolio>>` shared-state pattern — but
/// scoped per instance rather than one lock for the whole process, so engine operations on
/// distinct instances can run concurrently.
#[derive(Debug, Default)]
pub struct SimulationManager {
    instances: IndexMap<String, Arc<Mutex<SimulationInstance>>>,
    market_data: MarketData,
}

impl SimulationManager {
    pub fn new() -> Self {
        Self {
            instances: IndexMap::new(),
            market_data: MarketData::new(),
        }
    }

    /// `SimulationManager.InitializeAll(marketData)`. For every enabled `SimulationType`,
    /// attempts to load a persisted snapshot (unless `force_reset`), otherwise initializes
    /// fresh; always persists the resulting initial snapshot.
    #[allow(clippy::too_many_arguments)]
    pub async fn initialize_all(
        &mut self,
        simulation_types: Vec<SimulationType>,
        market_data: MarketData,
        persistence: &dyn PersistenceAdapter,
        mode: Mode,
        historical_period: Option<HistoricalPeriod>,
        chat_policy: ChatPolicy,
        clock: ClockPolicy,
        force_reset: bool,
    ) -> Result<(), SimulationError> {
        self.market_data = market_data.clone();

        for simulation_type in simulation_types.into_iter().filter(|t| t.enabled) {
            let persisted = if force_reset {
                None
            } else {
                persistence.load(&simulation_type.id).await?
            };

            let instance = SimulationInstance::initialize(
                simulation_type,
                market_data.clone(),
                persisted,
                mode,
                historical_period.clone(),
                chat_policy,
                clock,
            );

            let id = instance.snapshot().simulation_id.clone();
            persistence.save(&id, instance.snapshot()).await?;
            self.instances.insert(id, Arc::new(Mutex::new(instance)));
        }

        Ok(())
    }

    /// `SimulationManager.ResetSimulation(id)`: replaces the instance's snapshot with a freshly
    /// initialized one built from the current shared market data.
    pub async fn reset_simulation(&self, id: &str, chat_policy: ChatPolicy, clock: ClockPolicy) -> Result<(), SimulationError> {
        let handle = self.instances.get(id).ok_or_else(|| SimulationError::NotFound { id: id.to_string() })?;
        let mut instance = handle.lock().await;

        let simulation_type = instance.simulation_type().clone();
        let mode = instance.snapshot().mode;
        let historical_period = instance.snapshot().historical_period.clone();

        let fresh = SimulationInstance::initialize(
            simulation_type,
            self.market_data.clone(),
            None,
            mode,
            historical_period,
            chat_policy,
            clock,
        );
        *instance = fresh;
        Ok(())
    }

    /// `ResetAll`: resets every currently-tracked instance.
    pub async fn reset_all(&self, chat_policy: ChatPolicy, clock: ClockPolicy) -> Result<(), SimulationError> {
        for id in self.instances.keys() {
            self.reset_simulation(id, chat_policy, clock).await?;
        }
        Ok(())
    }

    /// `UpdateSharedMarketData(M)`: replaces the shared slot and propagates it into every
    /// instance's snapshot.
    pub async fn update_shared_market_data(&mut self, market_data: MarketData) {
        self.market_data = market_data.clone();
        for handle in self.instances.values() {
            handle.lock().await.snapshot_mut().market_data = market_data.clone();
        }
    }

    pub fn shared_market_data(&self) -> &MarketData {
        &self.market_data
    }

    /// Updates only the tracking slot returned by [`Self::shared_market_data`], without touching
    /// any instance's own snapshot. Used by the scheduler after a price tick has already applied
    /// the same market data into every instance via the engine transition itself.
    pub fn set_shared_market_data(&mut self, market_data: MarketData) {
        self.market_data = market_data;
    }

    /// Returns a cloned handle to the instance's lock, or `None` if `id` is untracked. Callers
    /// `.lock().await` it themselves — the manager never holds a lock across an `.await` of its
    /// own, so distinct instances never contend with each other through the manager.
    pub fn get(&self, id: &str) -> Option<Arc<Mutex<SimulationInstance>>> {
        self.instances.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.instances.keys()
    }

    pub fn handles(&self) -> impl Iterator<Item = (&String, &Arc<Mutex<SimulationInstance>>)> {
        self.instances.iter()
    }
}

//! Snapshot persistence: one `load`/`save`/`delete` contract (§6), two drivers — a JSON-file
//! store and a relational (PostgreSQL) store.

pub mod error;
pub mod json_file;
pub mod relational;

use async_trait::async_trait;

pub use error::PersistenceError;
pub use json_file::JsonFileAdapter;
pub use relational::RelationalAdapter;

use crate::simulation::SimulationSnapshot;

/// Shared key/value contract for persisting simulation snapshots. Mirrors a
/// `PositionHandler`/repository traits (`InMemoryRepository`, `RedisRepository`) implementing
/// one interface against two backends, generalized from per-position CRUD to whole-snapshot
/// load/save/delete.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<SimulationSnapshot>, PersistenceError>;
    async fn save(&self, id: &str, snapshot: &SimulationSnapshot) -> Result<(), PersistenceError>;
    async fn delete(&self, id: &str) -> Result<(), PersistenceError>;
}

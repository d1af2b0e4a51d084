use async_trait::async_trait;
use sqlx::PgPool;

use super::error::PersistenceError;
use super::PersistenceAdapter;
use crate::simulation::SimulationSnapshot;

/// Relational [`PersistenceAdapter`] backed by a single `simulation_snapshots` table, keyed by
/// `(namespace, snapshot_id)`. Writes are idempotent upserts against a `sqlx::PgPool`, the
/// conventional shape for key/value-over-Postgres storage.
#[derive(Debug, Clone)]
pub struct RelationalAdapter {
    pool: PgPool,
    namespace: String,
}

impl RelationalAdapter {
    pub fn new(pool: PgPool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }

    /// Creates the `simulation_snapshots` table if it does not already exist. Called once at
    /// startup by the (out-of-scope) process bootstrap.
    pub async fn ensure_schema(&self) -> Result<(), PersistenceError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS simulation_snapshots (
                namespace TEXT NOT NULL,
                snapshot_id TEXT NOT NULL,
                day INT NOT NULL,
                intraday_hour INT NOT NULL,
                mode TEXT NOT NULL,
                snapshot JSONB NOT NULL,
                last_updated TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (namespace, snapshot_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|err| PersistenceError::Database(err.to_string()))?;
        Ok(())
    }

    /// Deletes every row in the table, returning the row count removed. Used by the (out-of-
    /// scope) admin surface for history cleanup; byte-size reporting is the caller's job via
    /// `pg_total_relation_size` deltas, since that requires a connection held open across the
    /// delete, outside this adapter's narrow load/save/delete contract.
    pub async fn clear_history(&self) -> Result<u64, PersistenceError> {
        let result = sqlx::query("DELETE FROM simulation_snapshots")
            .execute(&self.pool)
            .await
            .map_err(|err| PersistenceError::Database(err.to_string()))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PersistenceAdapter for RelationalAdapter {
    async fn load(&self, id: &str) -> Result<Option<SimulationSnapshot>, PersistenceError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT snapshot FROM simulation_snapshots WHERE namespace = $1 AND snapshot_id = $2")
                .bind(&self.namespace)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| PersistenceError::Database(err.to_string()))?;

        match row {
            Some((value,)) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, id: &str, snapshot: &SimulationSnapshot) -> Result<(), PersistenceError> {
        let payload = serde_json::to_value(snapshot)?;
        let intraday_hour_millis = (snapshot.intraday_hour * 1000.0).round() as i32;
        let mode = serde_json::to_string(&snapshot.mode)?;

        sqlx::query(
            "INSERT INTO simulation_snapshots (namespace, snapshot_id, day, intraday_hour, mode, snapshot, last_updated)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (namespace, snapshot_id) DO UPDATE SET
                day = EXCLUDED.day,
                intraday_hour = EXCLUDED.intraday_hour,
                mode = EXCLUDED.mode,
                snapshot = EXCLUDED.snapshot,
                last_updated = EXCLUDED.last_updated",
        )
        .bind(&self.namespace)
        .bind(id)
        .bind(snapshot.day as i32)
        .bind(intraday_hour_millis)
        .bind(mode)
        .bind(payload)
        .bind(snapshot.last_updated)
        .execute(&self.pool)
        .await
        .map_err(|err| PersistenceError::Database(err.to_string()))?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM simulation_snapshots WHERE namespace = $1 AND snapshot_id = $2")
            .bind(&self.namespace)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| PersistenceError::Database(err.to_string()))?;
        Ok(())
    }
}

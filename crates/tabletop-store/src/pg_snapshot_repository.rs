//! `PostgreSQL` implementation of the `SnapshotRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use tabletop_core::error::DomainError;
use tabletop_core::repository::{SnapshotRepository, StoredSnapshot};

const SELECT_SNAPSHOT: &str = r"
SELECT aggregate_id, payload, version, saved_at
FROM battle_snapshots
WHERE aggregate_id = $1
";

const SELECT_VERSION: &str = r"
SELECT version
FROM battle_snapshots
WHERE aggregate_id = $1
";

// The WHERE clause drops writes that arrive out of order.
const UPSERT_SNAPSHOT: &str = r"
INSERT INTO battle_snapshots (aggregate_id, payload, version, saved_at)
VALUES ($1, $2, $3, $4)
ON CONFLICT (aggregate_id) DO UPDATE
SET payload = EXCLUDED.payload,
    version = EXCLUDED.version,
    saved_at = EXCLUDED.saved_at
WHERE battle_snapshots.version <= EXCLUDED.version
";

/// PostgreSQL-backed snapshot repository.
#[derive(Debug, Clone)]
pub struct PgSnapshotRepository {
    pool: PgPool,
}

impl PgSnapshotRepository {
    /// Creates a new `PgSnapshotRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn infrastructure(context: &str, err: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("{context}: {err}"))
}

fn snapshot_from_row(row: &PgRow) -> Result<StoredSnapshot, sqlx::Error> {
    Ok(StoredSnapshot {
        aggregate_id: row.try_get::<Uuid, _>("aggregate_id")?,
        payload: row.try_get::<serde_json::Value, _>("payload")?,
        version: row.try_get::<i64, _>("version")?,
        saved_at: row.try_get::<DateTime<Utc>, _>("saved_at")?,
    })
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
    async fn load_snapshot(
        &self,
        aggregate_id: Uuid,
    ) -> Result<Option<StoredSnapshot>, DomainError> {
        let row = sqlx::query(SELECT_SNAPSHOT)
            .bind(aggregate_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| infrastructure("snapshot load failed", &e))?;

        row.as_ref()
            .map(snapshot_from_row)
            .transpose()
            .map_err(|e| infrastructure("snapshot decode failed", &e))
    }

    async fn stored_version(&self, aggregate_id: Uuid) -> Result<Option<i64>, DomainError> {
        sqlx::query_scalar::<_, i64>(SELECT_VERSION)
            .bind(aggregate_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| infrastructure("snapshot version lookup failed", &e))
    }

    async fn save_snapshot(&self, snapshot: &StoredSnapshot) -> Result<(), DomainError> {
        let result = sqlx::query(UPSERT_SNAPSHOT)
            .bind(snapshot.aggregate_id)
            .bind(&snapshot.payload)
            .bind(snapshot.version)
            .bind(snapshot.saved_at)
            .execute(&self.pool)
            .await
            .map_err(|e| infrastructure("snapshot save failed", &e))?;

        if result.rows_affected() == 0 {
            debug!(
                aggregate_id = %snapshot.aggregate_id,
                version = snapshot.version,
                "stale snapshot ignored"
            );
        }
        Ok(())
    }
}

//! Snapshot repository abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of an aggregate snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    /// Aggregate this snapshot belongs to.
    pub aggregate_id: Uuid,
    /// Serialized aggregate record.
    pub payload: serde_json::Value,
    /// Aggregate version at the time the snapshot was taken.
    pub version: i64,
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
}

/// Repository trait for loading and saving one snapshot per aggregate.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Load the latest snapshot for an aggregate, if one was ever saved.
    async fn load_snapshot(&self, aggregate_id: Uuid)
    -> Result<Option<StoredSnapshot>, DomainError>;

    /// Version of the stored snapshot for an aggregate, if one was ever saved.
    async fn stored_version(&self, aggregate_id: Uuid) -> Result<Option<i64>, DomainError> {
        Ok(self
            .load_snapshot(aggregate_id)
            .await?
            .map(|snapshot| snapshot.version))
    }

    /// Save a snapshot, replacing any older one for the same aggregate.
    /// Implementations must not overwrite a newer `version` with an older one.
    async fn save_snapshot(&self, snapshot: &StoredSnapshot) -> Result<(), DomainError>;
}

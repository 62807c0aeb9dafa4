//! Test repositories: mock `SnapshotRepository` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tabletop_core::error::DomainError;
use tabletop_core::repository::{SnapshotRepository, StoredSnapshot};
use uuid::Uuid;

/// A snapshot repository that records every `save_snapshot` call and returns
/// the configured snapshot from every `load_snapshot` call.
#[derive(Debug, Default)]
pub struct RecordingSnapshotRepository {
    load_result: Mutex<Option<StoredSnapshot>>,
    loads: Mutex<Vec<Uuid>>,
    saved: Mutex<Vec<StoredSnapshot>>,
}

impl RecordingSnapshotRepository {
    /// Create a recording repository that returns `load_result` on load.
    #[must_use]
    pub fn new(load_result: Option<StoredSnapshot>) -> Self {
        Self {
            load_result: Mutex::new(load_result),
            loads: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of every snapshot that was saved, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved_snapshots(&self) -> Vec<StoredSnapshot> {
        self.saved.lock().unwrap().clone()
    }

    /// Returns the aggregate ids passed to `load_snapshot`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn load_calls(&self) -> Vec<Uuid> {
        self.loads.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotRepository for RecordingSnapshotRepository {
    async fn load_snapshot(
        &self,
        aggregate_id: Uuid,
    ) -> Result<Option<StoredSnapshot>, DomainError> {
        self.loads.lock().unwrap().push(aggregate_id);
        Ok(self.load_result.lock().unwrap().clone())
    }

    async fn save_snapshot(&self, snapshot: &StoredSnapshot) -> Result<(), DomainError> {
        self.saved.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

/// A snapshot repository that never has anything stored and silently accepts
/// saves.
#[derive(Debug)]
pub struct EmptySnapshotRepository;

#[async_trait]
impl SnapshotRepository for EmptySnapshotRepository {
    async fn load_snapshot(
        &self,
        _aggregate_id: Uuid,
    ) -> Result<Option<StoredSnapshot>, DomainError> {
        Ok(None)
    }

    async fn save_snapshot(&self, _snapshot: &StoredSnapshot) -> Result<(), DomainError> {
        Ok(())
    }
}

/// A snapshot repository that always returns an infrastructure error. Useful
/// for testing error-handling paths.
#[derive(Debug)]
pub struct FailingSnapshotRepository;

#[async_trait]
impl SnapshotRepository for FailingSnapshotRepository {
    async fn load_snapshot(
        &self,
        _aggregate_id: Uuid,
    ) -> Result<Option<StoredSnapshot>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save_snapshot(&self, _snapshot: &StoredSnapshot) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

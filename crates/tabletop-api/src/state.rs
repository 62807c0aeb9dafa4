//! Shared application state.

use std::sync::Arc;

use tabletop_battle::application::active_battles::ActiveBattles;
use tabletop_core::clock::Clock;
use tabletop_core::repository::SnapshotRepository;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for event timestamps.
    pub clock: Arc<dyn Clock>,
    /// Every battle touched by this process.
    pub battles: Arc<ActiveBattles>,
    /// Store that battle snapshots are written to and loaded from.
    pub snapshot_repository: Arc<dyn SnapshotRepository>,
}

impl AppState {
    /// Create new application state with an empty battle table.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, snapshot_repository: Arc<dyn SnapshotRepository>) -> Self {
        Self {
            clock,
            battles: Arc::new(ActiveBattles::new()),
            snapshot_repository,
        }
    }
}

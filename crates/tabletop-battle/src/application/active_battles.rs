//! In-memory table of live battles.
//!
//! Every mutation of a battle runs synchronously while the table lock is held,
//! so concurrent requests for the same battle are applied one after another.
//! Callers must never hold the lock across an `.await`; the closure-based API
//! makes that impossible.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tabletop_core::error::DomainError;
use uuid::Uuid;

use crate::domain::aggregates::Battle;

/// Owner of every battle touched by this process.
#[derive(Debug, Default)]
pub struct ActiveBattles {
    battles: Mutex<HashMap<Uuid, Battle>>,
}

impl ActiveBattles {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the battle, creating it first if this is the first
    /// time the id is seen.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or `DomainError::Infrastructure` if the
    /// lock is poisoned.
    pub fn with_battle<T>(
        &self,
        battle_id: Uuid,
        f: impl FnOnce(&mut Battle) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut battles = self.lock()?;
        let battle = battles
            .entry(battle_id)
            .or_insert_with(|| Battle::new(battle_id));
        f(battle)
    }

    /// Runs `f` against an existing battle without creating one.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the battle was never
    /// touched, or `DomainError::Infrastructure` if the lock is poisoned.
    pub fn read_battle<T>(
        &self,
        battle_id: Uuid,
        f: impl FnOnce(&Battle) -> T,
    ) -> Result<T, DomainError> {
        let battles = self.lock()?;
        battles
            .get(&battle_id)
            .map(f)
            .ok_or(DomainError::AggregateNotFound(battle_id))
    }

    /// Whether the battle has been touched by this process.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the lock is poisoned.
    pub fn contains(&self, battle_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.lock()?.contains_key(&battle_id))
    }

    /// Number of battles held.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the lock is poisoned.
    pub fn battle_count(&self) -> Result<usize, DomainError> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Battle>>, DomainError> {
        self.battles
            .lock()
            .map_err(|_| DomainError::Infrastructure("battle table lock poisoned".to_owned()))
    }
}

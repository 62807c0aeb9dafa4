//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for in-memory aggregate roots that record events as they mutate.
///
/// State lives in the aggregate itself; the recorded events are change
/// notifications drained by the application layer after each command.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate records.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version (number of events recorded so far).
    fn version(&self) -> i64;

    /// Returns events recorded since the last drain.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Clears recorded events once they have been handed off.
    fn clear_uncommitted_events(&mut self);
}

//! Shared test mocks and utilities for the tabletop session manager.

mod clock;
mod repository;

pub use clock::{FixedClock, fixed_clock};
pub use repository::{
    EmptySnapshotRepository, FailingSnapshotRepository, RecordingSnapshotRepository,
};

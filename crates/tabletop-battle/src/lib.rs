//! Tabletop session manager: Battle turn scheduling bounded context.
//!
//! Responsible for the combat roster, the speed-driven turn timeline,
//! grouping of simultaneous allied turns, manual reordering by the game
//! master, and snapshotting battles to an external store.

pub mod application;
pub mod domain;

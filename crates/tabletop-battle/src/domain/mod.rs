//! Domain layer for the Battle context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod grouping;
pub mod participants;
pub mod record;
pub mod timeline;
pub mod timing;

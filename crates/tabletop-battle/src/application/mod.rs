//! Application layer for the Battle context.

pub mod active_battles;
pub mod command_handlers;
pub mod query_handlers;

//! Tabletop Core: shared domain abstractions.
//!
//! This crate defines the traits and types every bounded context of the
//! session manager depends on. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod repository;

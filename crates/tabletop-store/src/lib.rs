//! PostgreSQL persistence for the tabletop session manager.

pub mod pg_snapshot_repository;

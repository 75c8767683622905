//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the catalog data access contract over all three collections.
//! - Isolate SQLite query details from service and console orchestration.
//! - Join collections by `species_name` at the application level.
//!
//! # Invariants
//! - Write paths validate records and documents before SQL mutations.
//! - Zero-match updates are reported through `UpdateOutcome`, not errors.

pub mod catalog_repo;
pub mod join;
mod sql;

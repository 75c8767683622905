//! Catalog domain model for species, taxonomy and distribution records.
//!
//! # Responsibility
//! - Define the three catalog collections and their field layout.
//! - Define typed record shapes shared by repository, join and console code.
//!
//! # Invariants
//! - Every record is identified by a store-assigned `RecordId`.
//! - `species_name` is an informal natural key; it is never unique and never
//!   a foreign key. Orphans and duplicates are valid states.

pub mod collection;
pub mod distribution;
pub mod record;
pub mod species;
pub mod taxonomy;
pub mod value;

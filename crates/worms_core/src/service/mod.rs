//! Catalog use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into catalog-level use cases.
//! - Own the demo seed dataset.

pub mod catalog_service;
pub mod seed;

//! Core catalog logic for the WoRMS marine species register.
//! Species, taxonomy and distribution collections over an embedded SQLite
//! store, with document-style filters, updates and species joins.

pub mod config;
pub mod console;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::{CatalogConfig, ConfigError};
pub use console::{run_script, ConsoleError, ScriptReport, StatementOutput, DEMO_SCRIPT};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::collection::Collection;
pub use model::distribution::Distribution;
pub use model::record::{CatalogRecord, RecordId, RecordValidationError};
pub use model::species::{Species, SpeciesStatus};
pub use model::taxonomy::{Ranks, Taxonomy};
pub use model::value::{EpochMs, Value};
pub use query::document::DocumentError;
pub use query::filter::{Condition, Filter};
pub use query::update::Update;
pub use repo::catalog_repo::{
    CatalogRepository, FindQuery, RepoError, RepoResult, SqliteCatalogRepository, UpdateOutcome,
};
pub use repo::join::{join_species, SpeciesJoin};
pub use service::catalog_service::CatalogService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

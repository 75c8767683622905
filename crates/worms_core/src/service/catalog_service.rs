//! Catalog use-case service.
//!
//! # Responsibility
//! - Provide named catalog queries (status, image, region, recency).
//! - Seed the demo dataset and run species joins.
//!
//! # Invariants
//! - Service APIs never bypass repository validation.
//! - The service holds its store handle explicitly; there is no ambient
//!   "current database".

use crate::model::collection::{Collection, FIELD_IMAGE, FIELD_SPECIES_NAME};
use crate::model::distribution::Distribution;
use crate::model::record::{CatalogRecord, RecordId};
use crate::model::species::{Species, SpeciesStatus};
use crate::model::taxonomy::Taxonomy;
use crate::model::value::{now_epoch_ms, EpochMs};
use crate::query::filter::Filter;
use crate::query::update::Update;
use crate::repo::catalog_repo::{CatalogRepository, FindQuery, RepoResult, UpdateOutcome};
use crate::repo::join::{join_species, SpeciesJoin};
use crate::service::seed::{demo_distribution, demo_species, demo_taxonomy, SeedSummary};
use log::info;
use std::time::Duration;

/// Use-case service wrapper over a catalog repository.
pub struct CatalogService<R: CatalogRepository> {
    repo: R,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Inserts the demo dataset stamped with the current time.
    ///
    /// Seeding is append-only; running it twice duplicates every record.
    pub fn seed_demo(&self) -> RepoResult<SeedSummary> {
        self.seed_demo_at(now_epoch_ms())
    }

    pub fn seed_demo_at(&self, now: EpochMs) -> RepoResult<SeedSummary> {
        let summary = SeedSummary {
            species: self.repo.insert_many(&demo_species(now))?.len(),
            taxonomy: self.repo.insert_many(&demo_taxonomy(now))?.len(),
            distribution: self.repo.insert_many(&demo_distribution(now))?.len(),
        };
        info!(
            "event=catalog_seed module=service status=ok species={} taxonomy={} distribution={}",
            summary.species, summary.taxonomy, summary.distribution
        );
        Ok(summary)
    }

    pub fn insert_many<T: CatalogRecord>(&self, records: &[T]) -> RepoResult<Vec<RecordId>> {
        self.repo.insert_many(records)
    }

    pub fn find<T: CatalogRecord>(&self, filter: Filter) -> RepoResult<Vec<T>> {
        self.repo.find(&FindQuery::new(filter))
    }

    /// Species with the given status and a non-null image.
    pub fn species_with_image(&self, status: SpeciesStatus) -> RepoResult<Vec<Species>> {
        self.find(
            Filter::new()
                .eq("status", status.as_str())
                .has_value(FIELD_IMAGE),
        )
    }

    /// Species whose status is any of `statuses`.
    pub fn species_with_status_in(&self, statuses: &[SpeciesStatus]) -> RepoResult<Vec<Species>> {
        self.find(Filter::new().is_in("status", statuses.iter().map(SpeciesStatus::as_str)))
    }

    pub fn taxonomy_in_order(&self, phylum: &str, order: &str) -> RepoResult<Vec<Taxonomy>> {
        self.find(Filter::new().eq("phylum", phylum).eq("order", order))
    }

    pub fn distribution_in_region(&self, region: &str) -> RepoResult<Vec<Distribution>> {
        self.find(Filter::new().eq("region", region))
    }

    /// Records whose `updatedAt` is at or after `threshold`.
    pub fn updated_since<T: CatalogRecord>(&self, threshold: EpochMs) -> RepoResult<Vec<T>> {
        self.find(Filter::new().updated_since(threshold))
    }

    /// Records updated within `window` before now.
    pub fn recently_updated<T: CatalogRecord>(&self, window: Duration) -> RepoResult<Vec<T>> {
        self.recently_updated_at(now_epoch_ms(), window)
    }

    pub fn recently_updated_at<T: CatalogRecord>(
        &self,
        now: EpochMs,
        window: Duration,
    ) -> RepoResult<Vec<T>> {
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        self.updated_since(now.saturating_sub(window_ms))
    }

    /// Species ⋈ Distribution on `species_name`.
    pub fn lookup_distribution(
        &self,
        species_filter: &Filter,
        distribution_filter: &Filter,
    ) -> RepoResult<Vec<SpeciesJoin<Distribution>>> {
        join_species(&self.repo, species_filter, distribution_filter)
    }

    /// Species ⋈ Taxonomy on `species_name`.
    pub fn lookup_taxonomy(
        &self,
        species_filter: &Filter,
        taxonomy_filter: &Filter,
    ) -> RepoResult<Vec<SpeciesJoin<Taxonomy>>> {
        join_species(&self.repo, species_filter, taxonomy_filter)
    }

    /// Species with `status` that occur in `region`.
    pub fn species_in_region(
        &self,
        status: SpeciesStatus,
        region: &str,
    ) -> RepoResult<Vec<SpeciesJoin<Distribution>>> {
        self.lookup_distribution(
            &Filter::new().eq("status", status.as_str()),
            &Filter::new().eq("region", region),
        )
    }

    /// Sets the status of the first species named `species_name`.
    pub fn set_species_status(
        &self,
        species_name: &str,
        status: SpeciesStatus,
    ) -> RepoResult<UpdateOutcome> {
        self.repo.update_one(
            Collection::Species,
            &Filter::new().eq(FIELD_SPECIES_NAME, species_name),
            &Update::new().set("status", status.as_str()),
        )
    }

    pub fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> RepoResult<UpdateOutcome> {
        self.repo.update_one(collection, filter, update)
    }

    pub fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> RepoResult<UpdateOutcome> {
        self.repo.update_many(collection, filter, update)
    }
}

//! WoRMS demo dataset: five reef-building corals with partial taxonomy and
//! distribution coverage.
//!
//! Only the first three species have taxonomy and distribution entries, so
//! joins over the seed exercise both matched and unmatched species.

use crate::model::distribution::Distribution;
use crate::model::species::{Species, SpeciesStatus};
use crate::model::taxonomy::{Ranks, Taxonomy};
use crate::model::value::EpochMs;

pub const SPECIES_PHOTO: &str = "species-photo-url";
pub const TAXONOMY_IMAGE: &str = "taxonomy-reference-image-url";
pub const DISTRIBUTION_MAP: &str = "distribution-map-url";

const SCLERACTINIA: Ranks<'static> = Ranks {
    kingdom: "Animalia",
    phylum: "Cnidaria",
    class_name: "Anthozoa",
    order: "Scleractinia",
};

const SPECIES: &[(&str, &str)] = &[
    ("Goniopora lobata", "Lamarck, 1816"),
    ("Acropora cervicornis", "Lamarck, 1816"),
    ("Pocillopora damicornis", "Linnaeus, 1758"),
    ("Stylophora pistillata", "Esper, 1795"),
    ("Montipora digitata", "Dana, 1846"),
];

const REGIONS: &[(&str, &str)] = &[
    ("Goniopora lobata", "Indo-Pacific"),
    ("Acropora cervicornis", "Caribbean Sea"),
    ("Pocillopora damicornis", "Pacific Ocean"),
];

/// Counts of records written by a seed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SeedSummary {
    pub species: usize,
    pub taxonomy: usize,
    pub distribution: usize,
}

pub fn demo_species(now: EpochMs) -> Vec<Species> {
    SPECIES
        .iter()
        .map(|(name, author)| {
            Species::new(*name, *author, SpeciesStatus::Accepted)
                .with_image(SPECIES_PHOTO)
                .stamped(now, now)
        })
        .collect()
}

pub fn demo_taxonomy(now: EpochMs) -> Vec<Taxonomy> {
    SPECIES
        .iter()
        .take(3)
        .map(|(name, _)| {
            Taxonomy::new(*name, SCLERACTINIA)
                .with_image(TAXONOMY_IMAGE)
                .stamped(now, now)
        })
        .collect()
}

pub fn demo_distribution(now: EpochMs) -> Vec<Distribution> {
    REGIONS
        .iter()
        .map(|(name, region)| {
            Distribution::new(*name, *region)
                .with_image(DISTRIBUTION_MAP)
                .stamped(now, now)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{demo_distribution, demo_species, demo_taxonomy};
    use crate::model::record::CatalogRecord;

    #[test]
    fn demo_records_are_valid_and_stamped() {
        let species = demo_species(10);
        assert_eq!(species.len(), 5);
        assert!(species.iter().all(|entry| entry.validate().is_ok()));
        assert!(species.iter().all(|entry| entry.updated_at == 10));

        assert_eq!(demo_taxonomy(10).len(), 3);
        let regions: Vec<_> = demo_distribution(10)
            .into_iter()
            .map(|entry| entry.region)
            .collect();
        assert_eq!(regions, vec!["Indo-Pacific", "Caribbean Sea", "Pacific Ocean"]);
    }
}

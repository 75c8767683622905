//! Application-level joins keyed by `species_name`.
//!
//! # Invariants
//! - Species without joined records produce no rows (inner join + unwind).
//! - A species with N joined records produces N rows.
//! - Output order: species insertion order, then joined insertion order.
//! - Duplicated species names on either side multiply, they are never
//!   collapsed.

use crate::model::collection::FIELD_SPECIES_NAME;
use crate::model::record::{CatalogRecord, RecordId};
use crate::model::species::{Species, SpeciesStatus};
use crate::query::filter::Filter;
use crate::repo::catalog_repo::{CatalogRepository, FindQuery, RepoResult};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeSet, HashMap};

/// Upper bound on names bound into one `$in` lookup.
const JOIN_KEY_CHUNK: usize = 500;

/// Projected join row: reduced species fields plus one joined record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesJoin<J> {
    pub species_id: RecordId,
    pub species_name: String,
    pub author: String,
    pub status: SpeciesStatus,
    pub joined: J,
}

impl<J: CatalogRecord + Serialize> Serialize for SpeciesJoin<J> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("_id", &self.species_id)?;
        map.serialize_entry("species_name", &self.species_name)?;
        map.serialize_entry("author", &self.author)?;
        map.serialize_entry("status", &self.status)?;
        map.serialize_entry(J::COLLECTION.join_alias(), &self.joined)?;
        map.end()
    }
}

/// Joins species matching `species_filter` with `J` records matching
/// `joined_filter` on equal `species_name`.
pub fn join_species<R, J>(
    repo: &R,
    species_filter: &Filter,
    joined_filter: &Filter,
) -> RepoResult<Vec<SpeciesJoin<J>>>
where
    R: CatalogRepository,
    J: CatalogRecord + Clone,
{
    let species = repo.find::<Species>(&FindQuery::new(species_filter.clone()))?;
    if species.is_empty() {
        return Ok(Vec::new());
    }

    let names: Vec<&str> = species
        .iter()
        .map(|entry| entry.species_name.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut index: HashMap<String, Vec<J>> = HashMap::new();
    for chunk in names.chunks(JOIN_KEY_CHUNK) {
        let filter = joined_filter
            .clone()
            .is_in(FIELD_SPECIES_NAME, chunk.iter().copied());
        for record in repo.find::<J>(&FindQuery::new(filter))? {
            index
                .entry(record.species_name().to_string())
                .or_default()
                .push(record);
        }
    }

    let mut rows = Vec::new();
    for entry in &species {
        let Some(matches) = index.get(&entry.species_name) else {
            continue;
        };
        for joined in matches {
            rows.push(SpeciesJoin {
                species_id: entry.id,
                species_name: entry.species_name.clone(),
                author: entry.author.clone(),
                status: entry.status.clone(),
                joined: joined.clone(),
            });
        }
    }
    Ok(rows)
}

//! Collection registry: names, tables and field layout.
//!
//! # Invariants
//! - Field names are the external document names (`species_name`,
//!   `createdAt`, `class`, ...); columns are the SQLite names.
//! - Every collection has `_id`, `species_name`, `image`, `createdAt` and
//!   `updatedAt`.

use std::fmt::{Display, Formatter};

pub const FIELD_ID: &str = "_id";
pub const FIELD_SPECIES_NAME: &str = "species_name";
pub const FIELD_IMAGE: &str = "image";
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_UPDATED_AT: &str = "updatedAt";

/// Storage type of a collection field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Store-assigned record id. Immutable.
    Id,
    /// Required non-blank text.
    Text,
    /// Nullable text.
    OptionalText,
    /// Epoch-millisecond timestamp.
    Timestamp,
}

/// Field descriptor within a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
    /// Whether `$set` may assign this field.
    pub mutable: bool,
}

const fn field(
    name: &'static str,
    column: &'static str,
    kind: FieldKind,
    mutable: bool,
) -> FieldSpec {
    FieldSpec {
        name,
        column,
        kind,
        mutable,
    }
}

const ID: FieldSpec = field(FIELD_ID, "id", FieldKind::Id, false);
const SPECIES_NAME: FieldSpec = field(FIELD_SPECIES_NAME, "species_name", FieldKind::Text, true);
const IMAGE: FieldSpec = field(FIELD_IMAGE, "image", FieldKind::OptionalText, true);
const CREATED_AT: FieldSpec = field(FIELD_CREATED_AT, "created_at", FieldKind::Timestamp, false);
const UPDATED_AT: FieldSpec = field(FIELD_UPDATED_AT, "updated_at", FieldKind::Timestamp, true);

const SPECIES_FIELDS: &[FieldSpec] = &[
    ID,
    SPECIES_NAME,
    field("author", "author", FieldKind::Text, true),
    field("status", "status", FieldKind::Text, true),
    IMAGE,
    CREATED_AT,
    UPDATED_AT,
];

const TAXONOMY_FIELDS: &[FieldSpec] = &[
    ID,
    SPECIES_NAME,
    field("kingdom", "kingdom", FieldKind::Text, true),
    field("phylum", "phylum", FieldKind::Text, true),
    field("class", "class_name", FieldKind::Text, true),
    field("order", "order_name", FieldKind::Text, true),
    IMAGE,
    CREATED_AT,
    UPDATED_AT,
];

const DISTRIBUTION_FIELDS: &[FieldSpec] = &[
    ID,
    SPECIES_NAME,
    field("region", "region", FieldKind::Text, true),
    IMAGE,
    CREATED_AT,
    UPDATED_AT,
];

/// The three catalog collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Species,
    Taxonomy,
    Distribution,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Self::Species, Self::Taxonomy, Self::Distribution];

    /// External collection name, also the SQLite table name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Species => "species",
            Self::Taxonomy => "taxonomy",
            Self::Distribution => "distribution",
        }
    }

    pub fn table(self) -> &'static str {
        self.name()
    }

    /// Field name used for this collection's side of a species join.
    pub fn join_alias(self) -> &'static str {
        match self {
            Self::Species => "species_info",
            Self::Taxonomy => "taxonomy_info",
            Self::Distribution => "distribution_info",
        }
    }

    /// Fields in storage order.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::Species => SPECIES_FIELDS,
            Self::Taxonomy => TAXONOMY_FIELDS,
            Self::Distribution => DISTRIBUTION_FIELDS,
        }
    }

    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|spec| spec.name == name)
    }

    /// Parses a collection name; matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|collection| collection.name() == value)
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

//! Species record: name, authority, acceptance status and photo link.
//!
//! # Invariants
//! - `species_name` and `author` are non-blank.
//! - `status` round-trips unknown values unchanged.

use crate::model::collection::{
    Collection, FIELD_CREATED_AT, FIELD_IMAGE, FIELD_SPECIES_NAME, FIELD_UPDATED_AT,
};
use crate::model::record::{
    common_fields, CatalogRecord, FieldMap, FieldReader, RecordId, RecordValidationError,
};
use crate::model::value::{now_epoch_ms, EpochMs, Value};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub const STATUS_ACCEPTED: &str = "accepted";
pub const STATUS_NOT_ACCEPTED: &str = "not accepted";

/// Acceptance status of a species name in the register.
///
/// Serialized as its plain string form. Values other than the two known
/// states are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SpeciesStatus {
    Accepted,
    NotAccepted,
    Other(String),
}

impl SpeciesStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Accepted => STATUS_ACCEPTED,
            Self::NotAccepted => STATUS_NOT_ACCEPTED,
            Self::Other(value) => value.as_str(),
        }
    }
}

impl From<String> for SpeciesStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            STATUS_ACCEPTED => Self::Accepted,
            STATUS_NOT_ACCEPTED => Self::NotAccepted,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for SpeciesStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<SpeciesStatus> for String {
    fn from(value: SpeciesStatus) -> Self {
        match value {
            SpeciesStatus::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for SpeciesStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One species entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub species_name: String,
    /// Naming authority, e.g. `Lamarck, 1816`.
    pub author: String,
    pub status: SpeciesStatus,
    /// Photo URL. `None` when no image is linked.
    pub image: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: EpochMs,
    #[serde(rename = "updatedAt")]
    pub updated_at: EpochMs,
}

impl Species {
    /// Creates a species stamped with the current time and a fresh id.
    pub fn new(
        species_name: impl Into<String>,
        author: impl Into<String>,
        status: impl Into<SpeciesStatus>,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            species_name: species_name.into(),
            author: author.into(),
            status: status.into(),
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Overrides both timestamps; used by imports and fixtures.
    pub fn stamped(mut self, created_at: EpochMs, updated_at: EpochMs) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    pub fn is_accepted(&self) -> bool {
        self.status == SpeciesStatus::Accepted
    }
}

impl CatalogRecord for Species {
    const COLLECTION: Collection = Collection::Species;

    fn id(&self) -> RecordId {
        self.id
    }

    fn species_name(&self) -> &str {
        &self.species_name
    }

    fn updated_at(&self) -> EpochMs {
        self.updated_at
    }

    fn to_fields(&self) -> FieldMap {
        let mut fields = common_fields(
            self.id,
            &self.species_name,
            self.image.as_deref(),
            self.created_at,
            self.updated_at,
        );
        fields.insert("author", Value::from(self.author.as_str()));
        fields.insert("status", Value::from(self.status.as_str()));
        fields
    }

    fn from_fields(fields: &FieldMap) -> Result<Self, RecordValidationError> {
        let reader = FieldReader::new(Self::COLLECTION, fields);
        Ok(Self {
            id: reader.id()?,
            species_name: reader.text(FIELD_SPECIES_NAME)?,
            author: reader.text("author")?,
            status: SpeciesStatus::from(reader.text("status")?),
            image: reader.optional_text(FIELD_IMAGE)?,
            created_at: reader.timestamp(FIELD_CREATED_AT)?,
            updated_at: reader.timestamp(FIELD_UPDATED_AT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Species, SpeciesStatus};
    use crate::model::record::{CatalogRecord, RecordValidationError};

    #[test]
    fn status_keeps_unknown_values() {
        assert_eq!(SpeciesStatus::from("accepted"), SpeciesStatus::Accepted);
        assert_eq!(SpeciesStatus::from("not accepted"), SpeciesStatus::NotAccepted);
        let other = SpeciesStatus::from("uncertain");
        assert_eq!(other, SpeciesStatus::Other("uncertain".to_string()));
        assert_eq!(String::from(other), "uncertain");
    }

    #[test]
    fn status_serializes_as_plain_string() {
        let json = serde_json::to_string(&SpeciesStatus::NotAccepted).unwrap();
        assert_eq!(json, "\"not accepted\"");
    }

    #[test]
    fn fields_round_trip() {
        let species = Species::new("Goniopora lobata", "Lamarck, 1816", SpeciesStatus::Accepted)
            .with_image("https://example.org/g.jpg");
        let decoded = Species::from_fields(&species.to_fields()).unwrap();
        assert_eq!(decoded, species);
    }

    #[test]
    fn validate_rejects_blank_author_and_blank_image() {
        let species = Species::new("Goniopora lobata", "  ", SpeciesStatus::Accepted);
        assert!(matches!(
            species.validate(),
            Err(RecordValidationError::BlankField { field: "author", .. })
        ));

        let species = Species::new("Goniopora lobata", "Lamarck, 1816", "accepted").with_image("");
        assert!(matches!(
            species.validate(),
            Err(RecordValidationError::BlankField { field: "image", .. })
        ));
    }

    #[test]
    fn serde_uses_document_field_names() {
        let species = Species::new("Acropora cervicornis", "Lamarck, 1816", "accepted");
        let json = serde_json::to_value(&species).unwrap();
        assert!(json.get("_id").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["status"], "accepted");
        assert!(json["image"].is_null());
    }
}

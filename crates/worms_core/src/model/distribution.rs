//! Geographic distribution entry for a species.

use crate::model::collection::{
    Collection, FIELD_CREATED_AT, FIELD_IMAGE, FIELD_SPECIES_NAME, FIELD_UPDATED_AT,
};
use crate::model::record::{
    common_fields, CatalogRecord, FieldMap, FieldReader, RecordId, RecordValidationError,
};
use crate::model::value::{now_epoch_ms, EpochMs, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Region of occurrence for one species name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub species_name: String,
    pub region: String,
    /// Distribution map URL.
    pub image: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: EpochMs,
    #[serde(rename = "updatedAt")]
    pub updated_at: EpochMs,
}

impl Distribution {
    pub fn new(species_name: impl Into<String>, region: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            species_name: species_name.into(),
            region: region.into(),
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn stamped(mut self, created_at: EpochMs, updated_at: EpochMs) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }
}

impl CatalogRecord for Distribution {
    const COLLECTION: Collection = Collection::Distribution;

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
        fields.insert("region", Value::from(self.region.as_str()));
        fields
    }

    fn from_fields(fields: &FieldMap) -> Result<Self, RecordValidationError> {
        let reader = FieldReader::new(Self::COLLECTION, fields);
        Ok(Self {
            id: reader.id()?,
            species_name: reader.text(FIELD_SPECIES_NAME)?,
            region: reader.text("region")?,
            image: reader.optional_text(FIELD_IMAGE)?,
            created_at: reader.timestamp(FIELD_CREATED_AT)?,
            updated_at: reader.timestamp(FIELD_UPDATED_AT)?,
        })
    }
}

//! Taxonomic classification of a species (kingdom down to order).

use crate::model::collection::{
    Collection, FIELD_CREATED_AT, FIELD_IMAGE, FIELD_SPECIES_NAME, FIELD_UPDATED_AT,
};
use crate::model::record::{
    common_fields, CatalogRecord, FieldMap, FieldReader, RecordId, RecordValidationError,
};
use crate::model::value::{now_epoch_ms, EpochMs, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification entry referencing a species by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub species_name: String,
    pub kingdom: String,
    pub phylum: String,
    /// Serialized as `class`.
    #[serde(rename = "class")]
    pub class_name: String,
    pub order: String,
    pub image: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: EpochMs,
    #[serde(rename = "updatedAt")]
    pub updated_at: EpochMs,
}

/// Rank values for a classification, kingdom first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranks<'a> {
    pub kingdom: &'a str,
    pub phylum: &'a str,
    pub class_name: &'a str,
    pub order: &'a str,
}

impl Taxonomy {
    pub fn new(species_name: impl Into<String>, ranks: Ranks<'_>) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            species_name: species_name.into(),
            kingdom: ranks.kingdom.to_string(),
            phylum: ranks.phylum.to_string(),
            class_name: ranks.class_name.to_string(),
            order: ranks.order.to_string(),
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

impl CatalogRecord for Taxonomy {
    const COLLECTION: Collection = Collection::Taxonomy;

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
        fields.insert("kingdom", Value::from(self.kingdom.as_str()));
        fields.insert("phylum", Value::from(self.phylum.as_str()));
        fields.insert("class", Value::from(self.class_name.as_str()));
        fields.insert("order", Value::from(self.order.as_str()));
        fields
    }

    fn from_fields(fields: &FieldMap) -> Result<Self, RecordValidationError> {
        let reader = FieldReader::new(Self::COLLECTION, fields);
        Ok(Self {
            id: reader.id()?,
            species_name: reader.text(FIELD_SPECIES_NAME)?,
            kingdom: reader.text("kingdom")?,
            phylum: reader.text("phylum")?,
            class_name: reader.text("class")?,
            order: reader.text("order")?,
            image: reader.optional_text(FIELD_IMAGE)?,
            created_at: reader.timestamp(FIELD_CREATED_AT)?,
            updated_at: reader.timestamp(FIELD_UPDATED_AT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Ranks, Taxonomy};
    use crate::model::record::CatalogRecord;

    #[test]
    fn class_field_uses_document_name() {
        let taxonomy = Taxonomy::new(
            "Goniopora lobata",
            Ranks {
                kingdom: "Animalia",
                phylum: "Cnidaria",
                class_name: "Anthozoa",
                order: "Scleractinia",
            },
        );
        let json = serde_json::to_value(&taxonomy).unwrap();
        assert_eq!(json["class"], "Anthozoa");
        assert_eq!(json["order"], "Scleractinia");

        let decoded = Taxonomy::from_fields(&taxonomy.to_fields()).unwrap();
        assert_eq!(decoded, taxonomy);
    }
}

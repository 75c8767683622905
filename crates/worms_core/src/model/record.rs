//! Shared record contract and field-map codec.
//!
//! # Responsibility
//! - Describe how each typed record maps to its collection's fields.
//! - Validate records before they reach storage.
//!
//! # Invariants
//! - `to_fields()` yields exactly one value per collection field.
//! - Required text fields are non-blank; `image` is `Null` or non-blank.

use crate::model::collection::{Collection, FieldKind, FIELD_ID};
use crate::model::value::{EpochMs, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier assigned to every stored record (`_id`).
pub type RecordId = Uuid;

/// Field values keyed by external field name.
pub type FieldMap = BTreeMap<&'static str, Value>;

/// Record shape violations detected on write or decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    MissingField {
        collection: Collection,
        field: &'static str,
    },
    BlankField {
        collection: Collection,
        field: &'static str,
    },
    TypeMismatch {
        collection: Collection,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    InvalidId(String),
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { collection, field } => {
                write!(f, "{collection}.{field} is required")
            }
            Self::BlankField { collection, field } => {
                write!(f, "{collection}.{field} must not be blank")
            }
            Self::TypeMismatch {
                collection,
                field,
                expected,
                found,
            } => write!(f, "{collection}.{field} expects {expected}, got {found}"),
            Self::InvalidId(value) => write!(f, "invalid record id `{value}`"),
        }
    }
}

impl Error for RecordValidationError {}

/// Typed record stored in one catalog collection.
pub trait CatalogRecord: Sized {
    const COLLECTION: Collection;

    fn id(&self) -> RecordId;

    /// Informal natural key shared across collections.
    fn species_name(&self) -> &str;

    fn updated_at(&self) -> EpochMs;

    /// Encodes the record as a full field map.
    fn to_fields(&self) -> FieldMap;

    /// Decodes a record from a full field map.
    fn from_fields(fields: &FieldMap) -> Result<Self, RecordValidationError>;

    /// Checks field-level invariants for this collection.
    fn validate(&self) -> Result<(), RecordValidationError> {
        validate_fields(Self::COLLECTION, &self.to_fields())
    }
}

/// Validates a field map against the collection layout.
pub fn validate_fields(
    collection: Collection,
    fields: &FieldMap,
) -> Result<(), RecordValidationError> {
    for spec in collection.fields() {
        let value = fields
            .get(spec.name)
            .ok_or(RecordValidationError::MissingField {
                collection,
                field: spec.name,
            })?;
        check_field_value(collection, spec.name, spec.kind, value)?;
    }
    Ok(())
}

/// Checks one value against a field kind.
pub fn check_field_value(
    collection: Collection,
    field: &'static str,
    kind: FieldKind,
    value: &Value,
) -> Result<(), RecordValidationError> {
    let mismatch = |expected: &'static str| RecordValidationError::TypeMismatch {
        collection,
        field,
        expected,
        found: value.kind_label(),
    };

    match (kind, value) {
        (FieldKind::Id, Value::Text(text)) => {
            Uuid::parse_str(text).map_err(|_| RecordValidationError::InvalidId(text.clone()))?;
            Ok(())
        }
        (FieldKind::Id, _) => Err(mismatch("text")),
        (FieldKind::Text, Value::Null) => {
            Err(RecordValidationError::MissingField { collection, field })
        }
        (FieldKind::Text | FieldKind::OptionalText, Value::Text(text)) => {
            if text.trim().is_empty() {
                return Err(RecordValidationError::BlankField { collection, field });
            }
            Ok(())
        }
        (FieldKind::OptionalText, Value::Null) => Ok(()),
        (FieldKind::Text | FieldKind::OptionalText, _) => Err(mismatch("text")),
        (FieldKind::Timestamp, Value::Timestamp(_)) => Ok(()),
        (FieldKind::Timestamp, _) => Err(mismatch("timestamp")),
    }
}

/// Read helper used by record decoders.
pub(crate) struct FieldReader<'a> {
    collection: Collection,
    fields: &'a FieldMap,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(collection: Collection, fields: &'a FieldMap) -> Self {
        Self { collection, fields }
    }

    fn get(&self, field: &'static str) -> Result<&'a Value, RecordValidationError> {
        self.fields
            .get(field)
            .ok_or(RecordValidationError::MissingField {
                collection: self.collection,
                field,
            })
    }

    pub(crate) fn id(&self) -> Result<RecordId, RecordValidationError> {
        let text = self.text(FIELD_ID)?;
        Uuid::parse_str(&text).map_err(|_| RecordValidationError::InvalidId(text))
    }

    pub(crate) fn text(&self, field: &'static str) -> Result<String, RecordValidationError> {
        match self.get(field)? {
            Value::Text(text) => Ok(text.clone()),
            Value::Null => Err(RecordValidationError::MissingField {
                collection: self.collection,
                field,
            }),
            other => Err(RecordValidationError::TypeMismatch {
                collection: self.collection,
                field,
                expected: "text",
                found: other.kind_label(),
            }),
        }
    }

    pub(crate) fn optional_text(
        &self,
        field: &'static str,
    ) -> Result<Option<String>, RecordValidationError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text.clone())),
            Some(other) => Err(RecordValidationError::TypeMismatch {
                collection: self.collection,
                field,
                expected: "text",
                found: other.kind_label(),
            }),
        }
    }

    pub(crate) fn timestamp(&self, field: &'static str) -> Result<EpochMs, RecordValidationError> {
        match self.get(field)? {
            Value::Timestamp(value) => Ok(*value),
            other => Err(RecordValidationError::TypeMismatch {
                collection: self.collection,
                field,
                expected: "timestamp",
                found: other.kind_label(),
            }),
        }
    }
}

/// Writes the fields common to every collection.
pub(crate) fn common_fields(
    id: RecordId,
    species_name: &str,
    image: Option<&str>,
    created_at: EpochMs,
    updated_at: EpochMs,
) -> FieldMap {
    use crate::model::collection::{
        FIELD_CREATED_AT, FIELD_IMAGE, FIELD_SPECIES_NAME, FIELD_UPDATED_AT,
    };

    let mut fields = FieldMap::new();
    fields.insert(FIELD_ID, Value::Text(id.to_string()));
    fields.insert(FIELD_SPECIES_NAME, Value::from(species_name));
    fields.insert(FIELD_IMAGE, Value::from(image.map(str::to_string)));
    fields.insert(FIELD_CREATED_AT, Value::Timestamp(created_at));
    fields.insert(FIELD_UPDATED_AT, Value::Timestamp(updated_at));
    fields
}

//! `$set` update documents.

use crate::model::collection::{Collection, FIELD_UPDATED_AT};
use crate::model::record::check_field_value;
use crate::model::value::{EpochMs, Value};
use crate::query::document::DocumentError;
use std::collections::BTreeMap;

/// Field assignments applied to every matched record.
///
/// `updatedAt` is refreshed by the store on every update; assigning it
/// explicitly overrides the refreshed value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Update {
    set: BTreeMap<String, Value>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one assignment. A later assignment to the same field wins.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    /// Assignments other than `updatedAt`, in field-name order.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.set
            .iter()
            .filter(|(field, _)| field.as_str() != FIELD_UPDATED_AT)
            .map(|(field, value)| (field.as_str(), value))
    }

    /// Explicit `updatedAt` assignment, when present.
    pub fn explicit_updated_at(&self) -> Option<EpochMs> {
        self.set
            .get(FIELD_UPDATED_AT)
            .and_then(Value::as_timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Verifies assignments against a collection layout.
    ///
    /// # Errors
    /// - `EmptyUpdate` when nothing is assigned.
    /// - `UnknownField` / `ImmutableField` for bad targets.
    /// - `Record` when a value does not fit the field kind, including `null`
    ///   or blank text for required fields.
    pub fn check(&self, collection: Collection) -> Result<(), DocumentError> {
        if self.set.is_empty() {
            return Err(DocumentError::EmptyUpdate);
        }

        for (field, value) in &self.set {
            let spec = collection
                .field(field)
                .ok_or_else(|| DocumentError::UnknownField {
                    collection,
                    field: field.clone(),
                })?;
            if !spec.mutable {
                return Err(DocumentError::ImmutableField(spec.name));
            }
            check_field_value(collection, spec.name, spec.kind, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Update;
    use crate::model::collection::Collection;
    use crate::model::record::RecordValidationError;
    use crate::model::value::Value;
    use crate::query::document::DocumentError;

    #[test]
    fn updated_at_is_split_from_assignments() {
        let update = Update::new()
            .set("status", "not accepted")
            .set("updatedAt", Value::Timestamp(42));
        let fields: Vec<_> = update.assignments().map(|(field, _)| field).collect();
        assert_eq!(fields, vec!["status"]);
        assert_eq!(update.explicit_updated_at(), Some(42));
        assert!(update.check(Collection::Species).is_ok());
    }

    #[test]
    fn check_rejects_empty_and_immutable() {
        assert!(matches!(
            Update::new().check(Collection::Species),
            Err(DocumentError::EmptyUpdate)
        ));
        assert!(matches!(
            Update::new()
                .set("createdAt", Value::Timestamp(0))
                .check(Collection::Species),
            Err(DocumentError::ImmutableField("createdAt"))
        ));
        assert!(matches!(
            Update::new().set("_id", "x").check(Collection::Taxonomy),
            Err(DocumentError::ImmutableField("_id"))
        ));
    }

    #[test]
    fn check_allows_clearing_image_but_not_required_fields() {
        assert!(Update::new()
            .set("image", Value::Null)
            .check(Collection::Distribution)
            .is_ok());
        assert!(matches!(
            Update::new()
                .set("region", Value::Null)
                .check(Collection::Distribution),
            Err(DocumentError::Record(RecordValidationError::MissingField {
                field: "region",
                ..
            }))
        ));
    }
}

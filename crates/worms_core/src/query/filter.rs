//! Typed filter documents.

use crate::model::collection::{Collection, FieldKind, FIELD_UPDATED_AT};
use crate::model::value::{EpochMs, Value};
use crate::query::document::DocumentError;

/// Predicate applied to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    /// `true` matches non-null values, `false` matches null/absent.
    Exists(bool),
}

impl Condition {
    /// Operator name as written in filter documents.
    pub fn operator(&self) -> &'static str {
        match self {
            Self::Eq(_) => "$eq",
            Self::Ne(_) => "$ne",
            Self::Gt(_) => "$gt",
            Self::Gte(_) => "$gte",
            Self::Lt(_) => "$lt",
            Self::Lte(_) => "$lte",
            Self::In(_) => "$in",
            Self::Nin(_) => "$nin",
            Self::Exists(_) => "$exists",
        }
    }

    fn operands(&self) -> &[Value] {
        match self {
            Self::Eq(value)
            | Self::Ne(value)
            | Self::Gt(value)
            | Self::Gte(value)
            | Self::Lt(value)
            | Self::Lte(value) => std::slice::from_ref(value),
            Self::In(values) | Self::Nin(values) => values.as_slice(),
            Self::Exists(_) => &[],
        }
    }

    fn is_range(&self) -> bool {
        matches!(
            self,
            Self::Gt(_) | Self::Gte(_) | Self::Lt(_) | Self::Lte(_)
        )
    }
}

/// One field predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub field: String,
    pub condition: Condition,
}

/// Conjunction of field predicates. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one clause.
    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses.push(Clause {
            field: field.into(),
            condition,
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Eq(value.into()))
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Ne(value.into()))
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Gt(value.into()))
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Gte(value.into()))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Lt(value.into()))
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Lte(value.into()))
    }

    pub fn is_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.with(field, Condition::In(values))
    }

    pub fn not_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.with(field, Condition::Nin(values))
    }

    pub fn exists(self, field: impl Into<String>, exists: bool) -> Self {
        self.with(field, Condition::Exists(exists))
    }

    /// `{field: {$exists: true, $ne: null}}`.
    pub fn has_value(self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.exists(field.clone(), true).ne(field, Value::Null)
    }

    /// `{updatedAt: {$gte: threshold}}`.
    pub fn updated_since(self, threshold: EpochMs) -> Self {
        self.gte(FIELD_UPDATED_AT, Value::Timestamp(threshold))
    }

    /// Conjunction of both filters.
    pub fn and(mut self, other: Filter) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Verifies field names and operand types against a collection.
    ///
    /// # Errors
    /// - `UnknownField` for fields outside the collection layout.
    /// - `InvalidOperand` for null range bounds.
    /// - `TypeMismatch` for text operands on timestamp fields and vice versa.
    pub fn check(&self, collection: Collection) -> Result<(), DocumentError> {
        for clause in &self.clauses {
            let spec = collection
                .field(&clause.field)
                .ok_or_else(|| DocumentError::UnknownField {
                    collection,
                    field: clause.field.clone(),
                })?;

            for operand in clause.condition.operands() {
                match (spec.kind, operand) {
                    (_, Value::Null) if clause.condition.is_range() => {
                        return Err(DocumentError::InvalidOperand {
                            field: clause.field.clone(),
                            operator: clause.condition.operator(),
                            message: "range bound must not be null".to_string(),
                        });
                    }
                    (_, Value::Null) => {}
                    (FieldKind::Timestamp, Value::Timestamp(_)) => {}
                    (FieldKind::Id | FieldKind::Text | FieldKind::OptionalText, Value::Text(_)) => {}
                    (FieldKind::Timestamp, other) => {
                        return Err(DocumentError::TypeMismatch {
                            collection,
                            field: clause.field.clone(),
                            expected: "timestamp",
                            found: other.kind_label(),
                        });
                    }
                    (_, other) => {
                        return Err(DocumentError::TypeMismatch {
                            collection,
                            field: clause.field.clone(),
                            expected: "text",
                            found: other.kind_label(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

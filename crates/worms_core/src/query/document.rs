//! JSON document parsing for filters, updates and records.
//!
//! Literal syntax:
//! - strings and `null` map to text and null;
//! - `{"$date": "<RFC 3339>"}` or `{"$date": <epoch ms>}` is an absolute
//!   timestamp;
//! - `{"$ago": "<n><s|m|h|d>"}` is `now` minus the duration.

use crate::model::collection::{
    Collection, FieldKind, FIELD_CREATED_AT, FIELD_ID, FIELD_IMAGE, FIELD_UPDATED_AT,
};
use crate::model::record::{CatalogRecord, FieldMap, RecordValidationError};
use crate::model::value::{parse_rfc3339, EpochMs, Value};
use crate::query::filter::{Condition, Filter};
use crate::query::update::Update;
use serde_json::{Map, Value as Json};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Malformed filter, update or record document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    NotAnObject(&'static str),
    UnknownField {
        collection: Collection,
        field: String,
    },
    UnknownOperator(String),
    InvalidOperand {
        field: String,
        operator: &'static str,
        message: String,
    },
    InvalidLiteral {
        field: String,
        message: String,
    },
    TypeMismatch {
        collection: Collection,
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    ImmutableField(&'static str),
    EmptyUpdate,
    Record(RecordValidationError),
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject(what) => write!(f, "{what} document must be a JSON object"),
            Self::UnknownField { collection, field } => {
                write!(f, "unknown field `{field}` for collection {collection}")
            }
            Self::UnknownOperator(operator) => write!(f, "unsupported operator `{operator}`"),
            Self::InvalidOperand {
                field,
                operator,
                message,
            } => write!(f, "invalid operand for `{field}` {operator}: {message}"),
            Self::InvalidLiteral { field, message } => {
                write!(f, "invalid value for `{field}`: {message}")
            }
            Self::TypeMismatch {
                collection,
                field,
                expected,
                found,
            } => write!(f, "{collection}.{field} expects {expected}, got {found}"),
            Self::ImmutableField(field) => write!(f, "field `{field}` cannot be updated"),
            Self::EmptyUpdate => write!(f, "update document must set at least one field"),
            Self::Record(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DocumentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Record(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RecordValidationError> for DocumentError {
    fn from(value: RecordValidationError) -> Self {
        Self::Record(value)
    }
}

/// Parses a filter document and checks it against `collection`.
pub fn parse_filter(
    collection: Collection,
    document: &Json,
    now: EpochMs,
) -> Result<Filter, DocumentError> {
    let object = document
        .as_object()
        .ok_or(DocumentError::NotAnObject("filter"))?;

    let mut filter = Filter::new();
    for (field, spec) in object {
        match spec {
            Json::Object(operators) if is_operator_object(operators) => {
                for (operator, operand) in operators {
                    let condition = parse_condition(field, operator, operand, now)?;
                    filter = filter.with(field.as_str(), condition);
                }
            }
            literal => {
                let value = parse_literal(field, literal, now)?;
                filter = filter.eq(field.as_str(), value);
            }
        }
    }

    filter.check(collection)?;
    Ok(filter)
}

/// Parses a `{"$set": {...}}` document and checks it against `collection`.
pub fn parse_update(
    collection: Collection,
    document: &Json,
    now: EpochMs,
) -> Result<Update, DocumentError> {
    let object = document
        .as_object()
        .ok_or(DocumentError::NotAnObject("update"))?;

    let mut update = Update::new();
    for (operator, body) in object {
        if operator != "$set" {
            return Err(DocumentError::UnknownOperator(operator.clone()));
        }
        let assignments = body
            .as_object()
            .ok_or(DocumentError::NotAnObject("$set"))?;
        for (field, literal) in assignments {
            update = update.set(field.as_str(), parse_literal(field, literal, now)?);
        }
    }

    update.check(collection)?;
    Ok(update)
}

/// Parses an insert document into a typed record.
///
/// Missing `_id` gets a fresh id, missing `createdAt` gets `now`, missing
/// `updatedAt` copies `createdAt` and missing `image` is null.
pub fn parse_record<T: CatalogRecord>(document: &Json, now: EpochMs) -> Result<T, DocumentError> {
    let collection = T::COLLECTION;
    let object = document
        .as_object()
        .ok_or(DocumentError::NotAnObject("record"))?;

    let mut fields = FieldMap::new();
    for (field, literal) in object {
        let spec = collection
            .field(field)
            .ok_or_else(|| DocumentError::UnknownField {
                collection,
                field: field.clone(),
            })?;
        let value = match (spec.kind, literal) {
            (FieldKind::Id, Json::String(text)) => {
                Uuid::parse_str(text)
                    .map_err(|_| RecordValidationError::InvalidId(text.clone()))?;
                Value::Text(text.clone())
            }
            _ => parse_literal(field, literal, now)?,
        };
        fields.insert(spec.name, value);
    }

    fields
        .entry(FIELD_ID)
        .or_insert_with(|| Value::Text(Uuid::new_v4().to_string()));
    fields.entry(FIELD_IMAGE).or_insert(Value::Null);
    let created_at = fields
        .entry(FIELD_CREATED_AT)
        .or_insert(Value::Timestamp(now))
        .clone();
    fields.entry(FIELD_UPDATED_AT).or_insert(created_at);

    let record = T::from_fields(&fields)?;
    record.validate()?;
    Ok(record)
}

/// Parses a scalar literal (text, null, `$date`, `$ago`).
pub fn parse_literal(field: &str, literal: &Json, now: EpochMs) -> Result<Value, DocumentError> {
    let invalid = |message: String| DocumentError::InvalidLiteral {
        field: field.to_string(),
        message,
    };

    match literal {
        Json::Null => Ok(Value::Null),
        Json::String(text) => Ok(Value::Text(text.clone())),
        Json::Object(object) if object.len() == 1 => {
            let (key, operand) = object
                .iter()
                .next()
                .ok_or_else(|| invalid("empty object".to_string()))?;
            match (key.as_str(), operand) {
                ("$date", Json::String(text)) => parse_rfc3339(text)
                    .map(Value::Timestamp)
                    .ok_or_else(|| invalid(format!("`{text}` is not an RFC 3339 timestamp"))),
                ("$date", Json::Number(number)) => number
                    .as_i64()
                    .map(Value::Timestamp)
                    .ok_or_else(|| invalid(format!("`{number}` is not an epoch millisecond value"))),
                ("$ago", Json::String(text)) => parse_duration_ms(text)
                    .map(|duration| Value::Timestamp(now.saturating_sub(duration)))
                    .ok_or_else(|| invalid(format!("`{text}` is not a duration like `24h`"))),
                (other, _) => Err(invalid(format!("unsupported literal `{other}`"))),
            }
        }
        Json::Object(_) => Err(invalid("embedded documents are not supported".to_string())),
        Json::Bool(_) | Json::Number(_) | Json::Array(_) => Err(invalid(format!(
            "expected string, null, $date or $ago, got `{literal}`"
        ))),
    }
}

/// Parses `<n><unit>` durations (`30s`, `15m`, `24h`, `2d`) into milliseconds.
pub fn parse_duration_ms(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    let unit = trimmed.chars().last()?;
    let amount: i64 = trimmed[..trimmed.len() - unit.len_utf8()].parse().ok()?;
    if amount < 0 {
        return None;
    }
    let unit_ms = match unit {
        's' => 1_000,
        'm' => 60 * 1_000,
        'h' => 60 * 60 * 1_000,
        'd' => 24 * 60 * 60 * 1_000,
        _ => return None,
    };
    amount.checked_mul(unit_ms)
}

fn is_operator_object(object: &Map<String, Json>) -> bool {
    !object.is_empty()
        && object.keys().all(|key| key.starts_with('$'))
        && !object.contains_key("$date")
        && !object.contains_key("$ago")
}

fn parse_condition(
    field: &str,
    operator: &str,
    operand: &Json,
    now: EpochMs,
) -> Result<Condition, DocumentError> {
    let condition = match operator {
        "$eq" => Condition::Eq(parse_literal(field, operand, now)?),
        "$ne" => Condition::Ne(parse_literal(field, operand, now)?),
        "$gt" => Condition::Gt(parse_literal(field, operand, now)?),
        "$gte" => Condition::Gte(parse_literal(field, operand, now)?),
        "$lt" => Condition::Lt(parse_literal(field, operand, now)?),
        "$lte" => Condition::Lte(parse_literal(field, operand, now)?),
        "$in" => Condition::In(parse_literal_list(field, "$in", operand, now)?),
        "$nin" => Condition::Nin(parse_literal_list(field, "$nin", operand, now)?),
        "$exists" => match operand {
            Json::Bool(flag) => Condition::Exists(*flag),
            other => {
                return Err(DocumentError::InvalidOperand {
                    field: field.to_string(),
                    operator: "$exists",
                    message: format!("expected boolean, got `{other}`"),
                });
            }
        },
        other => return Err(DocumentError::UnknownOperator(other.to_string())),
    };
    Ok(condition)
}

fn parse_literal_list(
    field: &str,
    operator: &'static str,
    operand: &Json,
    now: EpochMs,
) -> Result<Vec<Value>, DocumentError> {
    let items = operand
        .as_array()
        .ok_or_else(|| DocumentError::InvalidOperand {
            field: field.to_string(),
            operator,
            message: format!("expected array, got `{operand}`"),
        })?;
    items
        .iter()
        .map(|item| parse_literal(field, item, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_duration_ms, parse_filter, parse_record, parse_update, DocumentError};
    use crate::model::collection::Collection;
    use crate::model::species::{Species, SpeciesStatus};
    use crate::model::value::{Value, HOUR_MS};
    use crate::query::filter::Condition;
    use serde_json::json;

    const NOW: i64 = 1_750_000_000_000;

    #[test]
    fn parses_literal_equality_and_operator_objects() {
        let filter = parse_filter(
            Collection::Species,
            &json!({"status": "accepted", "image": {"$exists": true, "$ne": null}}),
            NOW,
        )
        .unwrap();
        let conditions: Vec<_> = filter
            .clauses()
            .iter()
            .map(|clause| (clause.field.as_str(), clause.condition.clone()))
            .collect();
        assert_eq!(
            conditions,
            vec![
                ("image", Condition::Exists(true)),
                ("image", Condition::Ne(Value::Null)),
                ("status", Condition::Eq(Value::from("accepted"))),
            ]
        );
    }

    #[test]
    fn ago_resolves_against_now() {
        let filter = parse_filter(
            Collection::Distribution,
            &json!({"updatedAt": {"$gte": {"$ago": "48h"}}}),
            NOW,
        )
        .unwrap();
        assert_eq!(
            filter.clauses()[0].condition,
            Condition::Gte(Value::Timestamp(NOW - 48 * HOUR_MS))
        );
    }

    #[test]
    fn date_literal_accepts_rfc3339_and_epoch() {
        let filter = parse_filter(
            Collection::Species,
            &json!({"updatedAt": {"$gte": {"$date": "2025-01-01T00:00:00Z"}}}),
            NOW,
        )
        .unwrap();
        assert_eq!(
            filter.clauses()[0].condition,
            Condition::Gte(Value::Timestamp(1_735_689_600_000))
        );

        let filter = parse_filter(
            Collection::Species,
            &json!({"createdAt": {"$date": 5}}),
            NOW,
        )
        .unwrap();
        assert_eq!(
            filter.clauses()[0].condition,
            Condition::Eq(Value::Timestamp(5))
        );
    }

    #[test]
    fn rejects_malformed_filters() {
        assert!(matches!(
            parse_filter(Collection::Species, &json!([1]), NOW),
            Err(DocumentError::NotAnObject("filter"))
        ));
        assert!(matches!(
            parse_filter(Collection::Species, &json!({"status": {"$regex": "acc"}}), NOW),
            Err(DocumentError::UnknownOperator(op)) if op == "$regex"
        ));
        assert!(matches!(
            parse_filter(Collection::Species, &json!({"status": {"$in": "accepted"}}), NOW),
            Err(DocumentError::InvalidOperand { operator: "$in", .. })
        ));
        assert!(matches!(
            parse_filter(Collection::Species, &json!({"status": 3}), NOW),
            Err(DocumentError::InvalidLiteral { .. })
        ));
        assert!(matches!(
            parse_filter(Collection::Species, &json!({"image": {"$exists": "yes"}}), NOW),
            Err(DocumentError::InvalidOperand { operator: "$exists", .. })
        ));
    }

    #[test]
    fn parses_set_update() {
        let update = parse_update(
            Collection::Taxonomy,
            &json!({"$set": {"order": "New Order", "updatedAt": {"$ago": "0s"}}}),
            NOW,
        )
        .unwrap();
        assert_eq!(update.explicit_updated_at(), Some(NOW));
        let assignments: Vec<_> = update.assignments().collect();
        assert_eq!(assignments, vec![("order", &Value::from("New Order"))]);
    }

    #[test]
    fn rejects_non_set_update_operators() {
        assert!(matches!(
            parse_update(Collection::Species, &json!({"$unset": {"image": ""}}), NOW),
            Err(DocumentError::UnknownOperator(op)) if op == "$unset"
        ));
        assert!(matches!(
            parse_update(Collection::Species, &json!({"$set": {}}), NOW),
            Err(DocumentError::EmptyUpdate)
        ));
    }

    #[test]
    fn record_defaults_id_image_and_timestamps() {
        let species: Species = parse_record(
            &json!({
                "species_name": "Montipora digitata",
                "author": "Dana, 1846",
                "status": "accepted"
            }),
            NOW,
        )
        .unwrap();
        assert_eq!(species.status, SpeciesStatus::Accepted);
        assert_eq!(species.image, None);
        assert_eq!(species.created_at, NOW);
        assert_eq!(species.updated_at, NOW);
    }

    #[test]
    fn record_rejects_unknown_and_missing_fields() {
        let err = parse_record::<Species>(
            &json!({"species_name": "x", "author": "y", "status": "accepted", "region": "z"}),
            NOW,
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::UnknownField { .. }));

        let err = parse_record::<Species>(&json!({"species_name": "x"}), NOW).unwrap_err();
        assert!(matches!(err, DocumentError::Record(_)));
    }

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration_ms("30s"), Some(30_000));
        assert_eq!(parse_duration_ms("24h"), Some(24 * HOUR_MS));
        assert_eq!(parse_duration_ms("2d"), Some(48 * HOUR_MS));
        assert_eq!(parse_duration_ms("h"), None);
        assert_eq!(parse_duration_ms("5w"), None);
    }
}

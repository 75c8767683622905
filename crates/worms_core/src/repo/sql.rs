//! Filter compilation into parameterized SQL.
//!
//! Null semantics follow the document-store reading of each operator:
//! `$ne` and `$nin` match null/absent values unless null is listed.

use crate::model::collection::{Collection, FieldSpec};
use crate::model::value::Value;
use crate::query::document::DocumentError;
use crate::query::filter::{Condition, Filter};
use rusqlite::types::Value as SqlValue;

/// WHERE clause body plus positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SqlFilter {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

pub(crate) fn quote(column: &str) -> String {
    format!("\"{column}\"")
}

pub(crate) fn bind(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Text(text) => SqlValue::Text(text.clone()),
        Value::Timestamp(ms) => SqlValue::Integer(*ms),
    }
}

/// Resolves a field name to its column descriptor.
pub(crate) fn field_spec(
    collection: Collection,
    field: &str,
) -> Result<&'static FieldSpec, DocumentError> {
    collection
        .field(field)
        .ok_or_else(|| DocumentError::UnknownField {
            collection,
            field: field.to_string(),
        })
}

/// Compiles a filter into an ANDed WHERE body. Empty filters compile to `1`.
pub(crate) fn compile_filter(
    collection: Collection,
    filter: &Filter,
) -> Result<SqlFilter, DocumentError> {
    let mut parts = Vec::with_capacity(filter.clauses().len());
    let mut params = Vec::new();

    for clause in filter.clauses() {
        let column = quote(field_spec(collection, &clause.field)?.column);
        parts.push(compile_condition(&column, &clause.condition, &mut params));
    }

    let sql = if parts.is_empty() {
        "1".to_string()
    } else {
        parts.join(" AND ")
    };
    Ok(SqlFilter { sql, params })
}

fn compile_condition(column: &str, condition: &Condition, params: &mut Vec<SqlValue>) -> String {
    match condition {
        Condition::Eq(Value::Null) | Condition::Exists(false) => format!("{column} IS NULL"),
        Condition::Ne(Value::Null) | Condition::Exists(true) => format!("{column} IS NOT NULL"),
        Condition::Eq(value) => binary(column, "=", value, params),
        Condition::Ne(value) => {
            params.push(bind(value));
            format!("({column} IS NULL OR {column} <> ?)")
        }
        Condition::Gt(value) => binary(column, ">", value, params),
        Condition::Gte(value) => binary(column, ">=", value, params),
        Condition::Lt(value) => binary(column, "<", value, params),
        Condition::Lte(value) => binary(column, "<=", value, params),
        Condition::In(values) => {
            let (includes_null, list) = value_list(values, params);
            match (list, includes_null) {
                (None, false) => "0".to_string(),
                (None, true) => format!("{column} IS NULL"),
                (Some(list), false) => format!("{column} IN ({list})"),
                (Some(list), true) => format!("({column} IS NULL OR {column} IN ({list}))"),
            }
        }
        Condition::Nin(values) => {
            let (includes_null, list) = value_list(values, params);
            match (list, includes_null) {
                (None, false) => "1".to_string(),
                (None, true) => format!("{column} IS NOT NULL"),
                (Some(list), false) => format!("({column} IS NULL OR {column} NOT IN ({list}))"),
                (Some(list), true) => format!("({column} IS NOT NULL AND {column} NOT IN ({list}))"),
            }
        }
    }
}

fn binary(column: &str, operator: &str, value: &Value, params: &mut Vec<SqlValue>) -> String {
    params.push(bind(value));
    format!("{column} {operator} ?")
}

/// Pushes non-null values as parameters and returns their placeholder list.
fn value_list(values: &[Value], params: &mut Vec<SqlValue>) -> (bool, Option<String>) {
    let includes_null = values.iter().any(Value::is_null);
    let mut placeholders = Vec::new();
    for value in values.iter().filter(|value| !value.is_null()) {
        params.push(bind(value));
        placeholders.push("?");
    }

    if placeholders.is_empty() {
        (includes_null, None)
    } else {
        (includes_null, Some(placeholders.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::compile_filter;
    use crate::model::collection::Collection;
    use crate::model::value::Value;
    use crate::query::filter::Filter;
    use rusqlite::types::Value as SqlValue;

    #[test]
    fn empty_filter_matches_everything() {
        let compiled = compile_filter(Collection::Species, &Filter::new()).unwrap();
        assert_eq!(compiled.sql, "1");
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn compiles_existence_and_equality() {
        let filter = Filter::new().eq("status", "accepted").has_value("image");
        let compiled = compile_filter(Collection::Species, &filter).unwrap();
        assert_eq!(
            compiled.sql,
            "\"status\" = ? AND \"image\" IS NOT NULL AND \"image\" IS NOT NULL"
        );
        assert_eq!(compiled.params, vec![SqlValue::Text("accepted".to_string())]);
    }

    #[test]
    fn compiles_keyword_columns_and_membership() {
        let filter = Filter::new()
            .eq("order", "Scleractinia")
            .is_in("class", [Value::from("Anthozoa"), Value::Null]);
        let compiled = compile_filter(Collection::Taxonomy, &filter).unwrap();
        assert_eq!(
            compiled.sql,
            "\"order_name\" = ? AND (\"class_name\" IS NULL OR \"class_name\" IN (?))"
        );
        assert_eq!(compiled.params.len(), 2);
    }

    #[test]
    fn empty_membership_lists() {
        let none = compile_filter(
            Collection::Species,
            &Filter::new().is_in("status", Vec::<Value>::new()),
        )
        .unwrap();
        assert_eq!(none.sql, "0");

        let all = compile_filter(
            Collection::Species,
            &Filter::new().not_in("status", Vec::<Value>::new()),
        )
        .unwrap();
        assert_eq!(all.sql, "1");
    }

    #[test]
    fn timestamps_bind_as_integers() {
        let compiled = compile_filter(
            Collection::Distribution,
            &Filter::new().updated_since(1_000),
        )
        .unwrap();
        assert_eq!(compiled.sql, "\"updated_at\" >= ?");
        assert_eq!(compiled.params, vec![SqlValue::Integer(1_000)]);
    }
}

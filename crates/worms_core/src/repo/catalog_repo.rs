//! Catalog repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/find/count/update APIs over the three collections.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Writes validate records, filters and updates before SQL mutations.
//! - Reads reject invalid persisted rows instead of masking them.
//! - Results come back in insertion order; `update_one` targets the first
//!   match in that order.
//! - Every update refreshes `updatedAt` to `max(previous, now)` unless the
//!   update assigns it explicitly.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::collection::{Collection, FieldKind};
use crate::model::record::{CatalogRecord, FieldMap, RecordId, RecordValidationError};
use crate::model::value::{now_epoch_ms, Value};
use crate::query::document::DocumentError;
use crate::query::filter::Filter;
use crate::query::update::Update;
use crate::repo::sql::{bind, compile_filter, field_spec, quote};
use log::debug;
use rusqlite::types::{FromSql, Value as SqlValue};
use rusqlite::{params_from_iter, Connection, ErrorCode, Row};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for catalog persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// A record failed field validation on write.
    Validation(RecordValidationError),
    /// A filter or update document is malformed.
    Malformed(DocumentError),
    /// A write collided with an existing `_id`.
    Conflict(String),
    /// The store is unavailable or failed underneath.
    Db(DbError),
    /// A persisted row could not be decoded.
    InvalidData(String),
}

impl RepoError {
    /// Whether the store itself is unusable; callers should stop issuing
    /// further operations.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Db(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Malformed(err) => write!(f, "{err}"),
            Self::Conflict(message) => write!(f, "conflicting write: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted catalog data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Malformed(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Conflict(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<RecordValidationError> for RepoError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DocumentError> for RepoError {
    fn from(value: DocumentError) -> Self {
        Self::Malformed(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::Conflict(value.to_string()),
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Query options for `find`.
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub filter: Filter,
    pub limit: Option<u32>,
    pub skip: u32,
}

impl FindQuery {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }
}

impl From<Filter> for FindQuery {
    fn from(filter: Filter) -> Self {
        Self::new(filter)
    }
}

/// Result of an update-one / update-many call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    /// Records selected by the filter (at most 1 for update-one).
    pub matched: usize,
    /// Matched records whose assigned fields, an explicit `updatedAt`
    /// included, actually changed value. The automatic `updatedAt` refresh
    /// does not count.
    pub modified: usize,
}

impl UpdateOutcome {
    pub fn is_not_found(&self) -> bool {
        self.matched == 0
    }
}

/// Repository interface for catalog operations.
pub trait CatalogRepository {
    fn insert_one<T: CatalogRecord>(&self, record: &T) -> RepoResult<RecordId>;
    /// Inserts all records atomically; nothing is written when any fails.
    fn insert_many<T: CatalogRecord>(&self, records: &[T]) -> RepoResult<Vec<RecordId>>;
    fn get<T: CatalogRecord>(&self, id: RecordId) -> RepoResult<Option<T>>;
    fn find<T: CatalogRecord>(&self, query: &FindQuery) -> RepoResult<Vec<T>>;
    fn count(&self, collection: Collection, filter: &Filter) -> RepoResult<u64>;
    fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> RepoResult<UpdateOutcome>;
    fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> RepoResult<UpdateOutcome>;
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `DbError::SchemaNotReady` when migrations have not been applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let db_version = current_version(conn)?;
        let expected = latest_version();
        if db_version != expected {
            return Err(RepoError::Db(DbError::SchemaNotReady {
                db_version,
                expected,
            }));
        }
        Ok(Self { conn })
    }

    fn apply_update(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        first_only: bool,
    ) -> RepoResult<UpdateOutcome> {
        update.check(collection)?;
        let where_clause = compile_filter(collection, filter)?;
        let now = now_epoch_ms();

        let mut assignments = Vec::new();
        for (field, value) in update.assignments() {
            assignments.push((field_spec(collection, field)?.column, value));
        }

        let explicit_updated_at = update.explicit_updated_at();
        let mut changed_parts: Vec<String> = assignments
            .iter()
            .map(|(column, _)| format!("{} IS NOT ?", quote(column)))
            .collect();
        let mut changed_params: Vec<SqlValue> =
            assignments.iter().map(|(_, value)| bind(value)).collect();
        if let Some(updated_at) = explicit_updated_at {
            changed_parts.push("\"updated_at\" IS NOT ?".to_string());
            changed_params.push(SqlValue::Integer(updated_at));
        }
        let changed_expr = if changed_parts.is_empty() {
            "0".to_string()
        } else {
            changed_parts.join(" OR ")
        };
        let select_sql = format!(
            "SELECT seq, ({changed_expr}) FROM {} WHERE {} ORDER BY seq ASC{}",
            quote(collection.table()),
            where_clause.sql,
            if first_only { " LIMIT 1" } else { "" }
        );
        let select_params: Vec<SqlValue> =
            changed_params.into_iter().chain(where_clause.params).collect();

        let mut set_parts: Vec<String> = assignments
            .iter()
            .map(|(column, _)| format!("{} = ?", quote(column)))
            .collect();
        let mut set_params: Vec<SqlValue> =
            assignments.iter().map(|(_, value)| bind(value)).collect();
        match explicit_updated_at {
            Some(updated_at) => {
                set_parts.push("\"updated_at\" = ?".to_string());
                set_params.push(SqlValue::Integer(updated_at));
            }
            None => {
                set_parts.push("\"updated_at\" = MAX(\"updated_at\", ?)".to_string());
                set_params.push(SqlValue::Integer(now));
            }
        }
        let update_sql = format!(
            "UPDATE {} SET {} WHERE seq = ?",
            quote(collection.table()),
            set_parts.join(", ")
        );

        let tx = self.conn.unchecked_transaction()?;
        let targets = {
            let mut stmt = tx.prepare(&select_sql)?;
            let rows = stmt.query_map(params_from_iter(select_params), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, bool>(1)?))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        {
            let mut stmt = tx.prepare(&update_sql)?;
            for (seq, _) in &targets {
                let mut row_params = set_params.clone();
                row_params.push(SqlValue::Integer(*seq));
                stmt.execute(params_from_iter(row_params))?;
            }
        }
        tx.commit()?;

        let outcome = UpdateOutcome {
            matched: targets.len(),
            modified: targets.iter().filter(|(_, changed)| *changed).count(),
        };
        debug!(
            "event=catalog_update module=repo status=ok collection={} mode={} matched={} modified={}",
            collection,
            if first_only { "one" } else { "many" },
            outcome.matched,
            outcome.modified
        );
        Ok(outcome)
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn insert_one<T: CatalogRecord>(&self, record: &T) -> RepoResult<RecordId> {
        self.insert_many(std::slice::from_ref(record))?;
        Ok(record.id())
    }

    fn insert_many<T: CatalogRecord>(&self, records: &[T]) -> RepoResult<Vec<RecordId>> {
        for record in records {
            record.validate()?;
        }

        let collection = T::COLLECTION;
        let specs = collection.fields();
        let columns = specs
            .iter()
            .map(|spec| quote(spec.column))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; specs.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders});",
            quote(collection.table())
        );

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                let fields = record.to_fields();
                let values = specs
                    .iter()
                    .map(|spec| fields.get(spec.name).map_or(SqlValue::Null, bind));
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        debug!(
            "event=catalog_insert module=repo status=ok collection={} count={}",
            collection,
            records.len()
        );
        Ok(records.iter().map(T::id).collect())
    }

    fn get<T: CatalogRecord>(&self, id: RecordId) -> RepoResult<Option<T>> {
        let filter = Filter::new().eq("_id", id.to_string());
        let query = FindQuery {
            filter,
            limit: Some(1),
            skip: 0,
        };
        Ok(self.find::<T>(&query)?.into_iter().next())
    }

    fn find<T: CatalogRecord>(&self, query: &FindQuery) -> RepoResult<Vec<T>> {
        let collection = T::COLLECTION;
        query.filter.check(collection)?;
        let where_clause = compile_filter(collection, &query.filter)?;
        let mut params = where_clause.params;

        let columns = collection
            .fields()
            .iter()
            .map(|spec| quote(spec.column))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "SELECT {columns} FROM {} WHERE {} ORDER BY seq ASC",
            quote(collection.table()),
            where_clause.sql
        );

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(SqlValue::Integer(i64::from(limit)));
            if query.skip > 0 {
                sql.push_str(" OFFSET ?");
                params.push(SqlValue::Integer(i64::from(query.skip)));
            }
        } else if query.skip > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(SqlValue::Integer(i64::from(query.skip)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row::<T>(row)?);
        }

        debug!(
            "event=catalog_find module=repo status=ok collection={} clauses={} returned={}",
            collection,
            query.filter.clauses().len(),
            records.len()
        );
        Ok(records)
    }

    fn count(&self, collection: Collection, filter: &Filter) -> RepoResult<u64> {
        filter.check(collection)?;
        let where_clause = compile_filter(collection, filter)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            quote(collection.table()),
            where_clause.sql
        );
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(where_clause.params), |row| row.get(0))?;
        u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count {count}")))
    }

    fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> RepoResult<UpdateOutcome> {
        filter.check(collection)?;
        self.apply_update(collection, filter, update, true)
    }

    fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> RepoResult<UpdateOutcome> {
        filter.check(collection)?;
        self.apply_update(collection, filter, update, false)
    }
}

fn parse_record_row<T: CatalogRecord>(row: &Row<'_>) -> RepoResult<T> {
    let collection = T::COLLECTION;
    let mut fields = FieldMap::new();
    for (index, spec) in collection.fields().iter().enumerate() {
        let value = match spec.kind {
            FieldKind::Timestamp => {
                Value::Timestamp(decode_column(row, index, collection, spec.name)?)
            }
            FieldKind::Id | FieldKind::Text | FieldKind::OptionalText => Value::from(
                decode_column::<Option<String>>(row, index, collection, spec.name)?,
            ),
        };
        fields.insert(spec.name, value);
    }

    let record = T::from_fields(&fields).map_err(|err| {
        RepoError::InvalidData(format!("{collection} row does not decode: {err}"))
    })?;
    record
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("{collection} row is invalid: {err}")))?;
    Ok(record)
}

fn decode_column<V: FromSql>(
    row: &Row<'_>,
    index: usize,
    collection: Collection,
    field: &str,
) -> RepoResult<V> {
    row.get::<_, V>(index).map_err(|err| {
        RepoError::InvalidData(format!("{collection} field `{field}` does not decode: {err}"))
    })
}

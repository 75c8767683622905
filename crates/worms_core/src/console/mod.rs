//! Console script interpreter.
//!
//! # Responsibility
//! - Execute `<collection>.<method>(<json args>)` statements against a
//!   catalog repository, strictly in script order.
//! - Classify failures: malformed statements and documents are reported and
//!   skipped; a store-unavailable failure aborts the rest of the script.
//!
//! # Invariants
//! - Each statement resolves relative timestamps against its own `now`.
//! - Zero-match finds and updates are successful outputs, not failures.

pub mod parser;

use crate::model::collection::Collection;
use crate::model::distribution::Distribution;
use crate::model::record::{CatalogRecord, RecordId};
use crate::model::species::Species;
use crate::model::taxonomy::Taxonomy;
use crate::model::value::{now_epoch_ms, EpochMs};
use crate::query::document::{parse_filter, parse_record, parse_update, DocumentError};
use crate::query::filter::Filter;
use crate::repo::catalog_repo::{CatalogRepository, FindQuery, RepoError, UpdateOutcome};
use crate::repo::join::join_species;
use log::{error, info, warn};
use parser::{parse_statement, split_statements, Statement};
use serde::Serialize;
use serde_json::Value as Json;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Script replaying the catalog's seed, query and update walkthrough.
pub const DEMO_SCRIPT: &str = include_str!("demo.worms");

/// Console statement failure.
#[derive(Debug)]
pub enum ConsoleError {
    Syntax {
        line: usize,
        message: String,
    },
    UnknownCollection(String),
    UnknownMethod {
        collection: Collection,
        method: String,
    },
    Arguments {
        method: String,
        message: String,
    },
    Malformed(DocumentError),
    Encode(String),
    Repo(RepoError),
}

impl ConsoleError {
    /// Whether remaining statements must be skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Repo(err) if err.is_store_unavailable())
    }
}

impl Display for ConsoleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax { line, message } => write!(f, "syntax error on line {line}: {message}"),
            Self::UnknownCollection(name) => write!(f, "unknown collection `{name}`"),
            Self::UnknownMethod { collection, method } => {
                write!(f, "unsupported method `{method}` on {collection}")
            }
            Self::Arguments { method, message } => write!(f, "bad arguments to {method}: {message}"),
            Self::Malformed(err) => write!(f, "{err}"),
            Self::Encode(message) => write!(f, "failed to encode result: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConsoleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DocumentError> for ConsoleError {
    fn from(value: DocumentError) -> Self {
        Self::Malformed(value)
    }
}

impl From<RepoError> for ConsoleError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value.to_string())
    }
}

/// Successful statement result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatementOutput {
    Inserted {
        collection: &'static str,
        ids: Vec<RecordId>,
    },
    Documents {
        collection: &'static str,
        documents: Vec<Json>,
    },
    Count {
        collection: &'static str,
        count: u64,
    },
    Updated {
        collection: &'static str,
        #[serde(flatten)]
        outcome: UpdateOutcome,
    },
}

/// Outcome of one statement within a script run.
#[derive(Debug)]
pub struct StatementReport {
    pub line: usize,
    pub source: String,
    pub result: Result<StatementOutput, ConsoleError>,
}

/// Outcome of a whole script run.
#[derive(Debug, Default)]
pub struct ScriptReport {
    pub statements: Vec<StatementReport>,
    /// Set when a store-unavailable failure stopped the run early.
    pub aborted: bool,
}

impl ScriptReport {
    pub fn failures(&self) -> usize {
        self.statements
            .iter()
            .filter(|report| report.result.is_err())
            .count()
    }
}

/// Runs a script using the wall clock for each statement.
pub fn run_script<R: CatalogRepository>(repo: &R, script: &str) -> ScriptReport {
    run_script_with_clock(repo, script, now_epoch_ms)
}

/// Runs a script, sampling `clock` once per statement.
pub fn run_script_with_clock<R: CatalogRepository>(
    repo: &R,
    script: &str,
    mut clock: impl FnMut() -> EpochMs,
) -> ScriptReport {
    let mut report = ScriptReport::default();

    for raw in split_statements(script) {
        let result = parse_statement(&raw).and_then(|statement| execute(repo, &statement, clock()));

        if let Err(err) = &result {
            if err.is_fatal() {
                error!(
                    "event=console_statement module=console status=error line={} fatal=true error={}",
                    raw.line, err
                );
                report.aborted = true;
            } else {
                warn!(
                    "event=console_statement module=console status=error line={} fatal=false error={}",
                    raw.line, err
                );
            }
        }

        report.statements.push(StatementReport {
            line: raw.line,
            source: raw.text,
            result,
        });
        if report.aborted {
            break;
        }
    }

    info!(
        "event=console_script module=console status={} statements={} failures={}",
        if report.aborted { "aborted" } else { "ok" },
        report.statements.len(),
        report.failures()
    );
    report
}

/// Executes one parsed statement.
pub fn execute<R: CatalogRepository>(
    repo: &R,
    statement: &Statement,
    now: EpochMs,
) -> Result<StatementOutput, ConsoleError> {
    let collection = Collection::parse(&statement.collection)
        .ok_or_else(|| ConsoleError::UnknownCollection(statement.collection.clone()))?;

    if statement.method == "lookup" {
        return execute_lookup(repo, collection, statement, now);
    }

    match collection {
        Collection::Species => execute_typed::<Species, R>(repo, statement, now),
        Collection::Taxonomy => execute_typed::<Taxonomy, R>(repo, statement, now),
        Collection::Distribution => execute_typed::<Distribution, R>(repo, statement, now),
    }
}

fn execute_typed<T, R>(
    repo: &R,
    statement: &Statement,
    now: EpochMs,
) -> Result<StatementOutput, ConsoleError>
where
    T: CatalogRecord + Serialize,
    R: CatalogRepository,
{
    let collection = T::COLLECTION;
    let name = collection.name();
    let args = Arguments::new(statement);

    match statement.method.as_str() {
        "insertOne" => {
            args.expect_count(1, 1)?;
            let record: T = parse_record(args.get(0), now)?;
            let id = repo.insert_one(&record)?;
            Ok(StatementOutput::Inserted {
                collection: name,
                ids: vec![id],
            })
        }
        "insertMany" => {
            args.expect_count(1, 1)?;
            let items = args.get(0).as_array().ok_or_else(|| args.error("expected an array"))?;
            let records = items
                .iter()
                .map(|item| parse_record::<T>(item, now))
                .collect::<Result<Vec<_>, _>>()?;
            let ids = repo.insert_many(&records)?;
            Ok(StatementOutput::Inserted {
                collection: name,
                ids,
            })
        }
        "find" => {
            args.expect_count(0, 1)?;
            let filter = args.filter(collection, 0, now)?;
            let records = repo.find::<T>(&FindQuery::new(filter))?;
            let documents = records
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(StatementOutput::Documents {
                collection: name,
                documents,
            })
        }
        "count" | "countDocuments" => {
            args.expect_count(0, 1)?;
            let filter = args.filter(collection, 0, now)?;
            Ok(StatementOutput::Count {
                collection: name,
                count: repo.count(collection, &filter)?,
            })
        }
        "updateOne" | "updateMany" => {
            args.expect_count(2, 2)?;
            let filter = parse_filter(collection, args.get(0), now)?;
            let update = parse_update(collection, args.get(1), now)?;
            let outcome = if statement.method == "updateOne" {
                repo.update_one(collection, &filter, &update)?
            } else {
                repo.update_many(collection, &filter, &update)?
            };
            Ok(StatementOutput::Updated {
                collection: name,
                outcome,
            })
        }
        other => Err(ConsoleError::UnknownMethod {
            collection,
            method: other.to_string(),
        }),
    }
}

/// `species.lookup("<collection>", {species filter}, {joined filter})`.
fn execute_lookup<R: CatalogRepository>(
    repo: &R,
    collection: Collection,
    statement: &Statement,
    now: EpochMs,
) -> Result<StatementOutput, ConsoleError> {
    if collection != Collection::Species {
        return Err(ConsoleError::UnknownMethod {
            collection,
            method: statement.method.clone(),
        });
    }

    let args = Arguments::new(statement);
    args.expect_count(1, 3)?;
    let from = args
        .get(0)
        .as_str()
        .and_then(Collection::parse)
        .filter(|target| *target != Collection::Species)
        .ok_or_else(|| args.error("first argument must be \"taxonomy\" or \"distribution\""))?;
    let species_filter = args.filter(Collection::Species, 1, now)?;
    let joined_filter = args.filter(from, 2, now)?;

    let documents = match from {
        Collection::Taxonomy => join_species::<R, Taxonomy>(repo, &species_filter, &joined_filter)?
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?,
        _ => join_species::<R, Distribution>(repo, &species_filter, &joined_filter)?
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(StatementOutput::Documents {
        collection: collection.name(),
        documents,
    })
}

struct Arguments<'a> {
    statement: &'a Statement,
}

impl<'a> Arguments<'a> {
    fn new(statement: &'a Statement) -> Self {
        Self { statement }
    }

    fn error(&self, message: &str) -> ConsoleError {
        ConsoleError::Arguments {
            method: self.statement.method.clone(),
            message: message.to_string(),
        }
    }

    fn expect_count(&self, min: usize, max: usize) -> Result<(), ConsoleError> {
        let count = self.statement.args.len();
        if count < min || count > max {
            return Err(ConsoleError::Arguments {
                method: self.statement.method.clone(),
                message: format!("expected {min}..={max} arguments, got {count}"),
            });
        }
        Ok(())
    }

    fn get(&self, index: usize) -> &'a Json {
        &self.statement.args[index]
    }

    /// Optional filter argument; missing means match-all.
    fn filter(
        &self,
        collection: Collection,
        index: usize,
        now: EpochMs,
    ) -> Result<Filter, ConsoleError> {
        match self.statement.args.get(index) {
            Some(document) => Ok(parse_filter(collection, document, now)?),
            None => Ok(Filter::new()),
        }
    }
}

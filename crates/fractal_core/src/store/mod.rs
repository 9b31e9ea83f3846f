//! Collection, table and key-value handles over one SQLite connection.
//!
//! # Responsibility
//! - Own the `Database` connection and hand out borrowed data handles.
//! - Resolve every field name against the bound schema before building SQL.
//! - Reshape result rows into `Record` maps.
//!
//! # Invariants
//! - Writes validate field names, value types and nullability first.
//! - Each mutating call is committed before it returns.
//! - Engine errors propagate unchanged except "no such column" on field
//!   removal, reported as `FieldNotFound`.

use crate::db::DbError;
use crate::model::types::SqlType;
use crate::schema::SchemaError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod collection;
mod database;
mod kv;
mod rows;
mod table;

pub use collection::Collection;
pub use database::Database;
pub use kv::{JsonFilter, JsonObject, JsonOp, Page};
pub use table::Table;

pub type StoreResult<T> = Result<T, StoreError>;

/// Error for data operations on collections, tables and pages.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Schema(SchemaError),
    Json(serde_json::Error),
    CollectionNotFound(String),
    FieldNotFound {
        collection: String,
        field: String,
    },
    /// A record or condition names a field the schema does not declare.
    UnknownField(String),
    MissingField(String),
    NullValue(String),
    TypeMismatch {
        field: String,
        expected: SqlType,
        found: SqlType,
    },
    FieldCountMismatch {
        expected: usize,
        found: usize,
    },
    InvalidArgument(String),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "invalid JSON document: {err}"),
            Self::CollectionNotFound(name) => write!(f, "collection `{name}` not found"),
            Self::FieldNotFound { collection, field } => {
                write!(f, "field `{field}` not found in collection `{collection}`")
            }
            Self::UnknownField(name) => write!(f, "invalid field: {name}"),
            Self::MissingField(name) => write!(f, "missing field: {name}"),
            Self::NullValue(name) => write!(f, "field `{name}` does not accept NULL"),
            Self::TypeMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "incorrect type for field `{field}`: expected {expected}, got {found}"
            ),
            Self::FieldCountMismatch { expected, found } => write!(
                f,
                "record has {found} fields but the schema declares {expected}"
            ),
            Self::InvalidArgument(message) => write!(f, "{message}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Schema(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<SchemaError> for StoreError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

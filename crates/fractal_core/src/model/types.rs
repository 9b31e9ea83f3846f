//! Logical column types and their SQL storage-class mapping.
//!
//! # Invariants
//! - `as_sql_type` is total over `SqlType`.
//! - `from_sql_type(as_sql_type(t)) == t` for every variant.

use crate::schema::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Logical type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    Integer,
    Real,
    /// Stored as INTEGER 0/1, decoded back into `Value::Boolean`.
    Boolean,
    Text,
    Blob,
    /// Stored as ISO-8601 text `YYYY-MM-DD HH:MM:SS[.fff]`.
    DateTime,
    /// Stored as ISO-8601 text `YYYY-MM-DD`.
    Date,
    /// Stored as ISO-8601 text `HH:MM:SS[.fff]`.
    Time,
}

impl SqlType {
    pub const ALL: [SqlType; 8] = [
        SqlType::Integer,
        SqlType::Real,
        SqlType::Boolean,
        SqlType::Text,
        SqlType::Blob,
        SqlType::DateTime,
        SqlType::Date,
        SqlType::Time,
    ];

    /// Returns the storage-class string used in DDL.
    pub fn as_sql_type(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Boolean => "BOOLEAN",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
            Self::DateTime => "DATETIME",
            Self::Date => "DATE",
            Self::Time => "TIME",
        }
    }

    /// Parses a declared column type as reported by `PRAGMA table_info`.
    ///
    /// Matching ignores surrounding whitespace and ASCII case.
    ///
    /// # Errors
    /// - `SchemaError::UnknownSqlType` for anything outside the fixed set.
    pub fn from_sql_type(declared: &str) -> SchemaResult<Self> {
        let normalized = declared.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_sql_type() == normalized)
            .ok_or_else(|| SchemaError::UnknownSqlType(declared.to_string()))
    }

    /// Whether `SUM`/`AVG` make sense over this type.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }
}

impl Display for SqlType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql_type())
    }
}

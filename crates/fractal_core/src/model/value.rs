//! Dynamic cell value and record shape.
//!
//! # Responsibility
//! - Carry caller data into parameter bindings.
//! - Decode SQLite cells back into typed values using the declared column type.
//!
//! # Invariants
//! - Temporal values are bound as ISO-8601 text and parsed back with the
//!   same formats.
//! - Booleans are bound as INTEGER 0/1.

use crate::model::types::SqlType;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde::ser::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S%.f";

// SQLite's CURRENT_TIMESTAMP and strict ISO-8601 both have to parse.
const DATETIME_PARSE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A row keyed by column name.
pub type Record = BTreeMap<String, Value>;

/// One cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
    Blob(Vec<u8>),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl Value {
    /// Logical type carried by this value; `None` for `Null`.
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            Self::Null => None,
            Self::Integer(_) => Some(SqlType::Integer),
            Self::Real(_) => Some(SqlType::Real),
            Self::Boolean(_) => Some(SqlType::Boolean),
            Self::Text(_) => Some(SqlType::Text),
            Self::Blob(_) => Some(SqlType::Blob),
            Self::DateTime(_) => Some(SqlType::DateTime),
            Self::Date(_) => Some(SqlType::Date),
            Self::Time(_) => Some(SqlType::Time),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns whether this value may be stored in a column of `kind`.
    ///
    /// Integers widen into REAL columns; `Null` is accepted here and the
    /// nullability check is left to the caller.
    pub fn fits(&self, kind: SqlType) -> bool {
        match self.sql_type() {
            None => true,
            Some(own) if own == kind => true,
            Some(SqlType::Integer) => kind == SqlType::Real,
            Some(_) => false,
        }
    }

    /// Converts an integer bound for a REAL column into the `Real` that
    /// SQLite's REAL affinity stores, so callers see what a read returns.
    pub fn widen_to(&mut self, kind: SqlType) {
        if let (Self::Integer(value), SqlType::Real) = (&*self, kind) {
            *self = Self::Real(*value as f64);
        }
    }

    /// Renders this value as an inline SQL literal for DDL `DEFAULT` clauses.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Real(value) => {
                let text = value.to_string();
                if text.contains(['.', 'e', 'E']) || !value.is_finite() {
                    text
                } else {
                    format!("{text}.0")
                }
            }
            Self::Boolean(value) => i64::from(*value).to_string(),
            Self::Text(value) => quote_literal(value),
            Self::Blob(bytes) => {
                let mut hex = String::with_capacity(bytes.len() * 2 + 3);
                hex.push_str("X'");
                for byte in bytes {
                    let _ = write!(hex, "{byte:02X}");
                }
                hex.push('\'');
                hex
            }
            Self::DateTime(value) => quote_literal(&value.format(DATETIME_FORMAT).to_string()),
            Self::Date(value) => quote_literal(&value.format(DATE_FORMAT).to_string()),
            Self::Time(value) => quote_literal(&value.format(TIME_FORMAT).to_string()),
        }
    }

    /// Decodes one SQLite cell.
    ///
    /// `declared` is the column's logical type when the schema knows it;
    /// without it the raw storage class is returned as-is.
    ///
    /// # Errors
    /// - Returns a description when text is not UTF-8 or temporal text does
    ///   not parse for a temporal column.
    pub fn from_column(raw: ValueRef<'_>, declared: Option<SqlType>) -> Result<Self, String> {
        match raw {
            ValueRef::Null => Ok(Self::Null),
            ValueRef::Integer(value) => match declared {
                Some(SqlType::Boolean) => Ok(Self::Boolean(value != 0)),
                _ => Ok(Self::Integer(value)),
            },
            ValueRef::Real(value) => Ok(Self::Real(value)),
            ValueRef::Text(bytes) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|err| format!("text cell is not valid UTF-8: {err}"))?;
                decode_text(text, declared)
            }
            ValueRef::Blob(bytes) => Ok(Self::Blob(bytes.to_vec())),
        }
    }
}

fn decode_text(text: &str, declared: Option<SqlType>) -> Result<Value, String> {
    match declared {
        Some(SqlType::DateTime) => DATETIME_PARSE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .map(Value::DateTime)
            .ok_or_else(|| format!("invalid datetime `{text}`")),
        Some(SqlType::Date) => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .map(Value::Date)
            .map_err(|err| format!("invalid date `{text}`: {err}")),
        Some(SqlType::Time) => NaiveTime::parse_from_str(text, TIME_FORMAT)
            .map(Value::Time)
            .map_err(|err| format!("invalid time `{text}`: {err}")),
        _ => Ok(Value::Text(text.to_string())),
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let output = match self {
            Self::Null => ToSqlOutput::Owned(SqlValue::Null),
            Self::Integer(value) => ToSqlOutput::Owned(SqlValue::Integer(*value)),
            Self::Real(value) => ToSqlOutput::Owned(SqlValue::Real(*value)),
            Self::Boolean(value) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*value))),
            Self::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
            Self::Blob(value) => ToSqlOutput::Borrowed(ValueRef::Blob(value)),
            Self::DateTime(value) => {
                ToSqlOutput::Owned(SqlValue::Text(value.format(DATETIME_FORMAT).to_string()))
            }
            Self::Date(value) => {
                ToSqlOutput::Owned(SqlValue::Text(value.format(DATE_FORMAT).to_string()))
            }
            Self::Time(value) => {
                ToSqlOutput::Owned(SqlValue::Text(value.format(TIME_FORMAT).to_string()))
            }
        };
        Ok(output)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Real(value) => serializer.serialize_f64(*value),
            Self::Boolean(value) => serializer.serialize_bool(*value),
            Self::Text(value) => serializer.serialize_str(value),
            Self::Blob(value) => serializer.serialize_bytes(value),
            Self::DateTime(value) => {
                serializer.collect_str(&value.format(DATETIME_FORMAT))
            }
            Self::Date(value) => serializer.collect_str(&value.format(DATE_FORMAT)),
            Self::Time(value) => serializer.collect_str(&value.format(TIME_FORMAT)),
        }
    }
}

macro_rules! value_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

value_from! {
    i64 => Integer,
    i32 => Integer,
    i16 => Integer,
    u32 => Integer,
    u16 => Integer,
    u8 => Integer,
    f64 => Real,
    f32 => Real,
    bool => Boolean,
    String => Text,
    &str => Text,
    Vec<u8> => Blob,
    &[u8] => Blob,
    NaiveDateTime => DateTime,
    NaiveDate => Date,
    NaiveTime => Time,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

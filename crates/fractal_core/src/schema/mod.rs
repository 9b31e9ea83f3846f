//! Schema declaration and schema→DDL mapping.
//!
//! # Responsibility
//! - Describe collection/table columns with logical types and constraints.
//! - Render `CREATE TABLE` / `ADD COLUMN` definitions.
//! - Reject names that are unsafe to interpolate into SQL.
//!
//! # Invariants
//! - Field names are unique within a schema.
//! - Every identifier that reaches SQL text matched `IDENTIFIER_PATTERN` and
//!   is not an SQLite keyword, so it is rendered unquoted.
//! - Fields are immutable once added to a schema.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod definition;
mod field;

pub use definition::{Schema, KEY_FIELD, TIMESTAMP_FIELD};
pub use field::{Constraint, Field};

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";
const MAX_IDENTIFIER_CHARS: usize = 64;

// SQLite keywords, sorted for binary search. `KEY` is left out: it is the
// implicit collection field and SQLite accepts it as a plain identifier.
const RESERVED_WORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS", "ASC",
    "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST",
    "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS",
    "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT",
    "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT", "DO", "DROP", "EACH",
    "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB",
    "GROUP", "GROUPS", "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED",
    "INITIALLY", "INNER", "INSERT", "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN",
    "LAST", "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT",
    "NOTHING", "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS",
    "OUTER", "OVER", "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE",
    "RANGE", "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE",
    "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT", "SET",
    "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION", "TRIGGER", "UNBOUNDED",
    "UNION", "UNIQUE", "UPDATE", "USING", "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN",
    "WHERE", "WINDOW", "WITH", "WITHOUT",
];

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(IDENTIFIER_PATTERN).unwrap_or_else(|err| panic!("invalid identifier regex: {err}"))
});

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Declaration-time errors for fields and schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    DuplicateField(String),
    FieldNotFound(String),
    /// Implicit `key`/`timestamp` fields cannot be altered or removed.
    ReservedField(String),
    InvalidIdentifier(String),
    /// The name is an SQLite keyword and would break unquoted SQL.
    ReservedWord(String),
    InvalidDefault {
        field: String,
        reason: String,
    },
    UnknownSqlType(String),
    UnsupportedSample {
        field: String,
    },
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateField(name) => write!(f, "field `{name}` is declared more than once"),
            Self::FieldNotFound(name) => write!(f, "field `{name}` not found in schema"),
            Self::ReservedField(name) => write!(f, "field `{name}` is managed implicitly"),
            Self::InvalidIdentifier(name) => write!(
                f,
                "invalid identifier `{name}`; expected [A-Za-z_][A-Za-z0-9_]* up to {MAX_IDENTIFIER_CHARS} chars"
            ),
            Self::ReservedWord(name) => {
                write!(f, "`{name}` is an SQLite keyword and cannot be used as a name")
            }
            Self::InvalidDefault { field, reason } => {
                write!(f, "invalid default for field `{field}`: {reason}")
            }
            Self::UnknownSqlType(declared) => write!(f, "unknown SQL type: {declared}"),
            Self::UnsupportedSample { field } => {
                write!(f, "cannot infer a type for sample field `{field}`")
            }
        }
    }
}

impl Error for SchemaError {}

/// Validates a collection or field name before it is interpolated into SQL.
///
/// # Errors
/// - `SchemaError::InvalidIdentifier` when the name is empty, too long,
///   contains characters outside `[A-Za-z0-9_]`, or uses SQLite's reserved
///   `sqlite_` prefix.
/// - `SchemaError::ReservedWord` for SQLite keywords such as `order`.
pub fn validate_identifier(name: &str) -> SchemaResult<()> {
    let reserved = name
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("sqlite_"));
    if name.chars().count() > MAX_IDENTIFIER_CHARS || reserved || !IDENTIFIER_RE.is_match(name) {
        return Err(SchemaError::InvalidIdentifier(name.to_string()));
    }
    if is_reserved_word(name) {
        return Err(SchemaError::ReservedWord(name.to_string()));
    }
    Ok(())
}

fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS
        .binary_search(&name.to_ascii_uppercase().as_str())
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::{validate_identifier, SchemaError, RESERVED_WORDS};

    #[test]
    fn accepts_plain_identifiers() {
        for name in ["users", "_tmp", "Field_2", "a", "key", "timestamp", "orders"] {
            validate_identifier(name).unwrap();
        }
    }

    #[test]
    fn rejects_injection_and_reserved_names() {
        for name in [
            "",
            "2fast",
            "name; DROP TABLE x",
            "with space",
            "quote\"",
            "sqlite_master",
            "SQLITE_sequence",
        ] {
            let err = validate_identifier(name).unwrap_err();
            assert!(matches!(err, SchemaError::InvalidIdentifier(_)), "{name}");
        }
        assert!(validate_identifier(&"x".repeat(65)).is_err());
    }

    #[test]
    fn rejects_sqlite_keywords_in_any_case() {
        for name in ["order", "GROUP", "Select", "values", "current_timestamp"] {
            let err = validate_identifier(name).unwrap_err();
            assert!(matches!(err, SchemaError::ReservedWord(_)), "{name}");
        }
    }

    #[test]
    fn reserved_words_are_sorted_for_lookup() {
        assert!(RESERVED_WORDS.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

//! Schema-less JSON pages.
//!
//! # Responsibility
//! - Store JSON objects in one `data` column per row.
//! - Filter objects by dotted JSON paths through SQLite `json_extract`.
//!
//! # Invariants
//! - Only JSON objects are stored; `get` rejects rows that decode to
//!   anything else.
//! - Paths and values are always bound, never interpolated.

use crate::model::value::Value;
use crate::store::rows::count_rows;
use crate::store::{StoreError, StoreResult};
use log::debug;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Comparison applied to one extracted JSON path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl JsonOp {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
        }
    }
}

/// One `json_extract(data, '$.<path>') <op> ?` predicate.
///
/// `Eq`/`Ne` against JSON `null` render `IS NULL`/`IS NOT NULL`, so an
/// explicit `null` and a missing path both match `Eq(null)`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonFilter {
    /// Dotted path below the object root, e.g. `specs.ram`.
    pub path: String,
    pub op: JsonOp,
    pub value: serde_json::Value,
}

impl JsonFilter {
    pub fn new(path: impl Into<String>, op: JsonOp, value: impl Into<serde_json::Value>) -> Self {
        Self {
            path: path.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for an equality filter.
    pub fn eq(path: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::new(path, JsonOp::Eq, value)
    }

    fn json_path(&self) -> StoreResult<String> {
        let path = self.path.trim();
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(StoreError::InvalidArgument(format!(
                "invalid JSON path `{}`",
                self.path
            )));
        }
        Ok(format!("$.{path}"))
    }
}

/// A JSON document page bound to a borrowed connection.
pub struct Page<'conn> {
    name: String,
    conn: &'conn Connection,
}

impl<'conn> Page<'conn> {
    pub(crate) fn new(name: impl Into<String>, conn: &'conn Connection) -> Self {
        Self {
            name: name.into(),
            conn,
        }
    }

    pub(crate) fn create_sql(name: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {name} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                data TEXT NOT NULL
            );"
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores `object` as a new row and returns its id.
    pub fn put(&self, object: &JsonObject) -> StoreResult<i64> {
        let data = serde_json::to_string(object)?;
        self.conn.execute(
            &format!("INSERT INTO {} (data) VALUES (?1)", self.name),
            [data],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("event=kv_put module=store page={} id={id}", self.name);
        Ok(id)
    }

    pub fn get(&self, id: i64) -> StoreResult<Option<JsonObject>> {
        let data = self
            .conn
            .query_row(
                &format!("SELECT data FROM {} WHERE id = ?1", self.name),
                [id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        data.map(|text| parse_object(&text)).transpose()
    }

    /// Shallow-merges `changes` into the object at `id`.
    ///
    /// When `id` does not exist, `changes` is stored as a new row and the
    /// new id is returned instead.
    pub fn update(&self, id: i64, changes: &JsonObject) -> StoreResult<i64> {
        let Some(mut existing) = self.get(id)? else {
            return self.put(changes);
        };
        for (key, value) in changes {
            existing.insert(key.clone(), value.clone());
        }
        let data = serde_json::to_string(&existing)?;
        self.conn.execute(
            &format!("UPDATE {} SET data = ?1 WHERE id = ?2", self.name),
            rusqlite::params![data, id],
        )?;
        Ok(id)
    }

    pub fn delete(&self, id: i64) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute(&format!("DELETE FROM {} WHERE id = ?1", self.name), [id])?;
        Ok(changed > 0)
    }

    pub fn count(&self) -> StoreResult<u64> {
        count_rows(self.conn, &self.name)
    }

    /// Objects matching every filter, in id order.
    pub fn query(&self, filters: &[JsonFilter]) -> StoreResult<Vec<(i64, JsonObject)>> {
        let mut sql = format!("SELECT id, data FROM {}", self.name);
        let mut params = Vec::with_capacity(filters.len() * 2);
        let mut clauses = Vec::with_capacity(filters.len());
        for filter in filters {
            params.push(Value::Text(filter.json_path()?));
            match (filter.op, filter.value.is_null()) {
                (JsonOp::Eq, true) => clauses.push("json_extract(data, ?) IS NULL".to_string()),
                (JsonOp::Ne, true) => {
                    clauses.push("json_extract(data, ?) IS NOT NULL".to_string())
                }
                (op, _) => {
                    clauses.push(format!("json_extract(data, ?) {} ?", op.as_sql()));
                    params.push(json_to_value(&filter.value)?);
                }
            }
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut matches = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let data: String = row.get(1)?;
            matches.push((id, parse_object(&data)?));
        }
        Ok(matches)
    }
}

fn parse_object(text: &str) -> StoreResult<JsonObject> {
    match serde_json::from_str::<serde_json::Value>(text)? {
        serde_json::Value::Object(object) => Ok(object),
        other => Err(StoreError::InvalidData(format!(
            "expected a JSON object, found `{other}`"
        ))),
    }
}

// Mirrors what json_extract returns: scalars as SQL values, containers as JSON text.
fn json_to_value(value: &serde_json::Value) -> StoreResult<Value> {
    Ok(match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(flag) => Value::Integer(i64::from(*flag)),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(integer) => Value::Integer(integer),
            None => Value::Real(number.as_f64().ok_or_else(|| {
                StoreError::InvalidArgument(format!("unsupported JSON number {number}"))
            })?),
        },
        serde_json::Value::String(text) => Value::Text(text.clone()),
        container => Value::Text(serde_json::to_string(container)?),
    })
}

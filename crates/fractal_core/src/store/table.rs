//! Rowid table handle over a plain schema.
//!
//! # Invariants
//! - Inserts must supply every declared field, no more and no less.
//! - Rows are addressed by SQLite `rowid`.

use crate::model::value::{Record, Value};
use crate::schema::{Field, Schema};
use crate::store::rows::{
    check_record, check_value, count_rows, insert_sql, query_records, require_field,
    widen_record,
};
use crate::store::{StoreError, StoreResult};
use log::debug;
use rusqlite::{params_from_iter, Connection};

pub struct Table<'conn> {
    name: String,
    schema: Schema,
    conn: &'conn Connection,
}

impl<'conn> Table<'conn> {
    pub(crate) fn new(name: impl Into<String>, schema: Schema, conn: &'conn Connection) -> Self {
        Self {
            name: name.into(),
            schema,
            conn,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Inserts one complete row and returns its rowid.
    ///
    /// # Errors
    /// - `FieldCountMismatch` when the record size differs from the schema.
    /// - `UnknownField`, `MissingField`, `NullValue`, `TypeMismatch`.
    pub fn insert(&self, mut record: Record) -> StoreResult<i64> {
        if record.len() != self.schema.len() {
            return Err(StoreError::FieldCountMismatch {
                expected: self.schema.len(),
                found: record.len(),
            });
        }
        if let Some(missing) = self
            .schema
            .names()
            .find(|name| !record.contains_key(*name))
        {
            return Err(StoreError::MissingField(missing.to_string()));
        }
        check_record(&self.schema, &record)?;
        widen_record(&self.schema, &mut record);

        self.conn.execute(
            &insert_sql(&self.name, &record),
            params_from_iter(record.values()),
        )?;
        let rowid = self.conn.last_insert_rowid();
        debug!(
            "event=table_insert module=store table={} rowid={rowid}",
            self.name
        );
        Ok(rowid)
    }

    pub fn fetch(&self, rowid: i64) -> StoreResult<Option<Record>> {
        let sql = format!("SELECT * FROM {} WHERE rowid = ?", self.name);
        Ok(self.records(&sql, &[Value::Integer(rowid)])?.pop())
    }

    /// First row whose `field` equals `value`, in rowid order.
    pub fn fetch_by(&self, field: &str, value: impl Into<Value>) -> StoreResult<Option<Record>> {
        let value = value.into();
        check_value(require_field(&self.schema, field)?, &value)?;
        let sql = format!(
            "SELECT * FROM {} WHERE {field} = ? ORDER BY rowid LIMIT 1",
            self.name
        );
        Ok(self.records(&sql, &[value])?.pop())
    }

    pub fn all(&self) -> StoreResult<Vec<Record>> {
        self.records(&format!("SELECT * FROM {}", self.name), &[])
    }

    pub fn count(&self) -> StoreResult<u64> {
        count_rows(self.conn, &self.name)
    }

    pub fn delete(&self, rowid: i64) -> StoreResult<bool> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE rowid = ?1", self.name),
            [rowid],
        )?;
        Ok(changed > 0)
    }

    fn records(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<Record>> {
        query_records(self.conn, sql, params, |name| {
            self.schema.field(name).map(Field::sql_type)
        })
    }
}

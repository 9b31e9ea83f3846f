//! Keyed collection handle.
//!
//! # Responsibility
//! - CRUD by generated `key` over one table with implicit key/timestamp.
//! - Aggregates, ordering, distinct values, union and join helpers.
//!
//! # Invariants
//! - `key` values are generated here and never updated.
//! - Batch inserts are atomic: all records or none.

use crate::model::types::SqlType;
use crate::model::value::{Record, Value};
use crate::query::{Condition, Order, Select};
use crate::schema::{Field, Schema, SchemaError, KEY_FIELD, TIMESTAMP_FIELD};
use crate::store::rows::{
    check_record, check_value, count_rows, insert_sql, query_column, query_records,
    query_scalar, require_field, widen_record,
};
use crate::store::{StoreError, StoreResult};
use chrono::Local;
use log::debug;
use rusqlite::{params_from_iter, Connection};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A named table bound to a collection schema and a borrowed connection.
pub struct Collection<'conn> {
    name: String,
    schema: Schema,
    conn: &'conn Connection,
}

impl<'conn> Collection<'conn> {
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

    /// Inserts records, assigning each a fresh key and a shared timestamp.
    ///
    /// Returns the stored records keyed by their generated key.
    ///
    /// # Errors
    /// - `UnknownField`, `TypeMismatch`, `NullValue` or `MissingField` when
    ///   any record violates the schema; nothing is written in that case.
    pub fn insert(
        &self,
        records: impl IntoIterator<Item = Record>,
    ) -> StoreResult<BTreeMap<String, Record>> {
        let now = Local::now().naive_local();
        let mut stored = BTreeMap::new();
        for mut record in records {
            let key = Uuid::new_v4().simple().to_string();
            record.insert(KEY_FIELD.to_string(), Value::Text(key.clone()));
            record.insert(TIMESTAMP_FIELD.to_string(), Value::DateTime(now));
            check_record(&self.schema, &record)?;
            widen_record(&self.schema, &mut record);
            stored.insert(key, record);
        }
        if stored.is_empty() {
            return Ok(stored);
        }

        let tx = self.conn.unchecked_transaction()?;
        for record in stored.values() {
            tx.execute(
                &insert_sql(&self.name, record),
                params_from_iter(record.values()),
            )?;
        }
        tx.commit()?;

        debug!(
            "event=collection_insert module=store collection={} rows={}",
            self.name,
            stored.len()
        );
        Ok(stored)
    }

    /// Inserts one record and returns its generated key.
    pub fn insert_one(&self, record: Record) -> StoreResult<String> {
        let stored = self.insert([record])?;
        stored
            .into_keys()
            .next()
            .ok_or_else(|| StoreError::InvalidData("insert returned no key".to_string()))
    }

    pub fn fetch(&self, key: &str) -> StoreResult<Option<Record>> {
        let sql = format!("SELECT * FROM {} WHERE {KEY_FIELD} = ?", self.name);
        let mut records = self.records(&sql, &[Value::from(key)])?;
        Ok(records.pop())
    }

    pub fn all(&self) -> StoreResult<Vec<Record>> {
        self.records(&format!("SELECT * FROM {}", self.name), &[])
    }

    pub fn count(&self) -> StoreResult<u64> {
        count_rows(self.conn, &self.name)
    }

    /// Applies `changes` to the record with `key`.
    ///
    /// Returns `false` when no record has that key.
    pub fn update(&self, key: &str, mut changes: Record) -> StoreResult<bool> {
        if changes.is_empty() {
            return Err(StoreError::InvalidArgument(
                "update requires at least one field".to_string(),
            ));
        }
        if changes.contains_key(KEY_FIELD) {
            return Err(SchemaError::ReservedField(KEY_FIELD.to_string()).into());
        }
        for (name, value) in &changes {
            check_value(require_field(&self.schema, name)?, value)?;
        }
        widen_record(&self.schema, &mut changes);

        let assignments = changes
            .keys()
            .map(|name| format!("{name} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut params = changes.into_values().collect::<Vec<_>>();
        params.push(Value::from(key));
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {assignments} WHERE {KEY_FIELD} = ?",
                self.name
            ),
            params_from_iter(params.iter()),
        )?;
        Ok(changed > 0)
    }

    /// Deletes the record with `key`; returns whether one existed.
    pub fn delete(&self, key: &str) -> StoreResult<bool> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE {KEY_FIELD} = ?1", self.name),
            [key],
        )?;
        Ok(changed > 0)
    }

    /// Removes every record and returns how many were removed.
    pub fn clear(&self) -> StoreResult<usize> {
        let removed = self
            .conn
            .execute(&format!("DELETE FROM {}", self.name), [])?;
        debug!(
            "event=collection_clear module=store collection={} rows={removed}",
            self.name
        );
        Ok(removed)
    }

    /// Drops the underlying table when `confirm` is set.
    pub fn drop_collection(&self, confirm: bool) -> StoreResult<bool> {
        if !confirm {
            return Ok(false);
        }
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {};", self.name))?;
        debug!(
            "event=collection_drop module=store collection={}",
            self.name
        );
        Ok(true)
    }

    /// Adds a column to the table and the bound schema.
    pub fn add_field(&mut self, field: Field) -> StoreResult<()> {
        let mut schema = self.schema.clone();
        let definition = field.added_column_definition();
        schema.append(field)?;
        self.conn.execute_batch(&format!(
            "ALTER TABLE {} ADD COLUMN {definition};",
            self.name
        ))?;
        self.schema = schema;
        Ok(())
    }

    /// Drops a column from the table and the bound schema.
    ///
    /// # Errors
    /// - `FieldNotFound` when the schema or the engine does not know `field`.
    /// - `Schema(ReservedField)` for `key`/`timestamp`.
    pub fn remove_field(&mut self, field: &str) -> StoreResult<()> {
        let mut schema = self.schema.clone();
        schema.remove(field).map_err(|err| match err {
            SchemaError::FieldNotFound(_) => self.field_not_found(field),
            other => other.into(),
        })?;

        let dropped = self.conn.execute_batch(&format!(
            "ALTER TABLE {} DROP COLUMN {field};",
            self.name
        ));
        match dropped {
            Ok(()) => {
                self.schema = schema;
                Ok(())
            }
            Err(err) if is_missing_column(&err) => Err(self.field_not_found(field)),
            Err(err) => Err(err.into()),
        }
    }

    pub fn distinct(&self, field: &str) -> StoreResult<Vec<Value>> {
        let kind = require_field(&self.schema, field)?.sql_type();
        query_column(
            self.conn,
            &format!("SELECT DISTINCT {field} FROM {}", self.name),
            &[],
            Some(kind),
        )
    }

    /// All records ordered by `fields`, all in the same direction.
    pub fn order_by(&self, fields: &[&str], order: Order) -> StoreResult<Vec<Record>> {
        if fields.is_empty() {
            return Err(StoreError::InvalidArgument(
                "at least one field must be specified".to_string(),
            ));
        }
        let mut select = self.query();
        for field in fields {
            select = select.order_by(*field, order);
        }
        select.fetch()
    }

    pub fn avg(&self, field: &str) -> StoreResult<Value> {
        self.numeric_aggregate("AVG", field)
    }

    pub fn sum(&self, field: &str) -> StoreResult<Value> {
        self.numeric_aggregate("SUM", field)
    }

    pub fn min(&self, field: &str) -> StoreResult<Value> {
        self.aggregate("MIN", field)
    }

    pub fn max(&self, field: &str) -> StoreResult<Value> {
        self.aggregate("MAX", field)
    }

    /// Rows of both collections with duplicates removed.
    ///
    /// Both schemas must declare the same number of columns.
    pub fn union(&self, other: &Collection<'_>) -> StoreResult<Vec<Record>> {
        if self.schema.len() != other.schema.len() {
            return Err(StoreError::FieldCountMismatch {
                expected: self.schema.len(),
                found: other.schema.len(),
            });
        }
        self.records(
            &format!("SELECT * FROM {} UNION SELECT * FROM {}", self.name, other.name),
            &[],
        )
    }

    /// Inner join on `self.field = other.on`.
    ///
    /// Columns of `other` whose names clash with this collection are
    /// returned as `<other>.<column>`.
    pub fn join(&self, field: &str, other: &Collection<'_>, on: &str) -> StoreResult<Vec<Record>> {
        require_field(&self.schema, field)?;
        require_field(&other.schema, on)?;

        let mut types = BTreeMap::new();
        let mut columns = Vec::new();
        for own in self.schema.fields() {
            columns.push(format!("{}.{} AS {}", self.name, own.name(), own.name()));
            types.insert(own.name().to_string(), own.sql_type());
        }
        for theirs in other.schema.fields() {
            let alias = if self.schema.contains(theirs.name()) {
                format!("{}.{}", other.name, theirs.name())
            } else {
                theirs.name().to_string()
            };
            columns.push(format!("{}.{} AS \"{alias}\"", other.name, theirs.name()));
            types.insert(alias, theirs.sql_type());
        }

        let sql = format!(
            "SELECT {} FROM {} JOIN {} ON {}.{field} = {}.{on}",
            columns.join(", "),
            self.name,
            other.name,
            self.name,
            other.name
        );
        query_records(self.conn, &sql, &[], |name| types.get(name).copied())
    }

    /// Starts a SELECT over every column.
    pub fn query(&self) -> Select<'_, 'conn> {
        Select::new(self)
    }

    /// Starts a SELECT over the given columns only.
    pub fn select<I, S>(&self, picks: I) -> Select<'_, 'conn>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Select::new(self).pick(picks)
    }

    /// All records matching `condition`.
    pub fn filter(&self, condition: &Condition) -> StoreResult<Vec<Record>> {
        self.query().filter(condition)
    }

    pub(crate) fn records(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<Record>> {
        query_records(self.conn, sql, params, |name| {
            self.schema.field(name).map(Field::sql_type)
        })
    }

    fn aggregate(&self, function: &str, field: &str) -> StoreResult<Value> {
        let kind = require_field(&self.schema, field)?.sql_type();
        query_scalar(
            self.conn,
            &format!("SELECT {function}({field}) FROM {}", self.name),
            Some(kind),
        )
    }

    fn numeric_aggregate(&self, function: &str, field: &str) -> StoreResult<Value> {
        let kind = require_field(&self.schema, field)?.sql_type();
        if !kind.is_numeric() {
            return Err(StoreError::InvalidArgument(format!(
                "{function} requires a numeric field; `{field}` is {kind}"
            )));
        }
        let declared = if function == "AVG" {
            Some(SqlType::Real)
        } else {
            Some(kind)
        };
        query_scalar(
            self.conn,
            &format!("SELECT {function}({field}) FROM {}", self.name),
            declared,
        )
    }

    fn field_not_found(&self, field: &str) -> StoreError {
        StoreError::FieldNotFound {
            collection: self.name.clone(),
            field: field.to_string(),
        }
    }
}

fn is_missing_column(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            message.to_lowercase().contains("no such column")
        }
        _ => false,
    }
}

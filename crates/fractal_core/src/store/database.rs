//! Database handle owning the single SQLite connection.
//!
//! # Responsibility
//! - Create and reopen collections, tables and JSON pages.
//! - Introspect existing tables into schemas via `pragma_table_info`.
//!
//! # Invariants
//! - Every name is validated before it reaches SQL text.
//! - Reopened schemas are re-derived from the engine on each call, never cached.

use crate::config::DbConfig;
use crate::db::{open_db, open_db_in_memory, open_with_config, DbError};
use crate::model::types::SqlType;
use crate::model::value::Value;
use crate::schema::{validate_identifier, Field, Schema};
use crate::store::kv::Page;
use crate::store::{Collection, StoreError, StoreResult, Table};
use log::{debug, info};
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::path::Path;

/// One live SQLite session.
pub struct Database {
    conn: Connection,
}

struct ColumnInfo {
    name: String,
    declared_type: String,
    not_null: bool,
    default: Option<String>,
    primary_key: bool,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    pub fn open_with(config: &DbConfig) -> StoreResult<Self> {
        Ok(Self::from_connection(open_with_config(config)?))
    }

    /// Wraps an already configured connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the connection, reporting any engine error on close.
    pub fn close(self) -> StoreResult<()> {
        self.conn
            .close()
            .map_err(|(_, err)| StoreError::Db(DbError::Sqlite(err)))
    }

    /// Creates a collection table if missing and adds any schema fields the
    /// existing table lacks.
    ///
    /// # Errors
    /// - `InvalidArgument` when `schema` has no implicit key/timestamp.
    pub fn create_collection(&self, name: &str, schema: Schema) -> StoreResult<Collection<'_>> {
        if !schema.has_implicit_fields() {
            return Err(StoreError::InvalidArgument(format!(
                "collection `{name}` needs a schema built with Schema::with_implicit_fields"
            )));
        }
        self.ensure_table(name, &schema)?;
        Ok(Collection::new(name, schema, &self.conn))
    }

    /// Reopens an existing collection from its stored columns.
    pub fn collection(&self, name: &str) -> StoreResult<Collection<'_>> {
        let schema = self.introspect(name)?;
        if !schema.has_implicit_fields() {
            return Err(StoreError::InvalidArgument(format!(
                "table `{name}` has no key/timestamp fields; open it with Database::table"
            )));
        }
        Ok(Collection::new(name, schema, &self.conn))
    }

    /// Creates a rowid table if missing and adds missing columns.
    pub fn create_table(&self, name: &str, schema: Schema) -> StoreResult<Table<'_>> {
        if schema.is_empty() {
            return Err(StoreError::InvalidArgument(format!(
                "table `{name}` needs at least one field"
            )));
        }
        self.ensure_table(name, &schema)?;
        Ok(Table::new(name, schema, &self.conn))
    }

    /// Reopens any existing table from its stored columns.
    pub fn table(&self, name: &str) -> StoreResult<Table<'_>> {
        let schema = self.introspect(name)?;
        Ok(Table::new(name, schema, &self.conn))
    }

    /// Opens (creating if needed) a schema-less JSON page.
    pub fn kv_page(&self, name: &str) -> StoreResult<Page<'_>> {
        validate_identifier(name)?;
        self.conn.execute_batch(&Page::create_sql(name))?;
        Ok(Page::new(name, &self.conn))
    }

    /// User table names in alphabetical order.
    pub fn collection_names(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    pub fn has_collection(&self, name: &str) -> StoreResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
            )",
            [name],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    /// Drops a table by name; returns `false` when it did not exist.
    pub fn drop_collection(&self, name: &str) -> StoreResult<bool> {
        validate_identifier(name)?;
        if !self.has_collection(name)? {
            return Ok(false);
        }
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {name};"))?;
        info!("event=collection_drop module=store status=ok collection={name}");
        Ok(true)
    }

    fn ensure_table(&self, name: &str, schema: &Schema) -> StoreResult<()> {
        self.conn.execute_batch(&schema.create_table_sql(name)?)?;

        let existing = self
            .table_info(name)?
            .into_iter()
            .map(|column| column.name)
            .collect::<BTreeSet<_>>();
        let mut added = 0_usize;
        for field in schema.fields() {
            if existing.contains(field.name()) {
                continue;
            }
            self.conn.execute_batch(&format!(
                "ALTER TABLE {name} ADD COLUMN {};",
                field.added_column_definition()
            ))?;
            added += 1;
        }

        info!(
            "event=table_ensure module=store status=ok table={name} fields={} added_columns={added}",
            schema.len()
        );
        Ok(())
    }

    fn introspect(&self, name: &str) -> StoreResult<Schema> {
        validate_identifier(name)?;
        if !self.has_collection(name)? {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        }

        let mut fields = Vec::new();
        for column in self.table_info(name)? {
            let mut field = Field::new(
                column.name.as_str(),
                SqlType::from_sql_type(&column.declared_type)?,
            );
            if column.primary_key {
                field = field.primary_key();
            }
            if column.not_null {
                field = field.not_null();
            }
            if let Some(value) = column.default.as_deref().and_then(parse_default_literal) {
                field = field.default(value);
            }
            fields.push(field);
        }
        debug!(
            "event=table_introspect module=store table={name} fields={}",
            fields.len()
        );
        Ok(Schema::from_columns(fields)?)
    }

    fn table_info(&self, name: &str) -> StoreResult<Vec<ColumnInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, type, \"notnull\", dflt_value, pk
             FROM pragma_table_info(?1)
             ORDER BY cid",
        )?;
        let columns = stmt
            .query_map([name], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    declared_type: row.get(1)?,
                    not_null: row.get::<_, i64>(2)? != 0,
                    default: row.get(3)?,
                    primary_key: row.get::<_, i64>(4)? != 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }
}

/// Recovers a literal `DEFAULT` value; expressions such as
/// `CURRENT_TIMESTAMP` are not representable and yield `None`.
fn parse_default_literal(raw: &str) -> Option<Value> {
    let text = raw.trim();
    if text.eq_ignore_ascii_case("NULL") {
        return Some(Value::Null);
    }
    if let Ok(integer) = text.parse::<i64>() {
        return Some(Value::Integer(integer));
    }
    if let Ok(real) = text.parse::<f64>() {
        return Some(Value::Real(real));
    }
    let quoted = text.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(Value::Text(quoted.replace("''", "'")))
}

//! Ordered schema bound to one collection or table.

use crate::model::types::SqlType;
use crate::model::value::Record;
use crate::schema::field::Field;
use crate::schema::{validate_identifier, SchemaError, SchemaResult};

/// Generated unique key injected into every collection schema.
pub const KEY_FIELD: &str = "key";
/// Creation timestamp injected into every collection schema.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Ordered set of uniquely named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
    implicit: bool,
}

impl Schema {
    /// Builds a plain schema holding exactly `fields`.
    ///
    /// # Errors
    /// - `InvalidIdentifier` for unsafe field or reference names.
    /// - `DuplicateField` when two fields share a name.
    pub fn new(fields: impl IntoIterator<Item = Field>) -> SchemaResult<Self> {
        let mut schema = Self {
            fields: Vec::new(),
            implicit: false,
        };
        for field in fields {
            schema.append(field)?;
        }
        Ok(schema)
    }

    /// Builds a collection schema: `key` and `timestamp` first, then `fields`.
    ///
    /// # Errors
    /// - Same as [`Schema::new`]; a user field named `key` or `timestamp`
    ///   is a `DuplicateField`.
    pub fn with_implicit_fields(fields: impl IntoIterator<Item = Field>) -> SchemaResult<Self> {
        let mut schema = Self {
            fields: implicit_fields(),
            implicit: true,
        };
        for field in fields {
            schema.append(field)?;
        }
        Ok(schema)
    }

    /// Infers a collection schema from one sample record.
    ///
    /// # Errors
    /// - `UnsupportedSample` when a sample value is `Null`.
    pub fn from_sample(sample: &Record) -> SchemaResult<Self> {
        let fields = sample
            .iter()
            .filter(|(name, _)| !is_implicit_name(name))
            .map(|(name, value)| {
                value
                    .sql_type()
                    .map(|kind| Field::new(name.as_str(), kind))
                    .ok_or_else(|| SchemaError::UnsupportedSample {
                        field: name.clone(),
                    })
            })
            .collect::<SchemaResult<Vec<_>>>()?;
        Self::with_implicit_fields(fields)
    }

    /// Rebuilds a schema from introspected columns, keeping them as-is.
    pub(crate) fn from_columns(fields: Vec<Field>) -> SchemaResult<Self> {
        let implicit = fields.iter().any(|field| field.name() == KEY_FIELD)
            && fields.iter().any(|field| field.name() == TIMESTAMP_FIELD);
        let mut schema = Self::new(fields)?;
        schema.implicit = implicit;
        Ok(schema)
    }

    /// Whether this schema carries the implicit `key`/`timestamp` fields.
    pub fn has_implicit_fields(&self) -> bool {
        self.implicit
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::name)
    }

    /// Adds one field at the end of the schema.
    pub fn append(&mut self, field: Field) -> SchemaResult<()> {
        field.validate()?;
        if self.contains(field.name()) {
            return Err(SchemaError::DuplicateField(field.name().to_string()));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Removes one field and returns it.
    ///
    /// # Errors
    /// - `ReservedField` for the implicit fields of a collection schema.
    /// - `FieldNotFound` for unknown names.
    pub fn remove(&mut self, name: &str) -> SchemaResult<Field> {
        if self.implicit && is_implicit_name(name) {
            return Err(SchemaError::ReservedField(name.to_string()));
        }
        let index = self
            .fields
            .iter()
            .position(|field| field.name() == name)
            .ok_or_else(|| SchemaError::FieldNotFound(name.to_string()))?;
        Ok(self.fields.remove(index))
    }

    /// Returns the declared type of `name`.
    pub fn resolve_field_type(&self, name: &str) -> SchemaResult<SqlType> {
        self.field(name)
            .map(Field::sql_type)
            .ok_or_else(|| SchemaError::FieldNotFound(name.to_string()))
    }

    pub fn column_definitions(&self) -> String {
        self.fields
            .iter()
            .map(Field::column_definition)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this schema.
    pub fn create_table_sql(&self, name: &str) -> SchemaResult<String> {
        validate_identifier(name)?;
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {name} ({})",
            self.column_definitions()
        ))
    }
}

pub(crate) fn is_implicit_name(name: &str) -> bool {
    name == KEY_FIELD || name == TIMESTAMP_FIELD
}

fn implicit_fields() -> Vec<Field> {
    vec![
        Field::new(KEY_FIELD, SqlType::Text).primary_key(),
        Field::new(TIMESTAMP_FIELD, SqlType::DateTime).not_null(),
    ]
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            fields: implicit_fields(),
            implicit: true,
        }
    }
}

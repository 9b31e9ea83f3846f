//! Field declaration and column DDL rendering.

use crate::model::types::SqlType;
use crate::model::value::Value;
use crate::schema::{validate_identifier, SchemaError, SchemaResult};

/// One DDL column constraint, rendered in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    PrimaryKey,
    Unique,
    NotNull,
    Default(Value),
    /// Caller-authored SQL boolean expression, emitted verbatim.
    Check(String),
    /// Foreign key with `ON DELETE CASCADE`.
    References {
        collection: String,
        field: String,
    },
}

impl Constraint {
    pub fn to_sql(&self) -> String {
        match self {
            Self::PrimaryKey => "PRIMARY KEY".to_string(),
            Self::Unique => "UNIQUE".to_string(),
            Self::NotNull => "NOT NULL".to_string(),
            Self::Default(value) => format!("DEFAULT {}", value.to_sql_literal()),
            Self::Check(expr) => format!("CHECK ({expr})"),
            Self::References { collection, field } => {
                format!("REFERENCES {collection}({field}) ON DELETE CASCADE")
            }
        }
    }
}

/// Declared column of a collection or table.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    sql_type: SqlType,
    constraints: Vec<Constraint>,
}

impl Field {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            constraints: Vec::new(),
        }
    }

    pub fn primary_key(self) -> Self {
        self.with(Constraint::PrimaryKey)
    }

    pub fn unique(self) -> Self {
        self.with(Constraint::Unique)
    }

    pub fn not_null(self) -> Self {
        self.with(Constraint::NotNull)
    }

    pub fn default(self, value: impl Into<Value>) -> Self {
        self.with(Constraint::Default(value.into()))
    }

    pub fn check(self, expr: impl Into<String>) -> Self {
        self.with(Constraint::Check(expr.into()))
    }

    pub fn references(self, collection: impl Into<String>, field: impl Into<String>) -> Self {
        self.with(Constraint::References {
            collection: collection.into(),
            field: field.into(),
        })
    }

    /// Appends a constraint unless an identical one is already declared.
    pub fn with(mut self, constraint: Constraint) -> Self {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_primary_key(&self) -> bool {
        self.constraints.contains(&Constraint::PrimaryKey)
    }

    pub fn is_nullable(&self) -> bool {
        !self.is_primary_key() && !self.constraints.contains(&Constraint::NotNull)
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.constraints.iter().find_map(|constraint| match constraint {
            Constraint::Default(value) => Some(value),
            _ => None,
        })
    }

    /// Whether an insert must supply a non-null value for this field.
    pub fn is_required(&self) -> bool {
        !self.is_nullable() && self.default_value().is_none()
    }

    /// Full column definition for `CREATE TABLE`.
    pub fn column_definition(&self) -> String {
        let mut definition = format!("{} {}", self.name, self.sql_type.as_sql_type());
        for constraint in &self.constraints {
            definition.push(' ');
            definition.push_str(&constraint.to_sql());
        }
        definition
    }

    /// Column definition accepted by `ALTER TABLE .. ADD COLUMN`.
    ///
    /// SQLite refuses PRIMARY KEY and UNIQUE on added columns, and NOT NULL
    /// without a default, so those are left out.
    pub fn added_column_definition(&self) -> String {
        let has_default = self.default_value().is_some_and(|value| !value.is_null());
        let mut definition = format!("{} {}", self.name, self.sql_type.as_sql_type());
        for constraint in &self.constraints {
            let keep = match constraint {
                Constraint::PrimaryKey | Constraint::Unique => false,
                Constraint::NotNull => has_default,
                Constraint::Default(_) | Constraint::Check(_) => true,
                Constraint::References { .. } => !has_default,
            };
            if keep {
                definition.push(' ');
                definition.push_str(&constraint.to_sql());
            }
        }
        definition
    }

    pub(crate) fn validate(&self) -> SchemaResult<()> {
        validate_identifier(&self.name)?;
        for constraint in &self.constraints {
            match constraint {
                Constraint::References { collection, field } => {
                    validate_identifier(collection)?;
                    validate_identifier(field)?;
                }
                Constraint::Default(Value::Real(value)) if !value.is_finite() => {
                    return Err(SchemaError::InvalidDefault {
                        field: self.name.clone(),
                        reason: format!("`{value}` has no SQL literal"),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

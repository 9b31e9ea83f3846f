//! Typed schema, collection and condition-builder layer over SQLite.
//!
//! Every durable operation is delegated to the embedded engine; this crate
//! only declares schemas, validates records against them and assembles
//! parameterized SQL.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod schema;
pub mod store;

pub use config::{DbConfig, DbLocation, LogConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::types::SqlType;
pub use model::value::{Record, Value};
pub use query::{condition, Column, Condition, Order, Select};
pub use schema::{Constraint, Field, Schema, SchemaError, SchemaResult};
pub use store::{
    Collection, Database, JsonFilter, JsonObject, JsonOp, Page, StoreError, StoreResult, Table,
};

/// Builds a [`Record`] from `name => value` pairs.
///
/// ```
/// let record = fractal_core::record! { "name" => "Ada", "age" => 36 };
/// assert_eq!(record.len(), 2);
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(record.insert(::std::string::String::from($name), $crate::Value::from($value));)+
        record
    }};
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

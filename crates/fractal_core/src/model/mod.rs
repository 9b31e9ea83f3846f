//! Value model shared by schema declaration, query building and row decoding.
//!
//! # Responsibility
//! - Define the closed set of logical column types and their SQL spelling.
//! - Define the dynamic cell value exchanged with SQLite.
//!
//! # Invariants
//! - Every `SqlType` has exactly one SQL storage-class string.
//! - A `Value` binds to SQLite without losing its logical type on read-back
//!   when the declared column type is known.

pub mod types;
pub mod value;

//! Condition builder and SELECT assembly.
//!
//! # Responsibility
//! - Build parameterized predicate fragments from field comparisons.
//! - Compose predicates with AND/OR/NOT into a tree.
//! - Collapse that tree into one WHERE clause plus an ordered parameter list.
//!
//! # Invariants
//! - Caller values never appear in SQL text; they travel as `?` bindings.
//! - Parameter order always matches placeholder order in the rendered clause.
//! - Every composed node is parenthesized, so composition never depends on
//!   SQL operator precedence.

mod condition;
mod select;

pub use condition::{condition, Column, Condition};
pub use select::{Order, Select};

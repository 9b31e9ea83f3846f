//! Predicate leaves and their AND/OR/NOT composition.

use crate::model::value::Value;
use std::collections::BTreeSet;
use std::ops::{BitAnd, BitOr, Not};

/// Entry point for building conditions on one field.
///
/// ```
/// use fractal_core::query::condition;
///
/// let adult = condition("age").ge(18) & condition("name").starts_with("A");
/// let (clause, params) = adult.to_sql();
/// assert_eq!(clause, "(age >= ? AND name LIKE ?)");
/// assert_eq!(params.len(), 2);
/// ```
pub fn condition(field: impl Into<String>) -> Column {
    Column::new(field)
}

/// A field reference that produces leaf conditions.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `field = ?`, or `field IS NULL` when `value` is null.
    pub fn eq(&self, value: impl Into<Value>) -> Condition {
        match value.into() {
            Value::Null => self.is_null(),
            value => self.compare("=", value),
        }
    }

    /// `field != ?`, or `field IS NOT NULL` when `value` is null.
    pub fn ne(&self, value: impl Into<Value>) -> Condition {
        match value.into() {
            Value::Null => self.not_null(),
            value => self.compare("!=", value),
        }
    }

    pub fn lt(&self, value: impl Into<Value>) -> Condition {
        self.compare("<", value.into())
    }

    pub fn le(&self, value: impl Into<Value>) -> Condition {
        self.compare("<=", value.into())
    }

    pub fn gt(&self, value: impl Into<Value>) -> Condition {
        self.compare(">", value.into())
    }

    pub fn ge(&self, value: impl Into<Value>) -> Condition {
        self.compare(">=", value.into())
    }

    /// Raw `LIKE` with a caller-supplied pattern.
    pub fn like(&self, pattern: impl Into<String>) -> Condition {
        self.compare("LIKE", Value::Text(pattern.into()))
    }

    /// `LIKE 'prefix%'`. Wildcards inside `prefix` are not escaped.
    pub fn starts_with(&self, prefix: &str) -> Condition {
        self.like(format!("{prefix}%"))
    }

    /// `LIKE '%suffix'`. Wildcards inside `suffix` are not escaped.
    pub fn ends_with(&self, suffix: &str) -> Condition {
        self.like(format!("%{suffix}"))
    }

    /// `LIKE '%infix%'`. Wildcards inside `infix` are not escaped.
    pub fn contains(&self, infix: &str) -> Condition {
        self.like(format!("%{infix}%"))
    }

    /// `field IN (?, ...)`; an empty list matches nothing.
    pub fn any_of<I, V>(&self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.membership("IN", "0", values)
    }

    /// `field NOT IN (?, ...)`; an empty list matches everything.
    pub fn none_of<I, V>(&self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.membership("NOT IN", "1", values)
    }

    pub fn between(&self, start: impl Into<Value>, end: impl Into<Value>) -> Condition {
        self.leaf(
            format!("{} BETWEEN ? AND ?", self.name),
            vec![start.into(), end.into()],
        )
    }

    pub fn is_null(&self) -> Condition {
        self.leaf(format!("{} IS NULL", self.name), Vec::new())
    }

    pub fn not_null(&self) -> Condition {
        self.leaf(format!("{} IS NOT NULL", self.name), Vec::new())
    }

    fn compare(&self, operator: &str, value: Value) -> Condition {
        self.leaf(format!("{} {operator} ?", self.name), vec![value])
    }

    fn membership<I, V>(&self, operator: &str, when_empty: &str, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let params = values.into_iter().map(Into::into).collect::<Vec<Value>>();
        if params.is_empty() {
            return self.leaf(when_empty.to_string(), params);
        }
        let placeholders = vec!["?"; params.len()].join(", ");
        self.leaf(format!("{} {operator} ({placeholders})", self.name), params)
    }

    fn leaf(&self, clause: String, params: Vec<Value>) -> Condition {
        Condition::Leaf {
            field: self.name.clone(),
            clause,
            params,
        }
    }
}

/// Composable predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Leaf {
        field: String,
        clause: String,
        params: Vec<Value>,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn and(self, other: Condition) -> Condition {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Condition {
        Condition::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Condition {
        Condition::Not(Box::new(self))
    }

    /// Collapses the tree into one clause and its bindings.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut clause = String::new();
        let mut params = Vec::new();
        self.render(&mut clause, &mut params);
        (clause, params)
    }

    /// Distinct field names referenced anywhere in the tree.
    pub fn fields(&self) -> BTreeSet<&str> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn render(&self, clause: &mut String, params: &mut Vec<Value>) {
        match self {
            Self::Leaf {
                clause: fragment,
                params: values,
                ..
            } => {
                clause.push_str(fragment);
                params.extend(values.iter().cloned());
            }
            Self::And(left, right) => Self::render_binary(left, "AND", right, clause, params),
            Self::Or(left, right) => Self::render_binary(left, "OR", right, clause, params),
            Self::Not(inner) => {
                clause.push_str("NOT (");
                inner.render(clause, params);
                clause.push(')');
            }
        }
    }

    fn render_binary(
        left: &Condition,
        operator: &str,
        right: &Condition,
        clause: &mut String,
        params: &mut Vec<Value>,
    ) {
        clause.push('(');
        left.render(clause, params);
        clause.push(' ');
        clause.push_str(operator);
        clause.push(' ');
        right.render(clause, params);
        clause.push(')');
    }

    fn collect_fields<'a>(&'a self, fields: &mut BTreeSet<&'a str>) {
        match self {
            Self::Leaf { field, .. } => {
                fields.insert(field.as_str());
            }
            Self::And(left, right) | Self::Or(left, right) => {
                left.collect_fields(fields);
                right.collect_fields(fields);
            }
            Self::Not(inner) => inner.collect_fields(fields),
        }
    }
}

impl BitAnd for Condition {
    type Output = Condition;

    fn bitand(self, rhs: Condition) -> Condition {
        self.and(rhs)
    }
}

impl BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Condition) -> Condition {
        self.or(rhs)
    }
}

impl Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        self.negate()
    }
}

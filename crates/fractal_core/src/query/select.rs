//! SELECT statement assembly over one collection.

use crate::model::value::{Record, Value};
use crate::query::condition::Condition;
use crate::store::{Collection, StoreError, StoreResult};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Pending SELECT over a collection; nothing runs until `fetch`/`filter`.
pub struct Select<'a, 'conn> {
    source: &'a Collection<'conn>,
    picks: Vec<String>,
    distinct: bool,
    order: Vec<(String, Order)>,
    limit: Option<u32>,
    offset: u32,
}

impl<'a, 'conn> Select<'a, 'conn> {
    pub fn new(source: &'a Collection<'conn>) -> Self {
        Self {
            source,
            picks: Vec::new(),
            distinct: false,
            order: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Restricts the result to these columns; no picks means `*`.
    pub fn pick<I, S>(mut self, picks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.picks.extend(picks.into_iter().map(Into::into));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: Order) -> Self {
        self.order.push((field.into(), order));
        self
    }

    /// Caps the number of rows; `0` means no cap.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Renders the statement and its bindings without running it.
    pub fn to_sql(&self, condition: Option<&Condition>) -> (String, Vec<Value>) {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.picks.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.picks.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(self.source.name());

        let mut params = Vec::new();
        if let Some(condition) = condition {
            let (clause, values) = condition.to_sql();
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
            params = values;
        }

        if !self.order.is_empty() {
            let terms = self
                .order
                .iter()
                .map(|(field, order)| format!("{field} {}", order.as_sql()))
                .collect::<Vec<_>>();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        match self.limit {
            Some(limit) => {
                sql.push_str(" LIMIT ?");
                params.push(Value::Integer(i64::from(limit)));
                if self.offset > 0 {
                    sql.push_str(" OFFSET ?");
                    params.push(Value::Integer(i64::from(self.offset)));
                }
            }
            None if self.offset > 0 => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                params.push(Value::Integer(i64::from(self.offset)));
            }
            None => {}
        }

        (sql, params)
    }

    /// Runs the statement without a WHERE clause.
    pub fn fetch(&self) -> StoreResult<Vec<Record>> {
        self.run(None)
    }

    /// Runs the statement filtered by `condition`.
    pub fn filter(&self, condition: &Condition) -> StoreResult<Vec<Record>> {
        self.run(Some(condition))
    }

    fn run(&self, condition: Option<&Condition>) -> StoreResult<Vec<Record>> {
        self.check_fields(condition)?;
        let (sql, params) = self.to_sql(condition);
        debug!(
            "event=select module=query collection={} params={}",
            self.source.name(),
            params.len()
        );
        self.source.records(&sql, &params)
    }

    fn check_fields(&self, condition: Option<&Condition>) -> StoreResult<()> {
        let schema = self.source.schema();
        let referenced = self
            .picks
            .iter()
            .map(String::as_str)
            .chain(self.order.iter().map(|(field, _)| field.as_str()))
            .chain(condition.into_iter().flat_map(Condition::fields));
        for name in referenced {
            if !schema.contains(name) {
                return Err(StoreError::UnknownField(name.to_string()));
            }
        }
        Ok(())
    }
}

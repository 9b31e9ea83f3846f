//! Shared row decoding and record validation.

use crate::model::types::SqlType;
use crate::model::value::{Record, Value};
use crate::schema::{Field, Schema};
use crate::store::{StoreError, StoreResult};
use rusqlite::{params_from_iter, Connection, Row};

/// Runs `sql` and decodes every row into a `Record`.
///
/// `column_type` maps a result column name to its declared type so temporal
/// and boolean cells decode into their logical values.
pub(crate) fn query_records(
    conn: &Connection,
    sql: &str,
    params: &[Value],
    column_type: impl Fn(&str) -> Option<SqlType>,
) -> StoreResult<Vec<Record>> {
    let mut stmt = conn.prepare(sql)?;
    let names = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let types = names
        .iter()
        .map(|name| column_type(name))
        .collect::<Vec<_>>();

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Record::new();
        for (index, name) in names.iter().enumerate() {
            record.insert(name.clone(), decode_cell(row, index, name, types[index])?);
        }
        records.push(record);
    }
    Ok(records)
}

/// Runs `sql` and decodes the first column of every row.
pub(crate) fn query_column(
    conn: &Connection,
    sql: &str,
    params: &[Value],
    declared: Option<SqlType>,
) -> StoreResult<Vec<Value>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        values.push(decode_cell(row, 0, "value", declared)?);
    }
    Ok(values)
}

/// Runs a single-row scalar query such as an aggregate.
pub(crate) fn query_scalar(
    conn: &Connection,
    sql: &str,
    declared: Option<SqlType>,
) -> StoreResult<Value> {
    Ok(query_column(conn, sql, &[], declared)?
        .into_iter()
        .next()
        .unwrap_or(Value::Null))
}

pub(crate) fn count_rows(conn: &Connection, table: &str) -> StoreResult<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    u64::try_from(count).map_err(|_| StoreError::InvalidData(format!("negative count {count}")))
}

fn decode_cell(
    row: &Row<'_>,
    index: usize,
    name: &str,
    declared: Option<SqlType>,
) -> StoreResult<Value> {
    Value::from_column(row.get_ref(index)?, declared)
        .map_err(|message| StoreError::InvalidData(format!("column `{name}`: {message}")))
}

/// Looks up a declared field or reports it as unknown.
pub(crate) fn require_field<'s>(schema: &'s Schema, name: &str) -> StoreResult<&'s Field> {
    schema
        .field(name)
        .ok_or_else(|| StoreError::UnknownField(name.to_string()))
}

/// Checks one value against its declared field.
pub(crate) fn check_value(field: &Field, value: &Value) -> StoreResult<()> {
    match value.sql_type() {
        None if !field.is_nullable() => Err(StoreError::NullValue(field.name().to_string())),
        None => Ok(()),
        Some(found) if !value.fits(field.sql_type()) => Err(StoreError::TypeMismatch {
            field: field.name().to_string(),
            expected: field.sql_type(),
            found,
        }),
        Some(_) => Ok(()),
    }
}

/// Checks every value of `record`, then that no required field is absent.
pub(crate) fn check_record(schema: &Schema, record: &Record) -> StoreResult<()> {
    for (name, value) in record {
        check_value(require_field(schema, name)?, value)?;
    }
    if let Some(missing) = schema
        .fields()
        .iter()
        .find(|field| field.is_required() && !record.contains_key(field.name()))
    {
        return Err(StoreError::MissingField(missing.name().to_string()));
    }
    Ok(())
}

/// Rewrites values to the shape the engine stores for their declared field.
pub(crate) fn widen_record(schema: &Schema, record: &mut Record) {
    for (name, value) in record.iter_mut() {
        if let Some(field) = schema.field(name) {
            value.widen_to(field.sql_type());
        }
    }
}

/// `INSERT INTO` statement for the columns present in `record`.
pub(crate) fn insert_sql(table: &str, record: &Record) -> String {
    let columns = record.keys().map(String::as_str).collect::<Vec<_>>();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::{check_record, insert_sql, widen_record};
    use crate::model::types::SqlType;
    use crate::model::value::{Record, Value};
    use crate::schema::{Field, Schema};
    use crate::store::StoreError;

    fn schema() -> Schema {
        Schema::new([
            Field::new("name", SqlType::Text).not_null(),
            Field::new("score", SqlType::Real),
            Field::new("active", SqlType::Boolean).not_null().default(true),
        ])
        .unwrap()
    }

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn accepts_required_fields_and_widened_integers() {
        let row = record(&[("name", Value::from("a")), ("score", Value::from(3))]);
        check_record(&schema(), &row).unwrap();
    }

    #[test]
    fn reports_unknown_missing_null_and_mistyped_fields() {
        let err = check_record(&schema(), &record(&[("nope", Value::from(1))])).unwrap_err();
        assert!(matches!(err, StoreError::UnknownField(name) if name == "nope"));

        let err = check_record(&schema(), &record(&[("score", Value::from(1.0))])).unwrap_err();
        assert!(matches!(err, StoreError::MissingField(name) if name == "name"));

        let err = check_record(&schema(), &record(&[("name", Value::Null)])).unwrap_err();
        assert!(matches!(err, StoreError::NullValue(name) if name == "name"));

        let err = check_record(&schema(), &record(&[("name", Value::from(5))])).unwrap_err();
        assert!(matches!(
            err,
            StoreError::TypeMismatch {
                expected: SqlType::Text,
                found: SqlType::Integer,
                ..
            }
        ));
    }

    #[test]
    fn insert_sql_lists_present_columns_in_key_order() {
        let row = record(&[("b", Value::from(1)), ("a", Value::from(2))]);
        assert_eq!(insert_sql("t", &row), "INSERT INTO t (a, b) VALUES (?, ?)");
    }

    #[test]
    fn widen_record_turns_integers_into_reals_for_real_fields() {
        let mut row = record(&[("name", Value::from("a")), ("score", Value::from(3))]);
        widen_record(&schema(), &mut row);
        assert_eq!(row["score"], Value::Real(3.0));
        assert_eq!(row["name"], Value::from("a"));
    }
}

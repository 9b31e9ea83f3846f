use chrono::NaiveDate;
use fractal_core::schema::KEY_FIELD;
use fractal_core::{
    record, Database, Field, Order, Schema, SchemaError, SqlType, StoreError, Value,
};

fn users_schema() -> Schema {
    Schema::with_implicit_fields([
        Field::new("name", SqlType::Text).not_null(),
        Field::new("age", SqlType::Integer),
        Field::new("score", SqlType::Real),
        Field::new("active", SqlType::Boolean).default(true),
        Field::new("joined", SqlType::Date),
    ])
    .unwrap()
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

#[test]
fn insert_and_fetch_roundtrip() {
    let db = Database::open_in_memory().unwrap();
    let users = db.create_collection("users", users_schema()).unwrap();

    let stored = users
        .insert([record! {
            "name" => "Ada",
            "age" => 36,
            "score" => 9.5,
            "active" => false,
            "joined" => date(2024, 2, 29),
        }])
        .unwrap();
    assert_eq!(stored.len(), 1);
    let (key, record) = stored.into_iter().next().unwrap();
    assert_eq!(key.len(), 32);
    assert_eq!(record[KEY_FIELD], Value::Text(key.clone()));
    assert!(matches!(record["timestamp"], Value::DateTime(_)));

    let loaded = users.fetch(&key).unwrap().unwrap();
    assert_eq!(loaded, record);
}

#[test]
fn omitted_optional_fields_read_back_as_null_or_default() {
    let db = Database::open_in_memory().unwrap();
    let users = db.create_collection("users", users_schema()).unwrap();

    let key = users.insert_one(record! { "name" => "Grace" }).unwrap();
    let loaded = users.fetch(&key).unwrap().unwrap();
    assert_eq!(loaded["age"], Value::Null);
    assert_eq!(loaded["joined"], Value::Null);
    assert_eq!(loaded["active"], Value::Boolean(true));
}

#[test]
fn batch_insert_shares_timestamp_and_generates_distinct_keys() {
    let db = Database::open_in_memory().unwrap();
    let users = db.create_collection("users", users_schema()).unwrap();

    let stored = users
        .insert([
            record! { "name" => "a" },
            record! { "name" => "b" },
            record! { "name" => "c" },
        ])
        .unwrap();
    assert_eq!(stored.len(), 3);
    let stamps = stored
        .values()
        .map(|record| record["timestamp"].clone())
        .collect::<Vec<_>>();
    assert!(stamps.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(users.count().unwrap(), 3);
    assert!(users.insert(Vec::new()).unwrap().is_empty());
}

#[test]
fn insert_rejects_records_that_violate_the_schema() {
    let db = Database::open_in_memory().unwrap();
    let users = db.create_collection("users", users_schema()).unwrap();

    let err = users
        .insert([record! { "name" => "x", "email" => "x@y" }])
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownField(name) if name == "email"));

    let err = users
        .insert([record! { "name" => "x", "age" => "old" }])
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::TypeMismatch { field, expected: SqlType::Integer, found: SqlType::Text }
            if field == "age"
    ));

    let err = users.insert([record! { "age" => 3 }]).unwrap_err();
    assert!(matches!(err, StoreError::MissingField(name) if name == "name"));

    let err = users
        .insert([record! { "name" => "ok" }, record! { "name" => Value::Null }])
        .unwrap_err();
    assert!(matches!(err, StoreError::NullValue(_)));
    assert_eq!(users.count().unwrap(), 0);
}

#[test]
fn batch_insert_is_atomic_on_engine_errors() {
    let db = Database::open_in_memory().unwrap();
    let schema = Schema::with_implicit_fields([Field::new("email", SqlType::Text).unique()])
        .unwrap();
    let accounts = db.create_collection("accounts", schema).unwrap();

    let err = accounts
        .insert([
            record! { "email" => "same@example.com" },
            record! { "email" => "same@example.com" },
        ])
        .unwrap_err();
    assert!(matches!(err, StoreError::Db(_)));
    assert_eq!(accounts.count().unwrap(), 0);
}

#[test]
fn update_validates_and_reports_missing_keys() {
    let db = Database::open_in_memory().unwrap();
    let users = db.create_collection("users", users_schema()).unwrap();
    let key = users.insert_one(record! { "name" => "Ada", "age" => 30 }).unwrap();

    assert!(users.update(&key, record! { "age" => 31 }).unwrap());
    assert_eq!(users.fetch(&key).unwrap().unwrap()["age"], Value::Integer(31));
    assert!(!users.update("missing", record! { "age" => 1 }).unwrap());

    let err = users.update(&key, record! { "age" => "x" }).unwrap_err();
    assert!(matches!(err, StoreError::TypeMismatch { .. }));
    let err = users.update(&key, record! { "key" => "new" }).unwrap_err();
    assert!(matches!(err, StoreError::Schema(SchemaError::ReservedField(_))));
    let err = users.update(&key, record! {}).unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
}

#[test]
fn delete_clear_and_drop() {
    let db = Database::open_in_memory().unwrap();
    let users = db.create_collection("users", users_schema()).unwrap();
    let key = users.insert_one(record! { "name" => "a" }).unwrap();
    users.insert([record! { "name" => "b" }, record! { "name" => "c" }]).unwrap();

    assert!(users.delete(&key).unwrap());
    assert!(!users.delete(&key).unwrap());
    assert!(users.fetch(&key).unwrap().is_none());

    assert_eq!(users.clear().unwrap(), 2);
    assert_eq!(users.count().unwrap(), 0);

    assert!(!users.drop_collection(false).unwrap());
    assert!(db.has_collection("users").unwrap());
    assert!(users.drop_collection(true).unwrap());
    assert!(!db.has_collection("users").unwrap());
}

#[test]
fn aggregates_follow_field_types() {
    let db = Database::open_in_memory().unwrap();
    let users = db.create_collection("users", users_schema()).unwrap();

    assert_eq!(users.sum("age").unwrap(), Value::Null);
    assert_eq!(users.avg("age").unwrap(), Value::Null);

    users
        .insert([
            record! { "name" => "a", "age" => 20, "joined" => date(2023, 1, 5) },
            record! { "name" => "b", "age" => 30, "joined" => date(2024, 6, 1) },
            record! { "name" => "c", "age" => 40, "joined" => date(2022, 12, 31) },
        ])
        .unwrap();

    assert_eq!(users.sum("age").unwrap(), Value::Integer(90));
    assert_eq!(users.avg("age").unwrap(), Value::Real(30.0));
    assert_eq!(users.min("age").unwrap(), Value::Integer(20));
    assert_eq!(users.max("age").unwrap(), Value::Integer(40));
    assert_eq!(users.max("joined").unwrap(), Value::Date(date(2024, 6, 1)));

    let err = users.avg("name").unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
    let err = users.min("height").unwrap_err();
    assert!(matches!(err, StoreError::UnknownField(_)));
}

#[test]
fn distinct_and_order_by() {
    let db = Database::open_in_memory().unwrap();
    let users = db.create_collection("users", users_schema()).unwrap();
    users
        .insert([
            record! { "name" => "a", "age" => 20 },
            record! { "name" => "b", "age" => 40 },
            record! { "name" => "a", "age" => 30 },
        ])
        .unwrap();

    let names = users.distinct("name").unwrap();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&Value::from("a")));
    assert!(names.contains(&Value::from("b")));

    let ages = users
        .order_by(&["age"], Order::Desc)
        .unwrap()
        .into_iter()
        .map(|record| record["age"].clone())
        .collect::<Vec<_>>();
    assert_eq!(
        ages,
        vec![Value::Integer(40), Value::Integer(30), Value::Integer(20)]
    );

    let err = users.order_by(&[], Order::Asc).unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
}

#[test]
fn add_and_remove_fields() {
    let db = Database::open_in_memory().unwrap();
    let mut users = db.create_collection("users", users_schema()).unwrap();

    users
        .add_field(Field::new("nickname", SqlType::Text).unique())
        .unwrap();
    let key = users
        .insert_one(record! { "name" => "a", "nickname" => "ace" })
        .unwrap();
    assert_eq!(
        users.fetch(&key).unwrap().unwrap()["nickname"],
        Value::from("ace")
    );

    users.remove_field("nickname").unwrap();
    assert!(!users.schema().contains("nickname"));
    assert!(!users.fetch(&key).unwrap().unwrap().contains_key("nickname"));

    let err = users.remove_field("nickname").unwrap_err();
    assert!(matches!(
        err,
        StoreError::FieldNotFound { collection, field } if collection == "users" && field == "nickname"
    ));
    let err = users.remove_field(KEY_FIELD).unwrap_err();
    assert!(matches!(err, StoreError::Schema(SchemaError::ReservedField(_))));
}

#[test]
fn remove_field_maps_engine_missing_column_to_field_not_found() {
    let db = Database::open_in_memory().unwrap();
    db.create_collection("users", users_schema()).unwrap();
    let mut first = db.collection("users").unwrap();
    let mut stale = db.collection("users").unwrap();

    first.remove_field("age").unwrap();
    let err = stale.remove_field("age").unwrap_err();
    assert!(matches!(err, StoreError::FieldNotFound { field, .. } if field == "age"));
}

#[test]
fn union_and_join() {
    let db = Database::open_in_memory().unwrap();
    let users = db.create_collection("users", users_schema()).unwrap();
    let archived = db.create_collection("archived", users_schema()).unwrap();
    let orders = db
        .create_collection(
            "orders",
            Schema::with_implicit_fields([
                Field::new("user_key", SqlType::Text).references("users", "key"),
                Field::new("total", SqlType::Real),
            ])
            .unwrap(),
        )
        .unwrap();

    let ada = users.insert_one(record! { "name" => "Ada" }).unwrap();
    archived.insert_one(record! { "name" => "Old" }).unwrap();
    let order_key = orders
        .insert_one(record! { "user_key" => ada.as_str(), "total" => 12.5 })
        .unwrap();

    assert_eq!(users.union(&archived).unwrap().len(), 2);
    let err = users.union(&orders).unwrap_err();
    assert!(matches!(err, StoreError::FieldCountMismatch { .. }));

    let joined = users.join("key", &orders, "user_key").unwrap();
    assert_eq!(joined.len(), 1);
    let row = &joined[0];
    assert_eq!(row["key"], Value::Text(ada.clone()));
    assert_eq!(row["orders.key"], Value::Text(order_key));
    assert_eq!(row["name"], Value::from("Ada"));
    assert_eq!(row["total"], Value::Real(12.5));
    assert!(matches!(row["orders.timestamp"], Value::DateTime(_)));
}

#[test]
fn foreign_keys_cascade_deletes() {
    let db = Database::open_in_memory().unwrap();
    let users = db.create_collection("users", users_schema()).unwrap();
    let orders = db
        .create_collection(
            "orders",
            Schema::with_implicit_fields([
                Field::new("user_key", SqlType::Text).references("users", "key")
            ])
            .unwrap(),
        )
        .unwrap();

    let ada = users.insert_one(record! { "name" => "Ada" }).unwrap();
    orders.insert_one(record! { "user_key" => ada.as_str() }).unwrap();
    assert_eq!(orders.count().unwrap(), 1);

    users.delete(&ada).unwrap();
    assert_eq!(orders.count().unwrap(), 0);
}

#[test]
fn integers_stored_in_real_fields_read_back_as_returned() {
    let db = Database::open_in_memory().unwrap();
    let users = db.create_collection("users", users_schema()).unwrap();

    let stored = users.insert([record! { "name" => "Ada", "score" => 3 }]).unwrap();
    let (key, returned) = stored.into_iter().next().unwrap();
    assert_eq!(returned["score"], Value::Real(3.0));
    assert_eq!(users.fetch(&key).unwrap().unwrap(), returned);

    users.update(&key, record! { "score" => 7 }).unwrap();
    assert_eq!(users.fetch(&key).unwrap().unwrap()["score"], Value::Real(7.0));
}

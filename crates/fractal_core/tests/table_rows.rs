use fractal_core::{record, Database, Field, Schema, SqlType, StoreError, Value};

fn products_schema() -> Schema {
    Schema::new([
        Field::new("sku", SqlType::Text).unique().not_null(),
        Field::new("price", SqlType::Real),
        Field::new("stock", SqlType::Integer).default(0),
    ])
    .unwrap()
}

#[test]
fn strict_insert_requires_every_field() {
    let db = Database::open_in_memory().unwrap();
    let products = db.create_table("products", products_schema()).unwrap();

    let first = products
        .insert(record! { "sku" => "A-1", "price" => 9.99, "stock" => 3 })
        .unwrap();
    let second = products
        .insert(record! { "sku" => "B-2", "price" => 5, "stock" => Value::Null })
        .unwrap();
    assert!(second > first);
    assert_eq!(products.count().unwrap(), 2);

    let err = products
        .insert(record! { "sku" => "C-3", "price" => 1.0 })
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::FieldCountMismatch { expected: 3, found: 2 }
    ));

    let err = products
        .insert(record! { "sku" => "C-3", "price" => 1.0, "colour" => "red" })
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingField(name) if name == "stock"));

    let err = products
        .insert(record! { "sku" => "C-3", "price" => "cheap", "stock" => 1 })
        .unwrap_err();
    assert!(matches!(err, StoreError::TypeMismatch { field, .. } if field == "price"));
    assert_eq!(products.count().unwrap(), 2);
}

#[test]
fn fetch_by_rowid_and_field() {
    let db = Database::open_in_memory().unwrap();
    let products = db.create_table("products", products_schema()).unwrap();
    let rowid = products
        .insert(record! { "sku" => "A-1", "price" => 2.5, "stock" => 4 })
        .unwrap();

    let row = products.fetch(rowid).unwrap().unwrap();
    assert_eq!(row["sku"], Value::from("A-1"));
    assert_eq!(row["price"], Value::Real(2.5));
    assert_eq!(row["stock"], Value::Integer(4));
    assert!(products.fetch(rowid + 100).unwrap().is_none());

    let by_sku = products.fetch_by("sku", "A-1").unwrap().unwrap();
    assert_eq!(by_sku, row);
    assert!(products.fetch_by("sku", "Z-9").unwrap().is_none());
    assert!(matches!(
        products.fetch_by("colour", "red").unwrap_err(),
        StoreError::UnknownField(_)
    ));
}

#[test]
fn delete_and_reopen_by_name() {
    let db = Database::open_in_memory().unwrap();
    let products = db.create_table("products", products_schema()).unwrap();
    let rowid = products
        .insert(record! { "sku" => "A-1", "price" => 1.0, "stock" => 1 })
        .unwrap();
    products
        .insert(record! { "sku" => "B-2", "price" => 2.0, "stock" => 2 })
        .unwrap();

    assert!(products.delete(rowid).unwrap());
    assert!(!products.delete(rowid).unwrap());

    let reopened = db.table("products").unwrap();
    assert_eq!(reopened.schema().len(), 3);
    assert!(!reopened.schema().has_implicit_fields());
    assert_eq!(
        reopened.schema().field("stock").unwrap().default_value(),
        Some(&Value::Integer(0))
    );
    let rows = reopened.all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["sku"], Value::from("B-2"));
}

#[test]
fn empty_table_schema_is_rejected() {
    let db = Database::open_in_memory().unwrap();
    let empty = Schema::new(Vec::new()).unwrap();
    assert!(matches!(
        db.create_table("nothing", empty).err().unwrap(),
        StoreError::InvalidArgument(_)
    ));
}

#[test]
fn integer_prices_are_stored_as_reals() {
    let db = Database::open_in_memory().unwrap();
    let products = db.create_table("products", products_schema()).unwrap();
    let rowid = products
        .insert(record! { "sku" => "A-1", "price" => 5, "stock" => 1 })
        .unwrap();

    assert_eq!(products.fetch(rowid).unwrap().unwrap()["price"], Value::Real(5.0));
    assert!(products.fetch_by("price", 5.0).unwrap().is_some());
}

mod common;

use std::io::Write;

use heap_db::{utils::HandyRwLock, Catalog, Database, OpIterator, SeqScan, Transaction, Type};

// Schema-file loading: one table per line,
// `path | name type, ... | primaryKeyName?`.
#[test]
fn test_load_schema_file() {
    common::setup();

    let db = Database::new();

    let users_path = common::temp_table_path();
    let orders_path = common::temp_table_path();
    let schema_path = std::env::temp_dir().join(format!(
        "heap_db_schema_{}.txt",
        std::process::id()
    ));

    let mut file = std::fs::File::create(&schema_path).unwrap();
    writeln!(
        file,
        "{} | id int, name string | id",
        users_path.display()
    )
    .unwrap();
    writeln!(file, "{} | order_id int, user_id int", orders_path.display()).unwrap();
    drop(file);

    let table_ids = Catalog::load_schema(&db, &schema_path).unwrap();
    assert_eq!(table_ids.len(), 2);

    let users = db.catalog().get_table(&table_ids[0]).unwrap();
    {
        let users = users.rl();
        assert_eq!(users.pkey, "id");
        assert_eq!(users.get_schema().get_field_type(0), Type::Int);
        assert_eq!(users.get_schema().get_field_type(1), Type::Str);
    }

    let orders = db.catalog().get_table(&table_ids[1]).unwrap();
    assert_eq!(orders.rl().pkey, "");

    // a loaded table is immediately scannable (and empty)
    let tx = Transaction::new();
    let mut scan = SeqScan::new(db.clone(), &tx, table_ids[0], "u").unwrap();
    scan.open().unwrap();
    assert_eq!(scan.fetch_next().unwrap(), None);
    tx.commit(&db).unwrap();

    let _ = std::fs::remove_file(&schema_path);
}

#[test]
fn test_malformed_schema_line_rejected() {
    common::setup();

    let db = Database::new();
    let schema_path = std::env::temp_dir().join(format!(
        "heap_db_bad_schema_{}.txt",
        std::process::id()
    ));
    std::fs::write(&schema_path, "just-a-path-no-schema\n").unwrap();

    assert!(Catalog::load_schema(&db, &schema_path).is_err());
    let _ = std::fs::remove_file(&schema_path);
}

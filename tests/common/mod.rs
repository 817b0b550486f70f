use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, RwLock,
    },
};

use rand::prelude::*;

use heap_db::{
    simple_int_schema, Cell, Database, HeapTable, Pod, Schema, Transaction, Tuple,
};

/// # Conduct the initialization
///
/// - Setting up log configurations.
pub fn setup() {
    heap_db::utils::init_log();
}

static NEXT_FILE_ID: AtomicUsize = AtomicUsize::new(0);

/// A fresh table file path, unique within the test process.
pub fn temp_table_path() -> PathBuf {
    let n = NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "heap_db_test_{}_{}.db",
        std::process::id(),
        n
    ));
    let _ = std::fs::remove_file(&path);
    path
}

/// Create an empty all-int table and register it with the catalog.
pub fn create_int_table(db: &Arc<Database>, columns: usize, name: &str) -> Pod<HeapTable> {
    let schema = simple_int_schema(columns, "");
    create_table(db, &schema, name)
}

pub fn create_table(db: &Arc<Database>, schema: &Schema, name: &str) -> Pod<HeapTable> {
    let path = temp_table_path();
    let table = HeapTable::new(&path, name, schema, "").unwrap();
    let table_rc = Arc::new(RwLock::new(table));
    db.mut_catalog().add_table(Arc::clone(&table_rc));
    table_rc
}

/// Insert the given rows in order, in one committed transaction.
pub fn insert_int_rows(db: &Arc<Database>, table_id: u32, columns: usize, rows: &[Vec<i32>]) {
    let schema = simple_int_schema(columns, "");
    let tx = Transaction::new();
    for row in rows {
        let cells: Vec<Cell> = row.iter().map(|v| Cell::Int(*v)).collect();
        let mut tuple = Tuple::new(&schema, &cells);
        db.buffer_pool()
            .insert_tuple(db, &tx, table_id, &mut tuple)
            .unwrap();
    }
    tx.commit(db).unwrap();
}

/// Create a table with a given number of rows and columns.
///
/// The rows are filled with random data and inserted in one committed
/// transaction; the generated values are appended to `cells` in
/// insertion order.
pub fn create_random_int_table(
    db: &Arc<Database>,
    columns: usize,
    rows: usize,
    max_value: i32,
    cells: &mut Vec<Vec<i32>>,
) -> Pod<HeapTable> {
    let mut rng = rand::thread_rng();
    let mut new_rows = Vec::new();
    for _ in 0..rows {
        let mut row = Vec::new();
        for _ in 0..columns {
            row.push(rng.gen_range(1, max_value));
        }
        new_rows.push(row);
    }

    let table_rc = create_int_table(db, columns, "table");
    let table_id = {
        use heap_db::utils::HandyRwLock;
        table_rc.rl().get_id()
    };
    insert_int_rows(db, table_id, columns, &new_rows);

    cells.extend(new_rows);
    table_rc
}

mod common;

use heap_db::{utils::HandyRwLock, Database, OpIterator, SeqScan, Transaction};
use log::info;

// java: simpledb.systemtest.ScanTest#testSmall
#[test]
fn test_small() {
    common::setup();

    let column_sizes = [1, 2, 3, 4];
    let row_sizes = [0, 1, 2, 511, 512, 513, 1000];

    for columns in &column_sizes {
        for rows in &row_sizes {
            validate_scan(*columns, *rows);
        }
    }
}

fn validate_scan(columns: usize, rows: usize) {
    info!("start validate scan, columns: {}, rows: {}", columns, rows);

    let db = Database::new();
    let mut cells: Vec<Vec<i32>> = Vec::new();
    let table_rc = common::create_random_int_table(&db, columns, rows, 10000, &mut cells);
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    let mut scan = SeqScan::new(db.clone(), &tx, table_id, "t").unwrap();
    scan.open().unwrap();

    let mut row_index = 0;
    while let Some(tuple) = scan.fetch_next().unwrap() {
        assert!(
            tuple.equal_cells(&cells[row_index]),
            "row {}: expect {:?}, got {}",
            row_index,
            cells[row_index],
            tuple
        );
        row_index += 1;
    }
    assert_eq!(row_index, cells.len());

    scan.close().unwrap();
    tx.commit(&db).unwrap();
}

// Test that rewinding a SeqScan iterator works.
// java: simpledb.systemtest.ScanTest#testRewind
#[test]
fn test_rewind() {
    common::setup();

    let db = Database::new();
    let mut cells: Vec<Vec<i32>> = Vec::new();
    let table_rc = common::create_random_int_table(&db, 2, 1000, 10000, &mut cells);
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    let mut scan = SeqScan::new(db.clone(), &tx, table_id, "t").unwrap();
    scan.open().unwrap();

    for row_index in 0..100 {
        let tuple = scan.fetch_next().unwrap().unwrap();
        assert!(tuple.equal_cells(&cells[row_index]));
    }

    scan.rewind().unwrap();

    let mut row_index = 0;
    while let Some(tuple) = scan.fetch_next().unwrap() {
        assert!(tuple.equal_cells(&cells[row_index]));
        row_index += 1;
    }
    assert_eq!(row_index, cells.len());

    tx.commit(&db).unwrap();
}

// Scan output carries record ids that point back into the table.
#[test]
fn test_scan_stamps_record_ids() {
    common::setup();

    let db = Database::new();
    let mut cells: Vec<Vec<i32>> = Vec::new();
    let table_rc = common::create_random_int_table(&db, 3, 10, 10000, &mut cells);
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    let mut scan = SeqScan::new(db.clone(), &tx, table_id, "t").unwrap();
    scan.open().unwrap();

    let slots_per_page = {
        use heap_db::{simple_int_schema, HeapPage};
        HeapPage::calculate_slots_count(&simple_int_schema(3, ""))
    };

    let mut expected_slot = 0;
    while let Some(tuple) = scan.fetch_next().unwrap() {
        let rid = tuple.get_record_id().expect("scan output must carry a record id");
        assert_eq!(rid.pid.table_id, table_id);
        assert!(rid.slot < slots_per_page);
        assert_eq!(rid.slot, expected_slot);
        expected_slot += 1;
    }

    tx.commit(&db).unwrap();
}

// The alias shows up in the scan's output schema.
#[test]
fn test_scan_alias() {
    common::setup();

    let db = Database::new();
    let table_rc = common::create_int_table(&db, 2, "aliased");
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    let scan = SeqScan::new(db.clone(), &tx, table_id, "t").unwrap();
    let desc = scan.tuple_desc();
    assert!(desc.fields[0].field_name.starts_with("t."));
    tx.commit(&db).unwrap();
}

mod common;

use heap_db::{utils::HandyRwLock, Cell, Database, Op, TableStats, Transaction};

// Statistics collected from a full scan drive the selectivity and
// cardinality estimates.
#[test]
fn test_table_stats_estimates() {
    common::setup();

    let db = Database::new();
    let table_rc = common::create_int_table(&db, 2, "measured");
    let table_id = table_rc.rl().get_id();

    // column 0: 1..=100 once each; column 1: constant
    let rows: Vec<Vec<i32>> = (1..=100).map(|v| vec![v, 7]).collect();
    common::insert_int_rows(&db, table_id, 2, &rows);

    let tx = Transaction::new();
    let io_cost = 13;
    let stats = TableStats::new(&db, &tx, table_id, io_cost).unwrap();
    tx.commit(&db).unwrap();

    assert_eq!(stats.total_tuples(), 100);

    let pages = table_rc.rl().num_pages().unwrap();
    assert_eq!(stats.estimate_scan_cost(), (pages as usize * io_cost) as f64);

    assert_eq!(stats.estimate_table_cardinality(0.5), 50);

    // uniform column: half the values are greater than the midpoint
    let sel = stats.estimate_selectivity(0, Op::GreaterThan, &Cell::Int(50));
    assert!(sel > 0.35 && sel < 0.65, "selectivity {}", sel);

    // everything is greater than the minimum minus one
    let sel = stats.estimate_selectivity(0, Op::GreaterThan, &Cell::Int(0));
    assert!((sel - 1.0).abs() < 1e-9);

    // the constant column matches only its single value
    let sel = stats.estimate_selectivity(1, Op::Equals, &Cell::Int(7));
    assert!((sel - 1.0).abs() < 1e-9);
    let sel = stats.estimate_selectivity(1, Op::Equals, &Cell::Int(8));
    assert_eq!(sel, 0.0);
}

// Columns without histograms fall back to the default selectivity.
#[test]
fn test_default_selectivity_for_strings() {
    common::setup();

    let db = Database::new();
    use heap_db::{FieldItem, Schema, Type};
    let schema = Schema::new(vec![
        FieldItem::new("id", Type::Int),
        FieldItem::new("tag", Type::Str),
    ]);
    let table_rc = common::create_table(&db, &schema, "tagged");
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    let stats = TableStats::new(&db, &tx, table_id, 1).unwrap();
    tx.commit(&db).unwrap();

    let sel = stats.estimate_selectivity(1, Op::Equals, &Cell::Str("x".to_string()));
    assert_eq!(sel, heap_db::optimizer::table_stats::DEFAULT_SELECTIVITY);
}

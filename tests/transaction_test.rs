mod common;

use std::{
    sync::{Arc, Mutex, RwLock},
    thread,
};

use heap_db::{
    simple_int_schema, utils::HandyRwLock, Cell, ConcurrentStatus, Database, DbError, HeapPageID,
    HeapTable, OpIterator, Permission, RecoveryLog, SeqScan, Transaction, TransactionID, Tuple,
};

// Committed rows survive a fresh database instance over the same
// file; the table id is derived from the path, so both instances
// agree on it.
#[test]
fn test_commit_persists_across_instances() {
    common::setup();

    let schema = simple_int_schema(2, "");
    let path;
    let table_id;
    {
        let db = Database::new();
        let table_rc = common::create_int_table(&db, 2, "persisted");
        path = table_rc.rl().get_path().to_path_buf();
        table_id = table_rc.rl().get_id();

        common::insert_int_rows(&db, table_id, 2, &[vec![1, 2], vec![3, 4]]);
    }

    let db = Database::new();
    let table = HeapTable::new(&path, "persisted", &schema, "").unwrap();
    assert_eq!(table.get_id(), table_id);
    db.mut_catalog().add_table(Arc::new(RwLock::new(table)));

    let tx = Transaction::new();
    let mut scan = SeqScan::new(db.clone(), &tx, table_id, "t").unwrap();
    scan.open().unwrap();
    assert!(scan.fetch_next().unwrap().unwrap().equal_cells(&[1, 2]));
    assert!(scan.fetch_next().unwrap().unwrap().equal_cells(&[3, 4]));
    assert_eq!(scan.fetch_next().unwrap(), None);
    tx.commit(&db).unwrap();
}

// Aborting discards dirty pages: an uncommitted insert leaves no
// trace for later transactions.
#[test]
fn test_abort_discards_changes() {
    common::setup();

    let db = Database::new();
    let table_rc = common::create_int_table(&db, 2, "aborted");
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    let mut tuple = Tuple::new_int_tuple(7, 2);
    db.buffer_pool()
        .insert_tuple(&db, &tx, table_id, &mut tuple)
        .unwrap();
    tx.abort(&db).unwrap();

    let tx = Transaction::new();
    let mut scan = SeqScan::new(db.clone(), &tx, table_id, "t").unwrap();
    scan.open().unwrap();
    assert_eq!(scan.fetch_next().unwrap(), None);
    tx.commit(&db).unwrap();
}

// Two transactions contend for an X-lock on the same page: the
// second times out with TransactionAborted, and a retry after the
// first commits goes through.
#[test]
fn test_write_write_conflict() {
    common::setup();
    ConcurrentStatus::set_lock_timeout_ms(100);

    let db = Database::new();
    let table_rc = common::create_int_table(&db, 2, "contended");
    let table_id = table_rc.rl().get_id();
    common::insert_int_rows(&db, table_id, 2, &[vec![1, 1]]);

    let pid = HeapPageID::new(table_id, 0);

    let t1 = Transaction::new();
    db.buffer_pool()
        .get_page(&db, &t1, Permission::ReadWrite, &pid)
        .unwrap();

    let t2 = Transaction::new();
    assert_eq!(
        db.buffer_pool()
            .get_page(&db, &t2, Permission::ReadWrite, &pid)
            .err(),
        Some(DbError::TransactionAborted)
    );
    t2.abort(&db).unwrap();

    t1.commit(&db).unwrap();

    let t2_retry = Transaction::new();
    db.buffer_pool()
        .get_page(&db, &t2_retry, Permission::ReadWrite, &pid)
        .unwrap();
    t2_retry.commit(&db).unwrap();

    ConcurrentStatus::set_lock_timeout_ms(heap_db::DEFAULT_DEADLOCK_TIMEOUT_MS);
}

struct CountingLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl CountingLog {
    fn push(&self, event: &str) {
        self.events.lock().unwrap().push(event.to_string());
    }
}

impl RecoveryLog for CountingLog {
    fn log_start(&mut self, _tid: TransactionID) -> heap_db::DbResult {
        self.push("start");
        Ok(())
    }

    fn log_commit(&mut self, _tid: TransactionID) -> heap_db::DbResult {
        self.push("commit");
        Ok(())
    }

    fn log_abort(&mut self, _tid: TransactionID) -> heap_db::DbResult {
        self.push("abort");
        Ok(())
    }

    fn log_write(
        &mut self,
        _tid: TransactionID,
        before_image: &[u8],
        after_image: &[u8],
    ) -> heap_db::DbResult {
        assert_ne!(before_image, after_image);
        self.push("write");
        Ok(())
    }

    fn force(&mut self) -> heap_db::DbResult {
        self.push("force");
        Ok(())
    }
}

// WAL ordering: the update record is written and forced before the
// page goes to disk at commit; aborts never log a page write.
#[test]
fn test_log_hook_ordering() {
    common::setup();

    let db = Database::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    db.set_log_manager(Box::new(CountingLog {
        events: events.clone(),
    }));

    let table_rc = common::create_int_table(&db, 2, "logged");
    let table_id = table_rc.rl().get_id();

    {
        events.lock().unwrap().clear();
        let tx = Transaction::new();
        tx.start(&db).unwrap();
        let mut tuple = Tuple::new_int_tuple(1, 2);
        db.buffer_pool()
            .insert_tuple(&db, &tx, table_id, &mut tuple)
            .unwrap();
        tx.commit(&db).unwrap();

        let got = events.lock().unwrap().clone();
        assert_eq!(got, vec!["start", "write", "force", "commit"]);
    }

    {
        events.lock().unwrap().clear();
        let tx = Transaction::new();
        tx.start(&db).unwrap();
        let mut tuple = Tuple::new_int_tuple(2, 2);
        db.buffer_pool()
            .insert_tuple(&db, &tx, table_id, &mut tuple)
            .unwrap();
        tx.abort(&db).unwrap();

        let got = events.lock().unwrap().clone();
        assert_eq!(got, vec!["start", "abort"]);
    }
}

fn insert_with_retry(db: &Arc<Database>, table_id: u32, value: i32) {
    loop {
        let tx = Transaction::new();
        let mut tuple = Tuple::new_int_tuple(value, 2);
        match db
            .buffer_pool()
            .insert_tuple(db, &tx, table_id, &mut tuple)
        {
            Ok(()) => {
                tx.commit(db).unwrap();
                return;
            }
            Err(DbError::TransactionAborted) => {
                tx.abort(db).unwrap();
            }
            Err(e) => panic!("insert failed: {}", e),
        }
    }
}

// Many single-row transactions from parallel threads; aborted ones
// retry with fresh transaction ids until they land. Every value must
// be visible exactly once afterwards.
#[test]
fn test_concurrent_single_row_transactions() {
    common::setup();

    let db = Database::new();
    let table_rc = common::create_int_table(&db, 2, "concurrent");
    let table_id = table_rc.rl().get_id();

    let (sender, receiver) = crossbeam::channel::unbounded();

    let mut workers = Vec::new();
    for worker in 0..4 {
        let local_db = db.clone();
        let local_sender = sender.clone();
        let handle = thread::spawn(move || {
            for j in 0..5 {
                let value = worker * 100 + j;
                insert_with_retry(&local_db, table_id, value);
                local_sender.send(value).unwrap();
            }
        });
        workers.push(handle);
    }
    for handle in workers {
        handle.join().unwrap();
    }
    drop(sender);

    let mut expected: Vec<i32> = receiver.iter().collect();
    expected.sort();
    assert_eq!(expected.len(), 20);

    let tx = Transaction::new();
    let mut scan = SeqScan::new(db.clone(), &tx, table_id, "t").unwrap();
    scan.open().unwrap();
    let mut found = Vec::new();
    while let Some(tuple) = scan.fetch_next().unwrap() {
        match tuple.get_cell(0) {
            Cell::Int(v) => found.push(v),
            other => panic!("unexpected cell {}", other),
        }
    }
    found.sort();
    assert_eq!(found, expected);
    tx.commit(&db).unwrap();
}

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{common::Database, types::DbResult};

pub type TransactionID = u64;

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// A transaction token. Ids increase monotonically and are never
/// reused within a process; each transaction is driven by a single
/// thread.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transaction {
    id: TransactionID,
}

impl Transaction {
    pub fn new() -> Self {
        let id = NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed);
        Self { id }
    }

    pub fn get_id(&self) -> TransactionID {
        self.id
    }

    /// Announce the transaction to the recovery log.
    pub fn start(&self, db: &Database) -> DbResult {
        db.mut_log_manager().log_start(self.id)
    }

    /// Force dirty pages to disk, then release all latches.
    pub fn commit(&self, db: &Database) -> DbResult {
        db.buffer_pool().transaction_complete(db, self, true)
    }

    /// Discard dirty pages, then release all latches. Idempotent.
    pub fn abort(&self, db: &Database) -> DbResult {
        db.buffer_pool().transaction_complete(db, self, false)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.id)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

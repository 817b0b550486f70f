use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
    thread::sleep,
    time::{Duration, Instant},
};

use log::debug;
use rand::Rng;

use crate::{
    error::DbError,
    heap::HeapPageID,
    transaction::{Transaction, TransactionID},
    types::DbResult,
};

pub const DEFAULT_DEADLOCK_TIMEOUT_MS: u64 = 5000;

static DEADLOCK_TIMEOUT_MS: AtomicU64 = AtomicU64::new(DEFAULT_DEADLOCK_TIMEOUT_MS);

const RETRY_INTERVAL_MS: u64 = 10;

#[derive(Debug, PartialEq)]
pub enum Lock {
    XLock,
    SLock,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_lock(&self) -> Lock {
        match self {
            Permission::ReadOnly => Lock::SLock,
            Permission::ReadWrite => Lock::XLock,
        }
    }
}

#[derive(Default)]
struct LatchTables {
    s_latch_map: HashMap<HeapPageID, HashSet<TransactionID>>,
    x_latch_map: HashMap<HeapPageID, TransactionID>,

    hold_pages: HashMap<TransactionID, HashSet<HeapPageID>>,
}

/// Per-page two-phase locking with shared/exclusive modes.
///
/// Deadlocks are resolved by timeout: each acquire draws a random
/// deadline in `[0, DEADLOCK_TIMEOUT_MS]`, so of two transactions
/// stuck on each other one gives up first and the other proceeds.
pub struct ConcurrentStatus {
    latches: Mutex<LatchTables>,
}

impl ConcurrentStatus {
    pub fn new() -> Self {
        Self {
            latches: Mutex::new(LatchTables::default()),
        }
    }

    /// Deadlock-detection timeout ceiling, fixed per database
    /// instance. Tests shrink it so conflict cases finish fast.
    pub fn set_lock_timeout_ms(ms: u64) {
        DEADLOCK_TIMEOUT_MS.store(ms, Ordering::Relaxed);
    }

    pub fn get_lock_timeout_ms() -> u64 {
        DEADLOCK_TIMEOUT_MS.load(Ordering::Relaxed)
    }

    /// Request a latch on the given page. Blocks until the latch is
    /// granted or the randomized deadline passes, then fails with
    /// `TransactionAborted`.
    pub fn request_latch(
        &self,
        tx: &Transaction,
        lock: &Lock,
        pid: &HeapPageID,
    ) -> DbResult {
        let timeout_ms = rand::thread_rng().gen_range(0, Self::get_lock_timeout_ms() + 1);
        let start_time = Instant::now();

        loop {
            {
                let mut latches = self.latches.lock().unwrap();
                if Self::add_latch(&mut latches, tx, lock, pid) {
                    return Ok(());
                }
            }

            if start_time.elapsed().as_millis() as u64 >= timeout_ms {
                debug!(
                    "{} timed out after {} ms waiting for {:?} on {}",
                    tx, timeout_ms, lock, pid
                );
                let err = DbError::TransactionAborted;
                err.show_backtrace();
                return Err(err);
            }

            sleep(Duration::from_millis(RETRY_INTERVAL_MS));
        }
    }

    // Try to grant the latch. Grant rules:
    // - free page: grant
    // - S requested, page held in S: join the holder set
    // - requester already holds X: grant immediately (covers S after X)
    // - X requested, sole S holder is the requester: upgrade in place;
    //   the S entry is dropped so a transaction never holds both modes
    //   on one page
    fn add_latch(
        latches: &mut LatchTables,
        tx: &Transaction,
        lock: &Lock,
        pid: &HeapPageID,
    ) -> bool {
        let tid = tx.get_id();

        if let Some(holder) = latches.x_latch_map.get(pid) {
            if *holder != tid {
                return false;
            }
            // already exclusive; nothing to change
            return true;
        }

        match lock {
            Lock::SLock => {
                latches
                    .s_latch_map
                    .entry(*pid)
                    .or_insert_with(HashSet::new)
                    .insert(tid);
            }
            Lock::XLock => {
                if let Some(holders) = latches.s_latch_map.get(pid) {
                    if holders.iter().any(|holder| *holder != tid) {
                        return false;
                    }
                }

                // either unlocked or upgrading our own S latch
                latches.s_latch_map.remove(pid);
                latches.x_latch_map.insert(*pid, tid);
            }
        }

        latches
            .hold_pages
            .entry(tid)
            .or_insert_with(HashSet::new)
            .insert(*pid);
        true
    }

    pub fn release_latch(&self, tx: &Transaction, pid: &HeapPageID) {
        let mut latches = self.latches.lock().unwrap();
        Self::drop_latch(&mut latches, tx.get_id(), pid);

        if let Some(pages) = latches.hold_pages.get_mut(&tx.get_id()) {
            pages.remove(pid);
        }
    }

    /// Release every latch held by the transaction. Called once, at
    /// transaction end, by the buffer pool.
    pub fn release_all(&self, tx: &Transaction) {
        let mut latches = self.latches.lock().unwrap();
        if let Some(pages) = latches.hold_pages.remove(&tx.get_id()) {
            for pid in pages {
                Self::drop_latch(&mut latches, tx.get_id(), &pid);
            }
        }
    }

    fn drop_latch(latches: &mut LatchTables, tid: TransactionID, pid: &HeapPageID) {
        if let Some(holders) = latches.s_latch_map.get_mut(pid) {
            holders.remove(&tid);
            if holders.is_empty() {
                latches.s_latch_map.remove(pid);
            }
        }

        if latches.x_latch_map.get(pid) == Some(&tid) {
            latches.x_latch_map.remove(pid);
        }
    }

    pub fn holds_latch(&self, tx: &Transaction, pid: &HeapPageID) -> bool {
        let latches = self.latches.lock().unwrap();
        latches
            .hold_pages
            .get(&tx.get_id())
            .map_or(false, |pages| pages.contains(pid))
    }

    /// Snapshot of the pages the transaction holds latches on. This
    /// set is authoritative: `transaction_complete` walks it.
    pub fn hold_pages(&self, tx: &Transaction) -> Vec<HeapPageID> {
        let latches = self.latches.lock().unwrap();
        latches
            .hold_pages
            .get(&tx.get_id())
            .map(|pages| pages.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        let mut latches = self.latches.lock().unwrap();
        latches.s_latch_map.clear();
        latches.x_latch_map.clear();
        latches.hold_pages.clear();
    }
}

impl fmt::Debug for ConcurrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let latches = self.latches.lock().unwrap();

        writeln!(f, "s_latch_map: {{")?;
        for (pid, holders) in latches.s_latch_map.iter() {
            writeln!(f, "\t{} -> {:?}", pid, holders)?;
        }
        writeln!(f, "}}")?;

        writeln!(f, "x_latch_map: {{")?;
        for (pid, holder) in latches.x_latch_map.iter() {
            writeln!(f, "\t{} -> tx_{}", pid, holder)?;
        }
        writeln!(f, "}}")?;

        writeln!(f, "hold_pages: {{")?;
        for (tid, pages) in latches.hold_pages.iter() {
            writeln!(f, "\ttx_{} -> {} pages", tid, pages.len())?;
        }
        write!(f, "}}")
    }
}

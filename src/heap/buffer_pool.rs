use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, RwLock,
    },
};

use log::debug;

use crate::{
    common::Database,
    error::DbError,
    heap::{page::HeapPage, page_id::HeapPageID},
    storage::tuple::Tuple,
    transaction::{Permission, Transaction},
    types::{DbResult, Pod, ResultPod},
    utils::HandyRwLock,
};

pub const DEFAULT_PAGE_SIZE: usize = 4096;
pub const DEFAULT_PAGES: usize = 50;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Bounded cache of pages, the sole path between operators and the
/// heap files. Every `get_page` call acquires the page latch first,
/// so two-phase locking falls out of simply using the pool.
///
/// Policies: NO-STEAL (eviction never touches a dirty page) and
/// FORCE (a committing transaction's dirty pages are written out at
/// commit time, preceded by the recovery-log write hook).
pub struct BufferPool {
    buffer: RwLock<HashMap<HeapPageID, Pod<HeapPage>>>,
    capacity: usize,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Page size is fixed per database instance; tests shrink it to
    /// force multi-page tables with little data.
    pub fn set_page_size(page_size: usize) {
        PAGE_SIZE.store(page_size, Ordering::Relaxed);
    }

    pub fn get_page_size() -> usize {
        PAGE_SIZE.load(Ordering::Relaxed)
    }

    pub fn get_capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pages currently cached.
    pub fn size(&self) -> usize {
        self.buffer.rl().len()
    }

    pub fn clear(&self) {
        self.buffer.wl().clear();
    }

    /// Retrieve the specified page with the associated permissions.
    /// Will acquire a lock and may block if that lock is held by
    /// another transaction; a lock-wait timeout surfaces as
    /// `TransactionAborted`.
    ///
    /// The page is looked up in the pool first. On a miss it is read
    /// from the owning table's file and cached, evicting a clean page
    /// if the pool is full; `CacheFull` if every cached page is dirty.
    pub fn get_page(
        &self,
        db: &Database,
        tx: &Transaction,
        perm: Permission,
        pid: &HeapPageID,
    ) -> ResultPod<HeapPage> {
        db.concurrent_status().request_latch(tx, &perm.to_lock(), pid)?;

        {
            let buffer = self.buffer.rl();
            if let Some(page_rc) = buffer.get(pid) {
                return Ok(page_rc.clone());
            }
        }

        let table_rc = db.catalog().get_table(&pid.table_id).ok_or_else(|| {
            DbError::InvalidRecord(format!("table {} not found", pid.table_id))
        })?;

        let mut buffer = self.buffer.wl();
        // another thread may have loaded the page while we were
        // waiting for the write lock
        if let Some(page_rc) = buffer.get(pid) {
            return Ok(page_rc.clone());
        }

        if buffer.len() >= self.capacity {
            Self::evict_page(&mut buffer)?;
        }

        let page = table_rc.rl().read_page(pid)?;
        let page_rc = Arc::new(RwLock::new(page));
        buffer.insert(*pid, page_rc.clone());
        Ok(page_rc)
    }

    /// NO-STEAL eviction: drop the first clean page found. Dirty
    /// pages may only reach disk through a commit, so a pool full of
    /// dirty pages cannot make room.
    fn evict_page(buffer: &mut HashMap<HeapPageID, Pod<HeapPage>>) -> DbResult {
        let victim = buffer
            .iter()
            .find(|(_, page_rc)| !page_rc.rl().is_dirty())
            .map(|(pid, _)| *pid);

        match victim {
            Some(pid) => {
                debug!("evicting clean page {}", pid);
                buffer.remove(&pid);
                Ok(())
            }
            None => Err(DbError::CacheFull),
        }
    }

    /// Add the tuple to the specified table on behalf of the
    /// transaction. Acquires an X-lock on the page the tuple lands on.
    /// The modified page is marked dirty and re-seated in the cache so
    /// future requests see the up-to-date copy.
    pub fn insert_tuple(
        &self,
        db: &Database,
        tx: &Transaction,
        table_id: u32,
        tuple: &mut Tuple,
    ) -> DbResult {
        let table_rc = db.catalog().get_table(&table_id).ok_or_else(|| {
            DbError::InvalidRecord(format!("table {} not found", table_id))
        })?;

        let dirtied = table_rc.rl().insert_tuple(db, tx, tuple)?;
        self.reseat_dirtied(tx, dirtied);
        Ok(())
    }

    /// Remove the tuple from its table. Acquires an X-lock on the
    /// owning page.
    pub fn delete_tuple(&self, db: &Database, tx: &Transaction, tuple: &Tuple) -> DbResult {
        let rid = match tuple.get_record_id() {
            Some(rid) => rid,
            None => {
                return Err(DbError::InvalidRecord(
                    "tuple has no record id".to_string(),
                ))
            }
        };

        let table_rc = db.catalog().get_table(&rid.pid.table_id).ok_or_else(|| {
            DbError::InvalidRecord(format!("table {} not found", rid.pid.table_id))
        })?;

        let dirtied = table_rc.rl().delete_tuple(db, tx, tuple)?;
        self.reseat_dirtied(tx, vec![dirtied]);
        Ok(())
    }

    fn reseat_dirtied(&self, tx: &Transaction, pages: Vec<Pod<HeapPage>>) {
        let mut buffer = self.buffer.wl();
        for page_rc in pages {
            let pid = {
                let mut page = page_rc.wl();
                page.mark_dirty(true, tx.get_id());
                page.get_pid()
            };
            buffer.insert(pid, page_rc);
        }
    }

    /// Finish the transaction: on commit, force its dirty pages to
    /// disk and snapshot fresh before-images; on abort, discard its
    /// dirty pages unwritten. Either way every latch the transaction
    /// holds is released afterwards, completing the two-phase locking
    /// protocol.
    pub fn transaction_complete(
        &self,
        db: &Database,
        tx: &Transaction,
        commit: bool,
    ) -> DbResult {
        let held = db.concurrent_status().hold_pages(tx);

        if commit {
            for pid in &held {
                self.flush_page(db, pid)?;

                let cached = self.buffer.rl().get(pid).cloned();
                if let Some(page_rc) = cached {
                    page_rc.wl().set_before_image();
                }
            }
            db.mut_log_manager().log_commit(tx.get_id())?;
        } else {
            for pid in &held {
                let dirty = match self.buffer.rl().get(pid) {
                    Some(page_rc) => page_rc.rl().is_dirty(),
                    None => false,
                };
                if dirty {
                    debug!("discarding dirty page {} on abort of {}", pid, tx);
                    self.discard_page(pid);
                }
            }
            db.mut_log_manager().log_abort(tx.get_id())?;
        }

        db.concurrent_status().release_all(tx);
        Ok(())
    }

    /// Write the content of a specific page to disk if it is dirty.
    ///
    /// WAL ordering: the recovery log sees the update record and is
    /// forced before the page bytes reach the heap file.
    fn flush_page(&self, db: &Database, pid: &HeapPageID) -> DbResult {
        let page_rc = match self.buffer.rl().get(pid) {
            Some(page_rc) => page_rc.clone(),
            None => return Ok(()),
        };

        let (dirtier, before, after) = {
            let page = page_rc.rl();
            match page.dirtier() {
                Some(tid) => (tid, page.before_image_data(), page.get_page_data()),
                None => return Ok(()),
            }
        };

        {
            let mut log = db.mut_log_manager();
            log.log_write(dirtier, &before, &after)?;
            log.force()?;
        }

        let table_rc = db.catalog().get_table(&pid.table_id).ok_or_else(|| {
            DbError::InvalidRecord(format!("table {} not found", pid.table_id))
        })?;
        table_rc.rl().write_page(&page_rc.rl())?;

        page_rc.wl().mark_dirty(false, dirtier);
        debug!("flushed page {} for {}", pid, dirtier);
        Ok(())
    }

    /// Write every dirty page of the transaction to disk.
    pub fn flush_pages(&self, db: &Database, tx: &Transaction) -> DbResult {
        for pid in db.concurrent_status().hold_pages(tx) {
            self.flush_page(db, &pid)?;
        }
        Ok(())
    }

    /// Flush all dirty pages to disk.
    ///
    /// NB: be careful using this routine -- writing dirty data to
    /// disk outside of a commit breaks the NO-STEAL discipline.
    pub fn flush_all_pages(&self, db: &Database) -> DbResult {
        let pids: Vec<HeapPageID> = self.buffer.rl().keys().cloned().collect();
        for pid in pids {
            self.flush_page(db, &pid)?;
        }
        Ok(())
    }

    /// Remove the specific page id from the buffer pool, dropping any
    /// in-memory changes.
    pub fn discard_page(&self, pid: &HeapPageID) {
        self.buffer.wl().remove(pid);
    }
}

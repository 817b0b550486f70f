use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    common::Catalog,
    heap::{buffer_pool::DEFAULT_PAGES, BufferPool},
    transaction::{ConcurrentStatus, NoopLog, RecoveryLog},
    utils::HandyRwLock,
};

/// We collect all engine-wide state here: the catalog, the buffer
/// pool, the latch tables, and the recovery-log collaborator.
///
/// There is deliberately no process-wide instance. Every caller holds
/// an explicit `Arc<Database>`; each test constructs its own, so
/// state never leaks between tests.
pub struct Database {
    catalog: RwLock<Catalog>,
    buffer_pool: BufferPool,
    concurrent_status: ConcurrentStatus,
    log_manager: RwLock<Box<dyn RecoveryLog>>,
}

impl Database {
    pub fn new() -> Arc<Self> {
        Self::with_pool_capacity(DEFAULT_PAGES)
    }

    pub fn with_pool_capacity(pages: usize) -> Arc<Self> {
        Arc::new(Self {
            catalog: RwLock::new(Catalog::new()),
            buffer_pool: BufferPool::new(pages),
            concurrent_status: ConcurrentStatus::new(),
            log_manager: RwLock::new(Box::new(NoopLog)),
        })
    }

    pub fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.rl()
    }

    pub fn mut_catalog(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.wl()
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    pub fn concurrent_status(&self) -> &ConcurrentStatus {
        &self.concurrent_status
    }

    pub fn mut_log_manager(&self) -> RwLockWriteGuard<'_, Box<dyn RecoveryLog>> {
        self.log_manager.wl()
    }

    /// Swap in a real write-ahead log implementation.
    pub fn set_log_manager(&self, log: Box<dyn RecoveryLog>) {
        *self.log_manager.wl() = log;
    }
}

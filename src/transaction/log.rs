use crate::{transaction::TransactionID, types::DbResult};

/// Hook points the engine offers a write-ahead log.
///
/// The buffer pool calls `log_write` followed by `force` immediately
/// before each disk write of a dirty page, and `log_commit` /
/// `log_abort` when a transaction finishes. The log implementation
/// itself (record format, recovery) lives outside this crate; the
/// default is to log nothing.
pub trait RecoveryLog: Send + Sync {
    fn log_start(&mut self, _tid: TransactionID) -> DbResult {
        Ok(())
    }

    fn log_commit(&mut self, _tid: TransactionID) -> DbResult {
        Ok(())
    }

    fn log_abort(&mut self, _tid: TransactionID) -> DbResult {
        Ok(())
    }

    /// Record an update with the page images before and after the
    /// change, keyed by the dirtying transaction.
    fn log_write(
        &mut self,
        _tid: TransactionID,
        _before_image: &[u8],
        _after_image: &[u8],
    ) -> DbResult {
        Ok(())
    }

    /// Make everything logged so far durable.
    fn force(&mut self) -> DbResult {
        Ok(())
    }
}

/// The default collaborator: a database without write-ahead logging.
pub struct NoopLog;

impl RecoveryLog for NoopLog {}

pub mod aggregate;
pub mod delete;
pub mod filter;
pub mod insert;
pub mod join;
pub mod seq_scan;

pub use aggregate::{AggOp, Aggregate};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use join::Join;
pub use seq_scan::SeqScan;

use crate::{error::DbError, storage::schema::Schema, storage::tuple::Tuple, types::DbResult};

/// The pull contract shared by all relational operators.
///
/// An operator tree is driven from the root: `open`, then repeated
/// `fetch_next` until it yields `None`, then `close`. `open` may call
/// into the buffer pool and therefore block on latches or fail with
/// `TransactionAborted`. Latches outlive `close`; they are only
/// released by `transaction_complete`.
pub trait OpIterator {
    fn open(&mut self) -> DbResult;

    fn close(&mut self) -> DbResult;

    /// Restart from the beginning; equivalent to close + open.
    fn rewind(&mut self) -> DbResult;

    /// The next tuple, or `None` once the stream is exhausted.
    fn fetch_next(&mut self) -> Result<Option<Tuple>, DbError>;

    fn tuple_desc(&self) -> Schema;

    fn children(&self) -> Vec<&dyn OpIterator>;

    /// Replace the children, handing the old ones back to the caller.
    fn set_children(&mut self, children: Vec<Box<dyn OpIterator>>) -> Vec<Box<dyn OpIterator>>;
}

pub(crate) fn check_open(opened: bool) -> DbResult {
    if !opened {
        return Err(DbError::IllegalState(
            "operator has not been opened".to_string(),
        ));
    }
    Ok(())
}

pub mod common;
pub mod error;
pub mod heap;
pub mod io;
pub mod operator;
pub mod optimizer;
pub mod predicate;
pub mod storage;
pub mod transaction;
pub mod types;
pub mod utils;

pub use common::{Catalog, Database};
pub use error::DbError;
pub use heap::{BufferPool, HeapPage, HeapPageID, HeapTable, HeapTableIterator};
pub use operator::{AggOp, Aggregate, Delete, Filter, Insert, Join, OpIterator, SeqScan};
pub use optimizer::{IntHistogram, TableStats};
pub use predicate::{JoinPredicate, Op, Predicate};
pub use storage::schema::{simple_int_schema, FieldItem, Schema, Type};
pub use storage::tuple::{Cell, RecordId, Tuple};
pub use transaction::concurrent_status::DEFAULT_DEADLOCK_TIMEOUT_MS;
pub use transaction::{
    ConcurrentStatus, Lock, NoopLog, Permission, RecoveryLog, Transaction, TransactionID,
};
pub use types::{DbResult, Pod, ResultPod};

pub mod concurrent_status;
pub mod log;
pub mod tx;

pub use concurrent_status::{ConcurrentStatus, Lock, Permission};
pub use self::log::{NoopLog, RecoveryLog};
pub use tx::{Transaction, TransactionID};

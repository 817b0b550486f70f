use std::{error::Error, fmt};

use log::debug;

/// Crate-wide error type.
///
/// `TransactionAborted` is the only variant upper layers are expected
/// to recover from: the driver should abort the transaction and may
/// retry with a fresh one. Everything else signals a broken request or
/// a broken environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    Io(String),
    InvalidRecord(String),
    PageFull,
    CacheFull,
    TypeMismatch(String),
    IllegalState(String),
    IllegalArgument(String),
    TransactionAborted,
}

impl DbError {
    pub fn io(msg: &str) -> Self {
        DbError::Io(msg.to_string())
    }

    pub fn show_backtrace(&self) {
        let bt = backtrace::Backtrace::new();
        debug!("{}\n{:?}", self, bt);
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DbError::Io(msg) => write!(f, "io error: {}", msg),
            DbError::InvalidRecord(msg) => write!(f, "invalid record: {}", msg),
            DbError::PageFull => write!(f, "no empty slot on page"),
            DbError::CacheFull => write!(f, "buffer pool full, all pages dirty"),
            DbError::TypeMismatch(msg) => write!(f, "type mismatch: {}", msg),
            DbError::IllegalState(msg) => write!(f, "illegal state: {}", msg),
            DbError::IllegalArgument(msg) => write!(f, "illegal argument: {}", msg),
            DbError::TransactionAborted => write!(f, "transaction aborted (lock timeout)"),
        }
    }
}

impl Error for DbError {}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        DbError::Io(e.to_string())
    }
}

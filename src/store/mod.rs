//! Persistent key-value store shared by the foreground and background contexts
//!
//! Values are plain JSON. There are no transactions and no atomicity across
//! keys: the last `set` wins.

pub mod memory;
pub mod file;
pub mod timer;

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryStore;
pub use file::FileStore;

/// Partial record returned by `get` and accepted by `set`
pub type Record = Map<String, Value>;

/// Well-known store keys
pub mod keys {
    pub const TIMER_STATE: &str = "timerState";
    pub const TIMER_SETTINGS: &str = "timerSettings";
    pub const BLOCKED_WEBSITES: &str = "blockedWebsites";
    pub const BLOCKING_ENABLED: &str = "blockingEnabled";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store contents are not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Asynchronous key-value storage
pub trait Store: Send + Sync {
    /// Fetch the given keys. Missing keys are simply absent from the record.
    fn get<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, Result<Record, StoreError>>;

    /// Merge `record` into the store
    fn set(&self, record: Record) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Delete the given keys; unknown keys are ignored
    fn remove<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, Result<(), StoreError>>;
}

/// Build a one-entry record
pub fn record(key: &str, value: Value) -> Record {
    let mut record = Record::new();
    record.insert(key.to_string(), value);
    record
}

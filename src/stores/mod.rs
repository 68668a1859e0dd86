//! Key/value storage backends for the escrow store. Provides:
//! - In-process storage with an optional byte quota ([`MemoryStorage`])
//! - One JSON file per key in a directory ([`FileStorage`])
//!
//! Both behave like browser local storage: string keys, string values,
//! reading a missing key is not an error.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::StorageError;

pub trait Storage: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

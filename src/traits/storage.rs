//! Key/value persistence for the configuration record.
//!
//! The configuration lives in one flash namespace as individual keys with
//! atomic per-key writes (see [`crate::config`] for the key layout). This
//! trait abstracts the store so that the record can be exercised on the host
//! against an in-memory map; the ESP32 binding wraps an NVS handle.

extern crate alloc;
use alloc::string::String;

/// Per-key persistent storage under a single namespace.
///
/// Missing keys are not errors: reads return `Ok(None)` and erasing an
/// absent key succeeds. Errors are reserved for the storage layer itself
/// (flash I/O, serialization of the handle).
pub trait ConfigStore {
    /// Error type for storage operations.
    type Error;

    /// Read a string value, `None` if the key has never been written.
    fn get_str(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Write a string value.
    fn set_str(&mut self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Read a byte value, `None` if the key has never been written.
    fn get_u8(&self, key: &str) -> Result<Option<u8>, Self::Error>;

    /// Write a byte value.
    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), Self::Error>;

    /// Erase one key. Erasing an absent key is not an error.
    fn erase(&mut self, key: &str) -> Result<(), Self::Error>;
}

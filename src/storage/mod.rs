//! # File storage abstraction for embedded systems
//!
//! Configuration documents live in a small flat namespace of named files,
//! the shape exposed by SPIFFS, LittleFS and most on-chip flash filesystems.
//! This module defines that interface and two implementations:
//!
//! - [`MemoryStorage`]: a fixed-capacity RAM store, usable anywhere
//! - [`DirStorage`]: files under a host directory (with the `std` feature)
//!
//! # Usage Examples
//!
//! ```rust
//! use iotlink::storage::{FileStorage, MemoryStorage};
//!
//! let mut storage: MemoryStorage<4, 256> = MemoryStorage::new();
//! storage.write("/boot.txt", b"count=1").unwrap();
//!
//! let mut buf = [0u8; 32];
//! let n = storage.read("/boot.txt", &mut buf).unwrap();
//! assert_eq!(&buf[..n], b"count=1");
//! ```

#![deny(unsafe_code)]

/// Common error types for storage operations
pub mod error;

mod memory;

#[cfg(feature = "std")]
mod fs;

#[cfg(test)]
mod tests;

pub use memory::{MAX_NAME_LEN, MemoryStorage};

#[cfg(feature = "std")]
pub use fs::DirStorage;

/// A flat namespace of named byte files.
///
/// Names are opaque strings; backends may impose a length limit. Every write
/// replaces the whole file.
///
/// # Examples
///
/// ```rust,no_run
/// use iotlink::storage::FileStorage;
///
/// fn bump_counter<S: FileStorage>(storage: &mut S) -> Result<u8, S::Error> {
///     let mut buf = [0u8; 1];
///     let current = if storage.exists("/counter") {
///         storage.read("/counter", &mut buf)?;
///         buf[0]
///     } else {
///         0
///     };
///     storage.write("/counter", &[current.wrapping_add(1)])?;
///     Ok(current.wrapping_add(1))
/// }
/// ```
pub trait FileStorage {
    /// Associated error type for storage operations
    type Error: core::fmt::Debug;

    /// Check whether a file exists.
    fn exists(&self, name: &str) -> bool;

    /// Size of a file in bytes.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file does not exist
    fn size(&self, name: &str) -> Result<usize, Self::Error>;

    /// Read a whole file into `buf`, returning the number of bytes read.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file does not exist
    /// - `BufferTooSmall` if the file does not fit in `buf`
    fn read(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Create or truncate a file and write `bytes` to it.
    ///
    /// # Errors
    ///
    /// - `NameTooLong` if the backend cannot store the name
    /// - `OutOfSpace` if the backend has no room
    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Delete a file.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file does not exist
    fn remove(&mut self, name: &str) -> Result<(), Self::Error>;

    /// Rename a file, replacing any file already named `to`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `from` does not exist
    fn rename(&mut self, from: &str, to: &str) -> Result<(), Self::Error>;
}

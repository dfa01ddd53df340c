//! Read-only asset storage used by the views (BMP images).
//!
//! An [`AssetStore`] resolves an absolute path such as `/images1/c.bmp` to a
//! file handle that supports random access through the `embedded-io`
//! [`Read`] and [`Seek`] traits. Closing a file is dropping its handle.
//!
//! The firmware backs this with a FAT volume on the SD card, the simulator
//! with the host filesystem, and tests with [`MemoryStore`].

mod memory;

pub use memory::{MemoryFile, MemoryStore};

use embedded_io::{ErrorKind, Read, Seek};
use thiserror_no_std::Error;

/// Errors returned when opening an asset.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The path does not exist. Callers treat this as a recoverable skip.
    #[error("asset not found")]
    NotFound,
    /// The path is not usable on this store (too deep, bad name, ...).
    #[error("invalid asset path")]
    InvalidPath,
    /// The underlying device or filesystem failed.
    #[error("storage device error: {0:?}")]
    Device(ErrorKind),
}

/// A random-access source of asset files.
pub trait AssetStore {
    /// Open file handle. Borrowing the store keeps handle lifetimes tied to
    /// the volume they were opened from.
    type File<'a>: Read + Seek
    where
        Self: 'a;

    /// Open `path` for reading.
    fn open(&mut self, path: &str) -> Result<Self::File<'_>, StorageError>;
}

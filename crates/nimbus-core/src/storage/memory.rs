use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_io::{ErrorType, Read, Seek, SeekFrom};

use super::{AssetStore, StorageError};

/// Asset store holding every file in RAM.
///
/// Useful for tests and for assets compiled into the binary with
/// `include_bytes!`.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&mut self, path: &str, data: impl Into<Vec<u8>>) {
        self.files.insert(String::from(path), data.into());
    }

    pub fn with_file(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl AssetStore for MemoryStore {
    type File<'a> = MemoryFile<'a>;

    fn open(&mut self, path: &str) -> Result<Self::File<'_>, StorageError> {
        self.files
            .get(path)
            .map(|data| MemoryFile::new(data))
            .ok_or(StorageError::NotFound)
    }
}

/// Cursor over an in-memory file.
///
/// Seeking past the end is allowed; reads there return 0 bytes.
#[derive(Debug, Clone)]
pub struct MemoryFile<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MemoryFile<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

impl ErrorType for MemoryFile<'_> {
    type Error = Infallible;
}

impl Read for MemoryFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let remaining = self.data.get(self.pos..).unwrap_or(&[]);
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Seek for MemoryFile<'_> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(delta) => self.data.len() as i64 + delta,
            SeekFrom::Current(delta) => self.pos as i64 + delta,
        };
        self.pos = target.max(0) as usize;
        Ok(self.pos as u64)
    }
}

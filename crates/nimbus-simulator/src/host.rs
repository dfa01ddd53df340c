//! Host filesystem stand-ins for the SD card and the network.

use std::fs;
use std::io::{self, Seek as _};
use std::path::{Path, PathBuf};

use embedded_io::{ErrorKind, ErrorType, Read, Seek, SeekFrom};
use log::{debug, warn};
use nimbus_core::forecast::{Forecast, ForecastError, ForecastSource};
use nimbus_core::storage::{AssetStore, StorageError};

/// `std::io::Error` wearing the `embedded-io` error trait.
#[derive(Debug)]
pub struct HostIoError(io::Error);

impl core::fmt::Display for HostIoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for HostIoError {}

impl embedded_io::Error for HostIoError {
    fn kind(&self) -> ErrorKind {
        match self.0.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::InvalidInput => ErrorKind::InvalidInput,
            io::ErrorKind::InvalidData => ErrorKind::InvalidData,
            io::ErrorKind::UnexpectedEof => ErrorKind::InvalidData,
            io::ErrorKind::Interrupted => ErrorKind::Interrupted,
            _ => ErrorKind::Other,
        }
    }
}

/// Asset store rooted at a directory laid out like the SD card.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            return Err(StorageError::InvalidPath);
        }
        Ok(self.root.join(relative))
    }
}

impl AssetStore for FileStore {
    type File<'a> = HostFile;

    fn open(&mut self, path: &str) -> Result<Self::File<'_>, StorageError> {
        let full = self.resolve(path)?;
        match fs::File::open(&full) {
            Ok(file) => Ok(HostFile(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => {
                warn!("open {} failed: {}", full.display(), e);
                Err(StorageError::Device(ErrorKind::Other))
            }
        }
    }
}

pub struct HostFile(fs::File);

impl ErrorType for HostFile {
    type Error = HostIoError;
}

impl Read for HostFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        io::Read::read(&mut self.0, buf).map_err(HostIoError)
    }
}

impl Seek for HostFile {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        let pos = match pos {
            SeekFrom::Start(offset) => io::SeekFrom::Start(offset),
            SeekFrom::End(delta) => io::SeekFrom::End(delta),
            SeekFrom::Current(delta) => io::SeekFrom::Current(delta),
        };
        self.0.seek(pos).map_err(HostIoError)
    }
}

/// Forecast source that re-reads a saved location response on every fetch.
pub struct FileForecastSource {
    path: PathBuf,
}

impl FileForecastSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ForecastSource for FileForecastSource {
    async fn fetch(&mut self) -> Result<Forecast, ForecastError> {
        debug!("Loading forecast from {}", self.path.display());
        let body = fs::read(&self.path).map_err(ForecastError::network)?;
        Forecast::decode(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nimbus-sim-{}-{}", name, std::process::id()));
        fs::create_dir_all(dir.join("images1")).unwrap();
        dir
    }

    #[test]
    fn test_file_store_reads_and_seeks() {
        let dir = scratch_dir("store");
        fs::write(dir.join("images1/c.bmp"), b"BM0123456789").unwrap();

        let mut store = FileStore::new(&dir);
        let mut file = store.open("/images1/c.bmp").unwrap();
        assert_eq!(file.seek(SeekFrom::Start(2)).unwrap(), 2);
        let mut buf = [0u8; 4];
        file.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"0123");

        assert!(matches!(
            store.open("/images1/x.bmp"),
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            store.open("/../etc/passwd"),
            Err(StorageError::InvalidPath)
        ));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_forecast_file_is_network_error() {
        let mut source = FileForecastSource::new("/nonexistent/forecast.json");
        assert!(matches!(
            block_on(source.fetch()),
            Err(ForecastError::Network(_))
        ));
    }
}

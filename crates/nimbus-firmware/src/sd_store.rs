//! Read-only asset store on the SD card's first FAT volume.
//!
//! The card shares the SPI bus with the LCD. Both drivers are blocking, and
//! the display manager is the only user of either, so accesses never
//! overlap.

use embedded_io::{ErrorKind, ErrorType, Read, Seek, SeekFrom};
use embedded_sdmmc::{
    Mode, RawDirectory, RawFile, RawVolume, SdCard, SdCardError, TimeSource, Timestamp,
    VolumeIdx, VolumeManager,
};
use log::{debug, warn};
use nimbus_core::storage::{AssetStore, StorageError};

type Volumes<S, D, T> = VolumeManager<SdCard<S, D>, T, 4, 4, 1>;
type FsError = embedded_sdmmc::Error<SdCardError>;

/// Timestamp source for a store that never writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedTime;

impl TimeSource for FixedTime {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 50,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

fn storage_error(err: FsError) -> StorageError {
    match err {
        embedded_sdmmc::Error::NotFound => StorageError::NotFound,
        embedded_sdmmc::Error::FilenameError(_) | embedded_sdmmc::Error::TooManyOpenDirs => {
            StorageError::InvalidPath
        }
        other => StorageError::Device(io_error_kind(&other)),
    }
}

fn io_error_kind(err: &FsError) -> ErrorKind {
    match err {
        embedded_sdmmc::Error::NotFound => ErrorKind::NotFound,
        embedded_sdmmc::Error::InvalidOffset => ErrorKind::InvalidInput,
        embedded_sdmmc::Error::EndOfFile => ErrorKind::InvalidData,
        _ => ErrorKind::Other,
    }
}

/// I/O error of an open [`SdAssetFile`].
#[derive(Debug)]
pub enum SdIoError {
    Fs(FsError),
    /// Seek target outside what FAT offsets can express.
    OutOfRange,
}

impl core::fmt::Display for SdIoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SdIoError::Fs(e) => write!(f, "SD card error: {:?}", e),
            SdIoError::OutOfRange => f.write_str("seek out of range"),
        }
    }
}

impl core::error::Error for SdIoError {}

impl embedded_io::Error for SdIoError {
    fn kind(&self) -> ErrorKind {
        match self {
            SdIoError::Fs(e) => io_error_kind(e),
            SdIoError::OutOfRange => ErrorKind::InvalidInput,
        }
    }
}

impl From<FsError> for SdIoError {
    fn from(err: FsError) -> Self {
        SdIoError::Fs(err)
    }
}

pub struct SdAssetStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    volume_mgr: Volumes<S, D, T>,
    volume: Option<RawVolume>,
}

impl<S, D, T> SdAssetStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    pub fn new(sd_card: SdCard<S, D>, ts: T) -> Self {
        Self {
            volume_mgr: VolumeManager::new(sd_card, ts),
            volume: None,
        }
    }

    /// The volume is opened on first use and kept open. A card inserted
    /// after boot is picked up by the next open.
    fn volume(&mut self) -> Result<RawVolume, FsError> {
        if let Some(volume) = self.volume {
            return Ok(volume);
        }
        let volume = self.volume_mgr.open_raw_volume(VolumeIdx(0))?;
        debug!("SD volume 0 opened");
        self.volume = Some(volume);
        Ok(volume)
    }

    /// Walk `dirs` down from the root, closing each parent on the way.
    fn open_parent<'p>(
        &self,
        volume: RawVolume,
        dirs: impl Iterator<Item = &'p str>,
    ) -> Result<RawDirectory, FsError> {
        let mut dir = self.volume_mgr.open_root_dir(volume)?;
        for name in dirs {
            let child = self.volume_mgr.open_dir(dir, name);
            self.volume_mgr.close_dir(dir)?;
            dir = child?;
        }
        Ok(dir)
    }

    fn open_file(&mut self, path: &str) -> Result<RawFile, FsError> {
        let volume = self.volume()?;
        let mut components = path.trim_start_matches('/').rsplitn(2, '/');
        let file_name = components.next().unwrap_or("");
        let dirs = components
            .next()
            .into_iter()
            .flat_map(|parent| parent.split('/'))
            .filter(|name| !name.is_empty());

        let dir = self.open_parent(volume, dirs)?;
        let file = self
            .volume_mgr
            .open_file_in_dir(dir, file_name, Mode::ReadOnly);
        self.volume_mgr.close_dir(dir)?;
        file
    }
}

impl<S, D, T> AssetStore for SdAssetStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    type File<'a>
        = SdAssetFile<'a, S, D, T>
    where
        Self: 'a;

    fn open(&mut self, path: &str) -> Result<Self::File<'_>, StorageError> {
        match self.open_file(path) {
            Ok(file) => Ok(SdAssetFile {
                volume_mgr: &self.volume_mgr,
                file,
            }),
            Err(e) => {
                if !matches!(e, embedded_sdmmc::Error::NotFound) {
                    warn!("SD open {} failed: {:?}", path, e);
                    // Force a remount on the next open
                    if let Some(volume) = self.volume.take() {
                        let _ = self.volume_mgr.close_volume(volume);
                    }
                }
                Err(storage_error(e))
            }
        }
    }
}

/// Open file on the SD card. Dropping it closes the file.
pub struct SdAssetFile<'a, S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    volume_mgr: &'a Volumes<S, D, T>,
    file: RawFile,
}

impl<S, D, T> ErrorType for SdAssetFile<'_, S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    type Error = SdIoError;
}

impl<S, D, T> Read for SdAssetFile<'_, S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() || self.volume_mgr.file_eof(self.file)? {
            return Ok(0);
        }
        Ok(self.volume_mgr.read(self.file, buf)?)
    }
}

impl<S, D, T> Seek for SdAssetFile<'_, S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        let vm = self.volume_mgr;
        match pos {
            SeekFrom::Start(offset) => {
                let offset = u32::try_from(offset).map_err(|_| SdIoError::OutOfRange)?;
                vm.file_seek_from_start(self.file, offset)?;
            }
            SeekFrom::Current(delta) => {
                let delta = i32::try_from(delta).map_err(|_| SdIoError::OutOfRange)?;
                vm.file_seek_from_current(self.file, delta)?;
            }
            SeekFrom::End(delta) => {
                let target = i64::from(vm.file_length(self.file)?) + delta;
                let target = u32::try_from(target).map_err(|_| SdIoError::OutOfRange)?;
                vm.file_seek_from_start(self.file, target)?;
            }
        }
        Ok(u64::from(vm.file_offset(self.file)?))
    }
}

impl<S, D, T> Drop for SdAssetFile<'_, S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    fn drop(&mut self) {
        if let Err(e) = self.volume_mgr.close_file(self.file) {
            warn!("SD close failed: {:?}", e);
        }
    }
}

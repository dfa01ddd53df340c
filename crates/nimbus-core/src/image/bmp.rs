//! Streaming 24-bit BMP decoder that blits straight to a draw target.
//!
//! Only uncompressed (`BI_RGB`) 24 bits-per-pixel bitmaps are drawn. The
//! image is never scaled: a narrow image is centered on the target, a wide
//! one is center-cropped to the target width. Rows are read one at a time
//! through a small 20 pixel buffer so a full-screen image never has to fit
//! in RAM, and each row is handed to the target as a single
//! `fill_contiguous` call.
//!
//! # File layout
//!
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 14   | file header (`BM`, size, offset)        |
//! | 14     | 40   | DIB header (`BITMAPINFOHEADER`)         |
//! | offset | ...  | pixel rows, bottom row first, B-G-R     |
//!
//! Every stored row is padded to a multiple of 4 bytes.

use alloc::vec::Vec;
use core::fmt::Debug;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_io::{Error as _, ErrorKind, Read, ReadExactError, Seek, SeekFrom};
use log::{debug, info, warn};
use thiserror_no_std::Error;

use crate::storage::{AssetStore, StorageError};

/// Size of the BMP file header in bytes.
pub const FILE_HEADER_LEN: usize = 14;

/// Size of the `BITMAPINFOHEADER` DIB header in bytes.
pub const INFO_HEADER_LEN: usize = 40;

const BMP_MAGIC: [u8; 2] = *b"BM";
const BYTES_PER_PIXEL: usize = 3;
const SUPPORTED_DEPTH: u16 = 24;
const COMPRESSION_NONE: u32 = 0;

/// Pixels fetched per read while streaming a row.
const BUFFER_PIXELS: usize = 20;
const BUFFER_LEN: usize = BUFFER_PIXELS * BYTES_PER_PIXEL;

/// Errors that abort a blit.
///
/// An unsupported pixel format is not an error, see [`BlitOutcome::Unsupported`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmpError {
    #[error("not a BMP file (magic {0:?})")]
    BadMagic([u8; 2]),
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("read failed: {0:?}")]
    Io(ErrorKind),
    #[error("draw target rejected a pixel row")]
    Draw,
}

impl<E: embedded_io::Error> From<ReadExactError<E>> for BmpError {
    fn from(err: ReadExactError<E>) -> Self {
        match err {
            ReadExactError::UnexpectedEof => BmpError::UnexpectedEof,
            ReadExactError::Other(e) => BmpError::Io(e.kind()),
        }
    }
}

fn io_error<E: embedded_io::Error>(err: E) -> BmpError {
    BmpError::Io(err.kind())
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn le_i32(bytes: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// The 14-byte BMP file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapHeader {
    pub magic: [u8; 2],
    pub file_size: u32,
    pub creator1: u16,
    pub creator2: u16,
    /// Byte offset from the start of the file to the first pixel row.
    pub pixel_offset: u32,
}

impl BitmapHeader {
    pub fn parse(bytes: &[u8; FILE_HEADER_LEN]) -> Self {
        Self {
            magic: [bytes[0], bytes[1]],
            file_size: le_u32(bytes, 2),
            creator1: le_u16(bytes, 6),
            creator2: le_u16(bytes, 8),
            pixel_offset: le_u32(bytes, 10),
        }
    }

    pub fn is_bmp(&self) -> bool {
        self.magic == BMP_MAGIC
    }
}

/// The 40-byte `BITMAPINFOHEADER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapInfo {
    pub header_size: u32,
    pub width: i32,
    /// Positive heights store rows bottom-to-top.
    pub height: i32,
    pub planes: u16,
    pub depth: u16,
    pub compression: u32,
    pub image_size: u32,
    pub h_resolution: i32,
    pub v_resolution: i32,
    pub colors: u32,
    pub important_colors: u32,
}

impl BitmapInfo {
    pub fn parse(bytes: &[u8; INFO_HEADER_LEN]) -> Self {
        Self {
            header_size: le_u32(bytes, 0),
            width: le_i32(bytes, 4),
            height: le_i32(bytes, 8),
            planes: le_u16(bytes, 12),
            depth: le_u16(bytes, 14),
            compression: le_u32(bytes, 16),
            image_size: le_u32(bytes, 20),
            h_resolution: le_i32(bytes, 24),
            v_resolution: le_i32(bytes, 28),
            colors: le_u32(bytes, 32),
            important_colors: le_u32(bytes, 36),
        }
    }

    /// Whether this decoder can draw the image.
    ///
    /// Top-down bitmaps (negative height) and empty images are skipped the
    /// same way as other pixel formats.
    pub fn is_supported(&self) -> bool {
        self.depth == SUPPORTED_DEPTH
            && self.compression == COMPRESSION_NONE
            && self.width > 0
            && self.height > 0
    }
}

/// Bytes occupied by one stored row of a 24 bpp image, padding included.
pub const fn row_stride(width: u32) -> u64 {
    (width as u64 * BYTES_PER_PIXEL as u64).div_ceil(4) * 4
}

/// Pack 8-bit channels into a 5-6-5 pixel (red in bits 15-11).
pub const fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
}

#[inline]
fn bgr_to_rgb565(bgr: &[u8]) -> Rgb565 {
    Rgb565::from(RawU16::new(pack_rgb565(bgr[2], bgr[1], bgr[0])))
}

/// Where the image lands on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Target row of the image's top row.
    pub y: i32,
    pub target_width: u32,
    pub target_height: u32,
}

/// Source columns and rows that get drawn, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    /// Target column of the first drawn pixel.
    pub x: u32,
    /// First source column drawn.
    pub first_col: u32,
    /// Number of columns drawn per row.
    pub cols: u32,
    /// Number of rows drawn, starting at source row 0.
    pub rows: u32,
}

impl CropWindow {
    pub fn new(width: u32, height: u32, target_width: u32) -> Self {
        let (x, first_col, cols) = if target_width >= width {
            ((target_width - width) / 2, 0, width)
        } else {
            (0, (width - target_width) / 2, target_width)
        };

        // No vertical window: every source row is drawn whatever the target
        // height, rows past the bottom edge are clipped by the target.
        Self {
            x,
            first_col,
            cols,
            rows: height,
        }
    }
}

/// Result of a blit that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitOutcome {
    Drawn(CropWindow),
    /// Pixel format this decoder does not draw; nothing was written.
    Unsupported { depth: u16, compression: u32 },
}

/// Decode the BMP in `file` (positioned at offset 0) onto `target`.
///
/// Rows already written when an error occurs stay on the target.
pub fn draw_bitmap<F, D>(
    file: &mut F,
    placement: Placement,
    target: &mut D,
) -> Result<BlitOutcome, BmpError>
where
    F: Read + Seek,
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
{
    let mut header_bytes = [0u8; FILE_HEADER_LEN];
    file.read_exact(&mut header_bytes[..2])?;
    if header_bytes[..2] != BMP_MAGIC {
        return Err(BmpError::BadMagic([header_bytes[0], header_bytes[1]]));
    }
    file.read_exact(&mut header_bytes[2..])?;
    let header = BitmapHeader::parse(&header_bytes);
    debug!(
        "BMP file size={} pixel offset={}",
        header.file_size, header.pixel_offset
    );

    let mut info_bytes = [0u8; INFO_HEADER_LEN];
    file.read_exact(&mut info_bytes)?;
    let info = BitmapInfo::parse(&info_bytes);

    if !info.is_supported() {
        debug!(
            "Skipping BMP: {}x{} depth={} compression={}",
            info.width, info.height, info.depth, info.compression
        );
        return Ok(BlitOutcome::Unsupported {
            depth: info.depth,
            compression: info.compression,
        });
    }

    // Both dimensions are positive past `is_supported`
    let width = info.width as u32;
    let height = info.height as u32;
    let stride = row_stride(width);
    let window = CropWindow::new(width, height, placement.target_width);
    info!(
        "BMP w={} h={} x={} cols={} first_col={} y={} target={}x{}",
        width,
        height,
        window.x,
        window.cols,
        window.first_col,
        placement.y,
        placement.target_width,
        placement.target_height
    );

    let row_bytes = window.cols as usize * BYTES_PER_PIXEL;
    let col_offset = u64::from(window.first_col) * BYTES_PER_PIXEL as u64;
    let mut chunk = [0u8; BUFFER_LEN];
    let mut colors: Vec<Rgb565> = Vec::with_capacity(window.cols as usize);

    for row in 0..window.rows {
        let stored_row = u64::from(height - 1 - row);
        let offset = u64::from(header.pixel_offset) + stored_row * stride + col_offset;
        file.seek(SeekFrom::Start(offset)).map_err(io_error)?;

        colors.clear();
        let mut remaining = row_bytes;
        while remaining > 0 {
            let len = remaining.min(BUFFER_LEN);
            file.read_exact(&mut chunk[..len])?;
            colors.extend(chunk[..len].chunks_exact(BYTES_PER_PIXEL).map(bgr_to_rgb565));
            remaining -= len;
        }

        let area = Rectangle::new(
            Point::new(window.x as i32, row as i32 + placement.y),
            Size::new(window.cols, 1),
        );
        target
            .fill_contiguous(&area, colors.iter().copied())
            .map_err(|e| {
                warn!("Pixel row {} rejected: {:?}", row, e);
                BmpError::Draw
            })?;
    }

    Ok(BlitOutcome::Drawn(window))
}

/// Open `path` in `store` and draw it with [`draw_bitmap`].
///
/// Never fails: a missing file, a non-BMP file or a truncated file is
/// logged as a warning, an unsupported pixel format is skipped silently.
pub fn blit_bitmap<S, D>(
    store: &mut S,
    path: &str,
    y: i32,
    target_width: u32,
    target_height: u32,
    target: &mut D,
) where
    S: AssetStore,
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
{
    let mut file = match store.open(path) {
        Ok(file) => file,
        Err(StorageError::NotFound) => {
            warn!("File not found [{}]", path);
            return;
        }
        Err(e) => {
            warn!("Cannot open [{}]: {}", path, e);
            return;
        }
    };

    let placement = Placement {
        y,
        target_width,
        target_height,
    };
    match draw_bitmap(&mut file, placement, target) {
        Ok(BlitOutcome::Drawn(window)) => debug!("Drew [{}]: {} rows", path, window.rows),
        Ok(BlitOutcome::Unsupported { .. }) => {}
        Err(BmpError::BadMagic(_)) => warn!("File is not BMP [{}]", path),
        Err(e) => warn!("Failed to draw [{}]: {}", path, e),
    }
}

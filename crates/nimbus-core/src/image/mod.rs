//! Image decoding for the weather icon view.

pub mod bmp;

pub use bmp::{
    BitmapHeader, BitmapInfo, BlitOutcome, BmpError, CropWindow, Placement, blit_bitmap,
    draw_bitmap, pack_rgb565, row_stride,
};

//! RAM framebuffer with per-pixel change detection.
//!
//! Views render into this buffer instead of the SPI panel. Once a view is
//! complete only the bounding rectangle of changed pixels is pushed to the
//! hardware in a single `fill_contiguous` call, so a button press that
//! switches views never shows a half-drawn screen.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::debug;

use crate::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

/// Bounding box of pixels that have changed since the last flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirtyRect {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl DirtyRect {
    fn expand(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn from_point(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn as_rectangle(&self) -> Rectangle {
        Rectangle::new(
            Point::new(self.min_x as i32, self.min_y as i32),
            Size::new(
                (self.max_x - self.min_x + 1) as u32,
                (self.max_y - self.min_y + 1) as u32,
            ),
        )
    }
}

/// Heap-allocated framebuffer implementing `DrawTarget<Color = Rgb565>`.
///
/// The full-panel buffer is 320x240x2 = 153,600 bytes.
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgb565>,
    dirty: Option<DirtyRect>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Allocate a full-panel framebuffer filled with black pixels.
    pub fn new() -> Self {
        Self::with_size(DISPLAY_WIDTH_PX as usize, DISPLAY_HEIGHT_PX as usize)
    }

    pub fn with_size(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb565::BLACK; width * height],
            dirty: None,
        }
    }

    /// Color at `(x, y)`, `None` outside the buffer.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb565> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Region that the next [`flush`](Self::flush) will send, if any.
    pub fn dirty_area(&self) -> Option<Rectangle> {
        self.dirty.as_ref().map(DirtyRect::as_rectangle)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Write a single pixel, expanding the dirty rect only if the color changed.
    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: Rgb565) {
        let idx = y * self.width + x;
        if self.pixels[idx] != color {
            self.pixels[idx] = color;
            match &mut self.dirty {
                Some(rect) => rect.expand(x, y),
                None => self.dirty = Some(DirtyRect::from_point(x, y)),
            }
        }
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Flush the dirty region to a hardware display, then reset the dirty state.
    ///
    /// If nothing changed this is a no-op.
    pub fn flush<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let Some(rect) = self.dirty.take() else {
            return Ok(());
        };

        let area = rect.as_rectangle();
        debug!(
            "Flushing {}x{} dirty region at ({}, {})",
            area.size.width, area.size.height, rect.min_x, rect.min_y
        );

        let pixels = &self.pixels;
        let stride = self.width;
        let width = area.size.width as usize;
        let pixel_iter = (rect.min_y..=rect.max_y).flat_map(move |y| {
            let row_start = y * stride + rect.min_x;
            pixels[row_start..row_start + width].iter().copied()
        });

        display.fill_contiguous(&area, pixel_iter)
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            if self.in_bounds(coord.x, coord.y) {
                self.set_pixel(coord.x as usize, coord.y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // Colors are consumed for every cell of `area`, including clipped
        // ones, so partially visible areas stay aligned.
        let mut colors = colors.into_iter();
        for point in area.points() {
            let Some(color) = colors.next() else {
                break;
            };
            if self.in_bounds(point.x, point.y) {
                self.set_pixel(point.x as usize, point.y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let visible = area.intersection(&self.bounding_box());
        let Some(bottom_right) = visible.bottom_right() else {
            return Ok(());
        };

        for y in visible.top_left.y..=bottom_right.y {
            for x in visible.top_left.x..=bottom_right.x {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        for y in 0..self.height {
            for x in 0..self.width {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mock_display::MockDisplay;

    #[test]
    fn test_new_buffer_is_clean() {
        let fb = FrameBuffer::new();
        assert_eq!(fb.size(), Size::new(320, 240));
        assert!(!fb.is_dirty());
        assert_eq!(fb.pixel(0, 0), Some(Rgb565::BLACK));
        assert_eq!(fb.pixel(320, 0), None);
    }

    #[test]
    fn test_unchanged_pixels_do_not_dirty() {
        let mut fb = FrameBuffer::with_size(8, 8);
        fb.clear(Rgb565::BLACK).unwrap();
        assert!(!fb.is_dirty());

        Pixel(Point::new(2, 3), Rgb565::RED).draw(&mut fb).unwrap();
        Pixel(Point::new(5, 1), Rgb565::RED).draw(&mut fb).unwrap();
        assert_eq!(
            fb.dirty_area(),
            Some(Rectangle::new(Point::new(2, 1), Size::new(4, 3)))
        );
    }

    #[test]
    fn test_fill_contiguous_clips_negative_origin() {
        let mut fb = FrameBuffer::with_size(4, 2);
        let area = Rectangle::new(Point::new(-2, 0), Size::new(4, 1));
        let colors = [Rgb565::RED, Rgb565::GREEN, Rgb565::BLUE, Rgb565::WHITE];
        fb.fill_contiguous(&area, colors).unwrap();

        // The first two colors fall off the left edge
        assert_eq!(fb.pixel(0, 0), Some(Rgb565::BLUE));
        assert_eq!(fb.pixel(1, 0), Some(Rgb565::WHITE));
        assert_eq!(fb.pixel(2, 0), Some(Rgb565::BLACK));
    }

    #[test]
    fn test_fill_solid_clips_to_bounds() {
        let mut fb = FrameBuffer::with_size(4, 4);
        let area = Rectangle::new(Point::new(-1, 2), Size::new(10, 10));
        fb.fill_solid(&area, Rgb565::YELLOW).unwrap();

        assert_eq!(fb.pixel(0, 1), Some(Rgb565::BLACK));
        assert_eq!(fb.pixel(0, 2), Some(Rgb565::YELLOW));
        assert_eq!(fb.pixel(3, 3), Some(Rgb565::YELLOW));
        assert_eq!(
            fb.dirty_area(),
            Some(Rectangle::new(Point::new(0, 2), Size::new(4, 2)))
        );
    }

    #[test]
    fn test_flush_sends_dirty_region_once() {
        let mut fb = FrameBuffer::with_size(4, 4);
        Pixel(Point::new(1, 1), Rgb565::RED).draw(&mut fb).unwrap();

        let mut display = MockDisplay::<Rgb565>::new();
        fb.flush(&mut display).unwrap();
        assert_eq!(display.get_pixel(Point::new(1, 1)), Some(Rgb565::RED));
        assert_eq!(display.affected_area().size, Size::new(1, 1));
        assert!(!fb.is_dirty());

        // Nothing changed since, so the second flush writes nothing
        let mut second = MockDisplay::<Rgb565>::new();
        fb.flush(&mut second).unwrap();
        assert_eq!(second.affected_area().size, Size::zero());
    }
}

//! The six forecast views and the full-screen notices.
//!
//! A view is first composed into positioned [`ViewLine`]s (plus an optional
//! icon path for the image view) and then drawn. Composition is pure data so
//! the exact strings can be tested without a display.
//!
//! Every view shares the same frame:
//!
//! ```text
//! line 1   World Weather Tokyo        (yellow, centered)
//! line 2   2020-01-16 13:46:06        (yellow, centered)
//! line 3
//! line 4+  view body                  (cyan)
//! ```

mod compose;
mod notice;

pub use compose::{compose, header_text, image_path};
pub use notice::Notice;

use core::fmt::Debug;

use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_10X20};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

use crate::forecast::Forecast;
use crate::image::blit_bitmap;
use crate::storage::AssetStore;
use crate::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

/// Width of one `FONT_10X20` character cell.
pub const CHAR_WIDTH_PX: u32 = 10;

/// Height of one `FONT_10X20` text line.
pub const LINE_HEIGHT_PX: u32 = 20;

/// Most lines a view composes: header, date, title and six days.
pub const MAX_LINES: usize = 10;

pub const HEADER_COLOR: Rgb565 = Rgb565::YELLOW;
pub const BODY_COLOR: Rgb565 = Rgb565::CYAN;

pub type ViewText = heapless::String<48>;
pub type ImagePath = heapless::String<32>;

/// Which view is on screen. Numbered 1-6 as on the buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Today,
    WeatherState,
    Temperature,
    Image,
    Wind,
    PressureHumidity,
}

impl ViewKind {
    pub const ALL: [ViewKind; 6] = [
        ViewKind::Today,
        ViewKind::WeatherState,
        ViewKind::Temperature,
        ViewKind::Image,
        ViewKind::Wind,
        ViewKind::PressureHumidity,
    ];

    pub fn number(self) -> u8 {
        match self {
            ViewKind::Today => 1,
            ViewKind::WeatherState => 2,
            ViewKind::Temperature => 3,
            ViewKind::Image => 4,
            ViewKind::Wind => 5,
            ViewKind::PressureHumidity => 6,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.get(usize::from(number).checked_sub(1)?).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            ViewKind::Today => "Today",
            ViewKind::WeatherState => "Weather State",
            ViewKind::Temperature => "Temperature(Avr,Max,Min)",
            ViewKind::Image => "Image",
            ViewKind::Wind => "Wind Speed/Direction",
            ViewKind::PressureHumidity => "Pressure/Humidity",
        }
    }
}

/// A line of text anchored at the bottom-left pixel of its first cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLine {
    pub text: ViewText,
    pub origin: Point,
    pub color: Rgb565,
}

impl ViewLine {
    /// Line `line` (1-based) starting `cells` character cells from the left.
    pub fn at_cell(text: ViewText, cells: u32, line: u32, color: Rgb565) -> Self {
        Self {
            origin: Point::new(
                (CHAR_WIDTH_PX * cells) as i32 - 1,
                line_bottom(line),
            ),
            text,
            color,
        }
    }

    /// Line `line` horizontally centered on the panel.
    pub fn centered(text: ViewText, line: u32, color: Rgb565) -> Self {
        let text_width = text.chars().count() as u32 * CHAR_WIDTH_PX;
        let x = u32::from(DISPLAY_WIDTH_PX).saturating_sub(text_width) / 2;
        Self {
            origin: Point::new(x as i32, line_bottom(line)),
            text,
            color,
        }
    }

    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        Text::with_baseline(
            &self.text,
            self.origin,
            MonoTextStyle::new(&FONT_10X20, self.color),
            Baseline::Bottom,
        )
        .draw(target)?;
        Ok(())
    }
}

/// Bottom pixel row of text line `line` (1-based).
pub fn line_bottom(line: u32) -> i32 {
    (LINE_HEIGHT_PX * line) as i32 - 1
}

/// A composed view ready to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewContent {
    pub lines: heapless::Vec<ViewLine, MAX_LINES>,
    pub image: Option<ImagePath>,
}

/// Draw `view` for `forecast` onto `target`, replacing its previous content.
///
/// A missing icon file for the image view only leaves the body empty.
pub fn render<S, D>(
    view: ViewKind,
    forecast: &Forecast,
    store: &mut S,
    target: &mut D,
) -> Result<(), D::Error>
where
    S: AssetStore,
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
{
    let content = compose(view, forecast);
    target.clear(Rgb565::BLACK)?;

    for line in &content.lines {
        line.draw(target)?;
    }

    if let Some(path) = &content.image {
        blit_bitmap(
            store,
            path,
            2 * LINE_HEIGHT_PX as i32,
            u32::from(DISPLAY_WIDTH_PX),
            u32::from(DISPLAY_HEIGHT_PX),
            target,
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::tests::sample_forecast;
    use crate::framebuffer::FrameBuffer;
    use crate::storage::MemoryStore;

    fn row_has_color(fb: &FrameBuffer, y: usize, color: Rgb565) -> bool {
        (0..DISPLAY_WIDTH_PX as usize).any(|x| fb.pixel(x, y) == Some(color))
    }

    #[test]
    fn test_view_numbers_round_trip() {
        for view in ViewKind::ALL {
            assert_eq!(ViewKind::from_number(view.number()), Some(view));
        }
        assert_eq!(ViewKind::from_number(0), None);
        assert_eq!(ViewKind::from_number(7), None);
    }

    #[test]
    fn test_line_positions() {
        let line = ViewLine::at_cell(ViewText::try_from("x").unwrap(), 4, 4, BODY_COLOR);
        assert_eq!(line.origin, Point::new(39, 79));

        let header = ViewLine::centered(
            ViewText::try_from("World Weather Tokyo").unwrap(),
            1,
            HEADER_COLOR,
        );
        assert_eq!(header.origin, Point::new(65, 19));
    }

    #[test]
    fn test_render_text_view() {
        let forecast = sample_forecast();
        let mut store = MemoryStore::new();
        let mut fb = FrameBuffer::new();

        render(ViewKind::Temperature, &forecast, &mut store, &mut fb).unwrap();

        // Header and date in yellow, body rows in cyan, line 3 blank
        assert!(row_has_color(&fb, 10, HEADER_COLOR));
        assert!(row_has_color(&fb, 30, HEADER_COLOR));
        assert!(!row_has_color(&fb, 50, HEADER_COLOR));
        assert!(!row_has_color(&fb, 50, BODY_COLOR));
        assert!(row_has_color(&fb, 70, BODY_COLOR));
        assert!(row_has_color(&fb, 190, BODY_COLOR));
    }

    #[test]
    fn test_render_image_view_without_icon() {
        let forecast = sample_forecast();
        let mut store = MemoryStore::new();
        let mut fb = FrameBuffer::new();

        render(ViewKind::Image, &forecast, &mut store, &mut fb).unwrap();
        assert!(row_has_color(&fb, 10, HEADER_COLOR));
        assert!(!row_has_color(&fb, 100, BODY_COLOR));
    }

    #[test]
    fn test_render_image_view_blits_icon() {
        let forecast = sample_forecast();
        // 1x1 red pixel, stride 4
        let mut bmp = alloc::vec::Vec::new();
        bmp.extend_from_slice(b"BM");
        bmp.extend_from_slice(&58u32.to_le_bytes());
        bmp.extend_from_slice(&[0; 4]);
        bmp.extend_from_slice(&54u32.to_le_bytes());
        bmp.extend_from_slice(&40u32.to_le_bytes());
        bmp.extend_from_slice(&1i32.to_le_bytes());
        bmp.extend_from_slice(&1i32.to_le_bytes());
        bmp.extend_from_slice(&1u16.to_le_bytes());
        bmp.extend_from_slice(&24u16.to_le_bytes());
        bmp.extend_from_slice(&[0; 24]);
        bmp.extend_from_slice(&[0x00, 0x00, 0xFF, 0x00]);
        let mut store = MemoryStore::new().with_file("/images2/lr.bmp", bmp);
        let mut fb = FrameBuffer::new();

        render(ViewKind::Image, &forecast, &mut store, &mut fb).unwrap();
        assert_eq!(fb.pixel(159, 40), Some(Rgb565::RED));
    }
}

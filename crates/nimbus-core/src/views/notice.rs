//! Full-screen notices shown instead of a view.

use embedded_graphics::{
    mono_font::{MonoTextStyle, ascii::FONT_10X20},
    pixelcolor::Rgb565,
    prelude::*,
    text::{Alignment, Text},
};

use super::LINE_HEIGHT_PX;
use crate::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

/// Centered two-line message: a red headline and a white hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub headline: &'static str,
    pub hint: &'static str,
}

impl Notice {
    pub const fn new(headline: &'static str, hint: &'static str) -> Self {
        Self { headline, hint }
    }

    /// Shown when the station never got an IP address.
    pub const fn wifi_failed() -> Self {
        Self::new("WiFi Connection Failed", "Check WiFi credentials")
    }

    /// Shown until the first forecast has been fetched.
    pub const fn no_forecast() -> Self {
        Self::new("No forecast data", "Retrying at next update")
    }

    pub fn draw<D: DrawTarget<Color = Rgb565>>(&self, display: &mut D) -> Result<(), D::Error> {
        display.clear(Rgb565::BLACK)?;

        let center_x = (DISPLAY_WIDTH_PX / 2) as i32;
        let center_y = (DISPLAY_HEIGHT_PX / 2) as i32;

        Text::with_alignment(
            self.headline,
            Point::new(center_x, center_y - LINE_HEIGHT_PX as i32),
            MonoTextStyle::new(&FONT_10X20, Rgb565::RED),
            Alignment::Center,
        )
        .draw(display)?;

        Text::with_alignment(
            self.hint,
            Point::new(center_x, center_y + LINE_HEIGHT_PX as i32),
            MonoTextStyle::new(&FONT_10X20, Rgb565::WHITE),
            Alignment::Center,
        )
        .draw(display)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::FrameBuffer;

    #[test]
    fn test_notice_draws_both_lines() {
        let mut fb = FrameBuffer::new();
        Notice::wifi_failed().draw(&mut fb).unwrap();

        let has = |y: usize, color: Rgb565| (0..320).any(|x| fb.pixel(x, y) == Some(color));
        // Alphabetic baseline: glyph bodies sit just above the anchor row
        assert!(has(95, Rgb565::RED));
        assert!(has(135, Rgb565::WHITE));
        assert!(!has(115, Rgb565::RED));
        assert!(!has(115, Rgb565::WHITE));
    }
}

use embedded_graphics::pixelcolor::Rgb565;

use super::{BODY_COLOR, HEADER_COLOR, ImagePath, ViewContent, ViewKind, ViewLine, ViewText};
use crate::forecast::{DailyForecast, Forecast, bounded, time_of_day};

/// First body line.
const BODY_LINE: u32 = 4;

/// Icons for these states live in the second image set.
const SECOND_SET: [&str; 5] = ["lr", "s", "sl", "sn", "t"];

/// Header line: the location title, prefixed when short enough to fit.
pub fn header_text(title: &str) -> ViewText {
    if title.chars().count() < 13 {
        bounded(format_args!("World Weather {:.12}", title))
    } else {
        bounded(format_args!("{:.26}", title))
    }
}

/// Icon file for a weather state abbreviation.
pub fn image_path(abbr: &str) -> ImagePath {
    let dir = if SECOND_SET.contains(&abbr) {
        "/images2"
    } else {
        "/images1"
    };
    bounded(format_args!("{}/{}.bmp", dir, abbr))
}

/// Today's temperatures get one extra column when not positive so the
/// sign does not push the digits.
fn temperature(value: f64) -> ViewText {
    if value > 0.0 {
        bounded(format_args!("{:4.1}", value))
    } else {
        bounded(format_args!("{:5.1}", value))
    }
}

struct Body {
    cells: u32,
    line: u32,
    lines: heapless::Vec<ViewLine, { super::MAX_LINES }>,
}

impl Body {
    fn push(&mut self, text: ViewText, color: Rgb565) {
        let line = ViewLine::at_cell(text, self.cells, self.line, color);
        // Capacity covers the longest view
        let _ = self.lines.push(line);
        self.line += 1;
    }

    fn text(&mut self, args: core::fmt::Arguments<'_>) {
        self.push(bounded(args), BODY_COLOR);
    }

    /// Title line followed by one line per day.
    fn daily(
        &mut self,
        title: &str,
        forecast: &Forecast,
        mut row: impl FnMut(&DailyForecast) -> ViewText,
    ) {
        self.push(bounded(title), BODY_COLOR);
        for day in &forecast.daily {
            self.push(row(day), BODY_COLOR);
        }
    }
}

fn body_cells(view: ViewKind) -> u32 {
    match view {
        ViewKind::Temperature => 1,
        ViewKind::Wind => 2,
        _ => 4,
    }
}

/// Compose the lines of `view`.
pub fn compose(view: ViewKind, forecast: &Forecast) -> ViewContent {
    let mut lines = heapless::Vec::new();
    let _ = lines.push(ViewLine::centered(header_text(&forecast.title), 1, HEADER_COLOR));
    let _ = lines.push(ViewLine::centered(
        bounded(forecast.date_time_label()),
        2,
        HEADER_COLOR,
    ));

    let mut body = Body {
        cells: body_cells(view),
        line: BODY_LINE,
        lines,
    };
    let mut image = None;

    match view {
        ViewKind::Today => {
            if let Some(today) = forecast.today() {
                body.text(format_args!("weather  :{}", today.weather_state_name));
                body.text(format_args!("sunrise  :{}", time_of_day(&forecast.sun_rise)));
                body.text(format_args!("sunset   :{}", time_of_day(&forecast.sun_set)));
                body.text(format_args!("temp     :{}", temperature(today.the_temp)));
                body.text(format_args!("temp(min):{}", temperature(today.min_temp)));
                body.text(format_args!("temp(max):{}", temperature(today.max_temp)));
            }
        }
        ViewKind::WeatherState => body.daily(view.title(), forecast, |day| {
            bounded(format_args!("{}:{:.12}", day.month_day(), day.weather_state_name))
        }),
        ViewKind::Temperature => body.daily(view.title(), forecast, |day| {
            bounded(format_args!(
                "{}:{:5.1} {:5.1} {:5.1}",
                day.month_day(),
                day.the_temp,
                day.max_temp,
                day.min_temp
            ))
        }),
        ViewKind::Image => {
            image = forecast.today().map(|today| image_path(&today.weather_state_abbr));
        }
        ViewKind::Wind => body.daily(view.title(), forecast, |day| {
            bounded(format_args!(
                "{}:{:7.4} {:5.1}({:.5})",
                day.month_day(),
                day.wind_speed,
                day.wind_direction,
                day.wind_direction_compass
            ))
        }),
        ViewKind::PressureHumidity => body.daily(view.title(), forecast, |day| {
            bounded(format_args!(
                "{}:{:6.1} {:3}",
                day.month_day(),
                day.air_pressure,
                day.humidity
            ))
        }),
    }

    ViewContent {
        lines: body.lines,
        image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::tests::sample_forecast;
    use alloc::vec::Vec;
    use embedded_graphics::prelude::Point;

    fn texts(content: &ViewContent) -> Vec<&str> {
        content.lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_header_text() {
        assert_eq!(header_text("Tokyo").as_str(), "World Weather Tokyo");
        assert_eq!(header_text("Twelve chars").as_str(), "World Weather Twelve chars");
        assert_eq!(
            header_text("Santa Cruz de Tenerife, Canary Islands").as_str(),
            "Santa Cruz de Tenerife, Ca"
        );
    }

    #[test]
    fn test_image_path_sets() {
        assert_eq!(image_path("lr").as_str(), "/images2/lr.bmp");
        assert_eq!(image_path("t").as_str(), "/images2/t.bmp");
        assert_eq!(image_path("c").as_str(), "/images1/c.bmp");
        assert_eq!(image_path("hc").as_str(), "/images1/hc.bmp");
    }

    #[test]
    fn test_today_view() {
        let content = compose(ViewKind::Today, &sample_forecast());
        assert_eq!(
            texts(&content),
            [
                "World Weather Tokyo",
                "2020-01-16 13:46:06",
                "weather  :Light Rain",
                "sunrise  :06:49:50",
                "sunset   :16:51:05",
                "temp     : 9.6",
                "temp(min): 5.4",
                "temp(max):10.4",
            ]
        );
        assert_eq!(content.lines[2].origin, Point::new(39, 79));
        assert_eq!(content.lines[7].origin, Point::new(39, 179));
        assert_eq!(content.image, None);
    }

    #[test]
    fn test_non_positive_temperature_width() {
        assert_eq!(temperature(-3.4).as_str(), " -3.4");
        assert_eq!(temperature(0.0).as_str(), "  0.0");
        assert_eq!(temperature(12.34).as_str(), "12.3");
    }

    #[test]
    fn test_weather_state_view() {
        let content = compose(ViewKind::WeatherState, &sample_forecast());
        let lines = texts(&content);
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[2], "Weather State");
        assert_eq!(lines[3], "01-16:Light Rain");
        assert_eq!(lines[8], "01-21:Clear");
        assert_eq!(content.lines[8].origin, Point::new(39, 199));
    }

    #[test]
    fn test_temperature_view() {
        let content = compose(ViewKind::Temperature, &sample_forecast());
        let lines = texts(&content);
        assert_eq!(lines[2], "Temperature(Avr,Max,Min)");
        assert_eq!(lines[3], "01-16:  9.6  10.4   5.4");
        assert_eq!(lines[4], "01-17:  4.6  10.4   5.4");
        assert_eq!(content.lines[3].origin.x, 9);
    }

    #[test]
    fn test_image_view_has_no_body() {
        let content = compose(ViewKind::Image, &sample_forecast());
        assert_eq!(content.lines.len(), 2);
        assert_eq!(content.image.as_deref(), Some("/images2/lr.bmp"));
    }

    #[test]
    fn test_wind_view() {
        let content = compose(ViewKind::Wind, &sample_forecast());
        let lines = texts(&content);
        assert_eq!(lines[2], "Wind Speed/Direction");
        assert_eq!(lines[3], "01-16: 6.2458 357.5(NNW)");
        assert_eq!(content.lines[3].origin.x, 19);
    }

    #[test]
    fn test_pressure_humidity_view() {
        let content = compose(ViewKind::PressureHumidity, &sample_forecast());
        let lines = texts(&content);
        assert_eq!(lines[2], "Pressure/Humidity");
        assert_eq!(lines[3], "01-16:1020.0  42");
    }
}

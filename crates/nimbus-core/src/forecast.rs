//! Forecast model decoded from the metaweather location API.
//!
//! `GET /api/location/{woeid}/` returns the location header (title, sun
//! times, local time) and a `consolidated_weather` array with one entry per
//! day. Only the first [`MAX_DAYS`] days are kept.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;
use core::future::Future;

use log::info;
use serde::Deserialize;
use thiserror_no_std::Error;

use crate::http::HttpError;

/// Days shown by the multi-day views.
pub const MAX_DAYS: usize = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForecastError {
    #[error("JSON decode failed: {0}")]
    Json(heapless::String<64>),
    #[error("HTTP error: {0}")]
    Http(HttpError),
    #[error("Network error: {0}")]
    Network(heapless::String<64>),
    /// The station gave up joining the access point.
    #[error("WiFi unavailable")]
    WifiUnavailable,
    #[error("Forecast has no daily entries")]
    Empty,
}

impl From<HttpError> for ForecastError {
    fn from(err: HttpError) -> Self {
        ForecastError::Http(err)
    }
}

impl ForecastError {
    /// Build a `Network` error from any displayable cause, truncated to fit.
    pub fn network(cause: impl core::fmt::Display) -> Self {
        ForecastError::Network(bounded(cause))
    }
}

/// Format `value` into a fixed-capacity string, dropping what does not fit.
pub(crate) fn bounded<const N: usize>(value: impl core::fmt::Display) -> heapless::String<N> {
    struct Truncating<'a, const N: usize>(&'a mut heapless::String<N>);

    impl<const N: usize> Write for Truncating<'_, N> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            for c in s.chars() {
                if self.0.push(c).is_err() {
                    break;
                }
            }
            Ok(())
        }
    }

    let mut out = heapless::String::new();
    let _ = write!(Truncating(&mut out), "{}", value);
    out
}

/// One day of the consolidated forecast.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DailyForecast {
    /// mph
    pub wind_speed: f64,
    /// `YYYY-MM-DD`
    pub applicable_date: String,
    pub predictability: i32,
    /// Short state code (`c`, `lr`, `hc`, ...), also the icon file name.
    pub weather_state_abbr: String,
    pub weather_state_name: String,
    pub created: String,
    /// Degrees
    pub wind_direction: f64,
    /// mbar
    pub air_pressure: f64,
    /// Percent
    pub humidity: i32,
    pub visibility: f64,
    /// Celsius
    pub the_temp: f64,
    pub min_temp: f64,
    pub max_temp: f64,
    pub id: u64,
    pub wind_direction_compass: String,
}

impl DailyForecast {
    /// `MM-DD` part of the applicable date.
    pub fn month_day(&self) -> &str {
        month_day(&self.applicable_date)
    }
}

#[derive(Deserialize)]
struct LocationDocument {
    title: String,
    woeid: u32,
    sun_rise: String,
    sun_set: String,
    latt_long: String,
    time: String,
    timezone_name: String,
    timezone: String,
    location_type: String,
    consolidated_weather: Vec<DailyForecast>,
}

/// Location forecast as shown on the device.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub title: String,
    pub woeid: u32,
    pub sun_rise: String,
    pub sun_set: String,
    pub latt_long: String,
    /// Local time of the forecast, ISO 8601 with fraction and offset.
    pub time: String,
    pub timezone_name: String,
    pub timezone: String,
    pub location_type: String,
    pub daily: heapless::Vec<DailyForecast, MAX_DAYS>,
}

impl Forecast {
    /// Decode a location API response body.
    pub fn decode(body: &[u8]) -> Result<Self, ForecastError> {
        let doc: LocationDocument =
            serde_json::from_slice(body).map_err(|e| ForecastError::Json(bounded(e)))?;

        if doc.consolidated_weather.is_empty() {
            return Err(ForecastError::Empty);
        }

        let mut daily = heapless::Vec::new();
        daily.extend(doc.consolidated_weather.into_iter().take(MAX_DAYS));

        let forecast = Self {
            title: doc.title,
            woeid: doc.woeid,
            sun_rise: doc.sun_rise,
            sun_set: doc.sun_set,
            latt_long: doc.latt_long,
            time: doc.time,
            timezone_name: doc.timezone_name,
            timezone: doc.timezone,
            location_type: doc.location_type,
            daily,
        };

        for day in &forecast.daily {
            info!("applicable_date={}", day.applicable_date);
        }
        Ok(forecast)
    }

    /// First day of the forecast. Decoding guarantees there is one.
    pub fn today(&self) -> Option<&DailyForecast> {
        self.daily.first()
    }

    /// `YYYY-MM-DD HH:MM:SS` from the forecast's local time.
    pub fn date_time_label(&self) -> heapless::String<32> {
        date_time_label(&self.time)
    }
}

/// Fetches a fresh forecast from wherever the platform gets it.
pub trait ForecastSource {
    fn fetch(&mut self) -> impl Future<Output = Result<Forecast, ForecastError>>;
}

/// Split an ISO 8601 timestamp into `"date time"`, dropping the fraction
/// and offset. A timestamp without `T` yields just the date.
pub fn date_time_label(timestamp: &str) -> heapless::String<32> {
    match timestamp.split_once('T') {
        Some((date, _)) => bounded(format_args!("{} {}", date, time_of_day(timestamp))),
        None => bounded(timestamp),
    }
}

/// Time part of an ISO 8601 timestamp: after `T`, up to the first `.`.
pub fn time_of_day(timestamp: &str) -> &str {
    let Some((_, rest)) = timestamp.split_once('T') else {
        return "";
    };
    rest.split('.').next().unwrap_or(rest)
}

/// `MM-DD` of a `YYYY-MM-DD` date.
pub fn month_day(date: &str) -> &str {
    let tail = date.get(5..).unwrap_or("");
    match tail.char_indices().nth(5) {
        Some((end, _)) => &tail[..end],
        None => tail,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloc::format;

    fn day_json(date: &str, abbr: &str, name: &str, temp: f64) -> String {
        format!(
            r#"{{"id":4970689951956992,"weather_state_name":"{name}","weather_state_abbr":"{abbr}",
"wind_direction_compass":"NNW","created":"2020-01-16T03:21:02.526991Z",
"applicable_date":"{date}","min_temp":5.405,"max_temp":10.425,"the_temp":{temp},
"wind_speed":6.245802910999761,"wind_direction":357.5,"air_pressure":1020.0,
"humidity":42,"visibility":14.596009305654974,"predictability":68}}"#
        )
    }

    /// A Tokyo response with `days` daily entries starting at 2020-01-16.
    pub(crate) fn sample_json(title: &str, days: usize) -> String {
        let daily: Vec<String> = (0..days)
            .map(|i| {
                let (abbr, name) = if i == 0 { ("lr", "Light Rain") } else { ("c", "Clear") };
                day_json(&format!("2020-01-{:02}", 16 + i), abbr, name, 9.615 - i as f64 * 5.0)
            })
            .collect();
        format!(
            r#"{{"consolidated_weather":[{}],
"time":"2020-01-16T13:46:06.039385+09:00",
"sun_rise":"2020-01-16T06:49:50.916354+09:00",
"sun_set":"2020-01-16T16:51:05.516037+09:00",
"timezone_name":"JST","parent":{{"title":"Japan","woeid":23424856}},
"title":"{title}","location_type":"City","woeid":1118370,
"latt_long":"35.670479,139.740921","timezone":"Asia/Tokyo"}}"#,
            daily.join(",")
        )
    }

    pub(crate) fn sample_forecast() -> Forecast {
        Forecast::decode(sample_json("Tokyo", 6).as_bytes()).unwrap()
    }

    #[test]
    fn test_decode_location_response() {
        let forecast = sample_forecast();
        assert_eq!(forecast.title, "Tokyo");
        assert_eq!(forecast.woeid, 1118370);
        assert_eq!(forecast.timezone, "Asia/Tokyo");
        assert_eq!(forecast.daily.len(), 6);

        let today = forecast.today().unwrap();
        assert_eq!(today.weather_state_abbr, "lr");
        assert_eq!(today.humidity, 42);
        assert_eq!(today.id, 4970689951956992);
        assert_eq!(today.wind_direction_compass, "NNW");
    }

    #[test]
    fn test_days_beyond_six_are_dropped() {
        let forecast = Forecast::decode(sample_json("Tokyo", 8).as_bytes()).unwrap();
        assert_eq!(forecast.daily.len(), MAX_DAYS);
        assert_eq!(forecast.daily[5].applicable_date, "2020-01-21");
    }

    #[test]
    fn test_missing_field_is_json_error() {
        let json = sample_json("Tokyo", 1).replace(r#""woeid":1118370,"#, "");
        assert!(matches!(
            Forecast::decode(json.as_bytes()),
            Err(ForecastError::Json(_))
        ));
    }

    #[test]
    fn test_no_days_is_empty_error() {
        let json = sample_json("Tokyo", 0);
        assert_eq!(Forecast::decode(json.as_bytes()), Err(ForecastError::Empty));
    }

    #[test]
    fn test_timestamp_helpers() {
        assert_eq!(
            date_time_label("2020-01-16T13:46:06.039385+09:00").as_str(),
            "2020-01-16 13:46:06"
        );
        assert_eq!(date_time_label("2020-01-16").as_str(), "2020-01-16");
        assert_eq!(time_of_day("2020-01-16T06:49:50.916354+09:00"), "06:49:50");
        assert_eq!(time_of_day("2020-01-16T06:49:50Z"), "06:49:50Z");
        assert_eq!(month_day("2020-01-21"), "01-21");
        assert_eq!(month_day("2020"), "");
    }

    #[test]
    fn test_bounded_truncates() {
        let s: heapless::String<4> = bounded("abcdefgh");
        assert_eq!(s.as_str(), "abcd");
    }
}

//! Device configuration.
//!
//! Strings borrow from the source they were read from: a JSON document on
//! the host, or compile-time environment variables on the device.

use embassy_time::Duration;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::forecast::bounded;
use crate::views::ViewKind;

pub const DEFAULT_MAX_RETRY: u32 = 5;
/// Tokyo
pub const DEFAULT_WOEID: u32 = 1118370;
pub const DEFAULT_UPDATE_PERIOD_MINUTES: u32 = 15;
pub const DEFAULT_INITIAL_VIEW: u8 = 1;
pub const DEFAULT_API_HOST: &str = "www.metaweather.com";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("WiFi SSID is empty")]
    MissingSsid,
    #[error("Update period must be at least one minute")]
    ZeroUpdatePeriod,
    #[error("Initial view {0} is not between 1 and 6")]
    InvalidView(u8),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        key: heapless::String<32>,
        value: heapless::String<32>,
    },
    #[error("Unknown key {0}")]
    UnknownKey(heapless::String<32>),
    #[error("Parse error: {0}")]
    Parse(heapless::String<64>),
}

fn default_max_retry() -> u32 {
    DEFAULT_MAX_RETRY
}

fn default_woeid() -> u32 {
    DEFAULT_WOEID
}

fn default_update_period() -> u32 {
    DEFAULT_UPDATE_PERIOD_MINUTES
}

fn default_initial_view() -> u8 {
    DEFAULT_INITIAL_VIEW
}

fn default_api_host() -> &'static str {
    DEFAULT_API_HOST
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WifiConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
}

impl Default for WifiConfig<'_> {
    fn default() -> Self {
        Self {
            ssid: "",
            password: "",
            max_retry: DEFAULT_MAX_RETRY,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct DeviceConfig<'a> {
    #[serde(borrow)]
    pub wifi: WifiConfig<'a>,
    #[serde(default = "default_woeid")]
    pub location_woeid: u32,
    #[serde(default = "default_update_period")]
    pub update_period_minutes: u32,
    #[serde(default = "default_initial_view")]
    pub initial_view: u8,
    #[serde(default = "default_api_host")]
    pub api_host: &'a str,
}

impl Default for DeviceConfig<'_> {
    fn default() -> Self {
        Self {
            wifi: WifiConfig::default(),
            location_woeid: DEFAULT_WOEID,
            update_period_minutes: DEFAULT_UPDATE_PERIOD_MINUTES,
            initial_view: DEFAULT_INITIAL_VIEW,
            api_host: DEFAULT_API_HOST,
        }
    }
}

impl<'a> DeviceConfig<'a> {
    /// Parse a JSON document. Missing optional fields take their defaults.
    pub fn from_json(json: &'a str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(bounded(e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Set one field from a `KEY=value` style pair.
    ///
    /// Keys match the `NIMBUS_*` environment variables without the prefix,
    /// lowercased: `wifi_ssid`, `wifi_password`, `max_retry`, `woeid`,
    /// `update_period`, `initial_view`, `api_host`.
    pub fn set(&mut self, key: &str, value: &'a str) -> Result<(), ConfigError> {
        fn number<T: core::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
            value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: bounded(key),
                value: bounded(value),
            })
        }

        match key {
            "wifi_ssid" => self.wifi.ssid = value,
            "wifi_password" => self.wifi.password = value,
            "max_retry" => self.wifi.max_retry = number(key, value)?,
            "woeid" => self.location_woeid = number(key, value)?,
            "update_period" => self.update_period_minutes = number(key, value)?,
            "initial_view" => self.initial_view = number(key, value)?,
            "api_host" => self.api_host = value,
            _ => return Err(ConfigError::UnknownKey(bounded(key))),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wifi.ssid.is_empty() {
            return Err(ConfigError::MissingSsid);
        }
        if self.update_period_minutes == 0 {
            return Err(ConfigError::ZeroUpdatePeriod);
        }
        if ViewKind::from_number(self.initial_view).is_none() {
            return Err(ConfigError::InvalidView(self.initial_view));
        }
        Ok(())
    }

    /// View shown after boot, view 1 if the setting is out of range.
    pub fn initial_view(&self) -> ViewKind {
        ViewKind::from_number(self.initial_view).unwrap_or(ViewKind::Today)
    }

    pub fn update_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.update_period_minutes) * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_applies_defaults() {
        let config =
            DeviceConfig::from_json(r#"{"wifi":{"ssid":"home","password":"secret"}}"#).unwrap();
        assert_eq!(config.wifi.ssid, "home");
        assert_eq!(config.wifi.max_retry, 5);
        assert_eq!(config.location_woeid, 1118370);
        assert_eq!(config.update_period(), Duration::from_secs(900));
        assert_eq!(config.initial_view(), ViewKind::Today);
        assert_eq!(config.api_host, "www.metaweather.com");
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let json = r#"{"wifi":{"ssid":"home","password":""},"initial_view":9}"#;
        assert_eq!(
            DeviceConfig::from_json(json),
            Err(ConfigError::InvalidView(9))
        );
        assert!(matches!(
            DeviceConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_set_keys() {
        let mut config = DeviceConfig::default();
        config.set("wifi_ssid", "lab").unwrap();
        config.set("woeid", "44418").unwrap();
        config.set("initial_view", "4").unwrap();
        config.set("update_period", " 30 ").unwrap();
        assert_eq!(config.location_woeid, 44418);
        assert_eq!(config.initial_view(), ViewKind::Image);
        assert_eq!(config.update_period_minutes, 30);
        assert!(config.validate().is_ok());

        assert!(matches!(
            config.set("woeid", "tokyo"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("colour", "red"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_validate() {
        let mut config = DeviceConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::MissingSsid));

        config.wifi.ssid = "home";
        config.update_period_minutes = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroUpdatePeriod));
    }
}

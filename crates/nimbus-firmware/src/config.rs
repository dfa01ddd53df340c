//! Device settings baked in at build time.
//!
//! `build.rs` exports the `NIMBUS_*` variables from `.env`; unset ones keep
//! the defaults of [`DeviceConfig`].

use nimbus_core::config::{ConfigError, DeviceConfig};

const SETTINGS: [(&str, Option<&str>); 7] = [
    ("wifi_ssid", option_env!("NIMBUS_WIFI_SSID")),
    ("wifi_password", option_env!("NIMBUS_WIFI_PASSWORD")),
    ("max_retry", option_env!("NIMBUS_MAX_RETRY")),
    ("woeid", option_env!("NIMBUS_WOEID")),
    ("update_period", option_env!("NIMBUS_UPDATE_PERIOD")),
    ("initial_view", option_env!("NIMBUS_INITIAL_VIEW")),
    ("api_host", option_env!("NIMBUS_API_HOST")),
];

/// Build and validate the device configuration.
pub fn device_config() -> Result<DeviceConfig<'static>, ConfigError> {
    let mut config = DeviceConfig::default();
    for (key, value) in SETTINGS {
        if let Some(value) = value {
            config.set(key, value)?;
        }
    }
    config.validate()?;
    Ok(config)
}

//! Bakes device settings from `.env` into the firmware.
//!
//! Variables already present in the build environment win over the file.
//! Anything left unset falls back to the defaults in `nimbus_core::config`.

use std::env;
use std::path::PathBuf;

const KEYS: [&str; 7] = [
    "NIMBUS_WIFI_SSID",
    "NIMBUS_WIFI_PASSWORD",
    "NIMBUS_MAX_RETRY",
    "NIMBUS_WOEID",
    "NIMBUS_UPDATE_PERIOD",
    "NIMBUS_INITIAL_VIEW",
    "NIMBUS_API_HOST",
];

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let candidates = [manifest_dir.join(".env"), manifest_dir.join("../../.env")];

    for path in &candidates {
        println!("cargo:rerun-if-changed={}", path.display());
    }
    for key in KEYS {
        println!("cargo:rerun-if-env-changed={key}");
    }

    let mut emitted = Vec::new();
    let from_file = candidates
        .iter()
        .find_map(|path| dotenvy::from_path_iter(path).ok());

    if let Some(iter) = from_file {
        for item in iter {
            let (key, value) = item.expect("malformed line in .env");
            if KEYS.contains(&key.as_str()) && env::var_os(&key).is_none() {
                println!("cargo:rustc-env={key}={value}");
                emitted.push(key);
            }
        }
    }

    for key in KEYS {
        if let Ok(value) = env::var(key) {
            println!("cargo:rustc-env={key}={value}");
            emitted.push(key.to_string());
        }
    }

    if !emitted.iter().any(|key| key == "NIMBUS_WIFI_SSID") {
        println!("cargo:warning=NIMBUS_WIFI_SSID is not set; the device will refuse to boot");
    }
}

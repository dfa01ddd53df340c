//! ESP32 firmware-specific modules for nimbus-rs
//!
//! This crate contains the code that only makes sense on the M5Stack:
//! compile-time device settings, the SD card asset store, the WiFi/HTTP
//! forecast source and the embassy tasks that feed the command queue.

#![no_std]

extern crate alloc;

pub mod config;
pub mod net;
pub mod sd_store;
pub mod tasks;

//! Hardware-independent core library for nimbus-rs
//!
//! This crate contains all platform-agnostic logic for the nimbus weather
//! display: BMP decoding and blitting, the framebuffer, forecast decoding,
//! the six info views, button and command handling, the WiFi retry state
//! machine and the display manager that ties them together.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod app_state;
pub mod command;
pub mod config;
pub mod display_manager;
pub mod forecast;
pub mod framebuffer;
pub mod http;
pub mod image;
pub mod input;
pub mod storage;
pub mod views;
pub mod wifi;

/// Panel width in pixels (M5Stack ILI9342C, landscape).
pub const DISPLAY_WIDTH_PX: u16 = 320;

/// Panel height in pixels.
pub const DISPLAY_HEIGHT_PX: u16 = 240;

//! Desktop simulator for the nimbus-rs weather display.
//!
//! Runs the real `DisplayManager` against a saved forecast response and a
//! directory laid out like the SD card, drawing into an SDL2 window via
//! `embedded-graphics-simulator`.
//!
//! # Key bindings
//!
//! | Key     | Action                                   |
//! |---------|------------------------------------------|
//! | A, S, D | Buttons A/B/C (hold > 2 s for long press) |
//! | 1-6     | Show view 1-6                            |
//! | R       | Refresh the forecast                     |
//! | Q       | Quit                                     |
//!
//! `--render <dir>` skips the window and writes one PNG per view instead.
//!
//! # Environment
//!
//! | Variable          | Default                |
//! |-------------------|------------------------|
//! | `NIMBUS_CONFIG`   | `assets/config.json`   |
//! | `NIMBUS_FORECAST` | `assets/forecast.json` |
//! | `NIMBUS_SD_ROOT`  | `assets/sd`            |

mod host;

use std::path::{Path, PathBuf};

use embassy_futures::block_on;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{OutputSettings, OutputSettingsBuilder, SimulatorDisplay};
use log::{error, info, warn};

use nimbus_core::app_state::AppError;
use nimbus_core::command::Command;
use nimbus_core::config::DeviceConfig;
use nimbus_core::display_manager::DisplayManager;
use nimbus_core::views::ViewKind;
use nimbus_core::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

use host::{FileForecastSource, FileStore};

/// Pixel scale factor for the simulator window.
#[cfg(feature = "window")]
const WINDOW_SCALE: u32 = 2;

type Manager = DisplayManager<FileStore, FileForecastSource>;

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var_os(key)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join(default))
}

fn load_config(json: &str) -> Result<ViewKind, AppError> {
    let config = DeviceConfig::from_json(json)?;
    info!(
        "Config: woeid {}, update every {} min",
        config.location_woeid, config.update_period_minutes
    );
    Ok(config.initial_view())
}

/// Initial view from the config file; the simulator has no radio so the
/// WiFi settings are ignored.
fn initial_view(path: &Path) -> ViewKind {
    let loaded = std::fs::read_to_string(path)
        .map_err(AppError::storage)
        .and_then(|json| load_config(&json));
    loaded.unwrap_or_else(|e| {
        warn!("Config {}: {}, using defaults", path.display(), e);
        DeviceConfig::default().initial_view()
    })
}

fn new_display() -> SimulatorDisplay<Rgb565> {
    SimulatorDisplay::new(Size::new(
        DISPLAY_WIDTH_PX as u32,
        DISPLAY_HEIGHT_PX as u32,
    ))
}

fn flush(manager: &mut Manager, display: &mut SimulatorDisplay<Rgb565>) {
    if let Err(never) = manager.flush(display) {
        match never {}
    }
}

/// Write `view-<n>.png` for every view into `out_dir`.
fn render_all(manager: &mut Manager, out_dir: &Path) -> Result<(), AppError> {
    std::fs::create_dir_all(out_dir).map_err(AppError::storage)?;
    let mut display = new_display();
    let output_settings: OutputSettings = OutputSettingsBuilder::new().scale(1).build();

    for view in ViewKind::ALL {
        block_on(manager.handle(Command::Show(view)));
        flush(manager, &mut display);

        let path = out_dir.join(format!("view-{}.png", view.number()));
        display
            .to_rgb_output_image(&output_settings)
            .save_png(&path)
            .map_err(AppError::display)?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

#[cfg(feature = "window")]
fn run_window(manager: &mut Manager) {
    use embassy_time::Instant;
    use embedded_graphics_simulator::{SimulatorEvent, Window, sdl2::Keycode};
    use nimbus_core::command::{command_receiver, command_sender, post};
    use nimbus_core::input::{Button, ButtonMonitor};

    fn keycode_to_button(keycode: Keycode) -> Option<Button> {
        match keycode {
            Keycode::A => Some(Button::A),
            Keycode::S => Some(Button::B),
            Keycode::D => Some(Button::C),
            _ => None,
        }
    }

    fn keycode_to_view(keycode: Keycode) -> Option<ViewKind> {
        let number = match keycode {
            Keycode::Num1 | Keycode::Kp1 => 1,
            Keycode::Num2 | Keycode::Kp2 => 2,
            Keycode::Num3 | Keycode::Kp3 => 3,
            Keycode::Num4 | Keycode::Kp4 => 4,
            Keycode::Num5 | Keycode::Kp5 => 5,
            Keycode::Num6 | Keycode::Kp6 => 6,
            _ => return None,
        };
        ViewKind::from_number(number)
    }

    let mut display = new_display();
    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let mut window = Window::new("Nimbus Simulator", &output_settings);

    let sender = command_sender();
    let receiver = command_receiver();
    let mut monitors = Button::ALL.map(ButtonMonitor::new);

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    flush(manager, &mut display);
    window.update(&display);

    'running: loop {
        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,
                SimulatorEvent::KeyDown {
                    keycode, repeat, ..
                } => {
                    if keycode == Keycode::Q || keycode == Keycode::Escape {
                        break 'running;
                    }
                    if repeat {
                        continue;
                    }
                    if let Some(button) = keycode_to_button(keycode) {
                        let monitor = &mut monitors[button as usize];
                        monitor.sample(false, Instant::now());
                    } else if let Some(view) = keycode_to_view(keycode) {
                        post(&sender, Command::Show(view));
                    } else if keycode == Keycode::R {
                        post(&sender, Command::Refresh);
                    }
                }
                SimulatorEvent::KeyUp { keycode, .. } => {
                    if let Some(button) = keycode_to_button(keycode) {
                        let monitor = &mut monitors[button as usize];
                        if let Some(command) = monitor.sample(true, Instant::now()) {
                            post(&sender, command);
                        }
                    }
                }
                _ => {}
            }
        }

        while let Ok(command) = receiver.try_receive() {
            info!("Command {:?}", command);
            block_on(manager.handle(command));
            flush(manager, &mut display);
        }

        window.update(&display);
        std::thread::sleep(std::time::Duration::from_millis(16));
    }
}

fn main() {
    env_logger::init();
    info!("Starting nimbus-rs simulator");

    let config_path = env_path("NIMBUS_CONFIG", "assets/config.json");
    let forecast_path = env_path("NIMBUS_FORECAST", "assets/forecast.json");
    let sd_root = env_path("NIMBUS_SD_ROOT", "assets/sd");
    info!(
        "Forecast {}, SD root {}",
        forecast_path.display(),
        sd_root.display()
    );

    let mut manager = DisplayManager::new(
        FileStore::new(sd_root),
        FileForecastSource::new(forecast_path),
        initial_view(&config_path),
    );
    block_on(manager.start());

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("--render") => {
            let out_dir = args.next().map(PathBuf::from).unwrap_or_else(|| "out".into());
            if let Err(e) = render_all(&mut manager, &out_dir) {
                error!("Render failed: {}", e);
                std::process::exit(1);
            }
        }
        #[cfg(feature = "window")]
        None => {
            info!("Display: {}×{} (scale {}×)", DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX, WINDOW_SCALE);
            info!("Keys: A/S/D=buttons  1-6=views  R=refresh  Q=quit");
            run_window(&mut manager);
        }
        _ => {
            eprintln!("usage: nimbus-simulator [--render <dir>]");
            std::process::exit(2);
        }
    }

    info!("Simulator exiting");
}

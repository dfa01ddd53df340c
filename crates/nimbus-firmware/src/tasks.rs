//! Producers for the command queue.

use embassy_time::{Duration, Instant, Ticker};
use esp_hal::gpio::Input;
use log::info;
use nimbus_core::command::{Command, CommandSender, post};
use nimbus_core::input::{Button, ButtonMonitor, POLL_INTERVAL};

/// Poll one front-panel button and post a view switch on every release.
#[embassy_executor::task(pool_size = 3)]
pub async fn button_task(button: Button, pin: Input<'static>, sender: CommandSender) {
    info!("Button {:?} task started", button);
    let mut monitor = ButtonMonitor::new(button);
    let mut ticker = Ticker::every(POLL_INTERVAL);
    loop {
        if let Some(command) = monitor.sample(pin.is_high(), Instant::now()) {
            post(&sender, command);
        }
        ticker.next().await;
    }
}

/// Request a forecast refresh once per update period.
#[embassy_executor::task]
pub async fn refresh_task(period: Duration, sender: CommandSender) {
    info!("Refreshing every {} s", period.as_secs());
    let mut ticker = Ticker::every(period);
    loop {
        ticker.next().await;
        post(&sender, Command::Refresh);
    }
}

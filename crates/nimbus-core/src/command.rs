//! Commands sent to the display task.
//!
//! Button tasks and the refresh timer are producers, the display manager is
//! the single consumer. The queue is bounded; when it is full a new command
//! is dropped and logged rather than blocking the producer.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use log::{debug, warn};

use crate::views::ViewKind;

/// Command queue capacity
pub const COMMAND_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Switch to a view and redraw it
    Show(ViewKind),
    /// Fetch a fresh forecast and redraw the current view
    Refresh,
}

pub type CommandSender = Sender<'static, CriticalSectionRawMutex, Command, COMMAND_CAPACITY>;
pub type CommandReceiver = Receiver<'static, CriticalSectionRawMutex, Command, COMMAND_CAPACITY>;

/// Global command queue
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, Command, COMMAND_CAPACITY> =
    Channel::new();

pub fn command_sender() -> CommandSender {
    COMMAND_CHANNEL.sender()
}

pub fn command_receiver() -> CommandReceiver {
    COMMAND_CHANNEL.receiver()
}

/// Queue `command` without waiting. Returns `false` if it was dropped.
pub fn post(
    sender: &Sender<'_, CriticalSectionRawMutex, Command, COMMAND_CAPACITY>,
    command: Command,
) -> bool {
    match sender.try_send(command) {
        Ok(()) => {
            debug!("Queued {:?}", command);
            true
        }
        Err(_) => {
            warn!("Command queue full, dropping {:?}", command);
            false
        }
    }
}

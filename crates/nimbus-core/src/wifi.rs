//! Station-mode connection retry logic.
//!
//! The radio driver reports three events: started, disconnected and got IP.
//! [`WifiConnection`] decides after each disconnect whether to try again, up
//! to the configured retry limit, and settles in `Failed` after that.

use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Idle,
    Connecting,
    Connected,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { attempt: u32 },
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct WifiConnection {
    state: WifiState,
    retries: u32,
    max_retries: u32,
}

impl WifiConnection {
    pub fn new(max_retries: u32) -> Self {
        Self {
            state: WifiState::Idle,
            retries: 0,
            max_retries,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Radio is up; the first connect attempt starts.
    pub fn on_started(&mut self) {
        self.state = WifiState::Connecting;
        self.retries = 0;
    }

    pub fn on_disconnected(&mut self) -> RetryDecision {
        if self.retries < self.max_retries {
            self.retries += 1;
            self.state = WifiState::Connecting;
            info!("Retry to connect to the AP ({}/{})", self.retries, self.max_retries);
            RetryDecision::Retry {
                attempt: self.retries,
            }
        } else {
            self.state = WifiState::Failed;
            warn!("Connect to the AP failed after {} retries", self.retries);
            RetryDecision::GiveUp
        }
    }

    pub fn on_got_ip(&mut self) {
        self.state = WifiState::Connected;
        self.retries = 0;
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    pub fn has_failed(&self) -> bool {
        self.state == WifiState::Failed
    }
}

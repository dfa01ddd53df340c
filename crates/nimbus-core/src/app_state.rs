//! Application-wide run state and error types for nimbus

use log::info;
use thiserror_no_std::Error;

use crate::config::ConfigError;
use crate::forecast::{ForecastError, bounded};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    Uninitialized,
    /// A forecast fetch is in progress.
    Fetching,
    /// A forecast is on screen.
    Running,
    /// The last fetch failed and there is nothing to show.
    Error,
}

impl AppRunState {
    /// Move to `next`, logging the transition.
    pub fn advance(&mut self, next: AppRunState) {
        if *self != next {
            info!("App state {:?} -> {:?}", self, next);
            *self = next;
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Forecast fetch failed: {0}")]
    Forecast(heapless::String<64>),
    #[error("SD card error: {0}")]
    Storage(heapless::String<64>),
    #[error("Display error: {0}")]
    Display(heapless::String<64>),
    #[error("Configuration error: {0}")]
    Config(ConfigError),
}

impl AppError {
    pub fn storage(cause: impl core::fmt::Display) -> Self {
        AppError::Storage(bounded(cause))
    }

    pub fn display(cause: impl core::fmt::Debug) -> Self {
        AppError::Display(bounded(format_args!("{:?}", cause)))
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        AppError::Forecast(bounded(err))
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpError;

    #[test]
    fn test_advance_changes_state() {
        let mut state = AppRunState::Uninitialized;
        state.advance(AppRunState::Fetching);
        state.advance(AppRunState::Fetching);
        assert_eq!(state, AppRunState::Fetching);
    }

    #[test]
    fn test_forecast_error_message_is_kept() {
        let err: AppError = ForecastError::Http(HttpError::Status(503)).into();
        assert_eq!(
            err,
            AppError::Forecast(bounded("HTTP error: unexpected status 503"))
        );
    }
}

//! Display manager: owns the forecast and renders the current view.
//!
//! The manager is the only consumer of the command queue. Each command
//! updates the view or the forecast, the view is re-rendered into the
//! framebuffer and the changed region is flushed to the panel. Rendering
//! never blocks on the network: fetching happens only on `Refresh` and at
//! start-up.

use core::convert::Infallible;
use core::fmt::Debug;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_time::{Duration, Timer};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use log::{debug, error, info, warn};

use crate::app_state::AppRunState;
use crate::command::{COMMAND_CAPACITY, Command};
use crate::forecast::{Forecast, ForecastError, ForecastSource};
use crate::framebuffer::FrameBuffer;
use crate::storage::AssetStore;
use crate::views::{self, Notice, ViewKind};

/// Fetch attempts per refresh before giving up.
pub const FETCH_ATTEMPTS: u32 = 5;

/// Pause between fetch attempts.
pub const FETCH_RETRY_DELAY: Duration = Duration::from_secs(1);

fn infallible(result: Result<(), Infallible>) {
    if let Err(never) = result {
        match never {}
    }
}

pub struct DisplayManager<S, F>
where
    S: AssetStore,
    F: ForecastSource,
{
    framebuffer: FrameBuffer,
    state: AppRunState,
    view: ViewKind,
    forecast: Option<Forecast>,
    last_error: Option<ForecastError>,
    store: S,
    source: F,
    retry_delay: Duration,
}

impl<S, F> DisplayManager<S, F>
where
    S: AssetStore,
    F: ForecastSource,
{
    pub fn new(store: S, source: F, initial_view: ViewKind) -> Self {
        Self {
            framebuffer: FrameBuffer::new(),
            state: AppRunState::Uninitialized,
            view: initial_view,
            forecast: None,
            last_error: None,
            store,
            source,
            retry_delay: FETCH_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn state(&self) -> AppRunState {
        self.state
    }

    pub fn view(&self) -> ViewKind {
        self.view
    }

    pub fn forecast(&self) -> Option<&Forecast> {
        self.forecast.as_ref()
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    pub fn source_mut(&mut self) -> &mut F {
        &mut self.source
    }

    /// Fetch with up to [`FETCH_ATTEMPTS`] tries.
    async fn fetch(&mut self) -> Result<Forecast, ForecastError> {
        let mut attempt = 1;
        loop {
            match self.source.fetch().await {
                Ok(forecast) => return Ok(forecast),
                Err(e) if attempt < FETCH_ATTEMPTS => {
                    warn!("Fetch attempt {}/{} failed: {}", attempt, FETCH_ATTEMPTS, e);
                    attempt += 1;
                    Timer::after(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Replace the forecast with a fresh one. On failure the previous
    /// forecast stays. Returns whether the forecast was updated.
    pub async fn refresh(&mut self) -> bool {
        self.state.advance(AppRunState::Fetching);
        match self.fetch().await {
            Ok(forecast) => {
                info!(
                    "Forecast for {} ({} days) at {}",
                    forecast.title,
                    forecast.daily.len(),
                    forecast.time
                );
                self.forecast = Some(forecast);
                self.last_error = None;
                self.state.advance(AppRunState::Running);
                true
            }
            Err(e) => {
                error!("Forecast update failed, keeping previous data: {}", e);
                self.last_error = Some(e);
                let next = if self.forecast.is_some() {
                    AppRunState::Running
                } else {
                    AppRunState::Error
                };
                self.state.advance(next);
                false
            }
        }
    }

    pub fn last_error(&self) -> Option<&ForecastError> {
        self.last_error.as_ref()
    }

    /// Render the current view into the framebuffer.
    ///
    /// Without any forecast a notice explains why.
    pub fn render(&mut self) {
        let fb = &mut self.framebuffer;
        match &self.forecast {
            Some(forecast) => {
                debug!("Rendering view {}", self.view.number());
                infallible(views::render(self.view, forecast, &mut self.store, fb));
            }
            None => {
                let notice = match self.last_error {
                    Some(ForecastError::WifiUnavailable) => Notice::wifi_failed(),
                    _ => Notice::no_forecast(),
                };
                infallible(notice.draw(fb));
            }
        }
    }

    /// Initial fetch and draw.
    pub async fn start(&mut self) {
        self.refresh().await;
        self.render();
    }

    pub async fn handle(&mut self, command: Command) {
        debug!("Processing command: {:?}", command);
        match command {
            Command::Show(view) => self.view = view,
            Command::Refresh => {
                self.refresh().await;
            }
        }
        self.render();
    }

    /// Push changed pixels to the panel.
    pub fn flush<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.framebuffer.flush(display)
    }

    /// Run the display task.
    ///
    /// Draws the initial view, then processes commands forever.
    pub async fn run<D>(
        &mut self,
        receiver: Receiver<'_, CriticalSectionRawMutex, Command, COMMAND_CAPACITY>,
        display: &mut D,
    ) -> !
    where
        D: DrawTarget<Color = Rgb565>,
        D::Error: Debug,
    {
        info!("Display manager task started");

        self.start().await;
        if let Err(e) = self.flush(display) {
            error!("Display flush error: {:?}", e);
        }

        loop {
            let command = receiver.receive().await;
            self.handle(command).await;
            if let Err(e) = self.flush(display) {
                error!("Display flush error: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::tests::sample_forecast;
    use crate::http::HttpError;
    use crate::storage::MemoryStore;
    use crate::views::HEADER_COLOR;
    use alloc::collections::VecDeque;
    use core::future::Future;
    use embassy_futures::block_on;

    struct ScriptedSource {
        responses: VecDeque<Result<Forecast, ForecastError>>,
        calls: u32,
    }

    impl ScriptedSource {
        fn new(responses: impl IntoIterator<Item = Result<Forecast, ForecastError>>) -> Self {
            Self {
                responses: responses.into_iter().collect(),
                calls: 0,
            }
        }
    }

    impl ForecastSource for ScriptedSource {
        fn fetch(&mut self) -> impl Future<Output = Result<Forecast, ForecastError>> {
            self.calls += 1;
            let next = self
                .responses
                .pop_front()
                .unwrap_or(Err(ForecastError::Empty));
            async move { next }
        }
    }

    fn failure() -> Result<Forecast, ForecastError> {
        Err(ForecastError::Http(HttpError::Status(500)))
    }

    fn manager(
        responses: impl IntoIterator<Item = Result<Forecast, ForecastError>>,
    ) -> DisplayManager<MemoryStore, ScriptedSource> {
        DisplayManager::new(
            MemoryStore::new(),
            ScriptedSource::new(responses),
            ViewKind::Today,
        )
        .with_retry_delay(Duration::from_ticks(0))
    }

    fn header_drawn(fb: &FrameBuffer) -> bool {
        (0..320).any(|x| fb.pixel(x, 10) == Some(HEADER_COLOR))
    }

    #[test]
    fn test_start_retries_until_success() {
        let mut dm = manager([failure(), failure(), Ok(sample_forecast())]);
        block_on(dm.start());

        assert_eq!(dm.source_mut().calls, 3);
        assert_eq!(dm.state(), AppRunState::Running);
        assert_eq!(dm.forecast().map(|f| f.title.as_str()), Some("Tokyo"));
        assert!(header_drawn(dm.framebuffer()));
    }

    #[test]
    fn test_start_gives_up_after_five_attempts() {
        let mut dm = manager([
            failure(),
            failure(),
            failure(),
            failure(),
            failure(),
            Ok(sample_forecast()),
        ]);
        block_on(dm.start());

        assert_eq!(dm.source_mut().calls, FETCH_ATTEMPTS);
        assert!(dm.forecast().is_none());
        assert_eq!(dm.state(), AppRunState::Error);
        // The no-data notice has no yellow header
        assert!(!header_drawn(dm.framebuffer()));
        assert!(dm.framebuffer().is_dirty());
    }

    #[test]
    fn test_failed_refresh_keeps_forecast() {
        let mut dm = manager([Ok(sample_forecast())]);
        block_on(dm.start());

        block_on(dm.handle(Command::Refresh));
        assert_eq!(dm.source_mut().calls, 1 + FETCH_ATTEMPTS);
        assert!(dm.forecast().is_some());
        assert_eq!(dm.state(), AppRunState::Running);
        assert!(header_drawn(dm.framebuffer()));
    }

    #[test]
    fn test_show_switches_view_without_fetching() {
        let mut dm = manager([Ok(sample_forecast())]);
        block_on(dm.start());

        block_on(dm.handle(Command::Show(ViewKind::Wind)));
        assert_eq!(dm.view(), ViewKind::Wind);
        assert_eq!(dm.source_mut().calls, 1);
    }

    #[test]
    fn test_wifi_failure_notice_until_first_forecast() {
        let wifi_down = || Err(ForecastError::WifiUnavailable);
        let mut dm = manager([
            wifi_down(),
            wifi_down(),
            wifi_down(),
            wifi_down(),
            wifi_down(),
            Ok(sample_forecast()),
        ]);
        block_on(dm.start());

        assert_eq!(dm.last_error(), Some(&ForecastError::WifiUnavailable));
        assert!(!header_drawn(dm.framebuffer()));
        let red_headline = (0..320).any(|x| dm.framebuffer().pixel(x, 95) == Some(Rgb565::RED));
        assert!(red_headline);

        block_on(dm.handle(Command::Refresh));
        assert_eq!(dm.last_error(), None);
        assert!(header_drawn(dm.framebuffer()));
    }
}

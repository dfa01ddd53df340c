//! Forecast source over WiFi and plain HTTP.
//!
//! The radio is only up while a fetch runs: every fetch starts the station,
//! joins the access point, performs one GET against the location API and
//! stops the radio again.

use alloc::vec::Vec;

use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{Runner, Stack};
use embassy_time::{Duration, Instant, Timer};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice};
use log::{debug, info, warn};
use nimbus_core::config::DeviceConfig;
use nimbus_core::forecast::{Forecast, ForecastError, ForecastSource};
use nimbus_core::http::{self, HTTP_PORT};
use nimbus_core::wifi::{RetryDecision, WifiConnection};

/// Pause between two attempts to join the access point.
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How long DHCP may take after joining.
const DHCP_TIMEOUT: Duration = Duration::from_secs(15);

const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for a location response (headers included).
const MAX_RESPONSE_LEN: usize = 16 * 1024;

const REQUEST_LEN: usize = 256;

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

pub struct HttpForecastSource {
    controller: WifiController<'static>,
    stack: Stack<'static>,
    ssid: &'static str,
    password: &'static str,
    host: &'static str,
    path: heapless::String<40>,
    wifi: WifiConnection,
    response: Vec<u8>,
}

impl HttpForecastSource {
    pub fn new(
        controller: WifiController<'static>,
        stack: Stack<'static>,
        config: &DeviceConfig<'static>,
    ) -> Self {
        Self {
            controller,
            stack,
            ssid: config.wifi.ssid,
            password: config.wifi.password,
            host: config.api_host,
            path: http::forecast_path(config.location_woeid),
            wifi: WifiConnection::new(config.wifi.max_retry),
            response: Vec::with_capacity(MAX_RESPONSE_LEN),
        }
    }

    /// Start the station and join the access point, retrying per the
    /// configured limit.
    async fn connect(&mut self) -> Result<(), ForecastError> {
        if !matches!(self.controller.is_started(), Ok(true)) {
            let client_config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(self.ssid.into())
                    .with_password(self.password.into()),
            );
            self.controller
                .set_config(&client_config)
                .map_err(|e| ForecastError::network(format_args!("WiFi config: {:?}", e)))?;
            self.controller
                .start_async()
                .await
                .map_err(|e| ForecastError::network(format_args!("WiFi start: {:?}", e)))?;
            debug!("WiFi started");
        }
        self.wifi.on_started();

        info!("Connecting to {}...", self.ssid);
        loop {
            match self.controller.connect_async().await {
                Ok(()) => break,
                Err(e) => {
                    warn!("Failed to connect: {:?}", e);
                    match self.wifi.on_disconnected() {
                        RetryDecision::Retry { .. } => Timer::after(CONNECT_RETRY_DELAY).await,
                        RetryDecision::GiveUp => return Err(ForecastError::WifiUnavailable),
                    }
                }
            }
        }

        self.wait_for_ip().await?;
        self.wifi.on_got_ip();
        Ok(())
    }

    async fn wait_for_ip(&self) -> Result<(), ForecastError> {
        let deadline = Instant::now() + DHCP_TIMEOUT;
        loop {
            if let Some(config) = self.stack.config_v4() {
                info!("Got IP: {}", config.address);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ForecastError::network("DHCP timed out"));
            }
            Timer::after(Duration::from_millis(500)).await;
        }
    }

    async fn disconnect(&mut self) {
        if let Err(e) = self.controller.disconnect_async().await {
            debug!("Disconnect error (may already be disconnected): {:?}", e);
        }
        if let Err(e) = self.controller.stop_async().await {
            warn!("WiFi stop error: {:?}", e);
        }
        debug!("WiFi stopped");
    }

    /// One GET of the location document, read until the server closes.
    async fn request(&mut self) -> Result<Forecast, ForecastError> {
        let addrs = self
            .stack
            .dns_query(self.host, DnsQueryType::A)
            .await
            .map_err(|e| ForecastError::network(format_args!("DNS {}: {:?}", self.host, e)))?;
        let addr = addrs
            .first()
            .copied()
            .ok_or_else(|| ForecastError::network("DNS returned no address"))?;
        debug!("{} resolved to {}", self.host, addr);

        let mut rx_buffer = [0u8; 1024];
        let mut tx_buffer = [0u8; 512];
        let mut socket = TcpSocket::new(self.stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        socket
            .connect((addr, HTTP_PORT))
            .await
            .map_err(|e| ForecastError::network(format_args!("connect: {:?}", e)))?;

        let request: heapless::String<REQUEST_LEN> = http::build_get_request(self.host, &self.path)?;
        let mut sent = request.as_bytes();
        while !sent.is_empty() {
            let n = socket
                .write(sent)
                .await
                .map_err(|e| ForecastError::network(format_args!("write: {:?}", e)))?;
            sent = &sent[n..];
        }
        socket
            .flush()
            .await
            .map_err(|e| ForecastError::network(format_args!("flush: {:?}", e)))?;

        self.response.clear();
        let mut chunk = [0u8; 512];
        loop {
            let n = socket
                .read(&mut chunk)
                .await
                .map_err(|e| ForecastError::network(format_args!("read: {:?}", e)))?;
            if n == 0 {
                break;
            }
            if self.response.len() + n > MAX_RESPONSE_LEN {
                return Err(ForecastError::network("response too large"));
            }
            self.response.extend_from_slice(&chunk[..n]);
        }
        socket.close();
        debug!("Received {} bytes", self.response.len());

        let response = http::parse_response(&self.response)?;
        Forecast::decode(response.body)
    }
}

impl ForecastSource for HttpForecastSource {
    async fn fetch(&mut self) -> Result<Forecast, ForecastError> {
        let result = match self.connect().await {
            Ok(()) => self.request().await,
            Err(e) => Err(e),
        };
        self.disconnect().await;
        result
    }
}

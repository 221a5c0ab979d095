//! Dashboard configuration.

use crate::sensors::SerialConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the dashboard web server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Host to bind the server to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
    /// Whether to enable CORS
    pub enable_cors: bool,
    /// Path to serve static files and page overrides from
    pub static_path: Option<String>,
    /// Passage log written by the counter process
    pub log_path: PathBuf,
    /// BCM pin of the IR illuminator
    pub led_pin: u8,
    /// Software PWM frequency of the illuminator
    pub pwm_frequency_hz: f64,
    /// Seconds before the illuminator switches itself off
    pub ir_auto_off_secs: u64,
    /// Seconds before the video stream stops itself
    pub stream_auto_off_secs: u64,
    /// Stream service command; `None` runs this executable's `stream` subcommand
    pub stream_command: Option<Vec<String>>,
    /// Command run by `POST /shutdown`
    pub halt_command: Vec<String>,
    /// Voltage sensor link; `None` disables voltage readings
    pub serial: Option<SerialConfig>,
    /// Thermal zone file for the CPU temperature
    pub thermal_zone: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_WEB_PORT,
            enable_cors: true,
            static_path: Some("static".to_string()),
            log_path: PathBuf::from(crate::DEFAULT_LOG_PATH),
            led_pin: crate::DEFAULT_LED_PIN,
            pwm_frequency_hz: 1000.0,
            ir_auto_off_secs: crate::control::illuminator::DEFAULT_AUTO_OFF.as_secs(),
            stream_auto_off_secs: crate::control::stream_process::DEFAULT_AUTO_STOP.as_secs(),
            stream_command: None,
            halt_command: crate::control::PowerControl::default_command(),
            serial: Some(SerialConfig::default()),
            thermal_zone: PathBuf::from(crate::status::collector::DEFAULT_THERMAL_ZONE),
        }
    }
}

impl DashboardConfig {
    /// Create a new dashboard configuration with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Enable or disable CORS.
    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    /// Set the static files path.
    pub fn with_static_path(mut self, path: Option<String>) -> Self {
        self.static_path = path;
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    pub fn with_led_pin(mut self, pin: u8) -> Self {
        self.led_pin = pin;
        self
    }

    pub fn with_ir_auto_off_secs(mut self, secs: u64) -> Self {
        self.ir_auto_off_secs = secs;
        self
    }

    pub fn with_stream_auto_off_secs(mut self, secs: u64) -> Self {
        self.stream_auto_off_secs = secs;
        self
    }

    pub fn with_stream_command(mut self, command: Option<Vec<String>>) -> Self {
        self.stream_command = command;
        self
    }

    pub fn with_halt_command(mut self, command: Vec<String>) -> Self {
        self.halt_command = command;
        self
    }

    pub fn with_serial(mut self, serial: Option<SerialConfig>) -> Self {
        self.serial = serial;
        self
    }

    /// Get the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

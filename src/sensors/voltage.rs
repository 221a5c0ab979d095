//! Battery voltage reported by the microcontroller over the UART.
//!
//! The microcontroller prints one reading per line, in volts. The reader runs
//! on a blocking thread and publishes the latest value; the dashboard only
//! ever reads it.

use crate::error::{BirdhouseError, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufReader};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// Readings below this raise the low-voltage alert.
pub const LOW_VOLTAGE_THRESHOLD: f64 = 3.3;

/// Latest voltage and whether it is below the alert threshold.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct VoltageReading {
    pub value: f64,
    pub alert: bool,
}

impl VoltageReading {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            alert: value < LOW_VOLTAGE_THRESHOLD,
        }
    }

    /// Parse one line from the UART; blank lines yield `None`.
    pub fn from_line(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let value = line
            .parse::<f64>()
            .map_err(|e| BirdhouseError::serial_error(format!("bad reading {:?}: {}", line, e)))?;
        Ok(Some(Self::new(value)))
    }
}

/// Serial link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    pub device: String,
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
    /// Pause after opening, the microcontroller resets when the port opens
    pub startup_delay_ms: u64,
    /// Pause between reads in milliseconds
    pub read_interval_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/serial0".to_string(),
            baud_rate: 9600,
            timeout_ms: 1000,
            startup_delay_ms: 2000,
            read_interval_ms: 1000,
        }
    }
}

/// Shared handle on the latest voltage reading.
#[derive(Debug, Clone, Default)]
pub struct VoltageMonitor {
    latest: Arc<RwLock<VoltageReading>>,
}

impl VoltageMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the serial port and start reading on a blocking thread.
    ///
    /// If the port cannot be opened the error is logged and the monitor
    /// keeps reporting 0 V without an alert.
    pub fn spawn(config: SerialConfig) -> Self {
        let monitor = Self::new();
        let publisher = monitor.clone();
        tokio::task::spawn_blocking(move || {
            let port = match open_port(&config) {
                Ok(port) => port,
                Err(e) => {
                    error!("Error opening UART {}: {}", config.device, e);
                    return;
                }
            };
            info!("Reading voltage from {} at {} baud", config.device, config.baud_rate);
            thread::sleep(Duration::from_millis(config.startup_delay_ms));

            publisher.pump_lines(
                BufReader::new(port),
                Duration::from_millis(config.read_interval_ms),
            );
            warn!("UART {} closed, voltage readings stopped", config.device);
        });
        monitor
    }

    pub fn latest(&self) -> VoltageReading {
        match self.latest.read() {
            Ok(reading) => *reading,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn update(&self, reading: VoltageReading) {
        match self.latest.write() {
            Ok(mut latest) => *latest = reading,
            Err(poisoned) => *poisoned.into_inner() = reading,
        }
    }

    /// Publish every reading from `reader` until end of input.
    ///
    /// Timeouts keep any partial line and try again; malformed lines and
    /// other read errors are logged and skipped.
    pub fn pump_lines<R: BufRead>(&self, mut reader: R, interval: Duration) {
        let mut line = String::new();
        loop {
            match reader.read_line(&mut line) {
                Ok(0) => return,
                Ok(_) => {
                    match VoltageReading::from_line(&line) {
                        Ok(Some(reading)) => self.update(reading),
                        Ok(None) => {}
                        Err(e) => warn!("Error reading voltage: {}", e),
                    }
                    line.clear();
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                    ) => {}
                Err(e) => {
                    warn!("Error reading voltage: {}", e);
                    line.clear();
                }
            }
            if !interval.is_zero() {
                thread::sleep(interval);
            }
        }
    }
}

/// Open the UART described by `config`.
pub fn open_port(config: &SerialConfig) -> Result<Box<dyn serialport::SerialPort>> {
    let port = serialport::new(&config.device, config.baud_rate)
        .timeout(Duration::from_millis(config.timeout_ms))
        .open()?;
    Ok(port)
}

//! Shared state handed to every dashboard handler.

use super::config::DashboardConfig;
use crate::control::{Illuminator, PowerControl, StreamController};
use crate::error::Result;
use crate::hardware::{self, simulated::RecordingOutput};
use crate::passage::PassageLog;
use crate::sensors::VoltageMonitor;
use crate::status::StatusReader;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Everything the dashboard can read or drive. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub passages: PassageLog,
    pub illuminator: Illuminator,
    pub stream: StreamController,
    pub voltage: VoltageMonitor,
    pub status: StatusReader,
    pub power: PowerControl,
    pub static_path: Option<PathBuf>,
}

impl AppState {
    /// Open the hardware named in `config` and start background readers.
    ///
    /// Must be called from inside a tokio runtime. A missing PWM pin is not
    /// fatal: the illuminator keeps its state but drives nothing.
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        let output = match hardware::open_pwm_output(config.led_pin, config.pwm_frequency_hz) {
            Ok(output) => {
                info!("IR illuminator on pin {}", config.led_pin);
                output
            }
            Err(e) => {
                warn!("{}; IR illuminator disabled", e);
                Box::new(RecordingOutput::new())
            }
        };

        let stream_command = match &config.stream_command {
            Some(command) => command.clone(),
            None => StreamController::default_command()?,
        };

        let voltage = match &config.serial {
            Some(serial) => VoltageMonitor::spawn(serial.clone()),
            None => {
                info!("Voltage sensor disabled");
                VoltageMonitor::new()
            }
        };

        Ok(Self {
            passages: PassageLog::new(&config.log_path),
            illuminator: Illuminator::new(output, Duration::from_secs(config.ir_auto_off_secs)),
            stream: StreamController::new(
                stream_command,
                Duration::from_secs(config.stream_auto_off_secs),
            )?,
            voltage,
            status: StatusReader::new(&config.thermal_zone),
            power: PowerControl::new(config.halt_command.clone())?,
            static_path: config.static_path.as_ref().map(PathBuf::from),
        })
    }
}

//! # Pi Birdhouse
//!
//! Controller for a camera-equipped birdhouse running on a Raspberry Pi.
//! Each duty runs as its own process and the processes only share the
//! passage log on disk.
//!
//! ## Components
//!
//! - **Passage counter**: polls an infrared beam-break sensor, counts every
//!   second raw edge as one passage and appends daily/total tallies to an
//!   append-only log that survives restarts
//! - **Dashboard**: web UI and JSON API for the passage log, IR illumination,
//!   the video stream, the UART voltage sensor and host health
//! - **Stream service**: MJPEG stream and single-frame capture from the camera
//! - **Shutdown watchdog**: halts the host after a 10 second long-press
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pi_birdhouse::{CounterConfig, PassageLog, ResumePolicy};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CounterConfig::default();
//!     let log = PassageLog::new(&config.log_path);
//!     let tallies = log.resume(ResumePolicy::LastLine)?;
//!     println!("{} passages so far", tallies.total_count);
//!     Ok(())
//! }
//! ```

pub mod control;
pub mod error;
pub mod hardware;
pub mod passage;
pub mod sensors;
pub mod status;
pub mod stream;
pub mod watchdog;
pub mod web;

// Re-export public API
pub use error::{BirdhouseError, Result};
pub use hardware::{DigitalInput, DutyCycleOutput, Level};
pub use passage::{
    clock::{Clock, LocalClock},
    counter::{Observation, PassageCounter, Tallies},
    log::{PassageLog, ResumePolicy},
    record::{PassageEntry, PassageRecord},
    runner::{CounterConfig, CounterRunner},
};
pub use status::{HostStatus, StatusReader};
pub use stream::{start_stream_server, StreamConfig};
pub use watchdog::{LongPressDetector, WatchdogConfig};
pub use web::{start_web_server, DashboardConfig};

/// Default location of the passage log shared by the counter and the dashboard
pub const DEFAULT_LOG_PATH: &str = "static/passages.log";

/// BCM pin of the infrared beam-break sensor
pub const DEFAULT_SENSOR_PIN: u8 = 18;

/// BCM pin driving the IR illuminator transistor
pub const DEFAULT_LED_PIN: u8 = 13;

/// BCM pin of the shutdown button
pub const DEFAULT_SHUTDOWN_PIN: u8 = 17;

/// Sensor polling interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Delay before the first sensor sample, avoids false positives at power-up
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;

/// The default dashboard port
pub const DEFAULT_WEB_PORT: u16 = 5000;

/// The default stream service port
pub const DEFAULT_STREAM_PORT: u16 = 8080;

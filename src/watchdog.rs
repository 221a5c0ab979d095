//! Shutdown watchdog: halts the host after a long press on the shutdown
//! button.
//!
//! The button pulls the pin LOW against the internal pull-up. Holding it for
//! the threshold (10 s by default) runs the halt command once.

use crate::control::PowerControl;
use crate::error::{BirdhouseError, Result};
use crate::hardware::{self, DigitalInput, Level, Pull};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for the shutdown watchdog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// BCM pin of the button
    pub pin: u8,
    /// How long the pin must stay LOW
    pub threshold_secs: u64,
    /// Sampling period in milliseconds (10 Hz by default)
    pub sample_interval_ms: u64,
    pub halt_command: Vec<String>,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            pin: crate::DEFAULT_SHUTDOWN_PIN,
            threshold_secs: 10,
            sample_interval_ms: 100,
            halt_command: vec!["sudo".to_string(), "halt".to_string()],
        }
    }
}

impl WatchdogConfig {
    pub fn with_pin(mut self, pin: u8) -> Self {
        self.pin = pin;
        self
    }

    pub fn with_threshold_secs(mut self, secs: u64) -> Self {
        self.threshold_secs = secs;
        self
    }

    pub fn with_halt_command(mut self, command: Vec<String>) -> Self {
        self.halt_command = command;
        self
    }

    pub fn threshold(&self) -> Duration {
        Duration::from_secs(self.threshold_secs)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

/// Tracks how long a line has been held LOW.
#[derive(Debug, Clone)]
pub struct LongPressDetector {
    threshold: Duration,
    low_since: Option<Instant>,
}

impl LongPressDetector {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            low_since: None,
        }
    }

    /// Feed one sample. HIGH resets the press; returns true once LOW has
    /// lasted at least the threshold.
    pub fn sample(&mut self, level: Level, now: Instant) -> bool {
        match level {
            Level::High => {
                self.low_since = None;
                false
            }
            Level::Low => {
                let since = *self.low_since.get_or_insert(now);
                now.saturating_duration_since(since) >= self.threshold
            }
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.low_since.is_some()
    }
}

/// Sample `input` until a long press is seen or `stop` is raised.
///
/// Returns whether a long press was detected.
pub fn wait_for_long_press<I: DigitalInput>(
    input: &mut I,
    config: &WatchdogConfig,
    stop: &AtomicBool,
) -> Result<bool> {
    let mut detector = LongPressDetector::new(config.threshold());
    let interval = config.sample_interval();

    while !stop.load(Ordering::SeqCst) {
        let level = input.read()?;
        let was_pressed = detector.is_pressed();
        if detector.sample(level, Instant::now()) {
            return Ok(true);
        }
        if detector.is_pressed() && !was_pressed {
            debug!("Shutdown button pressed");
        } else if was_pressed && !detector.is_pressed() {
            debug!("Shutdown button released early");
        }
        thread::sleep(interval);
    }
    Ok(false)
}

/// Watch the shutdown button and halt the host on a long press.
///
/// Returns without halting if `stop` is raised first.
pub async fn run_watchdog(config: WatchdogConfig, stop: Arc<AtomicBool>) -> Result<()> {
    let power = PowerControl::new(config.halt_command.clone())?;
    let mut input = hardware::open_input(config.pin, Pull::Up)?;
    info!(
        "Watching GPIO{} for a LOW level held {} seconds",
        config.pin, config.threshold_secs
    );

    let watch_config = config.clone();
    let pressed = tokio::task::spawn_blocking(move || {
        wait_for_long_press(&mut input, &watch_config, &stop)
    })
    .await
    .map_err(|e| BirdhouseError::process_error(format!("Watchdog task failed: {}", e)))??;

    if pressed {
        warn!(
            "GPIO{} held LOW for {} seconds, shutting down",
            config.pin, config.threshold_secs
        );
        power.halt().await?;
    } else {
        info!("Watchdog stopped");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::simulated::ScriptedInput;

    #[test]
    fn test_long_press_detection() {
        let mut detector = LongPressDetector::new(Duration::from_secs(10));
        let start = Instant::now();

        assert!(!detector.sample(Level::Low, start));
        assert!(!detector.sample(Level::Low, start + Duration::from_secs(9)));
        assert!(detector.sample(Level::Low, start + Duration::from_secs(10)));
    }

    #[test]
    fn test_release_resets_press() {
        let mut detector = LongPressDetector::new(Duration::from_secs(10));
        let start = Instant::now();

        assert!(!detector.sample(Level::Low, start));
        assert!(!detector.sample(Level::High, start + Duration::from_secs(8)));
        assert!(!detector.is_pressed());
        assert!(!detector.sample(Level::Low, start + Duration::from_secs(9)));
        assert!(!detector.sample(Level::Low, start + Duration::from_secs(18)));
        assert!(detector.sample(Level::Low, start + Duration::from_secs(19)));
    }

    #[test]
    fn test_high_never_triggers() {
        let mut detector = LongPressDetector::new(Duration::ZERO);
        assert!(!detector.sample(Level::High, Instant::now()));
        assert!(detector.sample(Level::Low, Instant::now()));
    }

    fn fast_config() -> WatchdogConfig {
        WatchdogConfig {
            threshold_secs: 0,
            sample_interval_ms: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_wait_for_long_press_detects_held_button() {
        // The scripted input holds LOW once its script runs out
        let mut input = ScriptedInput::new([Level::High, Level::High, Level::Low]);
        let stop = AtomicBool::new(false);

        assert!(wait_for_long_press(&mut input, &fast_config(), &stop).unwrap());
        assert_eq!(input.reads(), 3);
    }

    #[test]
    fn test_wait_for_long_press_honours_stop() {
        let mut input = ScriptedInput::new([Level::High]);
        let stop = AtomicBool::new(true);

        assert!(!wait_for_long_press(&mut input, &fast_config(), &stop).unwrap());
        assert_eq!(input.reads(), 0);
    }

    #[test]
    fn test_sensor_fault_propagates() {
        let mut input = ScriptedInput::new([Level::High]).fail_when_exhausted();
        let stop = AtomicBool::new(false);

        assert!(wait_for_long_press(&mut input, &fast_config(), &stop).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = WatchdogConfig::default();
        assert_eq!(config.pin, 17);
        assert_eq!(config.threshold(), Duration::from_secs(10));
        assert_eq!(config.sample_interval(), Duration::from_millis(100));
        assert_eq!(config.halt_command, vec!["sudo", "halt"]);
    }
}

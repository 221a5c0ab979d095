//! The passage counter process loop.

use super::clock::Clock;
use super::counter::{Observation, PassageCounter, Tallies};
use super::log::{PassageLog, ResumePolicy};
use crate::error::Result;
use crate::hardware::DigitalInput;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the passage counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Passage log shared with the dashboard
    pub log_path: PathBuf,
    /// BCM pin of the beam-break sensor
    pub sensor_pin: u8,
    /// Delay between sensor samples in milliseconds
    pub poll_interval_ms: u64,
    /// Delay before the first sample in milliseconds
    pub settle_delay_ms: u64,
    /// How to recover from a malformed last log line
    pub resume_policy: ResumePolicy,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(crate::DEFAULT_LOG_PATH),
            sensor_pin: crate::DEFAULT_SENSOR_PIN,
            poll_interval_ms: crate::DEFAULT_POLL_INTERVAL_MS,
            settle_delay_ms: crate::DEFAULT_SETTLE_DELAY_MS,
            resume_policy: ResumePolicy::default(),
        }
    }
}

impl CounterConfig {
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    pub fn with_sensor_pin(mut self, pin: u8) -> Self {
        self.sensor_pin = pin;
        self
    }

    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    pub fn with_settle_delay_ms(mut self, delay_ms: u64) -> Self {
        self.settle_delay_ms = delay_ms;
        self
    }

    pub fn with_resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.resume_policy = policy;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Owns the sensor, the counter state and the log for one process lifetime.
pub struct CounterRunner<I, C> {
    config: CounterConfig,
    sensor: I,
    clock: C,
    counter: PassageCounter,
    log: PassageLog,
}

impl<I: DigitalInput, C: Clock> CounterRunner<I, C> {
    /// Resume tallies from the log and get ready to count.
    pub fn new(config: CounterConfig, sensor: I, clock: C) -> Result<Self> {
        let log = PassageLog::new(&config.log_path);
        let tallies = log.resume_at(config.resume_policy, clock.now().date())?;

        Ok(Self {
            counter: PassageCounter::new(tallies),
            config,
            sensor,
            clock,
            log,
        })
    }

    pub fn tallies(&self) -> &Tallies {
        self.counter.tallies()
    }

    pub fn log(&self) -> &PassageLog {
        &self.log
    }

    /// Sample the sensor until `stop` is raised.
    ///
    /// Every counted passage is durable before the next sample is taken.
    /// Sensor and storage errors end the loop and are returned. Returns the
    /// number of passages counted during this call.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<u64> {
        let settle = self.config.settle_delay();
        if !settle.is_zero() {
            info!("Waiting {:?} for sensor stabilization", settle);
            thread::sleep(settle);
        }

        info!(
            "IR barrier active on pin {} (counting every second edge)",
            self.config.sensor_pin
        );

        let poll_interval = self.config.poll_interval();
        let mut counted = 0;
        while !stop.load(Ordering::SeqCst) {
            let level = self.sensor.read()?;
            match self.counter.observe(level, &self.clock) {
                Observation::Counted(record) => {
                    self.log.append(&record)?;
                    counted += 1;
                    info!("{}", record);
                }
                Observation::Uncounted { raw_count } => {
                    debug!("Passage detected (not counted), raw edge {}", raw_count);
                }
                Observation::Idle | Observation::Debouncing | Observation::Cleared => {}
            }
            self.sensor.wait_for_edge(poll_interval)?;
        }

        info!(
            "Counter stopped after {} passage(s); total is {}",
            counted,
            self.counter.tallies().total_count
        );
        Ok(counted)
    }

    /// Give the sensor back, releasing the pin when it is dropped.
    pub fn into_sensor(self) -> I {
        self.sensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BirdhouseError;
    use crate::hardware::simulated::ScriptedInput;
    use crate::passage::clock::ManualClock;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::fs;
    use std::sync::Arc;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn config(dir: &tempfile::TempDir) -> CounterConfig {
        CounterConfig::default()
            .with_log_path(dir.path().join("passages.log"))
            .with_settle_delay_ms(0)
            .with_poll_interval_ms(0)
    }

    fn run_edges(config: &CounterConfig, edges: usize, now: NaiveDateTime) -> Result<u64> {
        let stop = Arc::new(AtomicBool::new(false));
        let sensor = ScriptedInput::with_edges(edges).stop_when_exhausted(Arc::clone(&stop));
        let mut runner = CounterRunner::new(config.clone(), sensor, ManualClock::new(now))?;
        runner.run(&stop)
    }

    #[test]
    fn test_default_config() {
        let config = CounterConfig::default();
        assert_eq!(config.sensor_pin, 18);
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.log_path, PathBuf::from("static/passages.log"));
        assert_eq!(config.resume_policy, ResumePolicy::LastLine);
    }

    #[test]
    fn test_empty_log_four_edges() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        assert_eq!(run_edges(&config, 4, at(1, 10)).unwrap(), 2);

        let contents = fs::read_to_string(&config.log_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "2024-01-01 10:00:00 ; 2 ; 2");
    }

    #[test]
    fn test_resume_same_day() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        fs::write(&config.log_path, "2024-01-01 10:00:00 ; 5 ; 42\n").unwrap();

        run_edges(&config, 2, at(1, 12)).unwrap();

        let contents = fs::read_to_string(&config.log_path).unwrap();
        assert_eq!(
            contents,
            "2024-01-01 10:00:00 ; 5 ; 42\n2024-01-01 12:00:00 ; 6 ; 43\n"
        );
    }

    #[test]
    fn test_resume_next_day() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        fs::write(&config.log_path, "2024-01-01 10:00:00 ; 5 ; 42\n").unwrap();

        run_edges(&config, 2, at(2, 8)).unwrap();

        let contents = fs::read_to_string(&config.log_path).unwrap();
        assert_eq!(contents.lines().last(), Some("2024-01-02 08:00:00 ; 1 ; 43"));
    }

    #[test]
    fn test_resume_matches_uninterrupted_run() {
        let straight = tempfile::tempdir().unwrap();
        let straight_config = config(&straight);
        run_edges(&straight_config, 10, at(1, 10)).unwrap();

        let restarted = tempfile::tempdir().unwrap();
        let restarted_config = config(&restarted);
        run_edges(&restarted_config, 4, at(1, 10)).unwrap();
        run_edges(&restarted_config, 6, at(1, 10)).unwrap();

        assert_eq!(
            fs::read_to_string(&straight_config.log_path).unwrap(),
            fs::read_to_string(&restarted_config.log_path).unwrap()
        );
    }

    #[test]
    fn test_corrupt_tail_counts_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        fs::write(&config.log_path, "2024-01-01 10:00:00 ; 5 ; 42\n2024-01-01 10:0").unwrap();

        assert_eq!(run_edges(&config, 2, at(1, 11)).unwrap(), 1);

        let contents = fs::read_to_string(&config.log_path).unwrap();
        assert!(contents.starts_with("2024-01-01 10:00:00 ; 5 ; 42\n2024-01-01 10:0"));
        assert!(contents.ends_with("2024-01-01 11:00:00 ; 1 ; 1\n"));
    }

    #[test]
    fn test_sensor_fault_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let stop = AtomicBool::new(false);
        let sensor = ScriptedInput::with_edges(2).fail_when_exhausted();
        let mut runner =
            CounterRunner::new(config.clone(), sensor, ManualClock::new(at(1, 9))).unwrap();

        let result = runner.run(&stop);
        assert!(matches!(result, Err(BirdhouseError::Gpio(_))));
        assert_eq!(runner.tallies().total_count, 1);
        assert_eq!(fs::read_to_string(&config.log_path).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_storage_fault_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            config(&dir).with_log_path(dir.path().join("no-such-dir").join("passages.log"));
        assert!(matches!(
            run_edges(&config, 2, at(1, 9)),
            Err(BirdhouseError::Io(_))
        ));
    }

    #[test]
    fn test_stop_before_first_sample() {
        let dir = tempfile::tempdir().unwrap();
        let stop = AtomicBool::new(true);
        let mut runner = CounterRunner::new(
            config(&dir),
            ScriptedInput::with_edges(4),
            ManualClock::new(at(1, 9)),
        )
        .unwrap();
        assert_eq!(runner.run(&stop).unwrap(), 0);
        assert_eq!(runner.into_sensor().reads(), 0);
    }
}

//! Simulated devices for hosts without GPIO and for tests.

use super::{DigitalInput, DutyCycleOutput, Level};
use crate::error::{BirdhouseError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a [`ScriptedInput`] does once its script runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exhausted {
    /// Keep reporting LOW
    HoldLow,
    /// Fail every read, like a disconnected device
    Fault,
}

/// Digital input that replays a fixed sequence of levels, one per read.
///
/// `wait_for_edge` returns immediately so loops driven by this input run as
/// fast as the script allows.
pub struct ScriptedInput {
    script: VecDeque<Level>,
    exhausted: Exhausted,
    stop: Option<Arc<AtomicBool>>,
    reads: usize,
}

impl ScriptedInput {
    pub fn new(levels: impl IntoIterator<Item = Level>) -> Self {
        Self {
            script: levels.into_iter().collect(),
            exhausted: Exhausted::HoldLow,
            stop: None,
            reads: 0,
        }
    }

    /// Build a script from `edges` beam interruptions, each followed by a
    /// clear period. Every interruption is held for two samples so the
    /// debounce path is exercised.
    pub fn with_edges(edges: usize) -> Self {
        let mut levels = vec![Level::Low];
        for _ in 0..edges {
            levels.extend([Level::High, Level::High, Level::Low, Level::Low]);
        }
        Self::new(levels)
    }

    /// Raise `flag` when the script is exhausted.
    pub fn stop_when_exhausted(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    /// Fail every read after the script is exhausted.
    pub fn fail_when_exhausted(mut self) -> Self {
        self.exhausted = Exhausted::Fault;
        self
    }

    /// Number of reads served so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl DigitalInput for ScriptedInput {
    fn read(&mut self) -> Result<Level> {
        self.reads += 1;
        if let Some(level) = self.script.pop_front() {
            return Ok(level);
        }
        if let Some(flag) = &self.stop {
            flag.store(true, Ordering::SeqCst);
        }
        match self.exhausted {
            Exhausted::HoldLow => Ok(Level::Low),
            Exhausted::Fault => Err(BirdhouseError::gpio_error("simulated sensor fault")),
        }
    }

    fn wait_for_edge(&mut self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

/// Duty-cycle output that only remembers what it was told.
///
/// Clones share the same history, so a test can keep one handle while the
/// code under test owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    history: Arc<Mutex<Vec<f64>>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every duty cycle set so far, oldest first.
    pub fn history(&self) -> Vec<f64> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    /// The most recent duty cycle, 0 if never set.
    pub fn current(&self) -> f64 {
        self.history().last().copied().unwrap_or(0.0)
    }
}

impl DutyCycleOutput for RecordingOutput {
    fn set_duty_cycle(&mut self, percent: f64) -> Result<()> {
        let mut history = self
            .history
            .lock()
            .map_err(|_| BirdhouseError::gpio_error("duty cycle history poisoned"))?;
        history.push(percent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_input_replays_levels() {
        let mut input = ScriptedInput::new([Level::High, Level::Low]);
        assert_eq!(input.read().unwrap(), Level::High);
        assert_eq!(input.read().unwrap(), Level::Low);
        assert_eq!(input.read().unwrap(), Level::Low);
        assert_eq!(input.reads(), 3);
    }

    #[test]
    fn test_scripted_input_raises_stop_flag() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut input = ScriptedInput::new([Level::High]).stop_when_exhausted(Arc::clone(&stop));
        input.read().unwrap();
        assert!(!stop.load(Ordering::SeqCst));
        input.read().unwrap();
        assert!(stop.load(Ordering::SeqCst));
    }

    #[test]
    fn test_scripted_input_fault() {
        let mut input = ScriptedInput::new([]).fail_when_exhausted();
        assert!(input.read().is_err());
    }

    #[test]
    fn test_recording_output_shares_history() {
        let recorder = RecordingOutput::new();
        let mut output = recorder.clone();
        output.set_duty_cycle(100.0).unwrap();
        output.set_duty_cycle(0.0).unwrap();
        assert_eq!(recorder.history(), vec![100.0, 0.0]);
        assert_eq!(recorder.current(), 0.0);
    }
}

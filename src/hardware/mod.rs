//! Hardware access: digital inputs and PWM outputs.
//!
//! The real Raspberry Pi implementation lives behind the `gpio` feature so the
//! crate builds and tests on any host. Simulated devices in [`simulated`] are
//! used by tests and as a fallback when a pin cannot be opened.

pub mod gpio;
pub mod simulated;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::thread;
use std::time::Duration;

pub use gpio::{open_input, open_pwm_output};

/// Logic level of a digital line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => f.write_str("LOW"),
            Level::High => f.write_str("HIGH"),
        }
    }
}

/// Internal bias applied to an input pin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Pull {
    Up,
    Down,
    Floating,
}

/// A single digital input line.
pub trait DigitalInput {
    /// Sample the current level of the line.
    fn read(&mut self) -> Result<Level>;

    /// Block until the line may have changed, or until `timeout` elapses.
    ///
    /// The default implementation sleeps for the whole timeout, which turns
    /// the caller's loop into fixed-interval polling. Inputs that support
    /// edge interrupts return as soon as an edge arrives.
    fn wait_for_edge(&mut self, timeout: Duration) -> Result<()> {
        thread::sleep(timeout);
        Ok(())
    }
}

/// An output driven with a duty cycle expressed in percent (0-100).
pub trait DutyCycleOutput {
    fn set_duty_cycle(&mut self, percent: f64) -> Result<()>;
}

impl<T: DigitalInput + ?Sized> DigitalInput for Box<T> {
    fn read(&mut self) -> Result<Level> {
        (**self).read()
    }

    fn wait_for_edge(&mut self, timeout: Duration) -> Result<()> {
        (**self).wait_for_edge(timeout)
    }
}

impl<T: DutyCycleOutput + ?Sized> DutyCycleOutput for Box<T> {
    fn set_duty_cycle(&mut self, percent: f64) -> Result<()> {
        (**self).set_duty_cycle(percent)
    }
}

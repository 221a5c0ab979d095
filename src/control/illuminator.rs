//! Infrared illuminator on a PWM pin.

use crate::error::{BirdhouseError, Result};
use crate::hardware::DutyCycleOutput;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// How long the illuminator stays on after a toggle.
pub const DEFAULT_AUTO_OFF: Duration = Duration::from_secs(30);

/// Current illuminator state as reported to the dashboard.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct IlluminatorState {
    pub led_on: bool,
    pub intensity: f64,
}

struct Inner {
    output: Box<dyn DutyCycleOutput + Send>,
    led_on: bool,
    intensity: f64,
    generation: u64,
}

impl Inner {
    fn apply(&mut self, percent: f64) -> Result<()> {
        self.output.set_duty_cycle(percent)?;
        self.intensity = percent;
        self.led_on = percent > 0.0;
        Ok(())
    }
}

/// The IR LED. Cheap to clone; clones share the same output.
#[derive(Clone)]
pub struct Illuminator {
    inner: Arc<Mutex<Inner>>,
    auto_off: Duration,
}

impl Illuminator {
    /// Take ownership of `output`, which is assumed to start at 0 %.
    pub fn new(output: Box<dyn DutyCycleOutput + Send>, auto_off: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                output,
                led_on: false,
                intensity: 0.0,
                generation: 0,
            })),
            auto_off,
        }
    }

    pub async fn state(&self) -> IlluminatorState {
        let inner = self.inner.lock().await;
        IlluminatorState {
            led_on: inner.led_on,
            intensity: inner.intensity,
        }
    }

    /// Switch off if on, otherwise switch on at full power and schedule the
    /// auto-off. Returns whether the LED is now on.
    pub async fn toggle(&self) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;

        if inner.led_on {
            inner.apply(0.0)?;
            info!("IR illuminator off");
            return Ok(false);
        }

        inner.apply(100.0)?;
        info!("IR illuminator on for {:?}", self.auto_off);

        let generation = inner.generation;
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.auto_off).await;
            this.auto_turn_off(generation).await;
        });
        Ok(true)
    }

    /// Set the duty cycle directly. Values must be finite and within 0-100.
    pub async fn set_intensity(&self, percent: f64) -> Result<f64> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(BirdhouseError::InvalidIntensity(percent));
        }
        let mut inner = self.inner.lock().await;
        inner.apply(percent)?;
        debug!("IR intensity set to {}%", percent);
        Ok(percent)
    }

    async fn auto_turn_off(&self, generation: u64) {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation || !inner.led_on {
            return;
        }
        match inner.apply(0.0) {
            Ok(()) => info!("IR illuminator switched off automatically"),
            Err(e) => tracing::error!("Failed to switch off IR illuminator: {}", e),
        }
    }
}

//! GPIO (General Purpose Input/Output) access for Raspberry Pi.
//!
//! This module is feature-gated to allow compilation on non-Raspberry Pi
//! systems. Without the `gpio` feature every open call fails with a GPIO
//! error so callers can decide whether to fall back or exit.

use super::{DigitalInput, DutyCycleOutput, Pull};
use crate::error::Result;

#[cfg(feature = "gpio")]
mod raspberry_pi {
    use super::*;
    use crate::error::BirdhouseError;
    use crate::hardware::Level;
    use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
    use std::time::Duration;
    use tracing::debug;

    impl From<rppal::gpio::Level> for Level {
        fn from(level: rppal::gpio::Level) -> Self {
            match level {
                rppal::gpio::Level::Low => Level::Low,
                rppal::gpio::Level::High => Level::High,
            }
        }
    }

    /// Input pin backed by rppal. The pin is reset to its original state
    /// when dropped.
    pub struct PiInput {
        pin: InputPin,
        interrupts: bool,
    }

    impl PiInput {
        pub fn new(bcm_pin: u8, pull: Pull) -> Result<Self> {
            let gpio = Gpio::new().map_err(|e| {
                BirdhouseError::gpio_error(format!("Failed to initialize GPIO: {}", e))
            })?;
            let pin = gpio.get(bcm_pin).map_err(|e| {
                BirdhouseError::gpio_error(format!("Failed to access pin {}: {}", bcm_pin, e))
            })?;
            let mut pin = match pull {
                Pull::Up => pin.into_input_pullup(),
                Pull::Down => pin.into_input_pulldown(),
                Pull::Floating => pin.into_input(),
            };

            // Edge interrupts are optional; fall back to plain polling.
            let interrupts = match pin.set_interrupt(Trigger::Both) {
                Ok(()) => true,
                Err(e) => {
                    debug!("Interrupts unavailable on pin {}: {}", bcm_pin, e);
                    false
                }
            };

            Ok(Self { pin, interrupts })
        }
    }

    impl DigitalInput for PiInput {
        fn read(&mut self) -> Result<Level> {
            Ok(self.pin.read().into())
        }

        fn wait_for_edge(&mut self, timeout: Duration) -> Result<()> {
            if self.interrupts {
                self.pin.poll_interrupt(true, Some(timeout))?;
            } else {
                std::thread::sleep(timeout);
            }
            Ok(())
        }
    }

    /// Software PWM output backed by rppal.
    pub struct PiPwmOutput {
        pin: OutputPin,
        frequency_hz: f64,
    }

    impl PiPwmOutput {
        pub fn new(bcm_pin: u8, frequency_hz: f64) -> Result<Self> {
            let gpio = Gpio::new().map_err(|e| {
                BirdhouseError::gpio_error(format!("Failed to initialize GPIO: {}", e))
            })?;
            let mut pin = gpio
                .get(bcm_pin)
                .map_err(|e| {
                    BirdhouseError::gpio_error(format!("Failed to access pin {}: {}", bcm_pin, e))
                })?
                .into_output_low();
            pin.set_pwm_frequency(frequency_hz, 0.0)?;
            Ok(Self { pin, frequency_hz })
        }
    }

    impl DutyCycleOutput for PiPwmOutput {
        fn set_duty_cycle(&mut self, percent: f64) -> Result<()> {
            let duty = (percent / 100.0).clamp(0.0, 1.0);
            self.pin.set_pwm_frequency(self.frequency_hz, duty)?;
            Ok(())
        }
    }
}

#[cfg(not(feature = "gpio"))]
mod unavailable {
    use super::*;
    use crate::error::BirdhouseError;

    pub fn not_available(pin: u8) -> BirdhouseError {
        BirdhouseError::gpio_error(format!(
            "GPIO not available on this system (attempted to open pin {})",
            pin
        ))
    }

    pub fn open_input(pin: u8, _pull: Pull) -> Result<Box<dyn DigitalInput + Send>> {
        Err(not_available(pin))
    }

    pub fn open_pwm_output(pin: u8, _frequency_hz: f64) -> Result<Box<dyn DutyCycleOutput + Send>> {
        Err(not_available(pin))
    }
}

#[cfg(feature = "gpio")]
pub use raspberry_pi::{PiInput, PiPwmOutput};

/// Open a BCM input pin with the given bias.
#[cfg(feature = "gpio")]
pub fn open_input(pin: u8, pull: Pull) -> Result<Box<dyn DigitalInput + Send>> {
    Ok(Box::new(PiInput::new(pin, pull)?))
}

/// Open a BCM pin as a software PWM output, initially at 0 %.
#[cfg(feature = "gpio")]
pub fn open_pwm_output(pin: u8, frequency_hz: f64) -> Result<Box<dyn DutyCycleOutput + Send>> {
    Ok(Box::new(PiPwmOutput::new(pin, frequency_hz)?))
}

#[cfg(not(feature = "gpio"))]
pub use unavailable::{open_input, open_pwm_output};

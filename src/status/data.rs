//! Data structures for host status.

use serde::{Deserialize, Serialize};

/// What the dashboard shows about the host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HostStatus {
    /// CPU temperature in Celsius, one decimal
    pub temperature: f64,
    /// Five-minute load average, two decimals
    pub load5: f64,
}

impl HostStatus {
    /// Build from raw readings, rounding the way the dashboard displays them.
    pub fn from_readings(millidegrees: i64, load: &LoadAverage) -> Self {
        Self {
            temperature: round_to(millidegrees as f64 / 1000.0, 1),
            load5: round_to(load.five_minutes, 2),
        }
    }
}

/// System load averages.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct LoadAverage {
    pub one_minute: f64,
    pub five_minutes: f64,
    pub fifteen_minutes: f64,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

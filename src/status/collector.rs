//! Reads host temperature and load from sysfs and sysinfo.

use super::data::{HostStatus, LoadAverage};
use crate::error::{BirdhouseError, Result};
use std::path::{Path, PathBuf};
use sysinfo::System;

/// Raspberry Pi SoC thermal zone, in millidegrees Celsius.
pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Reads [`HostStatus`] on demand.
#[derive(Debug, Clone)]
pub struct StatusReader {
    thermal_zone: PathBuf,
}

impl Default for StatusReader {
    fn default() -> Self {
        Self::new(DEFAULT_THERMAL_ZONE)
    }
}

impl StatusReader {
    pub fn new(thermal_zone: impl AsRef<Path>) -> Self {
        Self {
            thermal_zone: thermal_zone.as_ref().to_path_buf(),
        }
    }

    /// Read the temperature and current load.
    pub async fn read(&self) -> Result<HostStatus> {
        let millidegrees = self.read_temperature().await?;
        Ok(HostStatus::from_readings(millidegrees, &Self::load_average()))
    }

    async fn read_temperature(&self) -> Result<i64> {
        let raw = tokio::fs::read_to_string(&self.thermal_zone).await?;
        raw.trim().parse::<i64>().map_err(|e| {
            BirdhouseError::config_error(format!(
                "Unexpected contents in {}: {}",
                self.thermal_zone.display(),
                e
            ))
        })
    }

    /// System load averages.
    pub fn load_average() -> LoadAverage {
        let load = System::load_average();
        LoadAverage {
            one_minute: load.one,
            five_minutes: load.five,
            fifteen_minutes: load.fifteen,
        }
    }
}

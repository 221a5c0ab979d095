//! Host halt, used by the dashboard and the shutdown watchdog.

use crate::error::{BirdhouseError, Result};
use std::sync::Arc;
use tokio::process::Command;
use tracing::warn;

/// Runs a fixed halt command.
#[derive(Debug, Clone)]
pub struct PowerControl {
    command: Arc<Vec<String>>,
}

impl PowerControl {
    /// `command` is the program followed by its arguments.
    pub fn new(command: Vec<String>) -> Result<Self> {
        if command.is_empty() {
            return Err(BirdhouseError::config_error("Halt command is empty"));
        }
        Ok(Self {
            command: Arc::new(command),
        })
    }

    /// `sudo /sbin/shutdown -h now`
    pub fn default_command() -> Vec<String> {
        ["sudo", "/sbin/shutdown", "-h", "now"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Run the halt command and wait for it to finish.
    pub async fn halt(&self) -> Result<()> {
        warn!("Halting host: {}", self.command.join(" "));
        let status = Command::new(&self.command[0])
            .args(&self.command[1..])
            .status()
            .await
            .map_err(|e| {
                BirdhouseError::process_error(format!("Failed to run halt command: {}", e))
            })?;
        if !status.success() {
            return Err(BirdhouseError::process_error(format!(
                "Halt command exited with {}",
                status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_halt_runs_command() {
        let power = PowerControl::new(vec!["true".into()]).unwrap();
        assert!(power.halt().await.is_ok());
    }

    #[tokio::test]
    async fn test_halt_failure_reported() {
        let power = PowerControl::new(vec!["false".into()]).unwrap();
        assert!(matches!(power.halt().await, Err(BirdhouseError::Process(_))));
    }

    #[test]
    fn test_default_command() {
        assert_eq!(PowerControl::default_command()[0], "sudo");
        assert!(PowerControl::new(Vec::new()).is_err());
    }
}

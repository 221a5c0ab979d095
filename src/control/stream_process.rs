//! Starts and stops the stream service as a child process.

use crate::error::{BirdhouseError, Result};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// How long the stream runs before it is stopped automatically.
pub const DEFAULT_AUTO_STOP: Duration = Duration::from_secs(60);

struct Inner {
    child: Option<Child>,
    generation: u64,
}

impl Inner {
    /// Whether the child is still alive; forgets it if it has exited.
    fn reap(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                info!("Stream process exited on its own: {}", status);
                self.child = None;
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("Could not poll stream process: {}", e);
                true
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            child
                .kill()
                .await
                .map_err(|e| {
                    BirdhouseError::process_error(format!("Failed to stop stream: {}", e))
                })?;
            info!("Stream process stopped");
        }
        Ok(())
    }
}

/// Owns the stream service child process. Clones share the same child.
#[derive(Clone)]
pub struct StreamController {
    command: Arc<Vec<String>>,
    auto_stop: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl StreamController {
    /// `command` is the program followed by its arguments.
    pub fn new(command: Vec<String>, auto_stop: Duration) -> Result<Self> {
        if command.is_empty() {
            return Err(BirdhouseError::config_error("Stream command is empty"));
        }
        Ok(Self {
            command: Arc::new(command),
            auto_stop,
            inner: Arc::new(Mutex::new(Inner {
                child: None,
                generation: 0,
            })),
        })
    }

    /// This executable's `stream` subcommand.
    pub fn default_command() -> Result<Vec<String>> {
        let exe = std::env::current_exe()?;
        Ok(vec![exe.to_string_lossy().into_owned(), "stream".to_string()])
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.reap()
    }

    /// Stop the stream if it runs, otherwise start it with an auto-stop.
    /// Returns whether the stream is now running.
    pub async fn toggle(&self) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;

        if inner.reap() {
            inner.stop().await?;
            return Ok(false);
        }

        let child = Command::new(&self.command[0])
            .args(&self.command[1..])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BirdhouseError::process_error(format!(
                    "Failed to start {}: {}",
                    self.command.join(" "),
                    e
                ))
            })?;
        info!(
            "Stream process started (pid {:?}), auto-stop in {:?}",
            child.id(),
            self.auto_stop
        );
        inner.child = Some(child);

        let generation = inner.generation;
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.auto_stop).await;
            this.expire(generation).await;
        });
        Ok(true)
    }

    async fn expire(&self, generation: u64) {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            return;
        }
        if let Err(e) = inner.stop().await {
            error!("{}", e);
        }
    }

    /// Stop the stream if it runs.
    pub async fn shutdown(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        inner.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sleeper(auto_stop: Duration) -> StreamController {
        StreamController::new(vec!["sleep".into(), "30".into()], auto_stop).unwrap()
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(StreamController::new(Vec::new(), DEFAULT_AUTO_STOP).is_err());
    }

    #[tokio::test]
    async fn test_toggle_starts_and_stops() {
        let stream = sleeper(DEFAULT_AUTO_STOP);
        assert!(!stream.is_running().await);
        assert!(stream.toggle().await.unwrap());
        assert!(stream.is_running().await);
        assert!(!stream.toggle().await.unwrap());
        assert!(!stream.is_running().await);
    }

    #[tokio::test]
    async fn test_auto_stop() {
        let stream = sleeper(Duration::from_millis(100));
        stream.toggle().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!stream.is_running().await);
    }

    #[tokio::test]
    async fn test_process_exiting_on_its_own() {
        let stream = StreamController::new(vec!["true".into()], DEFAULT_AUTO_STOP).unwrap();
        assert!(stream.toggle().await.unwrap());
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!stream.is_running().await);
        // A dead child means the next toggle starts a new one.
        assert!(stream.toggle().await.unwrap());
        stream.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_program() {
        let stream = StreamController::new(
            vec!["/nonexistent/stream-binary".into()],
            DEFAULT_AUTO_STOP,
        )
        .unwrap();
        assert!(matches!(stream.toggle().await, Err(BirdhouseError::Process(_))));
        assert!(!stream.is_running().await);
    }
}

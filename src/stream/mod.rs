//! Stream service: live MJPEG view and single-frame capture.
//!
//! A producer task pulls frames from a [`FrameSource`] and publishes each one
//! into a single-slot `watch` mailbox. Viewers and `/capture` only ever see
//! the newest frame; slow viewers skip frames instead of queueing them.

pub mod handlers;
pub mod jpeg;
pub mod source;

pub use jpeg::JpegSplitter;
pub use source::{CommandCamera, FrameSource, TestPattern};

use crate::error::{BirdhouseError, Result};
use axum::body::Bytes;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Where frames come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The Pi camera through `rpicam-vid`
    #[default]
    Camera,
    /// Generated frames, for hosts without a camera
    TestPattern,
}

/// Configuration for the stream service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub host: String,
    pub port: u16,
    /// Directory captured frames are written to
    pub images_dir: PathBuf,
    /// Directory holding `logo.png`
    pub static_path: PathBuf,
    pub source: SourceKind,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Camera program, run with MJPEG-to-stdout arguments
    pub camera_program: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_STREAM_PORT,
            images_dir: PathBuf::from("Images"),
            static_path: PathBuf::from("static"),
            source: SourceKind::Camera,
            width: 640,
            height: 480,
            fps: 10,
            camera_program: "rpicam-vid".to_string(),
        }
    }
}

impl StreamConfig {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.images_dir = dir.into();
        self
    }

    pub fn with_static_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_path = dir.into();
        self
    }

    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = source;
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open the configured frame source.
    pub fn open_source(&self) -> Result<Box<dyn FrameSource>> {
        match self.source {
            SourceKind::Camera => {
                let command = CommandCamera::rpicam_command(
                    &self.camera_program,
                    self.width,
                    self.height,
                    self.fps,
                );
                Ok(Box::new(CommandCamera::spawn(command)?))
            }
            SourceKind::TestPattern => {
                Ok(Box::new(TestPattern::new(self.width, self.height, self.fps)))
            }
        }
    }
}

/// Receiving side of the frame mailbox; `None` until the first frame.
pub type FrameReceiver = watch::Receiver<Option<Bytes>>;

/// Publish frames from `source` until it fails or every receiver is gone.
pub async fn run_producer(mut source: Box<dyn FrameSource>, frames: watch::Sender<Option<Bytes>>) {
    info!("Producing frames from {}", source.describe());
    loop {
        match source.next_frame().await {
            Ok(frame) => {
                if frames.send(Some(frame)).is_err() {
                    break;
                }
            }
            Err(e) => {
                error!("Frame source stopped: {}", e);
                break;
            }
        }
    }
}

/// Start the stream service and serve until SIGINT or SIGTERM.
pub async fn start_stream_server(config: StreamConfig) -> Result<()> {
    let source = config.open_source()?;
    let (tx, rx) = watch::channel(None);
    let producer = tokio::spawn(run_producer(source, tx));

    let state = handlers::StreamState {
        frames: rx,
        images_dir: config.images_dir.clone(),
    };
    let app = handlers::create_stream_app(state, &config.static_path);

    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| BirdhouseError::config_error(format!("Invalid bind address: {}", e)))?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| {
            BirdhouseError::web_server_error(format!("Failed to bind to address: {}", e))
        })?;
    info!("Stream server running at http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(crate::web::shutdown_signal())
        .await;

    // Dropping the source kills the camera process
    producer.abort();
    if let Err(e) = producer.await {
        if !e.is_cancelled() {
            warn!("Frame producer ended abnormally: {}", e);
        }
    }
    info!("Stream server stopped");

    served.map_err(|e| BirdhouseError::web_server_error(format!("Server error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(Vec<Bytes>);

    #[async_trait]
    impl FrameSource for Fixed {
        async fn next_frame(&mut self) -> Result<Bytes> {
            if self.0.is_empty() {
                Err(BirdhouseError::camera_error("done"))
            } else {
                Ok(self.0.remove(0))
            }
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    #[tokio::test]
    async fn test_producer_keeps_only_latest_frame() {
        let (tx, rx) = watch::channel(None);
        let source = Fixed(vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);

        run_producer(Box::new(source), tx).await;
        assert_eq!(rx.borrow().as_deref(), Some(&b"b"[..]));
    }

    #[tokio::test]
    async fn test_producer_stops_without_receivers() {
        let (tx, rx) = watch::channel(None);
        drop(rx);
        // Finishes even though the pattern never runs out
        run_producer(Box::new(TestPattern::new(8, 8, 1000)), tx).await;
    }

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!((config.width, config.height, config.fps), (640, 480, 10));
        assert_eq!(config.source, SourceKind::Camera);
    }
}

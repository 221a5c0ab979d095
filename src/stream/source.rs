//! Frame sources for the stream service.

use super::jpeg::JpegSplitter;
use crate::error::{BirdhouseError, Result};
use async_trait::async_trait;
use axum::body::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, Rgb, RgbImage};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info};

/// Something that produces JPEG frames, one at a time.
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for and return the next encoded frame.
    async fn next_frame(&mut self) -> Result<Bytes>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// A camera process writing MJPEG to its stdout (`rpicam-vid -o -`).
pub struct CommandCamera {
    command: Vec<String>,
    // Held so the process is killed when the source is dropped
    _child: Child,
    stdout: ChildStdout,
    splitter: JpegSplitter,
    chunk: Vec<u8>,
}

impl CommandCamera {
    /// `rpicam-vid` arguments for an endless MJPEG stream on stdout.
    pub fn rpicam_command(program: &str, width: u32, height: u32, fps: u32) -> Vec<String> {
        vec![
            program.to_string(),
            "-t".into(),
            "0".into(),
            "-n".into(),
            "--codec".into(),
            "mjpeg".into(),
            "--width".into(),
            width.to_string(),
            "--height".into(),
            height.to_string(),
            "--framerate".into(),
            fps.to_string(),
            "-o".into(),
            "-".into(),
        ]
    }

    /// Spawn `command` (program followed by its arguments).
    pub fn spawn(command: Vec<String>) -> Result<Self> {
        let Some((program, args)) = command.split_first() else {
            return Err(BirdhouseError::config_error("Camera command is empty"));
        };
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BirdhouseError::camera_error(format!("Failed to start {}: {}", program, e))
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BirdhouseError::camera_error("Camera stdout not captured"))?;
        info!("Camera started: {}", command.join(" "));

        Ok(Self {
            command,
            _child: child,
            stdout,
            splitter: JpegSplitter::new(),
            chunk: vec![0; 64 * 1024],
        })
    }
}

#[async_trait]
impl FrameSource for CommandCamera {
    async fn next_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(frame) = self.splitter.next_frame() {
                return Ok(Bytes::from(frame));
            }
            let read = self.stdout.read(&mut self.chunk).await?;
            if read == 0 {
                return Err(BirdhouseError::camera_error(format!(
                    "{} closed its output",
                    self.command[0]
                )));
            }
            self.splitter.push(&self.chunk[..read]);
        }
    }

    fn describe(&self) -> String {
        self.command.join(" ")
    }
}

/// Synthetic frames for hosts without a camera: a bar sweeping across a
/// green background.
pub struct TestPattern {
    width: u32,
    height: u32,
    frame: u64,
    ticker: Interval,
}

impl TestPattern {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        let period = Duration::from_secs(1) / fps.max(1);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            width: width.max(1),
            height: height.max(1),
            frame: 0,
            ticker,
        }
    }

    /// Render and encode frame number `n`.
    pub fn render(&self, n: u64) -> Result<Vec<u8>> {
        let bar_width = (self.width / 16).max(1);
        let bar_x = (n * u64::from(bar_width) % u64::from(self.width)) as u32;
        let image = RgbImage::from_fn(self.width, self.height, |x, y| {
            if x >= bar_x && x < bar_x + bar_width {
                Rgb([255, 255, 255])
            } else {
                let shade = (y * 120 / self.height) as u8;
                Rgb([27, 131 - shade / 2, 53])
            }
        });

        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, 80)
            .encode(image.as_raw(), self.width, self.height, ExtendedColorType::Rgb8)
            .map_err(|e| BirdhouseError::camera_error(format!("JPEG encoding failed: {}", e)))?;
        Ok(encoded)
    }
}

#[async_trait]
impl FrameSource for TestPattern {
    async fn next_frame(&mut self) -> Result<Bytes> {
        self.ticker.tick().await;
        let frame = self.render(self.frame)?;
        self.frame += 1;
        debug!("Test pattern frame {} ({} bytes)", self.frame, frame.len());
        Ok(Bytes::from(frame))
    }

    fn describe(&self) -> String {
        format!("test pattern {}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pattern_produces_jpeg() {
        let mut source = TestPattern::new(64, 48, 100);
        let frame = source.next_frame().await.unwrap();
        assert_eq!(&frame[..2], &[0xFF, 0xD8]);
        assert_eq!(&frame[frame.len() - 2..], &[0xFF, 0xD9]);

        let decoded = image::load_from_memory(&frame).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_rpicam_command() {
        let command = CommandCamera::rpicam_command("rpicam-vid", 640, 480, 10);
        assert_eq!(command[0], "rpicam-vid");
        assert!(command.windows(2).any(|w| w == ["--codec", "mjpeg"]));
        assert!(command.windows(2).any(|w| w == ["--framerate", "10"]));
        assert_eq!(command.last().map(String::as_str), Some("-"));
    }

    #[tokio::test]
    async fn test_command_camera_splits_stdout() {
        // Two minimal images written by a shell in one go
        let mut camera = CommandCamera::spawn(vec![
            "sh".into(),
            "-c".into(),
            r"printf '\377\330a\377\331\377\330b\377\331'".into(),
        ])
        .unwrap();

        assert_eq!(&camera.next_frame().await.unwrap()[..], b"\xFF\xD8a\xFF\xD9");
        assert_eq!(&camera.next_frame().await.unwrap()[..], b"\xFF\xD8b\xFF\xD9");
        assert!(matches!(
            camera.next_frame().await,
            Err(BirdhouseError::Camera(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_camera_program() {
        let result = CommandCamera::spawn(vec!["/nonexistent/rpicam-vid".into()]);
        assert!(matches!(result, Err(BirdhouseError::Camera(_))));
    }
}

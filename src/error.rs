//! Error handling for the birdhouse controller.

/// A specialized `Result` type for birdhouse operations.
pub type Result<T> = std::result::Result<T, BirdhouseError>;

/// The main error type for birdhouse operations.
#[derive(Debug, thiserror::Error)]
pub enum BirdhouseError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// GPIO operation failed or GPIO is not available on this host
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// Serial port operation failed
    #[error("Serial error: {0}")]
    Serial(String),

    /// A passage log line could not be parsed
    #[error("Malformed passage log line: {0}")]
    LogFormat(String),

    /// Illumination intensity outside 0-100
    #[error("Invalid intensity {0}: expected a value between 0 and 100")]
    InvalidIntensity(f64),

    /// Child process could not be started or stopped
    #[error("Process error: {0}")]
    Process(String),

    /// Camera produced no usable frames
    #[error("Camera error: {0}")]
    Camera(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BirdhouseError {
    /// Create a new GPIO error
    pub fn gpio_error(msg: impl Into<String>) -> Self {
        Self::Gpio(msg.into())
    }

    /// Create a new serial port error
    pub fn serial_error(msg: impl Into<String>) -> Self {
        Self::Serial(msg.into())
    }

    /// Create a new log format error
    pub fn log_format_error(msg: impl Into<String>) -> Self {
        Self::LogFormat(msg.into())
    }

    /// Create a new process error
    pub fn process_error(msg: impl Into<String>) -> Self {
        Self::Process(msg.into())
    }

    /// Create a new camera error
    pub fn camera_error(msg: impl Into<String>) -> Self {
        Self::Camera(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(feature = "gpio")]
impl From<rppal::gpio::Error> for BirdhouseError {
    fn from(err: rppal::gpio::Error) -> Self {
        Self::Gpio(err.to_string())
    }
}

impl From<serialport::Error> for BirdhouseError {
    fn from(err: serialport::Error) -> Self {
        Self::Serial(err.to_string())
    }
}

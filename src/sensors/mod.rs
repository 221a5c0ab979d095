//! Auxiliary sensors read by the dashboard.

pub mod voltage;

pub use voltage::{SerialConfig, VoltageMonitor, VoltageReading};

//! Host health for the dashboard: CPU temperature and load.

pub mod collector;
pub mod data;

pub use collector::StatusReader;
pub use data::{HostStatus, LoadAverage};

//! Actuators driven from the dashboard.
//!
//! Each actuator owns its own state; nothing here touches the passage log.
//! Auto-off timers are stamped with a generation number so a timer started
//! for an earlier "on" never cuts a later one short.

pub mod illuminator;
pub mod power;
pub mod stream_process;

pub use illuminator::Illuminator;
pub use power::PowerControl;
pub use stream_process::StreamController;

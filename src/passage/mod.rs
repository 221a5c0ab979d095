//! Beam-break passage counting.
//!
//! The infrared sensor fires twice for every bird that goes through the
//! entrance, so only every second raw edge is counted. Each counted passage
//! is appended to a plain-text log:
//!
//! ```text
//! 2024-01-01 10:00:00 ; 5 ; 42
//! ```
//!
//! The log is the only persisted state. On start the counter re-derives its
//! daily and total tallies from the last record instead of replaying history,
//! and the dashboard reads the same file independently.

pub mod clock;
pub mod counter;
pub mod log;
pub mod record;
pub mod runner;

pub use clock::{Clock, LocalClock};
pub use counter::{Observation, PassageCounter, Tallies};
pub use log::{PassageLog, ResumePolicy};
pub use record::{PassageEntry, PassageRecord};
pub use runner::{CounterConfig, CounterRunner};

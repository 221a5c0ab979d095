//! Beam-break state machine and day-aware tallies.

use super::clock::Clock;
use super::record::PassageRecord;
use crate::hardware::Level;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Running counters, re-derived from the log on start.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tallies {
    pub daily_count: u64,
    pub total_count: u64,
    /// Date the daily count belongs to, `None` before anything was counted
    pub current_day: Option<NaiveDate>,
}

impl Tallies {
    /// Count one passage at `now` and return the record to persist.
    ///
    /// The daily count restarts at 1 whenever the date of `now` differs from
    /// the current day, in either direction.
    pub fn record_passage(&mut self, now: NaiveDateTime) -> PassageRecord {
        let today = now.date();
        if self.current_day == Some(today) {
            self.daily_count += 1;
        } else {
            self.current_day = Some(today);
            self.daily_count = 1;
        }
        self.total_count += 1;

        PassageRecord {
            timestamp: now,
            daily_count: self.daily_count,
            total_count: self.total_count,
        }
    }
}

/// Whether the beam is currently interrupted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BeamState {
    /// Beam clear
    Idle,
    /// Beam interrupted, waiting for it to clear
    Blocked,
}

/// Outcome of feeding one sensor sample to the counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Beam clear, nothing happened
    Idle,
    /// Beam still interrupted by the same passage
    Debouncing,
    /// Raw edge that does not complete a passage
    Uncounted { raw_count: u64 },
    /// Raw edge that completes a passage
    Counted(PassageRecord),
    /// Beam cleared after an interruption
    Cleared,
}

/// Converts raw HIGH samples from the beam-break sensor into passages.
///
/// The sensor fires twice per physical passage, so only even raw edges are
/// counted. A HIGH sample while already blocked is ignored until the line
/// reads LOW again.
#[derive(Debug, Clone)]
pub struct PassageCounter {
    state: BeamState,
    raw_count: u64,
    tallies: Tallies,
}

impl PassageCounter {
    /// Start in the idle state with previously persisted tallies.
    pub fn new(tallies: Tallies) -> Self {
        Self {
            state: BeamState::Idle,
            raw_count: 0,
            tallies,
        }
    }

    pub fn state(&self) -> BeamState {
        self.state
    }

    /// Raw edges seen since start. Not persisted.
    pub fn raw_count(&self) -> u64 {
        self.raw_count
    }

    pub fn tallies(&self) -> &Tallies {
        &self.tallies
    }

    /// Feed one sample. The clock is only consulted when a passage is counted.
    pub fn observe<C: Clock + ?Sized>(&mut self, level: Level, clock: &C) -> Observation {
        match (self.state, level) {
            (BeamState::Idle, Level::Low) => Observation::Idle,
            (BeamState::Idle, Level::High) => {
                self.state = BeamState::Blocked;
                self.raw_count += 1;
                if self.raw_count % 2 == 0 {
                    Observation::Counted(self.tallies.record_passage(clock.now()))
                } else {
                    Observation::Uncounted {
                        raw_count: self.raw_count,
                    }
                }
            }
            (BeamState::Blocked, Level::High) => Observation::Debouncing,
            (BeamState::Blocked, Level::Low) => {
                self.state = BeamState::Idle;
                Observation::Cleared
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passage::clock::ManualClock;
    use chrono::Duration;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    /// Drive `edges` interruptions through the counter, each held for a few
    /// samples, and collect the records.
    fn run_edges(
        counter: &mut PassageCounter,
        clock: &ManualClock,
        edges: usize,
    ) -> Vec<PassageRecord> {
        let mut records = Vec::new();
        for _ in 0..edges {
            for level in [Level::High, Level::High, Level::High, Level::Low, Level::Low] {
                if let Observation::Counted(record) = counter.observe(level, clock) {
                    records.push(record);
                }
            }
            clock.advance(Duration::seconds(1));
        }
        records
    }

    #[test]
    fn test_half_rate() {
        for edges in 0..12 {
            let clock = ManualClock::new(start());
            let mut counter = PassageCounter::new(Tallies::default());
            let records = run_edges(&mut counter, &clock, edges);
            assert_eq!(records.len(), edges / 2, "edges = {}", edges);
            assert_eq!(counter.raw_count(), edges as u64);
        }
    }

    #[test]
    fn test_debounce_holds_blocked_state() {
        let clock = ManualClock::new(start());
        let mut counter = PassageCounter::new(Tallies::default());

        assert_eq!(
            counter.observe(Level::High, &clock),
            Observation::Uncounted { raw_count: 1 }
        );
        assert_eq!(counter.state(), BeamState::Blocked);
        for _ in 0..10 {
            assert_eq!(counter.observe(Level::High, &clock), Observation::Debouncing);
        }
        assert_eq!(counter.raw_count(), 1);
        assert_eq!(counter.observe(Level::Low, &clock), Observation::Cleared);
        assert_eq!(counter.observe(Level::Low, &clock), Observation::Idle);
        assert_eq!(counter.state(), BeamState::Idle);
    }

    #[test]
    fn test_total_is_monotonic() {
        let clock = ManualClock::new(start());
        let mut counter = PassageCounter::new(Tallies::default());
        let records = run_edges(&mut counter, &clock, 40);
        assert_eq!(records.len(), 20);
        assert_eq!(records[0].total_count, 1);
        for pair in records.windows(2) {
            assert_eq!(pair[1].total_count, pair[0].total_count + 1);
        }
    }

    #[test]
    fn test_daily_rollover() {
        let clock = ManualClock::new(start());
        let mut counter = PassageCounter::new(Tallies::default());
        let mut records = run_edges(&mut counter, &clock, 4);

        clock.set(
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 1)
                .unwrap(),
        );
        records.extend(run_edges(&mut counter, &clock, 6));

        let daily: Vec<u64> = records.iter().map(|r| r.daily_count).collect();
        assert_eq!(daily, vec![1, 2, 1, 2, 3]);
        for pair in records.windows(2) {
            if pair[0].date() == pair[1].date() {
                assert_eq!(pair[1].daily_count, pair[0].daily_count + 1);
            } else {
                assert_eq!(pair[1].daily_count, 1);
            }
        }
    }

    #[test]
    fn test_resumed_tallies_continue() {
        let clock = ManualClock::new(start());
        let tallies = Tallies {
            daily_count: 5,
            total_count: 42,
            current_day: Some(start().date()),
        };
        let mut counter = PassageCounter::new(tallies);
        let records = run_edges(&mut counter, &clock, 2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].daily_count, 6);
        assert_eq!(records[0].total_count, 43);
    }

    #[test]
    fn test_clock_going_backwards_resets_daily() {
        let mut tallies = Tallies {
            daily_count: 9,
            total_count: 9,
            current_day: NaiveDate::from_ymd_opt(2024, 1, 5),
        };
        let record = tallies.record_passage(start());
        assert_eq!(record.daily_count, 1);
        assert_eq!(record.total_count, 10);
    }
}

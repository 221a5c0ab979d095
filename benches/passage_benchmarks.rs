use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pi_birdhouse::{
    hardware::Level,
    passage::record::parse_entries,
    passage::clock::ManualClock,
    PassageCounter, PassageLog, PassageRecord, ResumePolicy, Tallies,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fmt::Write;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .expect("Should build date")
        .and_hms_opt(6, 0, 0)
        .expect("Should build time")
}

/// A log of `records` passages, one every minute.
fn synthetic_log(records: u64) -> String {
    let mut log = String::new();
    let mut tallies = Tallies::default();
    for i in 0..records {
        let record = tallies.record_passage(start() + Duration::minutes(i as i64));
        log.push_str(&record.to_log_line());
    }
    // A torn write at the end, as after a power cut
    write!(log, "2024-01-01 06:0").expect("Should write");
    log
}

/// Benchmark parsing a single log line
fn bench_record_parsing(c: &mut Criterion) {
    c.bench_function("passage_record_from_str", |b| {
        b.iter(|| {
            "2024-01-01 10:00:00 ; 5 ; 42"
                .parse::<PassageRecord>()
                .expect("Should parse")
        })
    });
}

/// Benchmark the dashboard view of logs of increasing size
fn bench_parse_entries(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_entries");
    for records in [100u64, 10_000, 100_000] {
        let log = synthetic_log(records);
        group.bench_with_input(BenchmarkId::from_parameter(records), &log, |b, log| {
            b.iter(|| parse_entries(log))
        });
    }
    group.finish();
}

/// Benchmark resuming from a large log; only the tail should be read
fn bench_resume(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let path = dir.path().join("passages.log");
    std::fs::write(&path, synthetic_log(100_000)).expect("Should write log");
    let log = PassageLog::new(&path);
    let today = start().date();

    let mut group = c.benchmark_group("resume");
    group.bench_function("last_line", |b| {
        b.iter(|| log.resume_at(ResumePolicy::LastLine, today).expect("Should resume"))
    });
    group.bench_function("scan_back", |b| {
        b.iter(|| log.resume_at(ResumePolicy::ScanBack, today).expect("Should resume"))
    });
    group.finish();
}

/// Benchmark the state machine over a long run of samples
fn bench_counter_observe(c: &mut Criterion) {
    let clock = ManualClock::new(start());
    let samples: Vec<Level> = (0..10_000)
        .map(|i| if i % 4 < 2 { Level::High } else { Level::Low })
        .collect();

    c.bench_function("counter_observe_10k_samples", |b| {
        b.iter(|| {
            let mut counter = PassageCounter::new(Tallies::default());
            for level in &samples {
                counter.observe(*level, &clock);
            }
            counter.tallies().total_count
        })
    });
}

criterion_group!(
    benches,
    bench_record_parsing,
    bench_parse_entries,
    bench_resume,
    bench_counter_observe
);
criterion_main!(benches);

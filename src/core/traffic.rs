//! Per-process network usage sampling.
//!
//! Polls `nettop` every [`SAMPLE_INTERVAL_SECS`], keeps the last cumulative
//! byte counters per PID in a DashMap, derives per-second rates from counter
//! deltas, and hands a sorted snapshot to the registered callback.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::config::{
    MIN_SAMPLE_ELAPSED_SECS, NOISE_FLOOR_BPS, SAMPLE_INTERVAL_SECS, TELEMETRY_EVERY_TICKS,
    TELEMETRY_TOP_COUNT,
};
use crate::core::clock::Clock;
use crate::core::command::CommandRunner;
use crate::core::ticker::Ticker;

/// One process's transfer rate at a sampling tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSample {
    pub pid: u32,
    pub process_name: String,
    /// Inbound bytes/sec.
    pub bytes_in_per_sec: f64,
    /// Outbound bytes/sec.
    pub bytes_out_per_sec: f64,
    pub observed_at: DateTime<Utc>,
}

impl UsageSample {
    pub fn total_per_sec(&self) -> f64 {
        self.bytes_in_per_sec + self.bytes_out_per_sec
    }
}

/// A parsed `nettop` data row: cumulative counters for one process.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterRow {
    pub pid: u32,
    pub process_name: String,
    pub bytes_in: f64,
    pub bytes_out: f64,
}

/// Last observed cumulative totals for a PID.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Totals {
    bytes_in: f64,
    bytes_out: f64,
}

pub type SnapshotCallback = Box<dyn Fn(Vec<UsageSample>) + Send + Sync>;

/// Header rows of `nettop -x` CSV output start with this.
const HEADER_PREFIX: &str = "time,";
const PROCESS_COLUMN: usize = 1;
const BYTES_IN_COLUMN: usize = 4;
const BYTES_OUT_COLUMN: usize = 5;

/// Periodic sampler. Counter state is owned here and never shared.
///
/// Entries for PIDs that disappear are not evicted; growth is bounded by PID
/// reuse.
pub struct UsageSampler {
    runner: Arc<dyn CommandRunner>,
    clock: Arc<dyn Clock>,
    counters: DashMap<u32, Totals>,
    last_tick: Mutex<Instant>,
    tick_count: AtomicU64,
    on_snapshot: RwLock<Option<SnapshotCallback>>,
    ticker: Mutex<Option<Ticker>>,
}

impl UsageSampler {
    pub fn new(runner: Arc<dyn CommandRunner>, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            runner,
            clock,
            counters: DashMap::new(),
            last_tick: Mutex::new(now),
            tick_count: AtomicU64::new(0),
            on_snapshot: RwLock::new(None),
            ticker: Mutex::new(None),
        }
    }

    /// Register the snapshot consumer, replacing any previous one.
    pub fn on_snapshot(&self, callback: SnapshotCallback) {
        *self.on_snapshot.write().unwrap() = Some(callback);
    }

    /// Begin sampling. A second call while running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut ticker = self.ticker.lock().unwrap();
        if ticker.is_some() {
            return;
        }
        tracing::info!(target: "monitor", "Starting network monitor");

        let sampler = Arc::clone(self);
        match Ticker::spawn(
            "usage-sampler",
            Duration::from_secs(SAMPLE_INTERVAL_SECS),
            move || sampler.tick(),
        ) {
            Ok(t) => *ticker = Some(t),
            Err(e) => tracing::error!(target: "monitor", "Failed to spawn sampler thread: {e}"),
        }
    }

    /// Halt sampling. Safe to call when not running.
    pub fn stop(&self) {
        let ticker = self.ticker.lock().unwrap().take();
        if let Some(ticker) = ticker {
            ticker.cancel();
            tracing::info!(target: "monitor", "Stopped network monitor");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.lock().unwrap().is_some()
    }

    /// One sampling tick: collect and deliver.
    pub fn tick(&self) {
        let samples = self.collect();
        if let Some(callback) = self.on_snapshot.read().unwrap().as_ref() {
            callback(samples);
        }
    }

    /// Poll the accounting command once and derive rates against the previous tick.
    pub fn collect(&self) -> Vec<UsageSample> {
        let raw = self
            .runner
            .run_ignoring_failure("nettop", &["-P", "-L", "1", "-n", "-x"]);

        let now = self.clock.now();
        let elapsed = {
            let mut last = self.last_tick.lock().unwrap();
            let secs = now.saturating_duration_since(*last).as_secs_f64();
            *last = now;
            secs.max(MIN_SAMPLE_ELAPSED_SECS)
        };

        let observed_at = Utc::now();
        let mut samples: Vec<UsageSample> = parse_nettop(&raw)
            .into_iter()
            .filter_map(|row| {
                let current = Totals {
                    bytes_in: row.bytes_in,
                    bytes_out: row.bytes_out,
                };
                let previous = self
                    .counters
                    .insert(row.pid, current)
                    .unwrap_or_default();

                let bytes_in_per_sec = rate(previous.bytes_in, current.bytes_in, elapsed);
                let bytes_out_per_sec = rate(previous.bytes_out, current.bytes_out, elapsed);
                if bytes_in_per_sec + bytes_out_per_sec <= NOISE_FLOOR_BPS {
                    return None;
                }
                Some(UsageSample {
                    pid: row.pid,
                    process_name: row.process_name,
                    bytes_in_per_sec,
                    bytes_out_per_sec,
                    observed_at,
                })
            })
            .collect();

        sort_by_total_desc(&mut samples);

        let tick = self.tick_count.fetch_add(1, AtomicOrdering::Relaxed) + 1;
        if tick % TELEMETRY_EVERY_TICKS == 0 {
            let top = samples
                .iter()
                .take(TELEMETRY_TOP_COUNT)
                .map(|s| format!("{}:{}B/s", s.process_name, s.total_per_sec() as u64))
                .collect::<Vec<_>>()
                .join(", ");
            tracing::debug!(
                target: "monitor",
                "snapshot={tick}, active={}, top=[{top}]",
                samples.len()
            );
        }

        samples
    }
}

/// Per-second rate from two cumulative readings. Counter resets yield zero.
pub fn rate(previous: f64, current: f64, elapsed_secs: f64) -> f64 {
    (current - previous).max(0.0) / elapsed_secs
}

/// Descending by combined rate.
pub fn sort_by_total_desc(samples: &mut [UsageSample]) {
    samples.sort_by(|a, b| {
        b.total_per_sec()
            .partial_cmp(&a.total_per_sec())
            .unwrap_or(Ordering::Equal)
    });
}

/// Parse `nettop -P -L 1 -x` CSV output into cumulative counter rows.
///
/// Header and malformed rows are skipped, as are rows with no traffic at all.
pub fn parse_nettop(raw: &str) -> Vec<CounterRow> {
    raw.lines()
        .filter(|line| !line.starts_with(HEADER_PREFIX))
        .filter_map(parse_row)
        .collect()
}

fn parse_row(line: &str) -> Option<CounterRow> {
    let cols: Vec<&str> = line.split(',').collect();
    if cols.len() <= BYTES_OUT_COLUMN {
        return None;
    }

    let process_field = cols[PROCESS_COLUMN].trim();
    if process_field.is_empty() {
        return None;
    }

    let bytes_in = cols[BYTES_IN_COLUMN].trim().parse::<f64>().unwrap_or(0.0);
    let bytes_out = cols[BYTES_OUT_COLUMN].trim().parse::<f64>().unwrap_or(0.0);
    if !(bytes_in > 0.0 || bytes_out > 0.0) {
        return None;
    }

    let (process_name, pid) = split_process(process_field)?;
    Some(CounterRow {
        pid,
        process_name,
        bytes_in,
        bytes_out,
    })
}

/// Split `name.pid` on the last dot. The PID must parse and be positive.
pub fn split_process(field: &str) -> Option<(String, u32)> {
    let (name, pid) = field.rsplit_once('.')?;
    let pid: u32 = pid.trim().parse().ok()?;
    if pid == 0 {
        return None;
    }
    Some((name.trim().to_string(), pid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ManualClock, ScriptedRunner};

    const NETTOP: &str = "nettop -P -L 1 -n -x";

    fn nettop_output(rows: &[(&str, u64, u64)]) -> String {
        let mut out = String::from("time,,interface,state,bytes_in,bytes_out,rx_dupe,rx_ooo\n");
        for (proc_field, bytes_in, bytes_out) in rows {
            out.push_str(&format!("12:00:00.000000,{proc_field},,,{bytes_in},{bytes_out},0,0\n"));
        }
        out
    }

    fn sampler() -> (Arc<UsageSampler>, Arc<ScriptedRunner>, Arc<ManualClock>) {
        let runner = Arc::new(ScriptedRunner::new());
        let clock = Arc::new(ManualClock::new());
        let sampler = Arc::new(UsageSampler::new(runner.clone(), clock.clone()));
        (sampler, runner, clock)
    }

    #[test]
    fn test_split_process_uses_last_dot() {
        assert_eq!(split_process("com.apple.Safari.812"), Some(("com.apple.Safari".into(), 812)));
        assert_eq!(split_process("cloudd.77"), Some(("cloudd".into(), 77)));
    }

    #[test]
    fn test_split_process_rejects_bad_pid() {
        assert_eq!(split_process("noseparator"), None);
        assert_eq!(split_process("proc.abc"), None);
        assert_eq!(split_process("proc.0"), None);
        assert_eq!(split_process("proc.-5"), None);
    }

    #[test]
    fn test_parse_skips_header_malformed_and_idle_rows() {
        let raw = "time,,interface,state,bytes_in,bytes_out\n\
                   12:00,short,row\n\
                   12:00,,,,100,100\n\
                   12:00,idle.10,,,0,0\n\
                   12:00,badpid.x,,,100,0\n\
                   12:00,active.11,,,garbage,250\n";
        let rows = parse_nettop(raw);
        assert_eq!(
            rows,
            vec![CounterRow {
                pid: 11,
                process_name: "active".into(),
                bytes_in: 0.0,
                bytes_out: 250.0,
            }]
        );
    }

    #[test]
    fn test_parse_empty_output_is_empty() {
        assert!(parse_nettop("").is_empty());
    }

    #[test]
    fn test_rate_is_delta_over_elapsed() {
        assert_eq!(rate(1000.0, 5000.0, 2.0), 2000.0);
    }

    #[test]
    fn test_rate_is_zero_on_counter_reset() {
        assert_eq!(rate(5000.0, 1000.0, 2.0), 0.0);
    }

    #[test]
    fn test_two_ticks_derive_inbound_rate() {
        let (sampler, runner, clock) = sampler();

        runner.respond(NETTOP, &nettop_output(&[("proc1.100", 1000, 0)]));
        clock.advance(Duration::from_secs(2));
        sampler.collect();

        runner.respond(NETTOP, &nettop_output(&[("proc1.100", 5000, 0)]));
        clock.advance(Duration::from_secs(2));
        let samples = sampler.collect();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].pid, 100);
        assert_eq!(samples[0].process_name, "proc1");
        assert!((samples[0].bytes_in_per_sec - 2000.0).abs() < 1e-9);
        assert_eq!(samples[0].bytes_out_per_sec, 0.0);
    }

    #[test]
    fn test_elapsed_is_floored_at_one_second() {
        let (sampler, runner, clock) = sampler();

        runner.respond(NETTOP, &nettop_output(&[("proc.1", 1000, 0)]));
        sampler.collect();

        runner.respond(NETTOP, &nettop_output(&[("proc.1", 1500, 0)]));
        clock.advance(Duration::from_millis(100));
        let samples = sampler.collect();

        assert_eq!(samples[0].bytes_in_per_sec, 500.0);
    }

    #[test]
    fn test_counter_reset_suppresses_sample() {
        let (sampler, runner, clock) = sampler();

        runner.respond(NETTOP, &nettop_output(&[("proc.1", 90_000, 0)]));
        sampler.collect();

        runner.respond(NETTOP, &nettop_output(&[("proc.1", 10, 0)]));
        clock.advance(Duration::from_secs(2));
        assert!(sampler.collect().is_empty());

        // The reset value becomes the new baseline.
        runner.respond(NETTOP, &nettop_output(&[("proc.1", 4010, 0)]));
        clock.advance(Duration::from_secs(2));
        assert_eq!(sampler.collect()[0].bytes_in_per_sec, 2000.0);
    }

    #[test]
    fn test_noise_floor_is_exclusive() {
        let (sampler, runner, clock) = sampler();

        runner.respond(NETTOP, &nettop_output(&[("quiet.1", 1, 0), ("loud.2", 1, 0)]));
        sampler.collect();

        runner.respond(NETTOP, &nettop_output(&[("quiet.1", 65, 0), ("loud.2", 66, 0)]));
        clock.advance(Duration::from_secs(1));
        let samples = sampler.collect();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].process_name, "loud");
    }

    #[test]
    fn test_snapshot_sorted_descending_by_total() {
        let (sampler, runner, clock) = sampler();

        runner.respond(
            NETTOP,
            &nettop_output(&[("a.1", 1, 1), ("b.2", 1, 1), ("c.3", 1, 1)]),
        );
        sampler.collect();

        runner.respond(
            NETTOP,
            &nettop_output(&[("a.1", 501, 1), ("b.2", 1, 9001), ("c.3", 2001, 2001)]),
        );
        clock.advance(Duration::from_secs(1));
        let names: Vec<_> = sampler
            .collect()
            .into_iter()
            .map(|s| s.process_name)
            .collect();

        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_command_failure_yields_empty_snapshot() {
        let (sampler, runner, _clock) = sampler();
        runner.fail(NETTOP);
        assert!(sampler.collect().is_empty());
    }

    #[test]
    fn test_tick_delivers_snapshot_to_callback() {
        let (sampler, runner, clock) = sampler();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        sampler.on_snapshot(Box::new(move |samples| sink.lock().unwrap().push(samples)));

        runner.respond(NETTOP, &nettop_output(&[("proc.1", 0, 100)]));
        sampler.tick();
        runner.respond(NETTOP, &nettop_output(&[("proc.1", 0, 3100)]));
        clock.advance(Duration::from_secs(2));
        sampler.tick();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1][0].bytes_out_per_sec, 1500.0);
    }

    #[test]
    fn test_start_runs_first_tick_immediately_and_stop_halts() {
        let (sampler, runner, _clock) = sampler();
        sampler.start();
        sampler.start();
        assert!(sampler.is_running());

        assert!(crate::test_support::wait_until(Duration::from_secs(2), || {
            runner.count(NETTOP) >= 1
        }));
        sampler.stop();
        assert!(!sampler.is_running());
        assert_eq!(runner.count(NETTOP), 1);
    }
}

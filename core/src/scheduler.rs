//! Scan scheduling and snapshot publication.
//!
//! The scheduler is the only component that mutates shared state. It runs
//! scan attempts strictly one at a time: a tick that arrives while a scan is
//! in flight is dropped, not queued, so a slow scan can never build a
//! backlog or spawn a second scanner process. On success it swaps the
//! published snapshot pointer; on failure it leaves the snapshot untouched
//! and bumps a per-kind failure counter. Readers go through [`Scheduler::observe`]
//! and never block on an in-progress scan.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use tokio::task::JoinHandle;

use probr_common::error::{FailureKind, ScanError};
use probr_common::network::target::Target;
use probr_common::scan::{ScanOutcome, ScanRun, Snapshot};
use probr_common::{debug, success, warn};

use crate::invoker::ScanInvoker;
use crate::parser;

/// Cumulative scan counters and last-attempt metadata.
#[derive(Clone, Debug, Default)]
pub struct ScanStats {
    /// Completed attempts, success or failure.
    pub scans_total: u64,
    pub success_total: u64,
    pub timeout_failures: u64,
    pub process_failures: u64,
    pub parse_failures: u64,
    /// Wall-clock duration of the last completed attempt.
    pub last_duration: Duration,
    /// Outcome of the last completed attempt; `None` before the first one.
    pub last_outcome: Option<ScanOutcome>,
}

impl ScanStats {
    pub fn last_success(&self) -> bool {
        self.last_outcome == Some(ScanOutcome::Success)
    }

    pub fn failures(&self, kind: FailureKind) -> u64 {
        match kind {
            FailureKind::Timeout => self.timeout_failures,
            FailureKind::Process => self.process_failures,
            FailureKind::Parse => self.parse_failures,
        }
    }

    fn record_success(&mut self, duration: Duration) {
        self.scans_total += 1;
        self.success_total += 1;
        self.last_duration = duration;
        self.last_outcome = Some(ScanOutcome::Success);
    }

    fn record_failure(&mut self, error: &ScanError, duration: Duration) {
        self.scans_total += 1;
        self.last_duration = duration;
        let outcome = match error.kind() {
            FailureKind::Timeout => {
                self.timeout_failures += 1;
                ScanOutcome::Timeout
            }
            FailureKind::Process => {
                self.process_failures += 1;
                ScanOutcome::ProcessError
            }
            FailureKind::Parse => {
                self.parse_failures += 1;
                ScanOutcome::ParseError
            }
        };
        self.last_outcome = Some(outcome);
    }
}

/// What readers see: the current snapshot plus the counters, swapped and
/// bumped together under one short write lock.
struct Published {
    snapshot: Arc<Snapshot>,
    stats: ScanStats,
}

/// Drives scan attempts on a timer and owns the published snapshot.
pub struct Scheduler {
    invoker: Arc<dyn ScanInvoker>,
    targets: Vec<Target>,
    scan_timeout: Duration,
    published: RwLock<Published>,
    scanning: AtomicBool,
}

impl Scheduler {
    pub fn new(invoker: Arc<dyn ScanInvoker>, targets: Vec<Target>, scan_timeout: Duration) -> Self {
        Self {
            invoker,
            targets,
            scan_timeout,
            published: RwLock::new(Published {
                snapshot: Arc::new(Snapshot::empty()),
                stats: ScanStats::default(),
            }),
            scanning: AtomicBool::new(false),
        }
    }

    /// One scheduling opportunity. A no-op while a scan is already running.
    pub async fn tick(&self) {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("scan already in flight, dropping tick");
            return;
        }

        self.run_attempt().await;
        self.scanning.store(false, Ordering::Release);
    }

    async fn run_attempt(&self) {
        let started_at = SystemTime::now();
        let clock = tokio::time::Instant::now();

        let result = self
            .invoker
            .run_scan(&self.targets, self.scan_timeout)
            .await
            .and_then(|raw| {
                let hosts = parser::parse(&raw)?;
                Ok((hosts, raw.bytes.len()))
            });

        let duration = clock.elapsed();
        let finished_at = SystemTime::now();

        match result {
            Ok((hosts, raw_bytes)) => {
                let run = ScanRun {
                    started_at,
                    finished_at,
                    outcome: ScanOutcome::Success,
                    raw_bytes,
                };
                let snapshot = Arc::new(Snapshot {
                    hosts,
                    run: Some(run),
                });

                let mut published = self.published.write();
                published.snapshot = snapshot;
                published.stats.record_success(duration);
                drop(published);

                success!("scan completed in {duration:.2?}");
            }
            Err(e) => {
                warn!("scan attempt failed ({}): {e}", e.kind().as_str());
                self.published.write().stats.record_failure(&e, duration);
            }
        }
    }

    /// The currently published snapshot. Never blocks on a running scan and
    /// never yields a partially built value.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.published.read().snapshot.clone()
    }

    /// One consistent (snapshot, stats) pair for a single render.
    pub fn observe(&self) -> (Arc<Snapshot>, ScanStats) {
        let published = self.published.read();
        (published.snapshot.clone(), published.stats.clone())
    }

    /// Spawns the periodic tick loop. The first tick fires immediately, so a
    /// freshly started exporter scans right away instead of serving an empty
    /// snapshot for a whole interval.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                scheduler.tick().await;
            }
        })
    }
}

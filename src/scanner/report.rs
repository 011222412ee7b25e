//! Run statistics and the final scan report.
//!
//! # Responsibilities
//! - Count query outcomes as they land, cheaply and from many tasks
//! - Shape a machine-readable summary once the run is over

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::scanner::types::{BalanceResult, QueryStatus, ScanRecord};

/// Live counters, updated by query tasks as results land.
pub struct ScanStats {
    started_at: Instant,
    candidates: AtomicU64,
    ok: AtomicU64,
    not_found: AtomicU64,
    rate_limited: AtomicU64,
    error: AtomicU64,
    mocked: AtomicU64,
}

impl ScanStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            candidates: AtomicU64::new(0),
            ok: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            error: AtomicU64::new(0),
            mocked: AtomicU64::new(0),
        }
    }

    pub fn record(&self, result: &BalanceResult) {
        let counter = match result.status {
            QueryStatus::Ok => &self.ok,
            QueryStatus::NotFound => &self.not_found,
            QueryStatus::RateLimited => &self.rate_limited,
            QueryStatus::Error => &self.error,
            QueryStatus::Mocked => &self.mocked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_candidate(&self) {
        self.candidates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts {
            ok: self.ok.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            error: self.error.load(Ordering::Relaxed),
            mocked: self.mocked.load(Ordering::Relaxed),
        }
    }

    pub fn candidates(&self) -> u64 {
        self.candidates.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Query counts broken down by outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub ok: u64,
    pub not_found: u64,
    pub rate_limited: u64,
    pub error: u64,
    pub mocked: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.ok + self.not_found + self.rate_limited + self.error + self.mocked
    }
}

/// Everything a finished (or cancelled) run produced.
#[derive(Debug)]
pub struct ScanReport {
    pub records: Vec<ScanRecord>,
    pub counts: StatusCounts,
    pub target_scans: usize,
    pub completed: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl ScanReport {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            target_scans: self.target_scans,
            completed: self.completed,
            cancelled: self.cancelled,
            elapsed_ms: self.elapsed.as_millis() as u64,
            queries: self.counts,
        }
    }
}

/// Compact serializable view of a run, for logs and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub target_scans: usize,
    pub completed: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
    pub queries: StatusCounts,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialSource;
    use crate::wallet::{derive_address, Chain};

    fn result(status: QueryStatus) -> BalanceResult {
        let candidate = CredentialSource::new().next().unwrap();
        BalanceResult::unresolved(derive_address(&candidate, Chain::Eth), status)
    }

    #[test]
    fn counts_land_in_the_right_bucket() {
        let stats = ScanStats::new();
        stats.record(&result(QueryStatus::Ok));
        stats.record(&result(QueryStatus::NotFound));
        stats.record(&result(QueryStatus::NotFound));
        stats.record(&result(QueryStatus::Error));
        stats.record_candidate();

        let counts = stats.counts();
        assert_eq!(counts.ok, 1);
        assert_eq!(counts.not_found, 2);
        assert_eq!(counts.error, 1);
        assert_eq!(counts.total(), 4);
        assert_eq!(stats.candidates(), 1);
    }

    #[test]
    fn summary_is_serializable() {
        let report = ScanReport {
            records: Vec::new(),
            counts: ScanStats::new().counts(),
            target_scans: 10,
            completed: 7,
            cancelled: true,
            elapsed: Duration::from_millis(1_234),
        };
        let json = serde_json::to_value(report.summary()).unwrap();
        assert_eq!(json["completed"], 7);
        assert_eq!(json["cancelled"], true);
        assert_eq!(json["elapsed_ms"], 1_234);
    }
}

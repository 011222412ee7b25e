//! Scan engine: candidate generation through final report.
//!
//! # Data Flow
//! ```text
//! run_scan
//!     → credential source (fresh candidate, OS entropy)
//!     → spawn scan_candidate (bounded task set)
//!         → derive addresses (blocking pool, secret dropped after)
//!         → per chain: concurrency gate → rate limiter → dispatcher
//!         → BalanceResult per chain, counted into ScanStats
//!     → ScanRecord per candidate
//!     → ScanReport (records + counts + cancelled flag)
//! ```
//!
//! # Design Decisions
//! - Cancellation races every query against a shutdown receiver; leases
//!   and pooled connections are RAII guards, so a cancelled query releases
//!   everything it held
//! - Pacing and admission are independent gates; a query waits on both
//! - Stats are atomics so result counting never serializes query tasks

pub mod orchestrator;
pub mod report;
pub mod types;

pub use orchestrator::ScanOrchestrator;
pub use report::{ReportSummary, ScanReport, ScanStats, StatusCounts};
pub use types::{BalanceResult, QueryStatus, ScanRecord};

//! Pooled HTTP transport.
//!
//! # Data Flow
//! ```text
//! dispatch → service.rs (build per-chain request URL)
//!     → pool.rs (acquire pooled connection, bounded + acquire-timeout)
//!     → single idempotent GET
//!     → success: connection returns to the pool
//!     → transport failure: connection discarded, replacement opened
//!       lazily on the next acquire
//!     → service.rs (parse body into an amount)
//! ```
//!
//! # Design Decisions
//! - Non-2xx statuses are not transport errors; they flow back as data so
//!   the safety gate can map them to query statuses
//! - Connections are exclusively owned by one in-flight request
//! - Counters (open/acquired/discarded) exist so tests can assert that
//!   nothing leaks across cancellation

pub mod pool;
pub mod service;

pub use pool::{ServiceResponse, TransportPool};
pub use service::BalanceService;

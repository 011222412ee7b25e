//! Concurrent wallet-credential balance probe engine.
//!
//! Generates fresh candidate credentials, derives a BTC- and an ETH-style
//! address from each, and checks their balances against upstream services,
//! with adaptive per-service pacing and a hard cap on in-flight queries.
//! Test mode (the default) answers every query deterministically without
//! touching the network.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                   SCAN ENGINE                        │
//!                  │                                                      │
//!                  │  ┌────────────┐   ┌──────────┐   ┌───────────────┐   │
//!                  │  │ credential │──▶│  wallet  │──▶│    scanner    │   │
//!                  │  │  (OS RNG)  │   │ (derive) │   │ (orchestrate) │   │
//!                  │  └────────────┘   └──────────┘   └───────┬───────┘   │
//!                  │                                          │           │
//!                  │                  ┌───────────┬───────────┤           │
//!                  │                  ▼           ▼           ▼           │
//!                  │            ┌─────────┐ ┌─────────┐ ┌──────────┐      │
//!                  │            │  gate   │ │ limiter │ │  safety  │      │
//!                  │            │ (slots) │ │ (pace)  │ │ (mode)   │      │
//!                  │            └─────────┘ └─────────┘ └────┬─────┘      │
//!                  │                                         │ live only  │
//!                  │                                    ┌────▼─────┐      │
//!   balance        │                                    │transport │      │
//!   services  ◀────┼────────────────────────────────────│ (pools)  │      │
//!                  │                                    └──────────┘      │
//!                  │                                                      │
//!                  │  ┌────────────────────────────────────────────────┐  │
//!                  │  │  Cross-cutting: config · lifecycle · error     │  │
//!                  │  └────────────────────────────────────────────────┘  │
//!                  └──────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod credential;
pub mod scanner;
pub mod wallet;

// Traffic management
pub mod gate;
pub mod limiter;
pub mod safety;
pub mod transport;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;

pub use config::ProbeConfig;
pub use error::ProbeError;
pub use lifecycle::Shutdown;
pub use safety::Dispatcher;
pub use scanner::ScanOrchestrator;

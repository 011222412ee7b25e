//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (MODE, MAX_CONCURRENT, BTC_DELAY, ...)
//!     → validation.rs (semantic checks)
//!     → ProbeConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the mode switch in particular can
//!   never change mid-run
//! - All fields have defaults so a config file is optional
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::Mode;
pub use schema::ProbeConfig;
pub use schema::ScanConfig;
pub use schema::ServiceConfig;
pub use schema::ServicesConfig;

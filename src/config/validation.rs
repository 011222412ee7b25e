//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (delays, timeouts, pool sizes)
//! - Check endpoint URLs parse and use a sane scheme
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ProbeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::ProbeConfig;
use crate::wallet::Chain;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(errors: &mut Vec<ValidationError>, field: &str, message: impl Into<String>) {
    errors.push(ValidationError {
        field: field.to_string(),
        message: message.into(),
    });
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProbeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.scan.target_scans == 0 {
        err(&mut errors, "scan.target_scans", "must be at least 1");
    }
    if config.scan.max_concurrent == 0 {
        err(&mut errors, "scan.max_concurrent", "must be at least 1");
    }
    if config.services.request_timeout_secs == 0 {
        err(&mut errors, "services.request_timeout_secs", "must be at least 1");
    }
    if config.services.connect_timeout_secs == 0 {
        err(&mut errors, "services.connect_timeout_secs", "must be at least 1");
    }
    if config.services.latency_window == 0 {
        err(&mut errors, "services.latency_window", "must be at least 1");
    }

    for chain in Chain::ALL {
        let service = config.services.for_chain(chain);
        let prefix = format!("services.{}", chain.to_string().to_lowercase());

        if service.pool_size == 0 {
            err(&mut errors, &format!("{prefix}.pool_size"), "must be at least 1");
        }
        if service.min_delay_ms > 60_000 {
            err(
                &mut errors,
                &format!("{prefix}.min_delay_ms"),
                "exceeds 60000ms",
            );
        }
        if config.services.delay_ceiling_ms < service.min_delay_ms {
            err(
                &mut errors,
                "services.delay_ceiling_ms",
                format!("below {prefix}.min_delay_ms"),
            );
        }
        match url::Url::parse(&service.endpoint) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
            Ok(parsed) => err(
                &mut errors,
                &format!("{prefix}.endpoint"),
                format!("unsupported scheme '{}'", parsed.scheme()),
            ),
            Err(e) => err(
                &mut errors,
                &format!("{prefix}.endpoint"),
                format!("invalid URL: {}", e),
            ),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

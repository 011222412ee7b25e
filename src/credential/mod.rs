//! Candidate credential generation.
//!
//! # Responsibilities
//! - Produce fresh candidate secrets from the OS secure RNG
//! - Keep secret material out of logs, serialization, and long-lived state
//!
//! # Design Decisions
//! - Entropy failure is fatal; a weaker RNG is never substituted
//! - `Secret` redacts its Debug output and scrubs its bytes on drop
//! - The source is stateless and callable concurrently through `&self`

use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

use crate::error::ProbeError;

/// Opaque identifier for a candidate, safe to log and persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct CandidateId(Uuid);

impl CandidateId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cand-{}", self.0.simple())
    }
}

/// 32 bytes of secret key material.
///
/// Exists only transiently between generation and address derivation.
pub struct Secret([u8; 32]);

impl Secret {
    pub fn bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never expose the material, even at trace level.
        write!(f, "Secret(<redacted>)")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        // Best-effort scrub.
        self.0.fill(0);
    }
}

/// A generated key unit awaiting balance checks.
#[derive(Debug)]
pub struct Candidate {
    pub id: CandidateId,
    pub secret: Secret,
    pub created_at: SystemTime,
}

/// Stateless generator of candidates.
pub struct CredentialSource;

impl CredentialSource {
    pub fn new() -> Self {
        Self
    }

    /// Generate a distinct, independently drawn candidate.
    pub fn next(&self) -> Result<Candidate, ProbeError> {
        let mut buf = [0u8; 32];
        OsRng.try_fill_bytes(&mut buf)?;
        Ok(Candidate {
            id: CandidateId::new(),
            secret: Secret(buf),
            created_at: SystemTime::now(),
        })
    }
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self::new()
    }
}

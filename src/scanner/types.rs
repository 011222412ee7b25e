//! Result records produced by the scan.

use serde::Serialize;
use std::time::{Duration, SystemTime};

use crate::credential::CandidateId;
use crate::wallet::ChainAddress;

/// How a single balance query resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    /// The service answered with a balance.
    Ok,
    /// The service answered and holds no record for the address.
    NotFound,
    /// The service pushed back with a rate-limit signal.
    RateLimited,
    /// Transport failure, unexpected status, or unparseable body.
    Error,
    /// Deterministic test-mode reply; no network was touched.
    Mocked,
}

/// The outcome of one balance query against one chain.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceResult {
    pub chain_address: ChainAddress,
    /// Whole coins. Absent unless the query resolved `Ok`.
    pub amount: Option<f64>,
    pub status: QueryStatus,
    pub latency: Duration,
    pub timestamp: SystemTime,
}

impl BalanceResult {
    /// A result for a query that never reached a service.
    pub fn unresolved(chain_address: ChainAddress, status: QueryStatus) -> Self {
        Self {
            chain_address,
            amount: None,
            status,
            latency: Duration::ZERO,
            timestamp: SystemTime::now(),
        }
    }
}

/// Everything learned about one candidate: one result per chain.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRecord {
    pub candidate_id: CandidateId,
    pub results: Vec<BalanceResult>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialSource;
    use crate::wallet::{derive_address, Chain};

    #[test]
    fn unresolved_result_carries_no_amount() {
        let candidate = CredentialSource::new().next().unwrap();
        let target = derive_address(&candidate, Chain::Btc);
        let result = BalanceResult::unresolved(target, QueryStatus::Error);
        assert_eq!(result.amount, None);
        assert_eq!(result.latency, Duration::ZERO);
    }

    #[test]
    fn status_serializes_snake_case() {
        let rendered = serde_json::to_string(&QueryStatus::RateLimited).unwrap();
        assert_eq!(rendered, "\"rate_limited\"");
    }
}

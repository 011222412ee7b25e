//! Mode-gated dispatch: the only path to the network.
//!
//! # Data Flow
//! ```text
//! query task → Dispatcher::dispatch(target)
//!     Mock: deterministic zero-balance reply, no I/O
//!     Live: service.query_url → pool.send → map status/body
//!         200 + amount   → Ok
//!         200 + no entry → NotFound
//!         404            → NotFound
//!         429            → RateLimited
//!         other / transport failure → Error
//! ```
//!
//! # Design Decisions
//! - The guarantee is structural: the mock variant contains no pool and no
//!   endpoint, so no code path can escalate a test-mode run to live
//!   traffic after construction
//! - Non-success replies are logged with the address only; secrets never
//!   reach this module at all

use std::time::Duration;

use crate::config::{Mode, ProbeConfig};
use crate::error::TransportError;
use crate::scanner::QueryStatus;
use crate::transport::{BalanceService, ServiceResponse, TransportPool};
use crate::wallet::{Chain, ChainAddress};

/// What one dispatched query came back with.
#[derive(Debug, Clone)]
pub struct DispatchReply {
    pub amount: Option<f64>,
    pub status: QueryStatus,
    pub latency: Duration,
}

/// The single entry point for balance queries. Which variant exists is
/// fixed at construction from the configured mode.
pub enum Dispatcher {
    Mock(MockDispatcher),
    Live(LiveDispatcher),
}

impl Dispatcher {
    pub fn from_config(config: &ProbeConfig) -> Result<Self, TransportError> {
        match config.mode {
            Mode::Test => Ok(Dispatcher::Mock(MockDispatcher)),
            Mode::Live => Ok(Dispatcher::Live(LiveDispatcher::from_config(config)?)),
        }
    }

    pub async fn dispatch(&self, target: &ChainAddress) -> DispatchReply {
        match self {
            Dispatcher::Mock(mock) => mock.dispatch(target),
            Dispatcher::Live(live) => live.dispatch(target).await,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Dispatcher::Live(_))
    }

    /// The live pool for a service, if this dispatcher has one.
    pub fn pool(&self, chain: Chain) -> Option<&TransportPool> {
        match self {
            Dispatcher::Mock(_) => None,
            Dispatcher::Live(live) => Some(live.pool(chain)),
        }
    }

    /// Close the underlying pools. A no-op for the mock variant.
    pub fn close(&self) {
        if let Dispatcher::Live(live) = self {
            live.btc_pool.close();
            live.eth_pool.close();
        }
    }
}

/// Deterministic replies with zero latency and zero balance. Holds no
/// network state whatsoever.
pub struct MockDispatcher;

impl MockDispatcher {
    fn dispatch(&self, target: &ChainAddress) -> DispatchReply {
        tracing::trace!(chain = %target.chain, address = %target.address, "Mock dispatch");
        DispatchReply {
            amount: Some(0.0),
            status: QueryStatus::Mocked,
            latency: Duration::ZERO,
        }
    }
}

/// Real balance lookups through the per-service pools.
pub struct LiveDispatcher {
    service: BalanceService,
    btc_pool: TransportPool,
    eth_pool: TransportPool,
}

impl LiveDispatcher {
    fn from_config(config: &ProbeConfig) -> Result<Self, TransportError> {
        let services = &config.services;
        let pool = |chain: Chain| {
            TransportPool::new(
                chain,
                services.for_chain(chain).pool_size,
                services.acquire_timeout(),
                services.connect_timeout(),
                services.request_timeout(),
            )
        };
        Ok(Self {
            service: BalanceService::from_config(services)?,
            btc_pool: pool(Chain::Btc),
            eth_pool: pool(Chain::Eth),
        })
    }

    fn pool(&self, chain: Chain) -> &TransportPool {
        match chain {
            Chain::Btc => &self.btc_pool,
            Chain::Eth => &self.eth_pool,
        }
    }

    async fn dispatch(&self, target: &ChainAddress) -> DispatchReply {
        let url = self.service.query_url(target);
        match self.pool(target.chain).send(url).await {
            Ok(response) => self.map_response(target, response),
            Err(e) => {
                tracing::warn!(
                    chain = %target.chain,
                    address = %target.address,
                    error = %e,
                    "Balance query failed in transport"
                );
                DispatchReply {
                    amount: None,
                    status: QueryStatus::Error,
                    latency: Duration::ZERO,
                }
            }
        }
    }

    fn map_response(&self, target: &ChainAddress, response: ServiceResponse) -> DispatchReply {
        let latency = response.latency;
        let reply = |amount, status| DispatchReply {
            amount,
            status,
            latency,
        };

        match response.status {
            200 => {
                if response.body.trim().is_empty() {
                    return reply(None, QueryStatus::NotFound);
                }
                match self.service.parse_amount(target, &response.body) {
                    Ok(Some(amount)) => reply(Some(amount), QueryStatus::Ok),
                    Ok(None) => reply(None, QueryStatus::NotFound),
                    Err(e) => {
                        tracing::warn!(
                            chain = %target.chain,
                            address = %target.address,
                            error = %e,
                            "Unparseable balance response"
                        );
                        reply(None, QueryStatus::Error)
                    }
                }
            }
            404 => reply(None, QueryStatus::NotFound),
            429 => {
                tracing::warn!(
                    chain = %target.chain,
                    address = %target.address,
                    "Upstream rate limit hit"
                );
                reply(None, QueryStatus::RateLimited)
            }
            status => {
                tracing::warn!(
                    chain = %target.chain,
                    address = %target.address,
                    status,
                    "Unexpected balance service status"
                );
                reply(None, QueryStatus::Error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialSource;
    use crate::wallet::derive_address;

    fn any_target(chain: Chain) -> ChainAddress {
        let candidate = CredentialSource::new().next().unwrap();
        derive_address(&candidate, chain)
    }

    #[tokio::test]
    async fn test_mode_builds_a_dispatcher_without_pools() {
        let dispatcher = Dispatcher::from_config(&ProbeConfig::default()).unwrap();
        assert!(!dispatcher.is_live());
        assert!(dispatcher.pool(Chain::Btc).is_none());
        assert!(dispatcher.pool(Chain::Eth).is_none());
    }

    #[tokio::test]
    async fn mock_dispatch_is_deterministic_and_instant() {
        let dispatcher = Dispatcher::from_config(&ProbeConfig::default()).unwrap();
        for chain in Chain::ALL {
            let reply = dispatcher.dispatch(&any_target(chain)).await;
            assert_eq!(reply.status, QueryStatus::Mocked);
            assert_eq!(reply.amount, Some(0.0));
            assert_eq!(reply.latency, Duration::ZERO);
        }
    }

    #[test]
    fn live_mode_builds_pools_for_both_services() {
        let mut config = ProbeConfig::default();
        config.mode = Mode::Live;
        let dispatcher = Dispatcher::from_config(&config).unwrap();
        assert!(dispatcher.is_live());
        assert!(dispatcher.pool(Chain::Btc).is_some());
        assert!(dispatcher.pool(Chain::Eth).is_some());
    }
}

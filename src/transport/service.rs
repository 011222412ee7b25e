//! Per-chain balance service: request URLs and response parsing.
//!
//! # Responsibilities
//! - Build the query URL for an address on each service's wire format
//! - Parse a raw response body into an amount in whole coins
//!
//! # Design Decisions
//! - Parsing is pure (no I/O), so wire-format edge cases are unit-testable
//!   without a live endpoint
//! - `Ok(None)` means the service answered and knows nothing about the
//!   address; malformed bodies are errors, never zero balances

use url::Url;

use crate::config::ServicesConfig;
use crate::error::TransportError;
use crate::wallet::{Chain, ChainAddress};

const SATOSHIS_PER_BTC: f64 = 100_000_000.0;
const WEI_PER_ETH: f64 = 1e18;

/// Knows how to talk to each chain's balance endpoint.
#[derive(Debug, Clone)]
pub struct BalanceService {
    btc_endpoint: Url,
    eth_endpoint: Url,
}

impl BalanceService {
    pub fn from_config(services: &ServicesConfig) -> Result<Self, TransportError> {
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| TransportError::Malformed(format!("endpoint: {e}")))
        };
        Ok(Self {
            btc_endpoint: parse(&services.btc.endpoint)?,
            eth_endpoint: parse(&services.eth.endpoint)?,
        })
    }

    /// Build the balance query URL for `target`.
    pub fn query_url(&self, target: &ChainAddress) -> Url {
        match target.chain {
            Chain::Btc => {
                let mut url = self.btc_endpoint.clone();
                url.query_pairs_mut().append_pair("active", &target.address);
                url
            }
            Chain::Eth => {
                let mut url = self.eth_endpoint.clone();
                url.query_pairs_mut()
                    .append_pair("module", "account")
                    .append_pair("action", "balance")
                    .append_pair("address", &target.address)
                    .append_pair("tag", "latest");
                url
            }
        }
    }

    /// Parse a 200 body into whole coins. `Ok(None)` means the service
    /// answered but holds no record for this address.
    pub fn parse_amount(
        &self,
        target: &ChainAddress,
        body: &str,
    ) -> Result<Option<f64>, TransportError> {
        match target.chain {
            Chain::Btc => parse_btc(&target.address, body),
            Chain::Eth => parse_eth(body),
        }
    }
}

/// blockchain.info-style: a map keyed by address with satoshi balances.
fn parse_btc(address: &str, body: &str) -> Result<Option<f64>, TransportError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| TransportError::Malformed(format!("btc body: {e}")))?;
    let map = value
        .as_object()
        .ok_or_else(|| TransportError::Malformed("btc body: expected object".into()))?;
    let entry = match map.get(address) {
        Some(entry) => entry,
        None => return Ok(None),
    };
    let satoshis = entry
        .get("final_balance")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| TransportError::Malformed("btc body: missing final_balance".into()))?;
    Ok(Some(satoshis / SATOSHIS_PER_BTC))
}

/// etherscan-style envelope: `{"status":"1","result":"<wei>"}`.
fn parse_eth(body: &str) -> Result<Option<f64>, TransportError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| TransportError::Malformed(format!("eth body: {e}")))?;
    let status = value
        .get("status")
        .and_then(|v| v.as_str())
        .ok_or_else(|| TransportError::Malformed("eth body: missing status".into()))?;
    if status != "1" {
        // The envelope carried no balance for this address.
        return Ok(None);
    }
    let wei: f64 = value
        .get("result")
        .and_then(|v| v.as_str())
        .ok_or_else(|| TransportError::Malformed("eth body: missing result".into()))?
        .parse()
        .map_err(|e| TransportError::Malformed(format!("eth result: {e}")))?;
    Ok(Some(wei / WEI_PER_ETH))
}

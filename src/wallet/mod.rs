//! Per-chain address derivation.
//!
//! # Responsibilities
//! - Map a candidate secret to one address per supported chain
//! - Stay pure and deterministic: same secret, same address, no I/O
//!
//! # Design Decisions
//! - Derivation is a stand-in for a full curve pipeline: a domain-tagged
//!   SHA-256 digest shaped into the chain's address format. Address shape
//!   and determinism are the contract here, not curve correctness.
//! - ETH-style addresses carry checksum casing over the address hash;
//!   BTC-style addresses are base58check with a version byte of 0x00.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::credential::{Candidate, CandidateId, Secret};

/// Supported chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chain {
    Btc,
    Eth,
}

impl Chain {
    pub const ALL: [Chain; 2] = [Chain::Btc, Chain::Eth];
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Btc => write!(f, "BTC"),
            Chain::Eth => write!(f, "ETH"),
        }
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BTC" => Ok(Chain::Btc),
            "ETH" => Ok(Chain::Eth),
            other => Err(format!("unknown chain '{}'", other)),
        }
    }
}

/// An address derived for one chain, immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainAddress {
    pub chain: Chain,
    pub address: String,
    /// Back-reference for lookup only; carries no ownership of the candidate.
    pub candidate_id: CandidateId,
}

/// Derive the address of `candidate` on `chain`.
pub fn derive_address(candidate: &Candidate, chain: Chain) -> ChainAddress {
    let address = match chain {
        Chain::Btc => btc_address(&candidate.secret),
        Chain::Eth => eth_address(&candidate.secret),
    };
    ChainAddress {
        chain,
        address,
        candidate_id: candidate.id,
    }
}

fn digest_material(secret: &Secret, tag: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(secret.bytes());
    hasher.finalize().into()
}

fn eth_address(secret: &Secret) -> String {
    let digest = digest_material(secret, b"eth/v1");
    let lower = hex::encode(&digest[12..]);
    format!("0x{}", checksum_case(&lower))
}

/// Mixed-case checksum over the lowercase hex address, EIP-55 style.
fn checksum_case(lower: &str) -> String {
    let hash = hex::encode(Sha256::digest(lower.as_bytes()));
    lower
        .chars()
        .zip(hash.chars())
        .map(|(ch, h)| {
            if ch.is_ascii_digit() || h < '8' {
                ch
            } else {
                ch.to_ascii_uppercase()
            }
        })
        .collect()
}

fn btc_address(secret: &Secret) -> String {
    let digest = digest_material(secret, b"btc/v1");
    let payload: [u8; 32] = Sha256::digest(digest).into();

    // version byte 0x00 + 20-byte payload + 4-byte double-SHA256 checksum
    let mut raw = Vec::with_capacity(25);
    raw.push(0x00);
    raw.extend_from_slice(&payload[..20]);
    let check: [u8; 32] = Sha256::digest(Sha256::digest(&raw)).into();
    raw.extend_from_slice(&check[..4]);

    bs58::encode(raw).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialSource;

    #[test]
    fn derivation_is_deterministic() {
        let candidate = CredentialSource::new().next().unwrap();
        for chain in Chain::ALL {
            let a = derive_address(&candidate, chain);
            let b = derive_address(&candidate, chain);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn distinct_secrets_give_distinct_addresses() {
        let source = CredentialSource::new();
        let a = source.next().unwrap();
        let b = source.next().unwrap();
        assert_ne!(
            derive_address(&a, Chain::Eth).address,
            derive_address(&b, Chain::Eth).address
        );
        assert_ne!(
            derive_address(&a, Chain::Btc).address,
            derive_address(&b, Chain::Btc).address
        );
    }

    #[test]
    fn eth_address_shape() {
        let candidate = CredentialSource::new().next().unwrap();
        let derived = derive_address(&candidate, Chain::Eth);
        assert!(derived.address.starts_with("0x"));
        assert_eq!(derived.address.len(), 42);
    }

    #[test]
    fn btc_address_checksum_round_trips() {
        let candidate = CredentialSource::new().next().unwrap();
        let derived = derive_address(&candidate, Chain::Btc);
        // Leading version byte 0x00 encodes as '1'.
        assert!(derived.address.starts_with('1'));

        let decoded = bs58::decode(&derived.address).into_vec().unwrap();
        assert_eq!(decoded.len(), 25);
        let (body, check) = decoded.split_at(21);
        let expected: [u8; 32] = Sha256::digest(Sha256::digest(body)).into();
        assert_eq!(check, &expected[..4]);
    }

    #[test]
    fn chain_parse_and_display() {
        assert_eq!("btc".parse::<Chain>().unwrap(), Chain::Btc);
        assert_eq!(Chain::Eth.to_string(), "ETH");
        assert!("DOGE".parse::<Chain>().is_err());
    }
}

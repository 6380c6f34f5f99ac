//! Signal collaborators backed by third-party indexing APIs
//!
//! - `covalent`: transaction feed
//! - `thegraph`: governance votes and airdrop claims
//! - `moralis`: DeFi action estimate

pub mod covalent;
pub mod moralis;
pub mod thegraph;

pub use covalent::CovalentClient;
pub use moralis::MoralisClient;
pub use thegraph::{GraphQuery, TheGraphClient};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::core::TransactionRecord;

#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("Failed to decode {service} response: {message}")]
    Decode { service: &'static str, message: String },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{service} did not answer within {secs}s")]
    Timeout { service: &'static str, secs: u64 },
}

/// Source of the raw transaction history of a wallet
#[async_trait]
pub trait TransactionFeed: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_transactions(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<Vec<TransactionRecord>, CollaboratorError>;
}

/// Source of one optional per-wallet count (votes, claims, actions)
#[async_trait]
pub trait SignalCounter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_count(&self, address: &str) -> Result<u64, CollaboratorError>;
}

pub fn build_http_client(timeout: Duration) -> Result<Client, CollaboratorError> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("proofdrop/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Append `segments` to `base`, each percent-encoded as a single path segment
pub(crate) fn endpoint_url(base: &str, segments: &[&str]) -> Result<Url, CollaboratorError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Reject non-2xx responses before decoding
pub(crate) fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(CollaboratorError::Status { service, status: status.as_u16() })
    }
}

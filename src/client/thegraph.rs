//! The Graph subgraph queries for governance votes and airdrop claims

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{check_status, CollaboratorError, SignalCounter};
use crate::core::normalize_address;

const SERVICE: &str = "The Graph";

/// Which subgraph entity list is counted for the wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphQuery {
    GovernanceVotes,
    AirdropClaims,
}

impl GraphQuery {
    pub fn query(&self) -> &'static str {
        match self {
            GraphQuery::GovernanceVotes => {
                "query($wallet:String!){ votes(where:{voter:$wallet}){id} }"
            }
            GraphQuery::AirdropClaims => {
                "query($wallet:String!){ airdropClaims(where:{claimer:$wallet}){id} }"
            }
        }
    }

    /// Field under `data` holding the matched entities
    pub fn list_field(&self) -> &'static str {
        match self {
            GraphQuery::GovernanceVotes => "votes",
            GraphQuery::AirdropClaims => "airdropClaims",
        }
    }
}

pub struct TheGraphClient {
    client: Client,
    endpoint: String,
    query: GraphQuery,
}

impl TheGraphClient {
    pub fn new(client: Client, endpoint: impl Into<String>, query: GraphQuery) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            query,
        }
    }
}

#[async_trait]
impl SignalCounter for TheGraphClient {
    fn name(&self) -> &'static str {
        match self.query {
            GraphQuery::GovernanceVotes => "The Graph governance",
            GraphQuery::AirdropClaims => "The Graph airdrops",
        }
    }

    #[instrument(skip(self), fields(query = ?self.query))]
    async fn fetch_count(&self, address: &str) -> Result<u64, CollaboratorError> {
        let request = json!({
            "query": self.query.query(),
            "variables": { "wallet": normalize_address(address) },
        });

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let response = check_status(SERVICE, response)?;
        let body: Value = response.json().await.map_err(|e| CollaboratorError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;

        let count = count_entities(&body, self.query.list_field());
        debug!("🗳️ {} matched {} {}", SERVICE, count, self.query.list_field());
        Ok(count)
    }
}

/// Length of `data.<field>`; absent or non-list reads as 0
fn count_entities(body: &Value, field: &str) -> u64 {
    body.get("data")
        .and_then(|data| data.get(field))
        .and_then(Value::as_array)
        .map(|list| list.len() as u64)
        .unwrap_or(0)
}

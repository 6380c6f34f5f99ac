//! Moralis transaction listing used to estimate DeFi interactions

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::{check_status, endpoint_url, CollaboratorError, SignalCounter};

const SERVICE: &str = "Moralis";

pub struct MoralisClient {
    client: Client,
    base_url: String,
    api_key: String,
    chain_id: u64,
}

impl MoralisClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        chain_id: u64,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            chain_id,
        }
    }

    fn transactions_url(&self, address: &str) -> Result<Url, CollaboratorError> {
        let mut url = endpoint_url(&self.base_url, &["api", "v2", address, "transactions"])?;
        url.query_pairs_mut()
            .append_pair("chain", &format!("0x{:x}", self.chain_id));
        Ok(url)
    }
}

#[async_trait]
impl SignalCounter for MoralisClient {
    fn name(&self) -> &'static str {
        SERVICE
    }

    #[instrument(skip(self))]
    async fn fetch_count(&self, address: &str) -> Result<u64, CollaboratorError> {
        let url = self.transactions_url(address)?;
        let response = self
            .client
            .get(url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;
        let response = check_status(SERVICE, response)?;
        let body: Value = response.json().await.map_err(|e| CollaboratorError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;

        let count = count_contract_calls(&body);
        debug!("🏦 Moralis estimated {} DeFi actions", count);
        Ok(count)
    }
}

/// Transactions sent to some address with non-empty calldata.
///
/// Accepts a bare array or a paged object with a `result` array.
fn count_contract_calls(body: &Value) -> u64 {
    let txs: &[Value] = match body {
        Value::Array(txs) => txs.as_slice(),
        Value::Object(_) => body
            .get("result")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    txs.iter().filter(|tx| is_contract_call(tx)).count() as u64
}

fn is_contract_call(tx: &Value) -> bool {
    let has_target = tx
        .get("to")
        .or_else(|| tx.get("to_address"))
        .and_then(Value::as_str)
        .is_some_and(|to| !to.is_empty());
    let has_calldata = tx
        .get("input")
        .and_then(Value::as_str)
        .is_some_and(|input| input.len() > 2);

    has_target && has_calldata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::build_http_client;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WALLET: &str = "0xabc0000000000000000000000000000000000001";

    fn client_for(server: &MockServer, chain_id: u64) -> MoralisClient {
        let http = build_http_client(Duration::from_secs(2)).unwrap();
        MoralisClient::new(http, server.uri(), "moralis_test", chain_id)
    }

    #[test]
    fn test_only_calls_with_calldata_count() {
        let body = json!([
            { "to": "0xrouter", "input": "0x38ed1739" },
            { "to": "0xfriend", "input": "0x" },
            { "to": "", "input": "0xa9059cbb" },
            { "to": null, "input": "0xa9059cbb" },
            { "to": "0xpool" }
        ]);
        assert_eq!(count_contract_calls(&body), 1);
    }

    #[test]
    fn test_paged_result_shape() {
        let body = json!({
            "page": 0,
            "result": [
                { "to_address": "0xrouter", "input": "0x38ed1739" },
                { "to": "0xvault", "input": "0xb6b55f25" }
            ]
        });
        assert_eq!(count_contract_calls(&body), 2);
        assert_eq!(count_contract_calls(&json!({ "message": "Invalid key" })), 0);
        assert_eq!(count_contract_calls(&json!("nope")), 0);
    }

    #[test]
    fn test_address_stays_one_path_segment() {
        let http = build_http_client(Duration::from_secs(2)).unwrap();
        let client = MoralisClient::new(http, "https://deep.example/", "moralis_test", 1);
        let url = client.transactions_url("0xabc/nft?chain=0x89#x").unwrap();

        assert_eq!(url.path(), "/api/v2/0xabc%2Fnft%3Fchain=0x89%23x/transactions");
        assert_eq!(url.query(), Some("chain=0x1"));
    }

    #[tokio::test]
    async fn test_fetch_count_sends_key_and_chain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/{}/transactions", WALLET)))
            .and(query_param("chain", "0x89"))
            .and(header("X-API-Key", "moralis_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    { "to": "0xrouter", "input": "0x38ed1739" },
                    { "to": "0xfriend", "input": "0x" }
                ]
            })))
            .mount(&server)
            .await;

        let count = client_for(&server, 137).fetch_count(WALLET).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_rejected_key_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server, 1).fetch_count(WALLET).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Status { status: 401, .. }));
    }
}

//! Covalent `transactions_v3` client for wallet transaction history

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::{check_status, endpoint_url, CollaboratorError, TransactionFeed};
use crate::core::{DecodedEvent, EventParam, LogEvent, TransactionRecord};

const SERVICE: &str = "Covalent";

#[derive(Debug, Deserialize)]
struct CovalentResponse {
    data: Option<CovalentData>,
}

#[derive(Debug, Deserialize)]
struct CovalentData {
    #[serde(default)]
    items: Option<Vec<Value>>,
}

pub struct CovalentClient {
    client: Client,
    base_url: String,
    api_key: String,
    page_size: u32,
}

impl CovalentClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            page_size,
        }
    }

    fn transactions_url(&self, address: &str, chain_id: u64) -> Result<Url, CollaboratorError> {
        let chain = chain_id.to_string();
        let mut url = endpoint_url(
            &self.base_url,
            &["v1", chain.as_str(), "address", address, "transactions_v3", ""],
        )?;
        url.query_pairs_mut()
            .append_pair("page-size", &self.page_size.to_string())
            .append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl TransactionFeed for CovalentClient {
    fn name(&self) -> &'static str {
        SERVICE
    }

    #[instrument(skip(self))]
    async fn fetch_transactions(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<Vec<TransactionRecord>, CollaboratorError> {
        let url = self.transactions_url(address, chain_id)?;
        let response = self.client.get(url).send().await?;
        let response = check_status(SERVICE, response)?;

        let body: CovalentResponse = response.json().await.map_err(|e| CollaboratorError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;

        let items = body.data.and_then(|d| d.items).unwrap_or_default();
        let records: Vec<TransactionRecord> = items.iter().map(record_from_item).collect();

        debug!("📄 Covalent returned {} transactions", records.len());
        Ok(records)
    }
}

/// Convert one `items[]` entry; unusable fields degrade to empty values
pub fn record_from_item(item: &Value) -> TransactionRecord {
    let timestamp = item
        .get("block_signed_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc));

    let log_events = item
        .get("log_events")
        .and_then(Value::as_array)
        .map(|events| events.iter().map(log_event_from_value).collect())
        .unwrap_or_default();

    TransactionRecord {
        timestamp,
        gas_offered: lenient_amount(item.get("gas_offered")),
        gas_price: lenient_amount(item.get("gas_price")),
        log_events,
    }
}

fn log_event_from_value(event: &Value) -> LogEvent {
    let sender_address = event
        .get("sender_address")
        .and_then(Value::as_str)
        .map(str::to_string);

    let decoded = event.get("decoded").and_then(|decoded| {
        let name = decoded.get("name")?.as_str()?.to_string();
        let params = decoded
            .get("params")
            .and_then(Value::as_array)
            .map(|params| {
                params
                    .iter()
                    .filter_map(|p| {
                        Some(EventParam {
                            name: p.get("name")?.as_str()?.to_string(),
                            value: p.get("value").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Some(DecodedEvent { name, params })
    });

    LogEvent { sender_address, decoded }
}

/// Numbers or numeric strings; anything else (or negative) is 0
fn lenient_amount(value: Option<&Value>) -> f64 {
    let amount = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    amount.filter(|a| a.is_finite() && *a >= 0.0).unwrap_or(0.0)
}

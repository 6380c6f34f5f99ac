//! Core data types for wallet trust scoring

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Single transaction as reported by the transaction feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Block signing time; `None` when the feed sent nothing usable
    pub timestamp: Option<DateTime<Utc>>,

    /// Gas limit offered by the sender
    pub gas_offered: f64,

    /// Gas price in wei
    pub gas_price: f64,

    /// Decoded log events emitted by the transaction, in emission order
    pub log_events: Vec<LogEvent>,
}

impl TransactionRecord {
    /// Gas cost of this record in wei
    pub fn gas_cost_wei(&self) -> f64 {
        self.gas_offered * self.gas_price
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Contract that emitted the event
    pub sender_address: Option<String>,
    pub decoded: Option<DecodedEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub name: String,
    pub params: Vec<EventParam>,
}

impl DecodedEvent {
    /// First parameter whose name is one of `names`
    pub fn find_param(&self, names: &[&str]) -> Option<&EventParam> {
        self.params.iter().find(|p| names.contains(&p.name.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventParam {
    pub name: String,
    pub value: serde_json::Value,
}

impl EventParam {
    pub fn as_address(&self) -> Option<String> {
        self.value.as_str().map(normalize_address)
    }
}

/// Counts reported by the optional signal collaborators.
///
/// `None` means the collaborator was not configured or did not answer;
/// either way the metric reads as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliarySignals {
    pub governance_votes: Option<u64>,
    pub airdrop_claims: Option<u64>,
    pub defi_actions: Option<u64>,
}

/// Normalized wallet activity metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub wallet_age_months: u32,
    pub total_gas_eth: f64,
    pub unique_contracts: u64,
    pub governance_votes: u64,
    pub defi_actions: u64,
    pub airdrops_claimed: u64,
}

impl Metrics {
    /// Value of the metric scored under `key`
    pub fn value(&self, key: MetricKey) -> f64 {
        match key {
            MetricKey::WalletAge => f64::from(self.wallet_age_months),
            MetricKey::GasSpent => self.total_gas_eth,
            MetricKey::UniqueContracts => self.unique_contracts as f64,
            MetricKey::GovernanceVotes => self.governance_votes as f64,
            MetricKey::DefiActions => self.defi_actions as f64,
            MetricKey::AirdropsClaimed => self.airdrops_claimed as f64,
        }
    }
}

/// Configuration key of each scored metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKey {
    WalletAge,
    GasSpent,
    UniqueContracts,
    GovernanceVotes,
    DefiActions,
    AirdropsClaimed,
}

impl MetricKey {
    /// All keys in breakdown order
    pub const ALL: [MetricKey; 6] = [
        MetricKey::WalletAge,
        MetricKey::GasSpent,
        MetricKey::UniqueContracts,
        MetricKey::GovernanceVotes,
        MetricKey::DefiActions,
        MetricKey::AirdropsClaimed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::WalletAge => "walletAge",
            MetricKey::GasSpent => "gasSpent",
            MetricKey::UniqueContracts => "uniqueContracts",
            MetricKey::GovernanceVotes => "governanceVotes",
            MetricKey::DefiActions => "defiActions",
            MetricKey::AirdropsClaimed => "airdropsClaimed",
        }
    }

    pub fn from_config_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }

    /// Human readable label for breakdown views
    pub fn label(&self) -> &'static str {
        match self {
            MetricKey::WalletAge => "Wallet age (months)",
            MetricKey::GasSpent => "Total gas (ETH)",
            MetricKey::UniqueContracts => "Unique contracts interacted",
            MetricKey::GovernanceVotes => "Governance votes",
            MetricKey::DefiActions => "DeFi actions (approx)",
            MetricKey::AirdropsClaimed => "Airdrops claimed (approx)",
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contribution of one metric to the final score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricBreakdown {
    pub key: MetricKey,
    pub value: f64,
    pub score: f64,
    /// `score` rounded for display
    pub rounded_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    /// Final score in `0..=100`
    pub raw_score: u8,
    pub badge: String,
    pub breakdown: Vec<MetricBreakdown>,
}

impl ScoreResult {
    pub fn score_for(&self, key: MetricKey) -> f64 {
        self.breakdown
            .iter()
            .find(|b| b.key == key)
            .map(|b| b.score)
            .unwrap_or(0.0)
    }
}

/// Everything produced by one scoring run for one address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub address: String,
    pub chain_id: u64,
    pub computed_at: DateTime<Utc>,
    pub metrics: Metrics,
    pub result: ScoreResult,
}

/// Canonical form used for every address comparison
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metric_key_round_trips_config_names() {
        for key in MetricKey::ALL {
            assert_eq!(MetricKey::from_config_key(key.as_str()), Some(key));
        }
        assert_eq!(MetricKey::from_config_key("capMonths"), None);
    }

    #[test]
    fn test_find_param_uses_first_matching_name() {
        let decoded = DecodedEvent {
            name: "Transfer".to_string(),
            params: vec![
                EventParam { name: "from".to_string(), value: json!("0xaaa") },
                EventParam { name: "dst".to_string(), value: json!("0xBBB") },
                EventParam { name: "to".to_string(), value: json!("0xccc") },
            ],
        };

        let to = decoded.find_param(&["to", "dst", "recipient"]).unwrap();
        assert_eq!(to.name, "dst");
        assert_eq!(to.as_address().as_deref(), Some("0xbbb"));
    }

    #[test]
    fn test_non_string_param_is_not_an_address() {
        let param = EventParam { name: "to".to_string(), value: json!(42) };
        assert_eq!(param.as_address(), None);
    }

    #[test]
    fn test_metrics_value_by_key() {
        let metrics = Metrics {
            wallet_age_months: 7,
            total_gas_eth: 0.5,
            unique_contracts: 3,
            governance_votes: 2,
            defi_actions: 9,
            airdrops_claimed: 4,
        };

        assert_eq!(metrics.value(MetricKey::WalletAge), 7.0);
        assert_eq!(metrics.value(MetricKey::GasSpent), 0.5);
        assert_eq!(metrics.value(MetricKey::AirdropsClaimed), 4.0);
    }

    #[test]
    fn test_score_report_serializes_camel_case() {
        let report = ScoreReport {
            address: "0xabc".to_string(),
            chain_id: 1,
            computed_at: Utc::now(),
            metrics: Metrics::default(),
            result: ScoreResult { raw_score: 0, badge: "Newbie".to_string(), breakdown: vec![] },
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["chainId"], json!(1));
        assert_eq!(value["metrics"]["walletAgeMonths"], json!(0));
        assert_eq!(value["result"]["rawScore"], json!(0));
    }
}

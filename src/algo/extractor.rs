//! Metric extraction from raw transaction feeds

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::core::{normalize_address, AuxiliarySignals, Metrics, TransactionRecord};

pub const WEI_PER_ETH: f64 = 1e18;
pub const TRANSFER_EVENT: &str = "Transfer";
pub const RECIPIENT_PARAMS: [&str; 3] = ["to", "dst", "recipient"];

/// Length of one "month" when computing wallet age
pub fn month() -> Duration {
    Duration::days(30)
}

/// On-chain facts gathered from one pass over the transaction feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnChainSummary {
    pub first_seen: Option<DateTime<Utc>>,
    pub total_gas_wei: f64,
    pub contracts: HashSet<String>,
    /// `Transfer` events whose recipient is the scored wallet
    pub airdrop_like: u64,
    /// Records that carried no usable timestamp
    pub undated_records: usize,
}

impl OnChainSummary {
    /// Whole 30-day periods between `first_seen` and `now`, never negative
    pub fn wallet_age_months(&self, now: DateTime<Utc>) -> u32 {
        let Some(first_seen) = self.first_seen else {
            return 0;
        };

        let elapsed_ms = now.signed_duration_since(first_seen).num_milliseconds();
        if elapsed_ms <= 0 {
            return 0;
        }

        let months = elapsed_ms / month().num_milliseconds();
        u32::try_from(months).unwrap_or(u32::MAX)
    }

    pub fn total_gas_eth(&self) -> f64 {
        self.total_gas_wei / WEI_PER_ETH
    }

    pub fn into_metrics(self, signals: &AuxiliarySignals, now: DateTime<Utc>) -> Metrics {
        let external_claims = signals.airdrop_claims.unwrap_or(0);

        Metrics {
            wallet_age_months: self.wallet_age_months(now),
            total_gas_eth: self.total_gas_eth(),
            unique_contracts: self.contracts.len() as u64,
            governance_votes: signals.governance_votes.unwrap_or(0),
            defi_actions: signals.defi_actions.unwrap_or(0),
            // Both signals describe claims; overlaps are counted twice
            airdrops_claimed: external_claims.saturating_add(self.airdrop_like),
        }
    }
}

/// Single pass over `records` for the wallet `address`
pub fn summarize_records(records: &[TransactionRecord], address: &str) -> OnChainSummary {
    let wallet = normalize_address(address);
    let mut summary = OnChainSummary::default();

    for record in records {
        match record.timestamp {
            Some(ts) => {
                if summary.first_seen.map_or(true, |first| ts < first) {
                    summary.first_seen = Some(ts);
                }
            }
            None => summary.undated_records += 1,
        }

        let gas = record.gas_cost_wei();
        if gas.is_finite() && gas > 0.0 {
            summary.total_gas_wei += gas;
        }

        for event in &record.log_events {
            if let Some(sender) = event.sender_address.as_deref() {
                let sender = normalize_address(sender);
                if !sender.is_empty() {
                    summary.contracts.insert(sender);
                }
            }

            let Some(decoded) = event.decoded.as_ref() else {
                continue;
            };
            if decoded.name != TRANSFER_EVENT {
                continue;
            }

            let recipient = decoded
                .find_param(&RECIPIENT_PARAMS)
                .and_then(|p| p.as_address());
            if recipient.as_deref() == Some(wallet.as_str()) {
                summary.airdrop_like += 1;
            }
        }
    }

    if summary.undated_records > 0 {
        debug!("{} of {} records had no usable timestamp", summary.undated_records, records.len());
    }

    summary
}

/// Reduce a transaction feed plus auxiliary signals into [`Metrics`].
///
/// `now` is the reference time for wallet age, so the same feed reads
/// older as time passes.
pub fn extract_metrics(
    records: &[TransactionRecord],
    address: &str,
    signals: &AuxiliarySignals,
    now: DateTime<Utc>,
) -> Metrics {
    summarize_records(records, address).into_metrics(signals, now)
}

use std::io::Write;

use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use proofdrop::client::covalent::record_from_item;
use proofdrop::config::MetricWeight;
use proofdrop::{
    extract_metrics, AuxiliarySignals, MetricKey, Metrics, ScoreHandler, ScoringConfig,
    ScoringEngine, TransactionRecord,
};

const WALLET: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";

#[test]
fn gas_only_wallet_scores_fraction_of_a_point() {
    let now = Utc::now();
    let records = vec![TransactionRecord {
        timestamp: Some(now - Duration::days(60)),
        gas_offered: 21_000.0,
        gas_price: 50e9,
        log_events: vec![],
    }];
    let config =
        ScoringConfig::from_json(r#"{ "metrics": { "gasSpent": { "cap": 1, "weight": 20 } } }"#)
            .unwrap();

    let metrics = extract_metrics(&records, WALLET, &AuxiliarySignals::default(), now);
    assert!((metrics.total_gas_eth - 0.00105).abs() < 1e-12);
    assert_eq!(metrics.wallet_age_months, 2);

    let result = ScoringEngine::new(&config).score(&metrics);
    assert!((result.score_for(MetricKey::GasSpent) - 0.021).abs() < 1e-9);
    assert_eq!(result.breakdown[1].rounded_score, 0);
    assert_eq!(result.raw_score, 0);
    assert_eq!(result.badge, "Newbie");
}

#[test]
fn cap_prefix_key_sets_wallet_age_cap() {
    let config = ScoringConfig::from_json(
        r#"{ "metrics": { "walletAge": { "capMonths": 24, "weight": 10 } } }"#,
    )
    .unwrap();
    let metrics = Metrics { wallet_age_months: 12, ..Default::default() };

    let result = ScoringEngine::new(&config).score(&metrics);
    assert_eq!(result.score_for(MetricKey::WalletAge), 5.0);
    assert_eq!(result.raw_score, 5);
}

#[test]
fn null_metric_entry_does_not_zero_the_others() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"{
            "chain_id": null,
            "metrics": {
                "walletAge": { "capMonths": 24, "weight": 24 },
                "defiActions": null
            },
            "thegraph_endpoints": null
        }"#,
    )
    .unwrap();

    let config = ScoringConfig::load_or_default(file.path());
    assert_eq!(config.chain_id, 1);

    let metrics = Metrics { wallet_age_months: 12, defi_actions: 7, ..Default::default() };
    let result = ScoringEngine::new(&config).score(&metrics);
    assert_eq!(result.score_for(MetricKey::WalletAge), 12.0);
    assert_eq!(result.score_for(MetricKey::DefiActions), 0.0);
    assert_eq!(result.raw_score, 12);
}

#[test]
fn unconfigured_signals_never_score() {
    let now = Utc::now();
    let item = json!({
        "block_signed_at": "2021-06-01T00:00:00Z",
        "gas_offered": 300000,
        "gas_price": 20000000000u64,
        "log_events": [
            { "sender_address": "0xDAO", "decoded": { "name": "VoteCast", "params": [] } },
            { "sender_address": "0xRouter", "decoded": { "name": "Swap", "params": [] } }
        ]
    });
    let records = vec![record_from_item(&item)];

    let metrics = extract_metrics(&records, WALLET, &AuxiliarySignals::default(), now);
    assert_eq!(metrics.governance_votes, 0);
    assert_eq!(metrics.defi_actions, 0);
    assert_eq!(metrics.unique_contracts, 2);
}

#[test]
fn raw_score_stays_within_bounds() {
    let metric_values = [0u64, 1, 5, 50, 10_000];
    for weight in [0.0, 5.0, 20.0, 40.0, 250.0] {
        let mut config = ScoringConfig::default();
        for key in MetricKey::ALL {
            config
                .metrics
                .insert(key.as_str().to_string(), MetricWeight::new(10.0, weight));
        }
        let engine = ScoringEngine::new(&config);

        for value in metric_values {
            let metrics = Metrics {
                wallet_age_months: value as u32,
                total_gas_eth: value as f64 / 100.0,
                unique_contracts: value,
                governance_votes: value,
                defi_actions: value,
                airdrops_claimed: value,
            };
            let result = engine.score(&metrics);
            assert!(result.raw_score <= 100, "weight {} value {}", weight, value);
        }
    }
}

#[tokio::test]
async fn end_to_end_against_mock_indexers() {
    let covalent = MockServer::start().await;
    let graph = MockServer::start().await;

    let signed_at = (Utc::now() - Duration::days(400)).to_rfc3339();
    Mock::given(method("GET"))
        .and(path(format!("/v1/10/address/{}/transactions_v3/", WALLET)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "items": [{
                    "block_signed_at": signed_at,
                    "gas_offered": 21000,
                    "gas_price": 50000000000u64,
                    "log_events": [{
                        "sender_address": "0xAirdropToken",
                        "decoded": {
                            "name": "Transfer",
                            "params": [
                                {
                                    "name": "from",
                                    "value": "0x0000000000000000000000000000000000000000"
                                },
                                { "name": "to", "value": WALLET.to_lowercase() },
                                { "name": "value", "value": "1000000000000000000" }
                            ]
                        }
                    }]
                }]
            }
        })))
        .mount(&covalent)
        .await;

    Mock::given(method("POST"))
        .and(path("/governance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "votes": [{ "id": "1" }, { "id": "2" }] }
        })))
        .mount(&graph)
        .await;

    Mock::given(method("POST"))
        .and(path("/airdrops"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&graph)
        .await;

    let document = json!({
        "chain_id": 10,
        "metrics": {
            "walletAge": { "capMonths": 24, "weight": 24 },
            "gasSpent": { "cap": 1, "weight": 20 },
            "uniqueContracts": { "cap": 10, "weight": 10 },
            "governanceVotes": { "cap": 4, "weight": 20 },
            "airdropsClaimed": { "cap": 2, "weight": 10 }
        },
        "badges": {
            "Veteran": [60, 100],
            "Explorer": [20, 59]
        },
        "covalent_api_key": "ckey_test",
        "thegraph_endpoints": {
            "governance": format!("{}/governance", graph.uri()),
            "airdrops": format!("{}/airdrops", graph.uri())
        },
        "collaborators": { "covalent_base_url": covalent.uri(), "timeout_secs": 5 }
    });
    let config = ScoringConfig::from_json(&document.to_string()).unwrap();

    let handler = ScoreHandler::from_config(config).unwrap();
    let report = handler.score_address(WALLET).await;

    assert_eq!(report.chain_id, 10);
    assert_eq!(report.metrics.wallet_age_months, 13);
    assert_eq!(report.metrics.unique_contracts, 1);
    assert_eq!(report.metrics.governance_votes, 2);
    assert_eq!(report.metrics.airdrops_claimed, 1);
    assert_eq!(report.metrics.defi_actions, 0);

    // 13 + 0.021 + 1 + 10 + 5
    assert_eq!(report.result.raw_score, 29);
    assert_eq!(report.result.badge, "Explorer");
}

#[test]
fn example_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json");
    let config = ScoringConfig::load_from_file(path).unwrap();

    assert_eq!(config.total_weight(), 100.0);
    assert_eq!(config.badges.tiers().len(), 4);
    for key in MetricKey::ALL {
        assert!(config.metric(key).is_some(), "{} missing", key);
    }
    assert_eq!(config.metric(MetricKey::WalletAge).unwrap().cap, 24.0);
}

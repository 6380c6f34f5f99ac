//! Score Handler
//!
//! Gathers every signal for a wallet concurrently, then runs the metric
//! extractor and scoring engine over whatever arrived.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::algo::{extract_metrics, ScoringEngine};
use crate::client::{
    build_http_client, CollaboratorError, CovalentClient, GraphQuery, MoralisClient, SignalCounter,
    TheGraphClient, TransactionFeed,
};
use crate::config::ScoringConfig;
use crate::core::{normalize_address, AuxiliarySignals, ScoreReport, TransactionRecord};

/// Raw collaborator output for one wallet
#[derive(Debug, Clone, Default)]
pub struct GatheredSignals {
    pub records: Vec<TransactionRecord>,
    pub signals: AuxiliarySignals,
}

pub struct ScoreHandler {
    config: Arc<ScoringConfig>,
    feed: Option<Arc<dyn TransactionFeed>>,
    governance: Option<Arc<dyn SignalCounter>>,
    airdrops: Option<Arc<dyn SignalCounter>>,
    defi: Option<Arc<dyn SignalCounter>>,
    timeout: Duration,
}

impl ScoreHandler {
    /// Handler with no collaborators; add them with the `with_*` builders
    pub fn new(config: ScoringConfig) -> Self {
        let timeout = Duration::from_secs(config.collaborators.timeout_secs);
        Self {
            config: Arc::new(config),
            feed: None,
            governance: None,
            airdrops: None,
            defi: None,
            timeout,
        }
    }

    /// Wire the HTTP collaborators enabled by the config document
    pub fn from_config(config: ScoringConfig) -> Result<Self> {
        info!("🔧 Initializing score handler for chain {}", config.chain_id);

        let settings = config.collaborators.clone();
        let http = build_http_client(Duration::from_secs(settings.timeout_secs))
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
        let mut handler = Self::new(config);
        let config = Arc::clone(&handler.config);

        match config.covalent_api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => {
                handler = handler.with_feed(Arc::new(CovalentClient::new(
                    http.clone(),
                    &settings.covalent_base_url,
                    key,
                    settings.page_size,
                )));
            }
            None => {
                warn!("⚠️ No covalent_api_key configured - transaction history will be empty")
            }
        }

        if let Some(endpoint) = config.thegraph_endpoints.governance.as_deref() {
            handler = handler.with_governance(Arc::new(TheGraphClient::new(
                http.clone(),
                endpoint,
                GraphQuery::GovernanceVotes,
            )));
        }

        if let Some(endpoint) = config.thegraph_endpoints.airdrops.as_deref() {
            handler = handler.with_airdrops(Arc::new(TheGraphClient::new(
                http.clone(),
                endpoint,
                GraphQuery::AirdropClaims,
            )));
        }

        if let Some(key) = config.moralis_api_key.as_deref().filter(|k| !k.is_empty()) {
            handler = handler.with_defi(Arc::new(MoralisClient::new(
                http,
                &settings.moralis_base_url,
                key,
                config.chain_id,
            )));
        }

        info!(
            "✅ Score handler ready (feed: {}, governance: {}, airdrops: {}, defi: {})",
            handler.feed.is_some(),
            handler.governance.is_some(),
            handler.airdrops.is_some(),
            handler.defi.is_some()
        );
        Ok(handler)
    }

    pub fn with_feed(mut self, feed: Arc<dyn TransactionFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn with_governance(mut self, counter: Arc<dyn SignalCounter>) -> Self {
        self.governance = Some(counter);
        self
    }

    pub fn with_airdrops(mut self, counter: Arc<dyn SignalCounter>) -> Self {
        self.airdrops = Some(counter);
        self
    }

    pub fn with_defi(mut self, counter: Arc<dyn SignalCounter>) -> Self {
        self.defi = Some(counter);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Query every configured collaborator at once.
    ///
    /// A collaborator that fails or times out contributes nothing; the
    /// others are unaffected.
    #[instrument(skip(self))]
    pub async fn gather(&self, address: &str) -> GatheredSignals {
        let chain_id = self.config.chain_id;

        let records = async {
            match &self.feed {
                Some(feed) => {
                    self.fail_soft(feed.name(), feed.fetch_transactions(address, chain_id))
                        .await
                        .unwrap_or_default()
                }
                None => Vec::new(),
            }
        };

        let (records, governance_votes, airdrop_claims, defi_actions) = tokio::join!(
            records,
            self.count(self.governance.as_deref(), address),
            self.count(self.airdrops.as_deref(), address),
            self.count(self.defi.as_deref(), address),
        );

        GatheredSignals {
            records,
            signals: AuxiliarySignals {
                governance_votes,
                airdrop_claims,
                defi_actions,
            },
        }
    }

    /// Fetch, extract and score one wallet, aging it against `now`
    #[instrument(skip(self, now))]
    pub async fn score_address_at(&self, address: &str, now: DateTime<Utc>) -> ScoreReport {
        info!("🔍 Scoring wallet {}", address);

        let gathered = self.gather(address).await;
        let metrics = extract_metrics(&gathered.records, address, &gathered.signals, now);
        debug!(?metrics, "Extracted wallet metrics");

        let result = ScoringEngine::new(&self.config).score(&metrics);
        info!("🏅 Wallet {} scored {} ({})", address, result.raw_score, result.badge);

        ScoreReport {
            address: normalize_address(address),
            chain_id: self.config.chain_id,
            computed_at: now,
            metrics,
            result,
        }
    }

    pub async fn score_address(&self, address: &str) -> ScoreReport {
        self.score_address_at(address, Utc::now()).await
    }

    async fn count(&self, counter: Option<&dyn SignalCounter>, address: &str) -> Option<u64> {
        let counter = counter?;
        self.fail_soft(counter.name(), counter.fetch_count(address)).await
    }

    async fn fail_soft<T>(
        &self,
        service: &'static str,
        request: impl Future<Output = Result<T, CollaboratorError>>,
    ) -> Option<T> {
        let outcome = match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout {
                service,
                secs: self.timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("⚠️ {} unavailable, contribution reads as zero: {}", service, e);
                None
            }
        }
    }
}

//! Scoring configuration structures

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::de::{self, DeserializeOwned, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::MetricKey;

pub const DEFAULT_CHAIN_ID: u64 = 1;
pub const DEFAULT_CAP: f64 = 1.0;
pub const DEFAULT_BADGE: &str = "Newbie";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const COVALENT_BASE_URL: &str = "https://api.covalenthq.com";
pub const MORALIS_BASE_URL: &str = "https://deep-index.moralis.io";

/// Visitor methods that turn every scalar or sequence into `$fallback`
macro_rules! fallback_for_non_maps {
    ($fallback:expr) => {
        fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
            Ok($fallback)
        }

        fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
            Ok($fallback)
        }

        fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
            Ok($fallback)
        }

        fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
            Ok($fallback)
        }

        fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
            Ok($fallback)
        }

        fn visit_seq<S: SeqAccess<'de>>(self, mut seq: S) -> Result<Self::Value, S::Error> {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok($fallback)
        }
    };
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The scoring document.
///
/// Every section is read on its own: a null or mistyped section falls back
/// to its default and a bad metric entry is skipped, so one gap never
/// discards the rest of the document.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_chain_id", deserialize_with = "lenient_chain_id")]
    pub chain_id: u64,

    /// Weight table keyed by metric name
    #[serde(default, deserialize_with = "lenient_metrics")]
    pub metrics: BTreeMap<String, MetricWeight>,

    #[serde(default)]
    pub badges: BadgeTable,

    #[serde(default, deserialize_with = "or_default")]
    pub thegraph_endpoints: GraphEndpoints,

    #[serde(default, deserialize_with = "or_default")]
    pub covalent_api_key: Option<String>,

    #[serde(default, deserialize_with = "or_default")]
    pub moralis_api_key: Option<String>,

    #[serde(default, deserialize_with = "or_default")]
    pub collaborators: CollaboratorSettings,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            metrics: BTreeMap::new(),
            badges: BadgeTable::default(),
            thegraph_endpoints: GraphEndpoints::default(),
            covalent_api_key: None,
            moralis_api_key: None,
            collaborators: CollaboratorSettings::default(),
        }
    }
}

impl ScoringConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: ScoringConfig = serde_json::from_str(content)?;
        config.warn_unknown_metrics();
        Ok(config)
    }

    /// Load the document, falling back to an empty configuration.
    ///
    /// An empty configuration scores every wallet 0 with the default badge.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load_from_file(path) {
            Ok(config) => {
                debug!("Loaded scoring config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("⚠️ Failed to load {}: {} - using empty config", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn metric(&self, key: MetricKey) -> Option<&MetricWeight> {
        self.metrics.get(key.as_str())
    }

    /// Sum of all configured weights; expected to stay at or below 100
    pub fn total_weight(&self) -> f64 {
        MetricKey::ALL
            .iter()
            .filter_map(|k| self.metric(*k))
            .map(|m| m.weight)
            .sum()
    }

    fn warn_unknown_metrics(&self) {
        for name in self.metrics.keys() {
            if MetricKey::from_config_key(name).is_none() {
                warn!("Ignoring unknown metric '{}' in config", name);
            }
        }
        let total = self.total_weight();
        if total > 100.0 {
            warn!("Metric weights sum to {:.1}, final score will be clamped to 100", total);
        }
    }
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

/// Null or malformed section reads as its default
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value.clone()).unwrap_or_else(|e| {
        warn!("Ignoring malformed config value {}: {}", value, e);
        T::default()
    }))
}

/// Zero, null or non-integer chain ids read as mainnet
fn lenient_chain_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match value.as_u64().filter(|id| *id > 0) {
        Some(id) => Ok(id),
        None => {
            if !value.is_null() {
                warn!("chain_id {} is not a positive integer, using {}", value, DEFAULT_CHAIN_ID);
            }
            Ok(DEFAULT_CHAIN_ID)
        }
    }
}

/// Metric entries read one by one; an entry that is not an object is dropped
fn lenient_metrics<'de, D>(deserializer: D) -> Result<BTreeMap<String, MetricWeight>, D::Error>
where
    D: Deserializer<'de>,
{
    struct MetricsVisitor;

    impl<'de> Visitor<'de> for MetricsVisitor {
        type Value = BTreeMap<String, MetricWeight>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of metric names to metric objects")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut metrics = BTreeMap::new();
            while let Some(name) = map.next_key::<String>()? {
                match map.next_value::<MetricEntry>()?.0 {
                    Some(weight) => {
                        metrics.insert(name, weight);
                    }
                    None => warn!("Skipping metric '{}': not a metric object", name),
                }
            }
            Ok(metrics)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(BTreeMap::new())
        }

        fallback_for_non_maps!(malformed_metrics());
    }

    deserializer.deserialize_any(MetricsVisitor)
}

fn malformed_metrics() -> BTreeMap<String, MetricWeight> {
    warn!("metrics must be an object - no metric will score");
    BTreeMap::new()
}

/// A metric slot that reads as `None` unless it holds an object
struct MetricEntry(Option<MetricWeight>);

impl<'de> Deserialize<'de> for MetricEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MetricEntryVisitor;

        impl<'de> Visitor<'de> for MetricEntryVisitor {
            type Value = MetricEntry;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a metric object or null")
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<MetricEntry, A::Error> {
                read_metric_weight(map).map(|weight| MetricEntry(Some(weight)))
            }

            fn visit_unit<E: de::Error>(self) -> Result<MetricEntry, E> {
                Ok(MetricEntry(None))
            }

            fallback_for_non_maps!(MetricEntry(None));
        }

        deserializer.deserialize_any(MetricEntryVisitor)
    }
}

/// Where the cap of a metric came from
#[derive(Debug, Clone, PartialEq)]
pub enum CapSource {
    /// Read from the named `cap*` key
    Key(String),
    Default,
}

/// Normalization cap and weight for one metric.
///
/// The cap is read from the first key, in document order, whose name
/// starts with `cap` (`cap`, `capMonths`, `capEth`, ...). When there is no
/// such key, or its value is not a positive number, the cap is 1. A
/// missing or non-numeric `weight` is 0. Any other key is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricWeight {
    pub cap: f64,
    pub weight: f64,
    pub cap_source: CapSource,
}

impl MetricWeight {
    pub fn new(cap: f64, weight: f64) -> Self {
        Self::resolve(Some(("cap".to_string(), Value::from(cap))), Some(Value::from(weight)))
    }

    fn resolve(cap_entry: Option<(String, Value)>, weight: Option<Value>) -> Self {
        let weight = weight.as_ref().and_then(Value::as_f64).unwrap_or(0.0);

        match cap_entry {
            Some((key, value)) => match value.as_f64() {
                Some(cap) if cap.is_finite() && cap > 0.0 => Self {
                    cap,
                    weight,
                    cap_source: CapSource::Key(key),
                },
                _ => {
                    warn!(
                        "Cap '{}' = {} is not a positive number, using {}",
                        key, value, DEFAULT_CAP
                    );
                    Self { cap: DEFAULT_CAP, weight, cap_source: CapSource::Default }
                }
            },
            None => Self { cap: DEFAULT_CAP, weight, cap_source: CapSource::Default },
        }
    }
}

impl<'de> Deserialize<'de> for MetricWeight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MetricWeightVisitor;

        impl<'de> Visitor<'de> for MetricWeightVisitor {
            type Value = MetricWeight;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a metric object with a cap* key and a weight")
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<MetricWeight, A::Error> {
                read_metric_weight(map)
            }
        }

        deserializer.deserialize_map(MetricWeightVisitor)
    }
}

fn read_metric_weight<'de, A: MapAccess<'de>>(mut map: A) -> Result<MetricWeight, A::Error> {
    let mut cap_entry = None;
    let mut weight = None;

    while let Some(key) = map.next_key::<String>()? {
        if key == "weight" {
            weight = Some(map.next_value::<Value>()?);
        } else if key.starts_with("cap") && cap_entry.is_none() {
            let value = map.next_value::<Value>()?;
            cap_entry = Some((key, value));
        } else {
            map.next_value::<IgnoredAny>()?;
        }
    }

    Ok(MetricWeight::resolve(cap_entry, weight))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BadgeTier {
    pub name: String,
    pub lo: f64,
    pub hi: f64,
}

impl BadgeTier {
    pub fn new(name: impl Into<String>, lo: f64, hi: f64) -> Self {
        Self { name: name.into(), lo, hi }
    }

    pub fn contains(&self, score: u8) -> bool {
        let score = f64::from(score);
        self.lo <= score && score <= self.hi
    }
}

/// Badge tiers in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BadgeTable {
    tiers: Vec<BadgeTier>,
}

impl BadgeTable {
    pub fn new(tiers: Vec<BadgeTier>) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> &[BadgeTier] {
        &self.tiers
    }

    /// First tier whose inclusive range holds `score`
    pub fn select(&self, score: u8) -> Option<&BadgeTier> {
        self.tiers.iter().find(|t| t.contains(score))
    }
}

impl<'de> Deserialize<'de> for BadgeTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BadgeTableVisitor;

        impl<'de> Visitor<'de> for BadgeTableVisitor {
            type Value = BadgeTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of badge names to [lo, hi] ranges")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<BadgeTable, A::Error> {
                let mut tiers = Vec::new();

                while let Some(name) = map.next_key::<String>()? {
                    let range = map.next_value::<Value>()?;
                    let bounds = range
                        .as_array()
                        .filter(|r| r.len() >= 2)
                        .and_then(|r| Some((r[0].as_f64()?, r[1].as_f64()?)));

                    match bounds {
                        Some((lo, hi)) => tiers.push(BadgeTier { name, lo, hi }),
                        None => warn!("Skipping badge '{}': range {} is not [lo, hi]", name, range),
                    }
                }

                Ok(BadgeTable { tiers })
            }

            fn visit_unit<E: de::Error>(self) -> Result<BadgeTable, E> {
                Ok(BadgeTable::default())
            }

            fallback_for_non_maps!(malformed_badges());
        }

        deserializer.deserialize_any(BadgeTableVisitor)
    }
}

fn malformed_badges() -> BadgeTable {
    warn!("badges must be a map of [lo, hi] ranges - every wallet gets {}", DEFAULT_BADGE);
    BadgeTable::default()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphEndpoints {
    pub governance: Option<String>,
    pub airdrops: Option<String>,
}

/// Network settings shared by all signal collaborators
#[derive(Debug, Clone, Deserialize)]
pub struct CollaboratorSettings {
    /// Per-collaborator limit, never below one second
    #[serde(default = "default_timeout_secs", deserialize_with = "at_least_one_second")]
    pub timeout_secs: u64,

    #[serde(default = "default_covalent_base_url")]
    pub covalent_base_url: String,

    #[serde(default = "default_moralis_base_url")]
    pub moralis_base_url: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for CollaboratorSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            covalent_base_url: COVALENT_BASE_URL.to_string(),
            moralis_base_url: MORALIS_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn at_least_one_second<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let secs = u64::deserialize(deserializer)?;
    if secs == 0 {
        warn!("timeout_secs = 0 would fail every collaborator, using 1");
        return Ok(1);
    }
    Ok(secs)
}

fn default_covalent_base_url() -> String {
    COVALENT_BASE_URL.to_string()
}

fn default_moralis_base_url() -> String {
    MORALIS_BASE_URL.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

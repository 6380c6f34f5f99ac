//! Metric extraction and scoring engine
//!
//! - `extractor`: reduces a transaction feed plus auxiliary signals into `Metrics`
//! - `scoring`: turns `Metrics` into a bounded score, badge and breakdown

pub mod extractor;
pub mod scoring;

pub use extractor::{extract_metrics, summarize_records, OnChainSummary};
pub use scoring::{bounded_score, select_badge, ScoringEngine};

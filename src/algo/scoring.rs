//! Weighted scoring of wallet metrics into a bounded score and badge

use tracing::debug;

use crate::config::{BadgeTable, MetricWeight, ScoringConfig, DEFAULT_BADGE};
use crate::core::{MetricBreakdown, MetricKey, Metrics, ScoreResult};

pub const MAX_SCORE: f64 = 100.0;

impl MetricWeight {
    /// `min(1, value / cap) * weight`
    pub fn score(&self, value: f64) -> f64 {
        let normalized = (value / self.cap).min(1.0);
        normalized * self.weight
    }
}

pub struct ScoringEngine<'a> {
    config: &'a ScoringConfig,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    /// Points earned by one metric; unconfigured metrics earn nothing
    pub fn metric_score(&self, key: MetricKey, value: f64) -> f64 {
        self.config
            .metric(key)
            .map(|weight| weight.score(value))
            .unwrap_or(0.0)
    }

    pub fn score(&self, metrics: &Metrics) -> ScoreResult {
        let breakdown: Vec<MetricBreakdown> = MetricKey::ALL
            .iter()
            .map(|&key| {
                let value = metrics.value(key);
                let score = self.metric_score(key, value);
                MetricBreakdown {
                    key,
                    value,
                    score,
                    rounded_score: round_points(score),
                }
            })
            .collect();

        let total: f64 = breakdown.iter().map(|b| b.score).sum();
        let raw_score = bounded_score(total);
        let badge = select_badge(&self.config.badges, raw_score);

        debug!(total, raw_score, badge = %badge, "Scored wallet metrics");

        ScoreResult {
            raw_score,
            badge,
            breakdown,
        }
    }
}

/// Clamp to `[0, 100]` first, then round; non-finite totals read as 0
pub fn bounded_score(total: f64) -> u8 {
    if !total.is_finite() {
        return 0;
    }
    total.clamp(0.0, MAX_SCORE).round() as u8
}

fn round_points(score: f64) -> u32 {
    if score.is_finite() && score > 0.0 {
        score.round() as u32
    } else {
        0
    }
}

/// First tier holding `score`, or the default badge
pub fn select_badge(badges: &BadgeTable, score: u8) -> String {
    badges
        .select(score)
        .map(|tier| tier.name.clone())
        .unwrap_or_else(|| DEFAULT_BADGE.to_string())
}

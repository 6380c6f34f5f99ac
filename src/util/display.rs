//! Display utilities for terminal output

use colored::Colorize;

use crate::core::{MetricKey, ScoreReport};

pub const BAR_WIDTH: usize = 20;

/// `[#####---------------]` for a score out of 100
pub fn score_bar(score: u8) -> String {
    let filled = (usize::from(score.min(100)) * BAR_WIDTH + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn format_value(key: MetricKey, value: f64) -> String {
    match key {
        MetricKey::GasSpent => format!("{:.5}", value),
        _ => format!("{}", value as u64),
    }
}

/// Plain-text breakdown, one line per metric
pub fn render_breakdown(report: &ScoreReport) -> String {
    let mut lines = vec!["Breakdown".to_string()];
    for entry in &report.result.breakdown {
        lines.push(format!(
            "  - {}: {} - score {}",
            entry.key.label(),
            format_value(entry.key, entry.value),
            entry.rounded_score
        ));
    }
    lines.join("\n")
}

pub fn print_score_report(report: &ScoreReport) {
    let score = report.result.raw_score;
    let painted_score = match score {
        0..=33 => score.to_string().red(),
        34..=66 => score.to_string().yellow(),
        _ => score.to_string().green(),
    };

    println!("\n{} {}", "🪪", "PROOFDROP TRUST SCORE".bold());
    println!("{}", "=".repeat(50));
    println!("   Wallet: {}", report.address);
    println!("   Chain:  {}", report.chain_id);
    println!("   Score:  {} / 100 {}", painted_score.bold(), score_bar(score));
    println!("   Badge:  {}", report.result.badge.cyan().bold());
    println!();
    println!("{}", render_breakdown(report));
    println!("{}", "=".repeat(50));
}

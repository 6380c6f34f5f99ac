// Core data types
pub mod core;

// Scoring configuration
pub mod config;

// Metric extraction and scoring engine
pub mod algo;

// Signal collaborators
pub mod client;

// Orchestration and terminal output
pub mod handlers;
pub mod util;

// Re-export commonly used types for convenience
pub use algo::{extract_metrics, ScoringEngine};
pub use config::ScoringConfig;
pub use self::core::*;
pub use handlers::ScoreHandler;

//! Handler Module
//!
//! Handlers wire collaborators, configuration and the scoring engine
//! together for the binary and for library users.

pub mod score_handler;

pub use score_handler::{GatheredSignals, ScoreHandler};

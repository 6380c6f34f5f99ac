//! Scoring configuration loaded from the JSON config document

pub mod scoring;

pub use scoring::*;

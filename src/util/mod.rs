pub mod display;

pub use display::{print_score_report, render_breakdown, score_bar};

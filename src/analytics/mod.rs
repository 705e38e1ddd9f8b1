//! Momentum analytics: indicator calculation, scoring, ranking

pub mod indicators;
pub mod scoring;
pub mod types;

pub use indicators::{
    breadth_ok, IndicatorCalculator, LookbackWindows, VolWindows,
};
pub use scoring::{top_n, Scorer, ScoringConfig};
pub use types::{IndicatorSet, PriceBar};

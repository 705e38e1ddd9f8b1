//! Momentum screener core
//!
//! Screens a configurable universe of ETFs, stocks, and indices by
//! risk-penalized momentum: quota-aware daily-bar ingestion, pure
//! indicator analytics, deterministic cross-universe ranking, and an
//! embedded SQLite run ledger.

pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod services;
pub mod state;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing from the configured level and format. Honors
/// RUST_LOG when set.
pub fn init_logging(level: &str, format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("momentum_screener={level}"))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

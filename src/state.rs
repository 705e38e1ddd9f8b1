//! Shared application state

use crate::config::Config;
use crate::db::Db;
use crate::error::Result;
use crate::fetch::{AlphaVantageClient, QuotaGate};
use std::sync::Arc;
use std::time::Duration;

/// Wires the store, quota gate, and provider client together for the CLI.
/// The quota gate is the single process-wide instance every fetch worker
/// shares.
pub struct AppState {
    pub config: Config,
    pub db: Arc<Db>,
    pub quota: Arc<QuotaGate>,
    pub provider: Arc<AlphaVantageClient>,
}

impl AppState {
    /// Open the store, migrate, seed the configured universe, and build
    /// the provider client.
    pub fn new(config: Config) -> Result<Self> {
        let db = Arc::new(Db::open(&config.db_path())?);
        db.ensure_universe(&config.universe)?;

        let quota = Arc::new(QuotaGate::new(config.alpha_vantage.daily_request_limit));
        let provider = Arc::new(AlphaVantageClient::new(
            config.alpha_vantage.api_key.clone(),
            config.alpha_vantage.base_url.clone(),
            Arc::clone(&quota),
            Duration::from_secs(config.fetcher.timeout),
            config.fetcher.max_retries,
        )?);

        tracing::info!(
            "Application state initialized ({} symbols in universe)",
            config.universe.len()
        );

        Ok(Self {
            config,
            db,
            quota,
            provider,
        })
    }
}

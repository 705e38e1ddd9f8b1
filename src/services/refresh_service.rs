//! Refresh orchestration
//!
//! Drives one end-to-end refresh: open a run, fetch every active symbol
//! through the scheduler, persist prices and per-symbol fetch outcomes,
//! recompute indicators from stored history, rank the universe, persist
//! indicators, and close the run ledger.

use crate::analytics::{
    IndicatorCalculator, IndicatorSet, LookbackWindows, PriceBar, Scorer, ScoringConfig,
    VolWindows,
};
use crate::config::Config;
use crate::db::models::{FetchLog, Price, RunStatus};
use crate::db::Db;
use crate::error::{AppError, Result};
use crate::fetch::{
    parse_bar, validate_price, DailyAdjusted, DailyBarsProvider, OutputSize, Scheduler,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Refresh-wide deadline after which outstanding fetches are cancelled.
const REFRESH_DEADLINE: Duration = Duration::from_secs(5 * 60);

/// Outcome of one refresh for the caller
#[derive(Debug, Clone)]
pub struct RefreshSummary {
    pub run_id: i64,
    pub symbols_processed: i64,
    pub symbols_failed: i64,
    pub indicators_written: usize,
    pub duration: Duration,
}

/// Refresh orchestrator
pub struct RefreshService;

impl RefreshService {
    /// Execute one refresh against the configured universe. Per-symbol
    /// fetch failures are recorded and survived; store failures close the
    /// run with status ERROR and propagate.
    pub async fn run(
        db: &Db,
        config: &Config,
        provider: Arc<dyn DailyBarsProvider>,
    ) -> Result<RefreshSummary> {
        let start = Instant::now();
        let run_id = db.create_run(Some("refresh"))?;
        info!("Starting refresh run {}", run_id);

        match Self::execute(db, config, provider, run_id).await {
            Ok(mut summary) => {
                summary.duration = start.elapsed();
                info!(
                    "Refresh run {} complete: {} processed, {} failed, {} indicators",
                    run_id,
                    summary.symbols_processed,
                    summary.symbols_failed,
                    summary.indicators_written
                );
                Ok(summary)
            }
            Err(err) => {
                // Close the ledger before surfacing a mid-refresh failure;
                // fetch_log already holds the per-symbol truth.
                let _ = db.finish_run(run_id, RunStatus::Error, 0, 0);
                Err(err)
            }
        }
    }

    async fn execute(
        db: &Db,
        config: &Config,
        provider: Arc<dyn DailyBarsProvider>,
        run_id: i64,
    ) -> Result<RefreshSummary> {
        let active = db.list_active_symbols()?;
        if active.is_empty() {
            return Err(AppError::Validation(
                "no active symbols in universe".into(),
            ));
        }
        let symbols: Vec<String> = active.iter().map(|s| s.symbol.clone()).collect();

        let scheduler = Scheduler::new(provider, config.fetcher.max_workers);
        let mut results = scheduler
            .fetch_symbols_with_deadline(&symbols, OutputSize::Compact, REFRESH_DEADLINE)
            .await?;
        results.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        let mut processed: i64 = 0;
        let mut failed: i64 = 0;

        for result in &results {
            let document = if result.success { result.data.as_ref() } else { None };
            match document {
                Some(doc) => match Self::bars_from_document(&result.symbol, doc) {
                    Ok(prices) => {
                        db.upsert_prices(&prices)?;
                        db.log_fetch(&FetchLog {
                            run_id,
                            symbol: result.symbol.clone(),
                            from_dt: prices.first().map(|p| p.date.clone()),
                            to_dt: prices.last().map(|p| p.date.clone()),
                            rows: prices.len() as i64,
                            ok: true,
                            msg: None,
                            fetched_at: String::new(),
                        })?;
                        processed += 1;
                        info!("Stored {} prices for {}", prices.len(), result.symbol);
                    }
                    Err(err) => {
                        failed += 1;
                        warn!("Rejected document for {}: {}", result.symbol, err);
                        db.log_fetch(&FetchLog {
                            run_id,
                            symbol: result.symbol.clone(),
                            from_dt: None,
                            to_dt: None,
                            rows: 0,
                            ok: false,
                            msg: Some(err.to_string()),
                            fetched_at: String::new(),
                        })?;
                    }
                },
                None => {
                    failed += 1;
                    let msg = result
                        .error
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "fetch failed".to_string());
                    warn!("Fetch failed for {}: {}", result.symbol, msg);
                    db.log_fetch(&FetchLog {
                        run_id,
                        symbol: result.symbol.clone(),
                        from_dt: None,
                        to_dt: None,
                        rows: 0,
                        ok: false,
                        msg: Some(msg),
                        fetched_at: String::new(),
                    })?;
                }
            }
        }

        let computed = Self::compute_indicators(db, config, &symbols)?;
        let ranked = Self::rank(config, &computed)?;

        let rows: Vec<_> = ranked.iter().map(IndicatorSet::to_row).collect();
        db.upsert_indicators(&rows)?;

        let status = if failed == 0 {
            RunStatus::Ok
        } else {
            RunStatus::Error
        };
        db.finish_run(run_id, status, processed, failed)?;

        Ok(RefreshSummary {
            run_id,
            symbols_processed: processed,
            symbols_failed: failed,
            indicators_written: rows.len(),
            duration: Duration::ZERO,
        })
    }

    /// Parse and validate every bar of a provider document. Any bad bar
    /// rejects the whole document, keeping per-symbol persistence
    /// all-or-nothing.
    fn bars_from_document(symbol: &str, document: &DailyAdjusted) -> Result<Vec<Price>> {
        let mut prices = Vec::with_capacity(document.time_series.len());
        for (date, bar) in &document.time_series {
            let price = parse_bar(symbol, date, bar)?;
            validate_price(&price)?;
            prices.push(price);
        }
        Ok(prices)
    }

    /// Run the calculator over every active symbol's stored series.
    /// Symbols without enough history are skipped, not failed.
    fn compute_indicators(
        db: &Db,
        config: &Config,
        symbols: &[String],
    ) -> Result<Vec<IndicatorSet>> {
        let calculator = IndicatorCalculator::new(
            LookbackWindows {
                r1m: config.lookbacks.r1m,
                r3m: config.lookbacks.r3m,
                r6m: config.lookbacks.r6m,
                r12m: config.lookbacks.r12m,
            },
            VolWindows {
                short: config.vol_windows.short,
                long: config.vol_windows.long,
            },
        );

        let mut computed = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let rows = db.prices_for(symbol)?;
            if rows.is_empty() {
                debug!("No price history for {}", symbol);
                continue;
            }
            let bars: Vec<PriceBar> = match rows.iter().map(PriceBar::try_from).collect() {
                Ok(bars) => bars,
                Err(err) => {
                    debug!("Skipping {}: {}", symbol, err);
                    continue;
                }
            };
            match calculator.compute(symbol, &bars) {
                Ok(set) => computed.push(set),
                Err(err) => debug!("Skipping {}: {}", symbol, err),
            }
        }
        Ok(computed)
    }

    /// Score and rank; an empty post-filter universe yields zero
    /// indicators rather than a failed refresh.
    fn rank(config: &Config, computed: &[IndicatorSet]) -> Result<Vec<IndicatorSet>> {
        let scorer = Scorer::new(ScoringConfig {
            penalty_lambda: config.scoring.penalty_lambda,
            min_adv: config.scoring.min_adv_usd,
            breadth_min_positive: config.scoring.breadth_min_positive,
            breadth_total: config.scoring.breadth_total_lookbacks,
        });

        match scorer.score_and_rank(computed) {
            Ok(ranked) => Ok(ranked),
            Err(AppError::NoSurvivors) => {
                warn!("No symbols passed filtering criteria; writing no indicators");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

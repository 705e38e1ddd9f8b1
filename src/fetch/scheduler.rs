//! Concurrent fetch scheduling
//!
//! A bounded pool of workers drains a closed task queue through the shared
//! provider client. Results are collected without loss: every submitted
//! symbol yields exactly one FetchResult, cancelled tasks included.

use crate::error::{AppError, Result};
use crate::fetch::alphavantage::{DailyAdjusted, DailyBarsProvider, OutputSize};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A unit of fetch work
#[derive(Debug, Clone)]
pub struct FetchTask {
    pub symbol: String,
    pub output_size: OutputSize,
}

/// Outcome of one symbol fetch. On success the parsed document rides along
/// so the provider is invoked at most once per symbol per refresh.
#[derive(Debug)]
pub struct FetchResult {
    pub symbol: String,
    pub success: bool,
    pub error: Option<AppError>,
    pub data: Option<DailyAdjusted>,
    pub records_fetched: usize,
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
}

/// Fetch scheduler running up to `max_workers` concurrent requests
pub struct Scheduler {
    provider: Arc<dyn DailyBarsProvider>,
    max_workers: usize,
}

impl Scheduler {
    pub fn new(provider: Arc<dyn DailyBarsProvider>, max_workers: usize) -> Self {
        Self {
            provider,
            max_workers: max_workers.max(1),
        }
    }

    /// Fetch all symbols concurrently, observing the cancellation token.
    /// Workers that see cancellation stop issuing requests and emit a
    /// cancelled result for each remaining task.
    pub async fn fetch_symbols(
        &self,
        symbols: &[String],
        output_size: OutputSize,
        cancel: CancellationToken,
    ) -> Result<Vec<FetchResult>> {
        if symbols.is_empty() {
            return Err(AppError::Validation("no symbols provided".into()));
        }

        let (task_tx, task_rx) = mpsc::channel(symbols.len());
        for symbol in symbols {
            // Capacity equals the task count, so this never blocks.
            task_tx
                .send(FetchTask {
                    symbol: symbol.clone(),
                    output_size,
                })
                .await
                .map_err(|_| AppError::Cancelled)?;
        }
        drop(task_tx);
        let task_rx = Arc::new(tokio::sync::Mutex::new(task_rx));

        let worker_count = self.max_workers.min(symbols.len());
        let (result_tx, mut result_rx) = mpsc::channel(symbols.len());
        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            workers.push(tokio::spawn(worker_loop(
                Arc::clone(&self.provider),
                Arc::clone(&task_rx),
                result_tx.clone(),
                cancel.clone(),
            )));
        }
        drop(result_tx);

        let mut results = Vec::with_capacity(symbols.len());
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }
        for worker in workers {
            let _ = worker.await;
        }

        Ok(results)
    }

    /// Fetch with a refresh-wide deadline after which outstanding work is
    /// cancelled.
    pub async fn fetch_symbols_with_deadline(
        &self,
        symbols: &[String],
        output_size: OutputSize,
        deadline: Duration,
    ) -> Result<Vec<FetchResult>> {
        let cancel = CancellationToken::new();
        let timer = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                cancel.cancel();
            })
        };

        let results = self.fetch_symbols(symbols, output_size, cancel).await;
        timer.abort();
        results
    }
}

async fn worker_loop(
    provider: Arc<dyn DailyBarsProvider>,
    task_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<FetchTask>>>,
    result_tx: mpsc::Sender<FetchResult>,
    cancel: CancellationToken,
) {
    loop {
        // The queue is closed before workers start, so recv never waits on
        // a producer; the lock is held only for the dequeue itself.
        let task = {
            let mut rx = task_rx.lock().await;
            rx.recv().await
        };
        let Some(task) = task else { break };

        if cancel.is_cancelled() {
            let _ = result_tx.send(cancelled_result(&task)).await;
            continue;
        }

        let start = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            fetched = provider.fetch_daily_adjusted(&task.symbol, task.output_size) => fetched,
        };
        let duration = start.elapsed();

        let result = match outcome {
            Ok(data) => FetchResult {
                symbol: task.symbol.clone(),
                success: true,
                error: None,
                records_fetched: data.time_series.len(),
                data: Some(data),
                duration,
                timestamp: Utc::now(),
            },
            Err(error) => FetchResult {
                symbol: task.symbol.clone(),
                success: false,
                error: Some(error),
                data: None,
                records_fetched: 0,
                duration,
                timestamp: Utc::now(),
            },
        };
        let _ = result_tx.send(result).await;
    }
}

fn cancelled_result(task: &FetchTask) -> FetchResult {
    FetchResult {
        symbol: task.symbol.clone(),
        success: false,
        error: Some(AppError::Cancelled),
        data: None,
        records_fetched: 0,
        duration: Duration::ZERO,
        timestamp: Utc::now(),
    }
}

/// Order symbols so that never-fetched ones come first and older fetches
/// precede newer ones. Stable for equal timestamps.
pub fn prioritize_fetch_order(
    symbols: &[String],
    last_fetched: &HashMap<String, DateTime<Utc>>,
) -> Vec<String> {
    let mut ordered: Vec<&String> = symbols.iter().collect();
    ordered.sort_by_key(|symbol| last_fetched.get(*symbol).copied());
    ordered.into_iter().cloned().collect()
}

/// Coarse wall-time estimate at ~2 seconds per symbol, parallelized.
pub fn estimate_fetch_time(symbol_count: usize, max_workers: usize) -> Duration {
    if symbol_count == 0 || max_workers == 0 {
        return Duration::ZERO;
    }
    let batches = symbol_count.div_ceil(max_workers);
    Duration::from_secs(batches as u64 * 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::collections::BTreeMap;

    use crate::fetch::alphavantage::DailyBar;

    fn stub_bar(close: f64) -> DailyBar {
        DailyBar {
            open: format!("{close}"),
            high: format!("{}", close + 1.0),
            low: format!("{}", close - 1.0),
            close: format!("{close}"),
            adjusted_close: format!("{close}"),
            volume: "1000000".to_string(),
            dividend_amount: "0.0".to_string(),
            split_coefficient: "1.0".to_string(),
        }
    }

    fn stub_document(days: usize) -> DailyAdjusted {
        let mut series = BTreeMap::new();
        for day in 0..days {
            series.insert(format!("2024-01-{:02}", day + 2), stub_bar(100.0 + day as f64));
        }
        DailyAdjusted {
            time_series: series,
            ..Default::default()
        }
    }

    /// Provider that fails for configured symbols and succeeds otherwise
    struct StubProvider {
        fail: Vec<String>,
        days: usize,
    }

    #[async_trait]
    impl DailyBarsProvider for StubProvider {
        async fn fetch_daily_adjusted(
            &self,
            symbol: &str,
            _output_size: OutputSize,
        ) -> crate::error::Result<DailyAdjusted> {
            if self.fail.iter().any(|s| s == symbol) {
                return Err(AppError::ProviderThrottle {
                    symbol: symbol.to_string(),
                    message: "simulated throttle".to_string(),
                });
            }
            Ok(stub_document(self.days))
        }
    }

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn collects_one_result_per_symbol() {
        let provider = Arc::new(StubProvider {
            fail: vec!["QQQ".to_string()],
            days: 5,
        });
        let scheduler = Scheduler::new(provider, 3);

        let mut results = scheduler
            .fetch_symbols(
                &symbols(&["SPY", "QQQ", "IWM"]),
                OutputSize::Compact,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        results.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        assert_eq!(results.len(), 3);
        let ok_count = results.iter().filter(|r| r.success).count();
        assert_eq!(ok_count, 2);

        let failed = results.iter().find(|r| !r.success).unwrap();
        assert_eq!(failed.symbol, "QQQ");
        assert!(matches!(
            failed.error,
            Some(AppError::ProviderThrottle { .. })
        ));
        assert!(failed.data.is_none());

        let succeeded = results.iter().find(|r| r.symbol == "SPY").unwrap();
        assert_eq!(succeeded.records_fetched, 5);
        assert!(succeeded.data.is_some());
    }

    #[tokio::test]
    async fn empty_symbol_list_is_an_error() {
        let scheduler = Scheduler::new(Arc::new(StubProvider { fail: vec![], days: 1 }), 2);
        let err = scheduler
            .fetch_symbols(&[], OutputSize::Compact, CancellationToken::new())
            .await;
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn cancelled_token_yields_cancelled_results() {
        let scheduler = Scheduler::new(Arc::new(StubProvider { fail: vec![], days: 1 }), 2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let results = scheduler
            .fetch_symbols(&symbols(&["SPY", "QQQ", "IWM"]), OutputSize::Compact, cancel)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        for result in &results {
            assert!(!result.success);
            assert!(matches!(result.error, Some(AppError::Cancelled)));
            assert!(result.data.is_none());
        }
    }

    #[test]
    fn prioritize_puts_never_fetched_first_then_oldest() {
        let now = Utc::now();
        let mut last_fetched = HashMap::new();
        last_fetched.insert("SPY".to_string(), now);
        last_fetched.insert("QQQ".to_string(), now - ChronoDuration::days(3));

        let ordered = prioritize_fetch_order(
            &symbols(&["SPY", "QQQ", "IWM", "DIA"]),
            &last_fetched,
        );
        assert_eq!(ordered, symbols(&["IWM", "DIA", "QQQ", "SPY"]));
    }

    #[test]
    fn prioritize_is_stable_for_equal_timestamps() {
        let now = Utc::now();
        let mut last_fetched = HashMap::new();
        for ticker in ["SPY", "QQQ", "IWM"] {
            last_fetched.insert(ticker.to_string(), now);
        }

        let ordered = prioritize_fetch_order(&symbols(&["SPY", "QQQ", "IWM"]), &last_fetched);
        assert_eq!(ordered, symbols(&["SPY", "QQQ", "IWM"]));
    }

    #[test]
    fn estimate_parallelizes_across_workers() {
        assert_eq!(estimate_fetch_time(0, 5), Duration::ZERO);
        assert_eq!(estimate_fetch_time(5, 5), Duration::from_secs(2));
        assert_eq!(estimate_fetch_time(10, 5), Duration::from_secs(4));
        assert_eq!(estimate_fetch_time(11, 5), Duration::from_secs(6));
        assert_eq!(estimate_fetch_time(3, 1), Duration::from_secs(6));
    }
}

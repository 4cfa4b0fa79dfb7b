use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

use crate::average::AveragePriceResult;
use crate::config::AppConfig;
use crate::error::{Result, SymbolError};
use crate::fetch::{ensure_concurrency_limit, QuoteFetcher};
use crate::sink::OutputSink;
use crate::utils::DateWindow;

/// A symbol that did not make it to the output file, and why.
#[derive(Debug)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: SymbolError,
}

/// Everything a run produced, in completion order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub completed: Vec<AveragePriceResult>,
    pub failures: Vec<SymbolFailure>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.completed.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure_for(&self, symbol: &str) -> Option<&SymbolError> {
        self.failures
            .iter()
            .find(|failure| failure.symbol == symbol)
            .map(|failure| &failure.error)
    }

    pub fn result_for(&self, symbol: &str) -> Option<&AveragePriceResult> {
        self.completed.iter().find(|result| result.symbol == symbol)
    }
}

/// Fans one unit of work out per symbol and waits for all of them.
///
/// Each unit fetches, averages and appends strictly in that order. Units
/// share the fetcher's HTTP client and the sink; nothing else is shared
/// apart from the progress counter.
pub struct FetchOrchestrator {
    fetcher: Arc<QuoteFetcher>,
    concurrency_limit: Option<usize>,
    deadline: Option<Duration>,
    progress_counter: Arc<AtomicUsize>,
}

impl FetchOrchestrator {
    pub fn new(fetcher: QuoteFetcher) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            concurrency_limit: None,
            deadline: None,
            progress_counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut orchestrator = Self::new(QuoteFetcher::from_config(config)?);
        if let Some(limit) = config.concurrency_limit {
            orchestrator = orchestrator.with_concurrency_limit(limit);
        }
        if let Some(deadline) = config.deadline {
            orchestrator = orchestrator.with_deadline(deadline);
        }
        Ok(orchestrator)
    }

    /// Cap the number of requests in flight at once.
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(ensure_concurrency_limit(limit));
        self
    }

    /// Abandon requests still outstanding `deadline` after the run starts.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Units settled so far in the current run.
    pub fn completed(&self) -> usize {
        self.progress_counter.load(Ordering::SeqCst)
    }

    pub async fn run(
        &self,
        symbols: &[String],
        window: &DateWindow,
        sink: Arc<OutputSink>,
    ) -> RunReport {
        self.progress_counter.store(0, Ordering::SeqCst);

        let semaphore = self
            .concurrency_limit
            .map(|limit| Arc::new(Semaphore::new(limit)));
        let deadline = self.deadline.map(|deadline| Instant::now() + deadline);

        let mut units = JoinSet::new();
        for symbol in symbols {
            let symbol = symbol.clone();
            let window = *window;
            let fetcher = Arc::clone(&self.fetcher);
            let sink = Arc::clone(&sink);
            let semaphore = semaphore.clone();
            let progress_counter = Arc::clone(&self.progress_counter);

            units.spawn(async move {
                let unit = process_symbol(&fetcher, &symbol, &window, &sink, semaphore, deadline);
                let outcome = AssertUnwindSafe(unit)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(SymbolError::Panicked(panic_message(panic))));

                progress_counter.fetch_add(1, Ordering::SeqCst);
                (symbol, outcome)
            });
        }

        let mut report = RunReport::default();
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((symbol, Ok(result))) => {
                    log::info!(
                        "Average price for {}: {} ({} days)",
                        symbol,
                        result.average,
                        result.days
                    );
                    report.completed.push(result);
                }
                Ok((symbol, Err(error))) => {
                    if error.is_insufficient_data() {
                        log::warn!("Not enough data for {symbol}");
                    } else {
                        log::warn!("Failed to process {symbol}: {error}");
                    }
                    report.failures.push(SymbolFailure { symbol, error });
                }
                Err(err) => log::error!("Fetch unit ended without a result: {err}"),
            }
        }

        report
    }
}

async fn process_symbol(
    fetcher: &QuoteFetcher,
    symbol: &str,
    window: &DateWindow,
    sink: &OutputSink,
    semaphore: Option<Arc<Semaphore>>,
    deadline: Option<Instant>,
) -> std::result::Result<AveragePriceResult, SymbolError> {
    let fetch = async {
        // The permit only spans the request; averaging and writing do not count.
        let _permit = match &semaphore {
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };
        fetcher.fetch(symbol, window).await
    };

    let series = match deadline {
        Some(at) => timeout_at(at, fetch)
            .await
            .map_err(|_| SymbolError::TimedOut)??,
        None => fetch.await?,
    };

    let (high, low) = series.high_low();
    let result = AveragePriceResult::from_series(symbol, high, low)?;

    sink.append(&result.sink_line()).await?;
    Ok(result)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_panic_messages() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7_u8)), "unknown panic payload");
    }

    #[test]
    fn report_lookups() {
        let report = RunReport {
            completed: vec![AveragePriceResult {
                symbol: "AAPL".into(),
                average: 102.5,
                days: 2,
            }],
            failures: vec![SymbolFailure {
                symbol: "FAKE".into(),
                error: SymbolError::TimedOut,
            }],
        };

        assert_eq!(report.total(), 2);
        assert!(!report.is_clean());
        assert!(report.result_for("AAPL").is_some());
        assert!(matches!(report.failure_for("FAKE"), Some(SymbolError::TimedOut)));
        assert!(report.failure_for("AAPL").is_none());
    }
}

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use candle_average::cli::{self, Cli};
use candle_average::config::AppConfig;
use candle_average::orchestrator::FetchOrchestrator;
use candle_average::sink::OutputSink;
use candle_average::tickers::load_tickers;
use candle_average::utils::DateWindow;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), cli.overrides())
        .context("Failed to load configuration")?;

    let tickers = load_tickers(&config.input_path).context("Failed to load ticker list")?;
    if tickers.is_empty() {
        log::warn!("Ticker list {} is empty", config.input_path.display());
        return Ok(());
    }

    let window = DateWindow::trailing_from_today();
    cli::show_banner(&window);

    let orchestrator =
        FetchOrchestrator::from_config(&config).context("Failed to prepare quote fetcher")?;
    let sink = Arc::new(OutputSink::new(&config.output_path));

    log::info!(
        "Fetching {} symbols from {} to {}",
        tickers.len(),
        window.start_param(),
        window.end_param()
    );
    let report = orchestrator.run(&tickers, &window, Arc::clone(&sink)).await;

    println!(
        "Finished: {} of {} symbols written to {}",
        report.completed.len(),
        report.total(),
        sink.path().display()
    );
    for failure in &report.failures {
        println!("  {}: {}", failure.symbol, failure.error);
    }

    Ok(())
}

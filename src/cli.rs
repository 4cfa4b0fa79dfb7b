use std::path::PathBuf;

use clap::Parser;

use crate::config::ConfigOverrides;
use crate::utils::{current_human_timestamp, DateWindow};

#[derive(Debug, Parser)]
#[command(name = "candle-average")]
#[command(about = "Fetch daily candles for a ticker list and record each symbol's average midpoint price")]
#[command(version)]
pub struct Cli {
    /// Optional JSON settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Ticker list, one symbol per line
    #[arg(short, long)]
    pub tickers: Option<PathBuf>,

    /// File the `symbol:average` lines are appended to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Market data API token (defaults to $MARKETDATA_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Market data API root, e.g. https://api.marketdata.app
    #[arg(long)]
    pub base_url: Option<String>,

    /// Maximum requests in flight; unbounded when omitted
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Give up on unfinished symbols after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Per-request HTTP timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_token: self.token.clone(),
            input_path: self.tickers.clone(),
            output_path: self.output.clone(),
            base_url: self.base_url.clone(),
            concurrency_limit: self.concurrency,
            deadline_secs: self.deadline_secs,
            request_timeout_secs: self.timeout_secs,
        }
    }
}

pub fn show_banner(window: &DateWindow) {
    println!("# ------------------------------------------------------------------------ #");
    println!("# Candle Average");
    println!("# Executing date: {}", current_human_timestamp());
    println!("# Start Date: {}", window.start_param());
    println!("# End Date: {}", window.end_param());
    println!("# ------------------------------------------------------------------------ #");
    println!();
}

pub mod average;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod sink;
pub mod tickers;
pub mod utils;

pub use error::{AppError, Result};

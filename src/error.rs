use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

/// Process-level failures: anything that stops a run before the fan-out starts.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }
}

/// Outcome of a single candle request that did not produce usable prices.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed with status {0}")]
    HttpStatus(u16),
    /// Built with the request URL stripped, so the token never reaches logs.
    #[error("request could not be completed: {0}")]
    Transport(reqwest::Error),
    #[error("response body could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("not enough data for {0}")]
    InsufficientData(String),
    #[error("symbol `{0}` cannot be placed in a request URL")]
    InvalidSymbol(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AverageError {
    #[error("cannot average an empty price series")]
    EmptyInput,
    #[error("high/low series differ in length ({high} vs {low})")]
    LengthMismatch { high: usize, low: usize },
}

/// Per-symbol failure recorded by the orchestrator. Never fatal to the batch.
#[derive(Debug, Error)]
pub enum SymbolError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Average(#[from] AverageError),
    #[error("failed to write result: {0}")]
    Io(#[from] std::io::Error),
    #[error("abandoned after the run deadline elapsed")]
    TimedOut,
    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl SymbolError {
    /// True when the vendor answered but had nothing usable for the symbol.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, SymbolError::Fetch(FetchError::InsufficientData(_)))
    }
}

use std::fs;
use std::path::Path;

use crate::error::{Context, Result};

/// Read one ticker symbol per line, keeping file order.
pub fn load_tickers(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read ticker list at {}", path.display()))?;

    Ok(parse_tickers(&contents))
}

pub fn parse_tickers(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_string())
        .collect()
}

use crate::error::AverageError;

/// Mean of the daily midpoints `(high[i] + low[i]) / 2`.
pub fn average_midpoint(high: &[f64], low: &[f64]) -> Result<f64, AverageError> {
    if high.len() != low.len() {
        return Err(AverageError::LengthMismatch {
            high: high.len(),
            low: low.len(),
        });
    }
    if high.is_empty() {
        return Err(AverageError::EmptyInput);
    }

    let total: f64 = high
        .iter()
        .zip(low)
        .map(|(h, l)| (h + l) / 2.0)
        .sum();

    Ok(total / high.len() as f64)
}

/// Average midpoint price derived for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct AveragePriceResult {
    pub symbol: String,
    pub average: f64,
    pub days: usize,
}

impl AveragePriceResult {
    pub fn from_series(symbol: &str, high: &[f64], low: &[f64]) -> Result<Self, AverageError> {
        let average = average_midpoint(high, low)?;
        Ok(Self {
            symbol: symbol.to_string(),
            average,
            days: high.len(),
        })
    }

    /// The line persisted to the output sink, without the trailing newline.
    pub fn sink_line(&self) -> String {
        format!("{}:{}", self.symbol, self.average)
    }
}

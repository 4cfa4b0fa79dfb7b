use serde::Deserialize;

/// Vendor status flag carried in the `s` field of every candle response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    Ok,
    NoData,
    Error,
    #[serde(other)]
    Unknown,
}

/// Daily candles for one symbol, decoded straight from the vendor payload.
///
/// Price and volume arrays are index-aligned by trading day. They are only
/// meaningful when `status` is [`SeriesStatus::Ok`]; the vendor omits them
/// for `no_data` and `error` answers.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceSeries {
    #[serde(rename = "s")]
    pub status: SeriesStatus,
    #[serde(rename = "c")]
    pub close: Option<Vec<f64>>,
    #[serde(rename = "h")]
    pub high: Option<Vec<f64>>,
    #[serde(rename = "l")]
    pub low: Option<Vec<f64>>,
    #[serde(rename = "o")]
    pub open: Option<Vec<f64>>,
    #[serde(rename = "t")]
    pub timestamps: Option<Vec<i64>>,
    #[serde(rename = "v")]
    pub volume: Option<Vec<u64>>,
    pub errmsg: Option<String>,
    #[serde(rename = "nextTime")]
    pub next_time: Option<i64>,
    #[serde(rename = "prevTime")]
    pub prev_time: Option<i64>,
}

impl PriceSeries {
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    pub fn is_ok(&self) -> bool {
        self.status == SeriesStatus::Ok
    }

    /// High and low slices, present only when the series can be averaged.
    pub fn midpoint_inputs(&self) -> Option<(&[f64], &[f64])> {
        if !self.is_ok() {
            return None;
        }

        let high = self.high.as_deref()?;
        let low = self.low.as_deref()?;
        if high.is_empty() || low.is_empty() {
            return None;
        }

        Some((high, low))
    }

    pub fn trading_days(&self) -> usize {
        self.high.as_ref().map_or(0, Vec::len)
    }

    /// Human-readable reason the series carries no prices, for log output.
    pub fn absence_reason(&self) -> String {
        match self.status {
            SeriesStatus::Ok => "empty high/low series".to_string(),
            SeriesStatus::NoData => match (self.prev_time, self.next_time) {
                (Some(prev), _) => format!("no data in range, previous candle at {prev}"),
                (None, Some(next)) => format!("no data in range, next candle at {next}"),
                (None, None) => "no data in range".to_string(),
            },
            SeriesStatus::Error => match &self.errmsg {
                Some(msg) => format!("vendor error: {msg}"),
                None => "vendor error".to_string(),
            },
            SeriesStatus::Unknown => "unrecognised status".to_string(),
        }
    }
}

/// A [`PriceSeries`] known to carry non-empty high and low prices.
#[derive(Debug, Clone)]
pub struct UsableSeries {
    series: PriceSeries,
}

impl UsableSeries {
    /// Hands the series back unchanged when it cannot be averaged.
    pub fn new(series: PriceSeries) -> Result<Self, PriceSeries> {
        if series.midpoint_inputs().is_some() {
            Ok(Self { series })
        } else {
            Err(series)
        }
    }

    pub fn high_low(&self) -> (&[f64], &[f64]) {
        (
            self.series.high.as_deref().unwrap_or_default(),
            self.series.low.as_deref().unwrap_or_default(),
        )
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_candle_payload() {
        let sample = r#"{
            "s": "ok",
            "c": [217.68, 221.03],
            "h": [222.49, 221.5],
            "l": [217.19, 218.05],
            "o": [221.03, 218.55],
            "t": [1569297600, 1569384000],
            "v": [33463820, 24018876]
        }"#;

        let series = PriceSeries::from_json(sample).unwrap();

        assert_eq!(series.status, SeriesStatus::Ok);
        assert_eq!(series.trading_days(), 2);
        assert_eq!(series.timestamps.as_deref(), Some(&[1569297600, 1569384000][..]));
        let (high, low) = series.midpoint_inputs().expect("usable series");
        assert!((high[0] - 222.49).abs() < 1e-9);
        assert!((low[1] - 218.05).abs() < 1e-9);
    }

    #[test]
    fn no_data_payload_has_no_midpoint_inputs() {
        let sample = r#"{"s": "no_data", "nextTime": 1663704000}"#;

        let series = PriceSeries::from_json(sample).unwrap();

        assert_eq!(series.status, SeriesStatus::NoData);
        assert!(series.midpoint_inputs().is_none());
        assert!(series.absence_reason().contains("1663704000"));
    }

    #[test]
    fn ok_status_with_empty_arrays_is_unusable() {
        let sample = r#"{"s": "ok", "h": [], "l": []}"#;

        let series = PriceSeries::from_json(sample).unwrap();

        assert!(series.midpoint_inputs().is_none());
    }

    #[test]
    fn only_averageable_series_become_usable() {
        let usable = UsableSeries::new(
            PriceSeries::from_json(r#"{"s": "ok", "h": [105, 110], "l": [95, 100]}"#).unwrap(),
        )
        .expect("ok series with prices");
        let (high, low) = usable.high_low();
        assert_eq!(high, &[105.0, 110.0]);
        assert_eq!(low, &[95.0, 100.0]);
        assert_eq!(usable.series().trading_days(), 2);

        let rejected = UsableSeries::new(PriceSeries::from_json(r#"{"s": "no_data"}"#).unwrap())
            .expect_err("no_data has nothing to average");
        assert_eq!(rejected.status, SeriesStatus::NoData);
    }

    #[test]
    fn unexpected_status_string_decodes_as_unknown() {
        let series = PriceSeries::from_json(r#"{"s": "throttled"}"#).unwrap();
        assert_eq!(series.status, SeriesStatus::Unknown);
    }

    #[test]
    fn rejects_type_mismatch() {
        let err = PriceSeries::from_json(r#"{"s": "ok", "h": "high"}"#);
        assert!(err.is_err());
    }
}

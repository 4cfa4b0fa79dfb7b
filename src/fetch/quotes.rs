use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;

use crate::config::AppConfig;
use crate::error::{Context, FetchError, Result};
use crate::fetch::request::CandleEndpoint;
use crate::fetch::series::{PriceSeries, UsableSeries};
use crate::fetch::FetchResult;
use crate::utils::DateWindow;

/// Issues candle requests for single symbols over a pooled HTTP client.
///
/// The client is cheap to share: clones point at the same connection pool
/// and carry no per-request state.
#[derive(Debug, Clone)]
pub struct QuoteFetcher {
    client: Client,
    endpoint: CandleEndpoint,
}

impl QuoteFetcher {
    pub fn new(endpoint: CandleEndpoint, request_timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .context("Failed to construct HTTP client")?;

        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let endpoint = CandleEndpoint::from_config(config)?;
        Self::new(endpoint, config.request_timeout)
    }

    /// Fetch and decode the daily candles of `symbol` inside `window`.
    ///
    /// Only series with usable high/low prices come back; vendor
    /// `no_data`/`error` answers become [`FetchError::InsufficientData`].
    /// Transport errors are stripped of the request URL, which carries the
    /// API token.
    pub async fn fetch(&self, symbol: &str, window: &DateWindow) -> FetchResult<UsableSeries> {
        let url = self.endpoint.url_for(symbol, window)?;
        log::debug!("Requesting candles for {symbol}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.without_url()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|err| FetchError::Transport(err.without_url()))?;
        let series = PriceSeries::from_json(&body)?;

        UsableSeries::new(series).map_err(|series| {
            log::debug!("{symbol}: {}", series.absence_reason());
            FetchError::InsufficientData(symbol.to_string())
        })
    }
}

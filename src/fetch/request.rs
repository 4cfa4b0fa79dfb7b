use std::fmt;

use reqwest::Url;

use crate::config::AppConfig;
use crate::error::{AppError, FetchError, Result};
use crate::fetch::FetchResult;
use crate::utils::DateWindow;

const SAMPLE_SYMBOL: &str = "SAMPLE";

/// Everything needed to address the candles endpoint for any symbol.
#[derive(Clone)]
pub struct CandleEndpoint {
    base_url: String,
    path_template: String,
    resolution: String,
    api_token: String,
    segment_count: usize,
}

impl CandleEndpoint {
    /// Checks the template once up front so per-symbol rendering can only
    /// fail on the symbol itself.
    pub fn new(
        base_url: impl Into<String>,
        path_template: impl Into<String>,
        resolution: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self> {
        let mut endpoint = Self {
            base_url: base_url.into(),
            path_template: path_template.into(),
            resolution: resolution.into(),
            api_token: api_token.into(),
            segment_count: 0,
        };

        let sample = endpoint.render_path(SAMPLE_SYMBOL)?;
        let url = Url::parse(&sample).map_err(|err| {
            AppError::message(format!("Candle URL `{sample}` is not a valid URL: {err}"))
        })?;
        endpoint.segment_count = path_segment_count(&url).ok_or_else(|| {
            AppError::message(format!("Candle URL `{sample}` cannot carry a path"))
        })?;

        Ok(endpoint)
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.path_template.clone(),
            config.resolution.clone(),
            config.api_token.clone(),
        )
    }

    /// Full request URL: rendered path plus `from`, `to` and `token` query
    /// parameters.
    pub fn url_for(&self, symbol: &str, window: &DateWindow) -> FetchResult<Url> {
        if symbol.is_empty() || symbol.contains(['/', '?', '#']) {
            return Err(FetchError::InvalidSymbol(symbol.to_string()));
        }

        let rendered = self
            .render_path(symbol)
            .map_err(|_| FetchError::InvalidSymbol(symbol.to_string()))?;
        let mut url =
            Url::parse(&rendered).map_err(|_| FetchError::InvalidSymbol(symbol.to_string()))?;

        // Dot segments such as `..` or `%2e` are resolved away by the parser.
        if path_segment_count(&url) != Some(self.segment_count) {
            return Err(FetchError::InvalidSymbol(symbol.to_string()));
        }

        url.query_pairs_mut()
            .append_pair("from", &window.start_param())
            .append_pair("to", &window.end_param())
            .append_pair("token", &self.api_token);

        Ok(url)
    }

    fn render_path(&self, symbol: &str) -> Result<String> {
        render_template(
            &self.path_template,
            &[
                ("base_url", self.base_url.as_str()),
                ("resolution", self.resolution.as_str()),
                ("symbol", symbol),
            ],
        )
    }
}

impl fmt::Debug for CandleEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandleEndpoint")
            .field("base_url", &self.base_url)
            .field("path_template", &self.path_template)
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}

fn path_segment_count(url: &Url) -> Option<usize> {
    url.path_segments().map(Iterator::count)
}

fn render_template(template: &str, replacements: &[(&str, &str)]) -> Result<String> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '{' {
            let mut key = String::new();
            let mut closed = false;
            while let Some(&next) = chars.peek() {
                chars.next();
                if next == '}' {
                    closed = true;
                    break;
                }
                key.push(next);
            }

            if !closed {
                return Err(AppError::message(format!(
                    "Unterminated placeholder in template: {{{key}"
                )));
            }

            if key.is_empty() {
                return Err(AppError::message(
                    "Encountered empty placeholder `{}` in template",
                ));
            }

            let value = replacements
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| *value)
                .ok_or_else(|| {
                    AppError::message(format!(
                        "No replacement provided for placeholder `{}` in template",
                        key
                    ))
                })?;
            result.push_str(value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, Context, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.marketdata.app";
pub const DEFAULT_PATH_TEMPLATE: &str = "{base_url}/v1/stocks/candles/{resolution}/{symbol}/";
pub const DEFAULT_RESOLUTION: &str = "D";
pub const DEFAULT_INPUT_PATH: &str = "ticker.txt";
pub const DEFAULT_OUTPUT_PATH: &str = "average_prices.txt";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const TOKEN_ENV_VAR: &str = "MARKETDATA_TOKEN";

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_token: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub base_url: String,
    pub path_template: String,
    pub resolution: String,
    /// `None` spawns every symbol at once.
    pub concurrency_limit: Option<usize>,
    pub deadline: Option<Duration>,
    pub request_timeout: Duration,
}

/// Optional JSON settings file. Every field may be omitted, and string
/// values may reference the environment with `${NAME}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_token: Option<String>,
    pub input_path: Option<String>,
    pub output_path: Option<String>,
    pub base_url: Option<String>,
    pub path_template: Option<String>,
    pub resolution: Option<String>,
    pub concurrency_limit: Option<usize>,
    pub deadline_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

/// Values supplied on the command line; they win over every other source.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub api_token: Option<String>,
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub concurrency_limit: Option<usize>,
    pub deadline_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let search_paths = vec![
            path.to_path_buf(),
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|p| p.join(path)))
                .unwrap_or_else(|| path.to_path_buf()),
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf()),
        ];

        let mut last_error = None;

        for search_path in search_paths {
            match std::fs::read_to_string(&search_path) {
                Ok(content) => {
                    let raw: FileConfig = serde_json::from_str(&content).with_context(|| {
                        format!("Failed to parse config JSON at {}", search_path.display())
                    })?;
                    log::debug!("Loaded configuration from {}", search_path.display());
                    return raw.expand(|name| std::env::var(name).ok());
                }
                Err(e) => {
                    last_error = Some(format!("Failed to read {}: {}", search_path.display(), e));
                }
            }
        }

        Err(AppError::message(format!(
            "Could not find config file. Last error: {}",
            last_error.unwrap_or_else(|| "No search paths".to_string())
        )))
    }

    fn expand<F>(self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expand = |value: Option<String>| -> Result<Option<String>> {
            value.map(|v| expand_env_vars(&v, &lookup)).transpose()
        };

        Ok(Self {
            api_token: expand(self.api_token)?,
            input_path: expand(self.input_path)?,
            output_path: expand(self.output_path)?,
            base_url: expand(self.base_url)?,
            path_template: self.path_template,
            resolution: expand(self.resolution)?,
            concurrency_limit: self.concurrency_limit,
            deadline_secs: self.deadline_secs,
            request_timeout_secs: self.request_timeout_secs,
        })
    }
}

impl AppConfig {
    /// Layer defaults, the optional config file, the environment and the
    /// command line, in increasing priority.
    pub fn load(config_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let file = match config_path {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let env_token = std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|token| !token.trim().is_empty());

        Self::resolve(file, env_token, overrides)
    }

    pub fn resolve(
        file: FileConfig,
        env_token: Option<String>,
        overrides: ConfigOverrides,
    ) -> Result<Self> {
        let api_token = overrides
            .api_token
            .or(env_token)
            .or(file.api_token)
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                AppError::message(format!(
                    "No API token configured; set {TOKEN_ENV_VAR} or pass --token"
                ))
            })?;

        let input_path = overrides
            .input_path
            .or_else(|| file.input_path.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_PATH));
        let output_path = overrides
            .output_path
            .or_else(|| file.output_path.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));

        let base_url = overrides
            .base_url
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AppError::message("base_url must not be empty"));
        }

        let path_template = file
            .path_template
            .unwrap_or_else(|| DEFAULT_PATH_TEMPLATE.to_string());
        if !path_template.contains("{symbol}") {
            return Err(AppError::message(
                "path_template must contain a `{symbol}` placeholder",
            ));
        }

        let resolution = file
            .resolution
            .unwrap_or_else(|| DEFAULT_RESOLUTION.to_string());

        let concurrency_limit = overrides.concurrency_limit.or(file.concurrency_limit);
        let deadline = overrides
            .deadline_secs
            .or(file.deadline_secs)
            .map(Duration::from_secs);
        let request_timeout = overrides
            .request_timeout_secs
            .or(file.request_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Ok(Self {
            api_token,
            input_path,
            output_path,
            base_url,
            path_template,
            resolution,
            concurrency_limit,
            deadline,
            request_timeout,
        })
    }
}

/// Replace every `${NAME}` in `value` using `lookup`.
pub fn expand_env_vars<F>(value: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut name = String::new();
            let mut closed = false;
            while let Some(&next) = chars.peek() {
                chars.next();
                if next == '}' {
                    closed = true;
                    break;
                }
                name.push(next);
            }

            if name.is_empty() {
                return Err(AppError::message(
                    "Encountered empty environment placeholder in config",
                ));
            }

            if !closed {
                return Err(AppError::message(
                    "Unterminated environment placeholder in config",
                ));
            }

            let value = lookup(&name).ok_or_else(|| {
                AppError::message(format!(
                    "Environment variable {} referenced by config is not set",
                    name
                ))
            })?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

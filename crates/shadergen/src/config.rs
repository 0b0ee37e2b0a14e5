use std::env;
use std::time::Duration;

use reqwest::Url;

/// Base URL used when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4000";

/// Environment variable overriding [`DEFAULT_ENDPOINT`].
pub const ENV_ENDPOINT: &str = "TEXT2SHADER_API";

/// Path appended to the endpoint for generation requests.
pub const GENERATE_PATH: &str = "api/generate-shader";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("shader service endpoint must not be empty")]
    EmptyEndpoint,
    #[error("invalid shader service endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    endpoint: Url,
    generate_url: Url,
    timeout: Duration,
}

impl GeneratorConfig {
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self, ConfigError> {
        let raw = endpoint.as_ref().trim();
        if raw.is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason,
        };

        let endpoint = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "unsupported scheme '{}', expected http or https",
                endpoint.scheme()
            )));
        }
        let generate_url = Url::parse(&format!(
            "{}/{GENERATE_PATH}",
            endpoint.as_str().trim_end_matches('/')
        ))
        .map_err(|err| invalid(err.to_string()))?;

        Ok(Self {
            endpoint,
            generate_url,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Reads [`ENV_ENDPOINT`], falling back to [`DEFAULT_ENDPOINT`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_value(env::var(ENV_ENDPOINT).ok())
    }

    pub(crate) fn from_value(value: Option<String>) -> Result<Self, ConfigError> {
        match value {
            Some(endpoint) if !endpoint.trim().is_empty() => Self::new(endpoint),
            _ => Self::new(DEFAULT_ENDPOINT),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn generate_url(&self) -> &Url {
        &self.generate_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

//! Environment-driven configuration.
//!
//! Values come from `INFRALENS_*` environment variables (a `.env` file is
//! loaded by the binary before resolution). Every resolver returns a
//! [`ConfigError`] keyed by the variable that failed, so misconfiguration is
//! reported against the knob the operator actually set.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::ConfigError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_EVENT_BUFFER: usize = 256;
const DEFAULT_DEADLINE_WINDOW_DAYS: i64 = 30;

// Latencies the mock backend ships with, matching the simulated inference
// delays of the original dashboard.
const DEFAULT_MOCK_PARSE_MS: u64 = 2000;
const DEFAULT_MOCK_RISK_MS: u64 = 1500;
const DEFAULT_MOCK_INSIGHTS_MS: u64 = 1000;
const DEFAULT_MOCK_COMPARE_MS: u64 = 2000;
const DEFAULT_MOCK_SEARCH_MS: u64 = 800;

pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "value is not valid UTF-8".to_string(),
        }),
    }
}

pub(crate) fn parse_u64_env(key: &str, default: u64) -> Result<u64, ConfigError> {
    match optional_env(key)? {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected an unsigned integer, got '{raw}'"),
        }),
        None => Ok(default),
    }
}

pub(crate) fn parse_i64_env(key: &str, default: i64) -> Result<i64, ConfigError> {
    match optional_env(key)? {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected an integer, got '{raw}'"),
        }),
        None => Ok(default),
    }
}

/// Which analysis backend the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyzerBackend {
    /// Fixture-returning backend with simulated latency.
    #[default]
    Mock,
    /// HTTP backend speaking the OpenAI-compatible analysis API.
    OpenAi,
}

impl AnalyzerBackend {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::InvalidValue {
                key: "INFRALENS_ANALYZER".to_string(),
                message: format!("unsupported backend '{other}' (expected 'mock' or 'openai')"),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::OpenAi => "openai",
        }
    }
}

/// Per-operation latencies for the mock backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockLatency {
    pub parse: Duration,
    pub risk: Duration,
    pub insights: Duration,
    pub compare: Duration,
    pub search: Duration,
}

impl Default for MockLatency {
    fn default() -> Self {
        Self {
            parse: Duration::from_millis(DEFAULT_MOCK_PARSE_MS),
            risk: Duration::from_millis(DEFAULT_MOCK_RISK_MS),
            insights: Duration::from_millis(DEFAULT_MOCK_INSIGHTS_MS),
            compare: Duration::from_millis(DEFAULT_MOCK_COMPARE_MS),
            search: Duration::from_millis(DEFAULT_MOCK_SEARCH_MS),
        }
    }
}

impl MockLatency {
    /// Zero latency everywhere. Tests use this to exercise the pipeline
    /// without waiting out the simulated inference delays.
    pub fn instant() -> Self {
        Self {
            parse: Duration::ZERO,
            risk: Duration::ZERO,
            insights: Duration::ZERO,
            compare: Duration::ZERO,
            search: Duration::ZERO,
        }
    }
}

/// Analysis backend configuration.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub backend: AnalyzerBackend,
    pub api_key: Option<SecretString>,
    pub base_url: Url,
    pub request_timeout: Duration,
    pub mock_latency: MockLatency,
}

impl AiConfig {
    pub fn resolve() -> Result<Self, ConfigError> {
        let backend = match optional_env("INFRALENS_ANALYZER")? {
            Some(raw) => AnalyzerBackend::from_str(&raw)?,
            None => AnalyzerBackend::default(),
        };

        let api_key = optional_env("INFRALENS_API_KEY")?.map(SecretString::from);
        if backend == AnalyzerBackend::OpenAi && api_key.is_none() {
            return Err(ConfigError::MissingValue {
                key: "INFRALENS_API_KEY".to_string(),
            });
        }

        let base_url_raw = optional_env("INFRALENS_BASE_URL")?
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base_url_raw).map_err(|e| ConfigError::InvalidValue {
            key: "INFRALENS_BASE_URL".to_string(),
            message: e.to_string(),
        })?;

        let request_timeout = Duration::from_secs(parse_u64_env(
            "INFRALENS_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        let defaults = MockLatency::default();
        let mock_latency = MockLatency {
            parse: Duration::from_millis(parse_u64_env(
                "INFRALENS_MOCK_PARSE_MS",
                defaults.parse.as_millis() as u64,
            )?),
            risk: Duration::from_millis(parse_u64_env(
                "INFRALENS_MOCK_RISK_MS",
                defaults.risk.as_millis() as u64,
            )?),
            insights: Duration::from_millis(parse_u64_env(
                "INFRALENS_MOCK_INSIGHTS_MS",
                defaults.insights.as_millis() as u64,
            )?),
            compare: Duration::from_millis(parse_u64_env(
                "INFRALENS_MOCK_COMPARE_MS",
                defaults.compare.as_millis() as u64,
            )?),
            search: Duration::from_millis(parse_u64_env(
                "INFRALENS_MOCK_SEARCH_MS",
                defaults.search.as_millis() as u64,
            )?),
        };

        Ok(Self {
            backend,
            api_key,
            base_url,
            request_timeout,
            mock_latency,
        })
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: AnalyzerBackend::Mock,
            api_key: None,
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            mock_latency: MockLatency::default(),
        }
    }
}

/// Service-level knobs: event fan-out and pipeline deadlines.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Capacity of the broadcast channel behind [`subscribe`].
    ///
    /// [`subscribe`]: crate::service::ContractService::subscribe
    pub event_buffer: usize,
    /// Deadline applied to each individual analyzer call.
    pub pipeline_timeout: Duration,
    /// How far ahead analytics looks for upcoming deadlines.
    pub deadline_window_days: i64,
}

impl ServiceConfig {
    pub fn resolve() -> Result<Self, ConfigError> {
        let event_buffer =
            parse_u64_env("INFRALENS_EVENT_BUFFER", DEFAULT_EVENT_BUFFER as u64)? as usize;
        if event_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INFRALENS_EVENT_BUFFER".to_string(),
                message: "event buffer must be at least 1".to_string(),
            });
        }

        let pipeline_timeout = Duration::from_secs(parse_u64_env(
            "INFRALENS_PIPELINE_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        let deadline_window_days = parse_i64_env(
            "INFRALENS_DEADLINE_WINDOW_DAYS",
            DEFAULT_DEADLINE_WINDOW_DAYS,
        )?;
        if deadline_window_days < 0 {
            return Err(ConfigError::InvalidValue {
                key: "INFRALENS_DEADLINE_WINDOW_DAYS".to_string(),
                message: "deadline window must not be negative".to_string(),
            });
        }

        Ok(Self {
            event_buffer,
            pipeline_timeout,
            deadline_window_days,
        })
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            event_buffer: DEFAULT_EVENT_BUFFER,
            pipeline_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            deadline_window_days: DEFAULT_DEADLINE_WINDOW_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AnalyzerBackend, MockLatency};
    use crate::error::ConfigError;

    #[test]
    fn backend_parses_known_names_case_insensitively() {
        assert_eq!(
            AnalyzerBackend::from_str("Mock").expect("mock"),
            AnalyzerBackend::Mock
        );
        assert_eq!(
            AnalyzerBackend::from_str("OPENAI").expect("openai"),
            AnalyzerBackend::OpenAi
        );
    }

    #[test]
    fn backend_rejects_unknown_names() {
        let err = AnalyzerBackend::from_str("bard").expect_err("must reject");
        let ConfigError::InvalidValue { key, message } = err else {
            panic!("expected InvalidValue");
        };
        assert_eq!(key, "INFRALENS_ANALYZER");
        assert!(message.contains("bard"), "unexpected message: {message}");
    }

    #[test]
    fn default_mock_latency_matches_simulated_inference_delays() {
        let latency = MockLatency::default();
        assert_eq!(latency.parse.as_millis(), 2000);
        assert_eq!(latency.risk.as_millis(), 1500);
        assert_eq!(latency.insights.as_millis(), 1000);
        assert_eq!(latency.compare.as_millis(), 2000);
        assert_eq!(latency.search.as_millis(), 800);
    }

    #[test]
    fn instant_latency_is_zero_everywhere() {
        let latency = MockLatency::instant();
        assert!(latency.parse.is_zero());
        assert!(latency.search.is_zero());
    }
}

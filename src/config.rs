//! Connection and executor configuration
//!
//! Both layers read from the environment. Per-instance overrides are
//! merged on top, so two clients in one process can point at different
//! endpoints without touching shared state.

use crate::error::{QueryError, Result};
use std::time::Duration;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Settings for the HTTP query service client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AthenaConfig {
    /// Base URL, e.g. `https://athena.eu-west-1.amazonaws.com`
    pub endpoint: String,
    pub region: String,
    /// Default workgroup when a request does not name one
    pub workgroup: Option<String>,
    /// Default output location when a request does not name one
    pub output_location: Option<String>,
    /// Sent as `Authorization: Bearer ...` when present
    pub auth_token: Option<String>,
    pub request_timeout: Duration,
}

/// Per-instance values layered over an [`AthenaConfig`]
#[derive(Debug, Clone, Default)]
pub struct AthenaOverrides {
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub workgroup: Option<String>,
    pub output_location: Option<String>,
    pub auth_token: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl AthenaConfig {
    pub fn for_region(region: impl Into<String>) -> Self {
        let region = region.into();
        Self {
            endpoint: default_endpoint(&region),
            region,
            workgroup: None,
            output_location: None,
            auth_token: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Create configuration from environment variables
    ///
    /// `ATHENA_ENDPOINT` wins over the regional default derived from
    /// `AWS_REGION`.
    pub fn from_env() -> Result<Self> {
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let mut config = Self::for_region(region);

        if let Ok(endpoint) = std::env::var("ATHENA_ENDPOINT") {
            config.endpoint = endpoint;
        }
        config.workgroup = std::env::var("ATHENA_WORKGROUP").ok();
        config.output_location = std::env::var("ATHENA_OUTPUT_LOCATION").ok();
        config.auth_token = std::env::var("ATHENA_AUTH_TOKEN").ok();
        if let Some(secs) = env_u64("ATHENA_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides; an overridden region without an explicit endpoint
    /// also moves the endpoint to that region.
    pub fn merge(mut self, overrides: AthenaOverrides) -> Result<Self> {
        if let Some(region) = overrides.region {
            if overrides.endpoint.is_none() && self.endpoint == default_endpoint(&self.region) {
                self.endpoint = default_endpoint(&region);
            }
            self.region = region;
        }
        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = endpoint;
        }
        if overrides.workgroup.is_some() {
            self.workgroup = overrides.workgroup;
        }
        if overrides.output_location.is_some() {
            self.output_location = overrides.output_location;
        }
        if overrides.auth_token.is_some() {
            self.auth_token = overrides.auth_token;
        }
        if let Some(timeout) = overrides.request_timeout {
            self.request_timeout = timeout;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(QueryError::Config(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(QueryError::Config("request timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Poll loop settings for a [`QueryExecutor`](crate::QueryExecutor)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Delay between two status polls
    pub poll_interval: Duration,
    /// Upper bound on the whole wait for a terminal state
    pub timeout: Option<Duration>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: None,
        }
    }
}

impl ExecutorOptions {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read `ATHENA_POLL_INTERVAL_MS` and `ATHENA_QUERY_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();
        if let Some(ms) = env_u64("ATHENA_POLL_INTERVAL_MS")? {
            options.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = env_u64("ATHENA_QUERY_TIMEOUT_SECS")? {
            options.timeout = Some(Duration::from_secs(secs));
        }
        Ok(options)
    }
}

fn default_endpoint(region: &str) -> String {
    format!("https://athena.{}.amazonaws.com", region)
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| QueryError::Config(format!("{} must be an integer: {}", name, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_sets_default_endpoint() {
        let config = AthenaConfig::for_region("eu-west-1");
        assert_eq!(config.endpoint, "https://athena.eu-west-1.amazonaws.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_region_moves_default_endpoint() {
        let merged = AthenaConfig::for_region("us-east-1")
            .merge(AthenaOverrides {
                region: Some("ap-south-1".to_string()),
                workgroup: Some("analytics".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(merged.region, "ap-south-1");
        assert_eq!(merged.endpoint, "https://athena.ap-south-1.amazonaws.com");
        assert_eq!(merged.workgroup.as_deref(), Some("analytics"));
    }

    #[test]
    fn test_merge_keeps_custom_endpoint() {
        let mut base = AthenaConfig::for_region("us-east-1");
        base.endpoint = "http://localhost:4566".to_string();

        let merged = base
            .merge(AthenaOverrides {
                region: Some("eu-central-1".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(merged.endpoint, "http://localhost:4566");
    }

    #[test]
    fn test_merge_rejects_bad_endpoint() {
        let result = AthenaConfig::for_region("us-east-1").merge(AthenaOverrides {
            endpoint: Some("athena.local".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(QueryError::Config(_))));
    }

    #[test]
    fn test_default_poll_interval_is_one_second() {
        let options = ExecutorOptions::default();
        assert_eq!(options.poll_interval, Duration::from_millis(1000));
        assert!(options.timeout.is_none());
    }
}

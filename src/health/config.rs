//! Health checker configuration

use std::time::Duration;

use crate::config::{self, ConfigError, Lookup};

/// Default table used for the bounded datastore read
pub const DEFAULT_PROBE_TABLE: &str = "users";

/// Endpoint plus credential for an HTTP-probed dependency
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEndpoint {
    pub url: String,
    pub api_key: Option<String>,
}

/// Health checker configuration
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Version reported in every response
    pub version: String,
    /// Deployment environment name (development, staging, production, ...)
    pub environment: String,
    /// REST datastore base URL
    pub datastore_url: Option<String>,
    pub datastore_api_key: Option<String>,
    /// Table read by the database probe
    pub probe_table: String,
    /// Cache endpoint; when unset the cache probe reports degraded
    pub cache_url: Option<String>,
    pub identity: Option<ServiceEndpoint>,
    pub object_storage: Option<ServiceEndpoint>,
    pub payment: Option<ServiceEndpoint>,
    pub email_provider: Option<ServiceEndpoint>,
    /// Memory ceiling for the system probe; derived from total memory when unset
    pub memory_limit_bytes: Option<u64>,
    /// Environment variables the application cannot run without
    pub required_env_vars: Vec<String>,
    /// Tables that must exist in the datastore
    pub required_tables: Vec<String>,
    /// Upper bound for every network-facing probe
    pub probe_timeout: Duration,
    /// Connect timeout for the cache ping
    pub cache_connect_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            datastore_url: None,
            datastore_api_key: None,
            probe_table: DEFAULT_PROBE_TABLE.to_string(),
            cache_url: None,
            identity: None,
            object_storage: None,
            payment: None,
            email_provider: None,
            memory_limit_bytes: None,
            required_env_vars: vec!["DATASTORE_URL".to_string(), "DATASTORE_API_KEY".to_string()],
            required_tables: vec![DEFAULT_PROBE_TABLE.to_string()],
            probe_timeout: Duration::from_millis(5000),
            cache_connect_timeout: Duration::from_millis(2000),
        }
    }
}

impl HealthConfig {
    /// Load from process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&config::env_lookup)
    }

    /// Load from an arbitrary key lookup.
    ///
    /// Identity and object-storage endpoints default to the datastore's
    /// `/auth/v1/health` and `/storage/v1/bucket` routes when not given.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let datastore_url = config::string(lookup, "DATASTORE_URL")
            .map(|url| url.trim_end_matches('/').to_string());
        let datastore_api_key = config::string(lookup, "DATASTORE_API_KEY");

        let derived = |explicit: &str, suffix: &str| -> Option<ServiceEndpoint> {
            config::string(lookup, explicit)
                .or_else(|| datastore_url.as_ref().map(|base| format!("{}{}", base, suffix)))
                .map(|url| ServiceEndpoint {
                    url,
                    api_key: datastore_api_key.clone(),
                })
        };
        let identity = derived("IDENTITY_HEALTH_URL", "/auth/v1/health");
        let object_storage = derived("STORAGE_LIST_URL", "/storage/v1/bucket");

        let payment = config::string(lookup, "PAYMENT_API_KEY").map(|key| ServiceEndpoint {
            url: config::string(lookup, "PAYMENT_API_URL")
                .unwrap_or_else(|| "https://api.stripe.com/v1/balance".to_string()),
            api_key: Some(key),
        });
        let email_provider = config::string(lookup, "EMAIL_API_KEY").map(|key| ServiceEndpoint {
            url: format!(
                "{}/domains",
                config::string(lookup, "EMAIL_API_URL")
                    .unwrap_or_else(|| "https://api.resend.com".to_string())
                    .trim_end_matches('/')
            ),
            api_key: Some(key),
        });

        let memory_limit_bytes = match config::string(lookup, "MEMORY_LIMIT_MB") {
            Some(raw) => {
                let megabytes = config::parsed(lookup, "MEMORY_LIMIT_MB", 0u64)?;
                Some(megabytes.checked_mul(1024 * 1024).ok_or_else(|| {
                    ConfigError::Invalid {
                        key: "MEMORY_LIMIT_MB".to_string(),
                        value: raw,
                        reason: "too large".to_string(),
                    }
                })?)
            }
            None => None,
        };

        Ok(Self {
            version: config::string(lookup, "APP_VERSION").unwrap_or(defaults.version),
            environment: config::first_of(lookup, &["APP_ENV", "ENVIRONMENT"])
                .unwrap_or(defaults.environment),
            datastore_url,
            datastore_api_key,
            probe_table: config::string(lookup, "HEALTH_PROBE_TABLE").unwrap_or(defaults.probe_table),
            cache_url: config::first_of(lookup, &["CACHE_URL", "REDIS_URL"]),
            identity,
            object_storage,
            payment,
            email_provider,
            memory_limit_bytes,
            required_env_vars: config::list(lookup, "REQUIRED_ENV_VARS")
                .unwrap_or(defaults.required_env_vars),
            required_tables: config::list(lookup, "REQUIRED_TABLES")
                .unwrap_or(defaults.required_tables),
            probe_timeout: Duration::from_millis(config::parsed(
                lookup,
                "HEALTH_PROBE_TIMEOUT_MS",
                5000u64,
            )?),
            cache_connect_timeout: Duration::from_millis(config::parsed(
                lookup,
                "CACHE_CONNECT_TIMEOUT_MS",
                2000u64,
            )?),
        })
    }

    /// Set the reported environment
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Set the reported version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::map_lookup;

    #[test]
    fn test_defaults_without_environment() {
        let lookup = map_lookup(&[]);
        let config = HealthConfig::from_lookup(&lookup).unwrap();

        assert_eq!(config.environment, "development");
        assert!(config.datastore_url.is_none());
        assert!(config.cache_url.is_none());
        assert!(config.identity.is_none());
        assert!(config.payment.is_none());
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_endpoints_derived_from_datastore() {
        let lookup = map_lookup(&[
            ("DATASTORE_URL", "https://db.example.com/"),
            ("DATASTORE_API_KEY", "anon"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
        ]);
        let config = HealthConfig::from_lookup(&lookup).unwrap();

        assert_eq!(config.datastore_url.as_deref(), Some("https://db.example.com"));
        assert_eq!(
            config.identity.as_ref().unwrap().url,
            "https://db.example.com/auth/v1/health"
        );
        let storage = config.object_storage.as_ref().unwrap();
        assert_eq!(storage.url, "https://db.example.com/storage/v1/bucket");
        assert_eq!(storage.api_key.as_deref(), Some("anon"));
        assert_eq!(config.cache_url.as_deref(), Some("redis://127.0.0.1:6379"));
    }

    #[test]
    fn test_optional_providers_and_limits() {
        let lookup = map_lookup(&[
            ("PAYMENT_API_KEY", "sk_test"),
            ("EMAIL_API_KEY", "re_test"),
            ("MEMORY_LIMIT_MB", "512"),
            ("REQUIRED_TABLES", "users,companies"),
            ("APP_ENV", "production"),
        ]);
        let config = HealthConfig::from_lookup(&lookup).unwrap();

        assert_eq!(
            config.payment.as_ref().unwrap().url,
            "https://api.stripe.com/v1/balance"
        );
        assert_eq!(
            config.email_provider.as_ref().unwrap().url,
            "https://api.resend.com/domains"
        );
        assert_eq!(config.memory_limit_bytes, Some(512 * 1024 * 1024));
        assert_eq!(config.required_tables, vec!["users", "companies"]);
        assert!(config.is_production());
    }

    #[test]
    fn test_oversized_memory_limit_is_error() {
        let lookup = map_lookup(&[("MEMORY_LIMIT_MB", "17592186044416")]);
        match HealthConfig::from_lookup(&lookup) {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "MEMORY_LIMIT_MB"),
            other => panic!("expected invalid config, got {:?}", other.map(|c| c.memory_limit_bytes)),
        }

        let lookup = map_lookup(&[("MEMORY_LIMIT_MB", "17592186044415")]);
        let config = HealthConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.memory_limit_bytes, Some(17592186044415 * 1024 * 1024));
    }

    #[test]
    fn test_invalid_timeout_is_error() {
        let lookup = map_lookup(&[("HEALTH_PROBE_TIMEOUT_MS", "soon")]);
        assert!(HealthConfig::from_lookup(&lookup).is_err());
    }
}

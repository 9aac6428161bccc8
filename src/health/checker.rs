//! Health checker: runs every probe concurrently and aggregates the results

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde_json::json;

use super::clients::{HttpServiceProbe, RedisCache, RestDatastore};
use super::config::HealthConfig;
use super::probes::{CacheClient, Datastore, MemorySampler, ProbeError, ServiceProbe};
use super::system::{classify_memory, SysinfoSampler};
use super::types::{HealthCheckResponse, HealthCheckResult, HealthStatus};

pub const DATABASE: &str = "database";
pub const CACHE: &str = "cache";
pub const EXTERNAL_APIS: &str = "external_apis";
pub const SYSTEM: &str = "system";
pub const APPLICATION: &str = "application";

/// Names of the probes in the order they appear in a full response
pub const ALL_CHECKS: [&str; 5] = [DATABASE, CACHE, EXTERNAL_APIS, SYSTEM, APPLICATION];

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Runs the health probes
pub struct HealthChecker {
    config: HealthConfig,
    datastore: Option<Arc<dyn Datastore>>,
    cache: Option<Arc<dyn CacheClient>>,
    services: Vec<Arc<dyn ServiceProbe>>,
    memory: Arc<dyn MemorySampler>,
    env: EnvLookup,
    started_at: Instant,
}

impl HealthChecker {
    /// Create a checker with no collaborators wired in
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            datastore: None,
            cache: None,
            services: Vec::new(),
            memory: Arc::new(SysinfoSampler::new()),
            env: Arc::new(crate::config::env_lookup),
            started_at: Instant::now(),
        }
    }

    /// Create a checker with the concrete clients described by `config`
    pub fn from_config(config: HealthConfig) -> Self {
        let timeout = config.probe_timeout;
        let mut checker = Self::new(config.clone());

        if let Some(url) = &config.datastore_url {
            checker = checker.with_datastore(Arc::new(RestDatastore::new(
                url.clone(),
                config.datastore_api_key.clone(),
                timeout,
            )));
        }
        if let Some(url) = &config.cache_url {
            checker = checker.with_cache(Arc::new(RedisCache::new(url.clone())));
        }

        let services = [
            ("identity", &config.identity),
            ("object_storage", &config.object_storage),
            ("payment", &config.payment),
            ("email_provider", &config.email_provider),
        ];
        for (name, endpoint) in services {
            if let Some(endpoint) = endpoint {
                checker = checker.with_service(Arc::new(HttpServiceProbe::new(
                    name,
                    endpoint.clone(),
                    timeout,
                )));
            }
        }

        checker
    }

    pub fn with_datastore(mut self, datastore: Arc<dyn Datastore>) -> Self {
        self.datastore = Some(datastore);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheClient>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Register an external dependency for the external API check
    pub fn with_service(mut self, service: Arc<dyn ServiceProbe>) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_memory_sampler(mut self, memory: Arc<dyn MemorySampler>) -> Self {
        self.memory = memory;
        self
    }

    /// Replace the lookup used to verify required environment variables
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Seconds since the checker was created
    pub fn uptime(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    /// Run every probe concurrently. Never fails: probe errors and panics
    /// become unhealthy results.
    pub async fn run_all_checks(&self) -> HealthCheckResponse {
        let (database, cache, external, system, application) = tokio::join!(
            guarded(DATABASE, self.check_database()),
            guarded(CACHE, self.check_cache()),
            guarded(EXTERNAL_APIS, self.check_external_apis()),
            guarded(SYSTEM, async { self.check_system() }),
            guarded(APPLICATION, self.check_application()),
        );

        self.respond(vec![database, cache, external, system, application])
    }

    /// Database probe only, for liveness endpoints
    pub async fn run_quick_check(&self) -> HealthCheckResponse {
        let database = guarded(DATABASE, self.check_database()).await;
        self.respond(vec![database])
    }

    fn respond(&self, checks: Vec<HealthCheckResult>) -> HealthCheckResponse {
        let response = HealthCheckResponse::from_results(
            checks,
            self.uptime(),
            self.config.version.clone(),
            self.config.environment.clone(),
        );

        if response.status == HealthStatus::Healthy {
            tracing::debug!(checks = response.summary.total, "Health check passed");
        } else {
            tracing::warn!(
                status = %response.status,
                unhealthy = response.summary.unhealthy,
                degraded = response.summary.degraded,
                total = response.summary.total,
                "Health check reported problems"
            );
        }

        response
    }

    /// Bound a network-facing step by the configured probe timeout
    async fn bounded<T, F>(&self, step: F) -> Result<T, ProbeError>
    where
        F: Future<Output = Result<T, ProbeError>>,
    {
        let limit = self.config.probe_timeout;
        tokio::time::timeout(limit, step)
            .await
            .map_err(|_| ProbeError::Timeout(limit))?
    }

    async fn check_database(&self) -> HealthCheckResult {
        let Some(datastore) = &self.datastore else {
            return HealthCheckResult::unhealthy(DATABASE, ProbeError::NotConfigured("Datastore").to_string());
        };

        let table = &self.config.probe_table;
        match self.bounded(datastore.bounded_read(table, 1)).await {
            Ok(outcome) => {
                let result = HealthCheckResult::healthy(DATABASE, "Database connection successful")
                    .with_detail("table", table.as_str());
                match outcome.row_count {
                    Some(count) => result.with_detail("row_count", count),
                    None => result,
                }
            }
            Err(e) => {
                tracing::warn!(service = DATABASE, error = %e, "Database check failed");
                HealthCheckResult::unhealthy(DATABASE, format!("Database query failed: {}", e))
            }
        }
    }

    async fn check_cache(&self) -> HealthCheckResult {
        let Some(cache) = &self.cache else {
            return HealthCheckResult::degraded(CACHE, "Cache not configured; running without cache")
                .with_detail("configured", false);
        };

        let connect_timeout = self.config.cache_connect_timeout;
        match self.bounded(cache.ping(connect_timeout)).await {
            Ok(()) => HealthCheckResult::healthy(CACHE, "Cache responded to ping")
                .with_detail("configured", true),
            Err(e) => {
                tracing::warn!(service = CACHE, error = %e, "Cache check failed");
                HealthCheckResult::unhealthy(CACHE, format!("Cache ping failed: {}", e))
                    .with_detail("configured", true)
            }
        }
    }

    async fn check_external_apis(&self) -> HealthCheckResult {
        if self.services.is_empty() {
            return HealthCheckResult::degraded(EXTERNAL_APIS, "No external services configured");
        }

        let probes = self.services.iter().map(|service| async move {
            let start = Instant::now();
            let outcome = match AssertUnwindSafe(self.bounded(service.probe()))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(panic) => Err(ProbeError::Response(panic_message(panic.as_ref()))),
            };
            (service.name().to_string(), outcome, start.elapsed())
        });
        let outcomes = futures::future::join_all(probes).await;

        let total = outcomes.len();
        let mut passed = 0;
        let mut details = serde_json::Map::new();
        for (name, outcome, elapsed) in outcomes {
            let entry = match outcome {
                Ok(()) => {
                    passed += 1;
                    json!({ "status": "healthy", "response_time": millis(elapsed) })
                }
                Err(e) => {
                    tracing::warn!(service = %name, error = %e, "External service check failed");
                    json!({
                        "status": "unhealthy",
                        "response_time": millis(elapsed),
                        "error": e.to_string(),
                    })
                }
            };
            details.insert(name, entry);
        }

        let status = HealthStatus::from_partial(passed, total);
        let message = match status {
            HealthStatus::Healthy => "All external services reachable".to_string(),
            HealthStatus::Unhealthy => "No external services reachable".to_string(),
            HealthStatus::Degraded => format!("{} of {} external services reachable", passed, total),
        };

        let mut result = HealthCheckResult::new(EXTERNAL_APIS, status, message);
        result.details = details.into_iter().collect();
        result
    }

    fn check_system(&self) -> HealthCheckResult {
        let base = |result: HealthCheckResult| {
            result
                .with_detail("uptime_seconds", self.uptime().round())
                .with_detail("platform", std::env::consts::OS)
                .with_detail("arch", std::env::consts::ARCH)
                .with_detail("pid", std::process::id())
        };

        let sample = match self.memory.sample() {
            Ok(sample) => sample,
            Err(e) => {
                return base(HealthCheckResult::unhealthy(
                    SYSTEM,
                    format!("Failed to read memory usage: {}", e),
                ))
            }
        };

        let ceiling = self.config.memory_limit_bytes.unwrap_or(sample.total_bytes);
        if ceiling == 0 {
            return base(HealthCheckResult::unhealthy(SYSTEM, "Memory ceiling is zero"))
                .with_detail("process_memory_bytes", sample.process_bytes);
        }

        let usage_percent = sample.process_bytes as f64 / ceiling as f64 * 100.0;
        let status = classify_memory(usage_percent);
        let message = match status {
            HealthStatus::Healthy => format!("Memory usage normal ({:.1}%)", usage_percent),
            HealthStatus::Degraded => format!("Memory usage elevated ({:.1}%)", usage_percent),
            HealthStatus::Unhealthy => format!("Memory usage critical ({:.1}%)", usage_percent),
        };

        base(HealthCheckResult::new(SYSTEM, status, message))
            .with_detail("process_memory_bytes", sample.process_bytes)
            .with_detail("total_memory_bytes", sample.total_bytes)
            .with_detail("memory_limit_bytes", ceiling)
            .with_detail("memory_usage_percent", (usage_percent * 100.0).round() / 100.0)
    }

    async fn check_application(&self) -> HealthCheckResult {
        let missing_env: Vec<String> = self
            .config
            .required_env_vars
            .iter()
            .filter(|key| (self.env)(key.as_str()).is_none())
            .cloned()
            .collect();

        let (missing_tables, schema_errors) = self.missing_tables().await;

        let env_ok = missing_env.is_empty();
        let schema_ok = missing_tables.is_empty() && schema_errors.is_empty();
        let passed = [env_ok, schema_ok].iter().filter(|ok| **ok).count();
        let status = HealthStatus::from_partial(passed, 2);

        let message = if status == HealthStatus::Healthy {
            "Application configuration and schema verified".to_string()
        } else {
            let mut problems = Vec::new();
            if !env_ok {
                problems.push(format!("missing environment variables: {}", missing_env.join(", ")));
            }
            if !missing_tables.is_empty() {
                problems.push(format!("missing tables: {}", missing_tables.join(", ")));
            }
            if !schema_errors.is_empty() {
                problems.push(format!("schema check errors: {}", schema_errors.join("; ")));
            }
            format!("Application invariants violated ({})", problems.join("; "))
        };

        HealthCheckResult::new(APPLICATION, status, message)
            .with_detail("missing_env_vars", missing_env)
            .with_detail("missing_tables", missing_tables)
            .with_detail("schema_errors", schema_errors)
    }

    /// Tables from `required_tables` that are absent, plus errors from the lookups
    async fn missing_tables(&self) -> (Vec<String>, Vec<String>) {
        let required = &self.config.required_tables;
        if required.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let Some(datastore) = &self.datastore else {
            return (
                Vec::new(),
                vec![ProbeError::NotConfigured("Datastore").to_string()],
            );
        };

        let lookups = required.iter().map(|table| async move {
            (table, self.bounded(datastore.table_exists(table)).await)
        });

        let mut missing = Vec::new();
        let mut errors = Vec::new();
        for (table, outcome) in futures::future::join_all(lookups).await {
            match outcome {
                Ok(true) => {}
                Ok(false) => missing.push(table.clone()),
                Err(e) => errors.push(format!("{}: {}", table, e)),
            }
        }
        (missing, errors)
    }
}

/// Run one probe, stamping its response time and turning a panic into an
/// unhealthy result
async fn guarded<F>(service: &'static str, check: F) -> HealthCheckResult
where
    F: Future<Output = HealthCheckResult>,
{
    let start = Instant::now();
    let result = match AssertUnwindSafe(check).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(service, error = %message, "Health check panicked");
            HealthCheckResult::unhealthy(service, format!("Health check failed: {}", message))
        }
    };
    result.with_response_time(millis(start.elapsed()))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn millis(elapsed: Duration) -> u64 {
    elapsed.as_millis() as u64
}

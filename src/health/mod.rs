//! Dependency health checks
//!
//! A fixed battery of independent probes (datastore, cache, external
//! services, memory, application invariants) run concurrently and reduce to
//! one [`HealthCheckResponse`].

pub mod checker;
pub mod clients;
pub mod config;
pub mod probes;
pub mod system;
pub mod types;

pub use checker::{HealthChecker, ALL_CHECKS};
pub use clients::{HttpServiceProbe, RedisCache, RestDatastore};
pub use config::{HealthConfig, ServiceEndpoint};
pub use probes::{
    CacheClient, Datastore, MemorySample, MemorySampler, ProbeError, ReadOutcome, ServiceProbe,
};
pub use system::SysinfoSampler;
pub use types::{HealthCheckResponse, HealthCheckResult, HealthStatus, HealthSummary};

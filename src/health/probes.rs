//! Capabilities the health checker consumes from its collaborators
//!
//! Implementations live in [`super::clients`] and [`super::system`]; tests
//! substitute their own.

use std::time::Duration;

use async_trait::async_trait;

/// Result of a bounded datastore read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Row count reported by the datastore, when it reports one
    pub row_count: Option<u64>,
}

/// Datastore client
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Read at most `limit` rows from `table`
    async fn bounded_read(&self, table: &str, limit: usize) -> Result<ReadOutcome, ProbeError>;

    /// Whether `table` exists in the schema
    async fn table_exists(&self, table: &str) -> Result<bool, ProbeError>;
}

/// Cache client
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Round-trip a ping; connecting must not take longer than `connect_timeout`
    async fn ping(&self, connect_timeout: Duration) -> Result<(), ProbeError>;
}

/// A named external dependency (identity service, object storage, ...)
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn probe(&self) -> Result<(), ProbeError>;
}

/// Point-in-time memory reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySample {
    /// Resident memory of this process
    pub process_bytes: u64,
    /// Total memory of the host
    pub total_bytes: u64,
}

/// Source of memory readings
pub trait MemorySampler: Send + Sync {
    fn sample(&self) -> Result<MemorySample, ProbeError>;
}

/// Probe errors. These never leave the checker; they become unhealthy results.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    Response(String),

    #[error("System error: {0}")]
    System(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        ProbeError::Connection(e.to_string())
    }
}

impl From<redis::RedisError> for ProbeError {
    fn from(e: redis::RedisError) -> Self {
        ProbeError::Connection(e.to_string())
    }
}

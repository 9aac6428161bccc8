//! Tracing subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "healthwatch=info,tower_http=info";

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    Pretty,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// JSON in production, pretty elsewhere; `LOG_FORMAT` wins when it names a format
    pub fn resolve(environment: &str, override_format: Option<&str>) -> LogFormat {
        match override_format.map(|f| f.trim().to_ascii_lowercase()) {
            Some(f) if f == "json" => LogFormat::Json,
            Some(f) if f == "pretty" || f == "text" => LogFormat::Pretty,
            _ if environment.eq_ignore_ascii_case("production") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Install the global subscriber. Call once, from `main`.
pub fn init(environment: &str) {
    let format = LogFormat::resolve(
        environment,
        crate::config::env_lookup("LOG_FORMAT").as_deref(),
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false),
            )
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_follows_environment() {
        assert_eq!(LogFormat::resolve("production", None), LogFormat::Json);
        assert_eq!(LogFormat::resolve("Production", None), LogFormat::Json);
        assert_eq!(LogFormat::resolve("development", None), LogFormat::Pretty);
        assert_eq!(LogFormat::resolve("staging", None), LogFormat::Pretty);
    }

    #[test]
    fn test_explicit_format_wins() {
        assert_eq!(LogFormat::resolve("development", Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::resolve("production", Some("pretty")), LogFormat::Pretty);
        assert_eq!(LogFormat::resolve("production", Some("xml")), LogFormat::Json);
    }
}

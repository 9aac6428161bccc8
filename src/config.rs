//! Environment-style configuration helpers shared by the area configs
//!
//! Every config type exposes `from_env()` plus a `from_lookup()` form that
//! takes the key lookup as a closure, so parsing can be tested without
//! touching the process environment.

use std::str::FromStr;

/// Key lookup used by the `from_lookup` constructors
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Process-environment lookup. Empty values count as unset.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid server address: {0}")]
    Address(String),
}

/// Read a string value, trimming whitespace
pub fn string(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read the first key that is set
pub fn first_of(lookup: Lookup<'_>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| string(lookup, key))
}

/// Parse a value, falling back to `default` when unset
pub fn parsed<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match string(lookup, key) {
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Parse a boolean flag (`true/1/yes/on`, `false/0/no/off`)
pub fn flag(lookup: Lookup<'_>, key: &str, default: bool) -> Result<bool, ConfigError> {
    match string(lookup, key) {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key: key.to_string(),
                value: raw,
                reason: "expected a boolean".to_string(),
            }),
        },
        None => Ok(default),
    }
}

/// Split a comma-separated list, dropping blanks
pub fn list(lookup: Lookup<'_>, key: &str) -> Option<Vec<String>> {
    string(lookup, key).map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
}

#[cfg(test)]
pub(crate) fn map_lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: std::collections::HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_and_defaults() {
        let lookup = map_lookup(&[("PORT", "9090"), ("BAD", "abc")]);

        assert_eq!(parsed(&lookup, "PORT", 8080u16).unwrap(), 9090);
        assert_eq!(parsed(&lookup, "MISSING", 8080u16).unwrap(), 8080);
        assert!(matches!(
            parsed(&lookup, "BAD", 1u64),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_flag() {
        let lookup = map_lookup(&[("A", "TRUE"), ("B", "0"), ("C", "maybe")]);

        assert!(flag(&lookup, "A", false).unwrap());
        assert!(!flag(&lookup, "B", true).unwrap());
        assert!(flag(&lookup, "MISSING", true).unwrap());
        assert!(flag(&lookup, "C", true).is_err());
    }

    #[test]
    fn test_list_drops_blanks() {
        let lookup = map_lookup(&[("TO", " a@x.io, ,b@x.io,")]);
        assert_eq!(
            list(&lookup, "TO").unwrap(),
            vec!["a@x.io".to_string(), "b@x.io".to_string()]
        );
        assert!(list(&lookup, "NONE").is_none());
    }

    #[test]
    fn test_blank_values_are_unset() {
        let lookup = map_lookup(&[("EMPTY", "   ")]);
        assert!(string(&lookup, "EMPTY").is_none());
        assert_eq!(first_of(&lookup, &["EMPTY", "NONE"]), None);
    }
}

//! Environment-tunable pipeline parameters.
//!
//! All knobs carry safe built-in defaults; unset or malformed environment
//! values silently fall back so a bare process always starts with a working
//! configuration.
//!
//! | Variable            | Default | Meaning                                |
//! |---------------------|---------|----------------------------------------|
//! | `CHUNK_SIZE`        | 2000    | Maximum tokens per chunk               |
//! | `CHUNK_OVERLAP`     | 200     | Token overlap between hard-sliced windows |
//! | `RETRIEVAL_RESULTS` | 7       | Nearest neighbours fetched per query   |

use std::env;

use tracing::warn;

pub const DEFAULT_CHUNK_SIZE: usize = 2000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_RETRIEVAL_RESULTS: usize = 7;

/// Tunable parameters shared by the chunking and retrieval paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RagConfig {
    /// Maximum tokens per chunk.
    pub max_chunk_tokens: usize,
    /// Trailing tokens repeated at the start of the next hard-sliced window.
    pub chunk_overlap_tokens: usize,
    /// Nearest neighbours requested per rewritten query.
    pub results_per_query: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: DEFAULT_CHUNK_SIZE,
            chunk_overlap_tokens: DEFAULT_CHUNK_OVERLAP,
            results_per_query: DEFAULT_RETRIEVAL_RESULTS,
        }
    }
}

impl RagConfig {
    /// Loads configuration from the process environment, reading a `.env`
    /// file first when one is present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary lookup function.
    ///
    /// Extracted from [`from_env`](Self::from_env) so tests can drive the
    /// parsing logic without mutating process-global environment state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            max_chunk_tokens: parse_var(&lookup, "CHUNK_SIZE", defaults.max_chunk_tokens),
            chunk_overlap_tokens: parse_var(
                &lookup,
                "CHUNK_OVERLAP",
                defaults.chunk_overlap_tokens,
            ),
            results_per_query: parse_var(&lookup, "RETRIEVAL_RESULTS", defaults.results_per_query),
        }
    }
}

fn parse_var(lookup: impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, raw = %raw, "unparseable configuration value, using default");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = RagConfig::from_lookup(|_| None);
        assert_eq!(config, RagConfig::default());
        assert_eq!(config.max_chunk_tokens, 2000);
        assert_eq!(config.chunk_overlap_tokens, 200);
        assert_eq!(config.results_per_query, 7);
    }

    #[test]
    fn environment_values_override_defaults() {
        let config = RagConfig::from_lookup(lookup_from(&[
            ("CHUNK_SIZE", "512"),
            ("CHUNK_OVERLAP", "64"),
            ("RETRIEVAL_RESULTS", "12"),
        ]));
        assert_eq!(config.max_chunk_tokens, 512);
        assert_eq!(config.chunk_overlap_tokens, 64);
        assert_eq!(config.results_per_query, 12);
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let config = RagConfig::from_lookup(lookup_from(&[
            ("CHUNK_SIZE", "not-a-number"),
            ("CHUNK_OVERLAP", "-3"),
        ]));
        assert_eq!(config.max_chunk_tokens, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.chunk_overlap_tokens, DEFAULT_CHUNK_OVERLAP);
    }
}

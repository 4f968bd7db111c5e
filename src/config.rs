//! Runtime configuration
//!
//! Read from the process environment (after `.env` is loaded by the binaries).

use crate::error::AgentError;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SEARCH_TOP_K: usize = 5;

/// Independent timeouts for each external call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub generation: Duration,
    pub index_build: Duration,
    pub index_query: Duration,
    pub search: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            generation: Duration::from_secs(60),
            index_build: Duration::from_secs(120),
            index_query: Duration::from_secs(60),
            search: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub staging_dir: PathBuf,
    pub index_storage_dir: PathBuf,
    pub elasticsearch_url: String,
    pub elasticsearch_index: String,
    pub search_top_k: usize,
    pub timeouts: Timeouts,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.0-flash".to_string(),
            staging_dir: PathBuf::from("data"),
            index_storage_dir: PathBuf::from("storage"),
            elasticsearch_url: "http://localhost:9200".to_string(),
            elasticsearch_index: "documents".to_string(),
            search_top_k: DEFAULT_SEARCH_TOP_K,
            timeouts: Timeouts::default(),
            port: 8080,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeouts = Timeouts {
            generation: secs(&get, "GENERATION_TIMEOUT_SECS", defaults.timeouts.generation)?,
            index_build: secs(&get, "INDEX_BUILD_TIMEOUT_SECS", defaults.timeouts.index_build)?,
            index_query: secs(&get, "INDEX_QUERY_TIMEOUT_SECS", defaults.timeouts.index_query)?,
            search: secs(&get, "SEARCH_TIMEOUT_SECS", defaults.timeouts.search)?,
        };

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => parse("PORT", &raw)?,
            None => defaults.port,
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY").unwrap_or(defaults.gemini_api_key),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            staging_dir: get("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            index_storage_dir: get("INDEX_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_storage_dir),
            elasticsearch_url: get("ELASTICSEARCH_URL").unwrap_or(defaults.elasticsearch_url),
            elasticsearch_index: get("ELASTICSEARCH_INDEX").unwrap_or(defaults.elasticsearch_index),
            search_top_k: match get("SEARCH_TOP_K") {
                Some(raw) => parse("SEARCH_TOP_K", &raw)?,
                None => defaults.search_top_k,
            },
            timeouts,
            port,
        })
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AgentError::Config(format!("{} has invalid value '{}'", key, raw)))
}

fn secs<G>(get: &G, key: &str, default: Duration) -> Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => Ok(Duration::from_secs(parse(key, &raw)?)),
        None => Ok(default),
    }
}

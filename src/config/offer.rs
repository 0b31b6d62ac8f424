//! Offer cache and scheduler configuration structures.

use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const fn default_true() -> bool {
    true
}

const fn default_max_offer_age_ms() -> u64 {
    60_000
}

const fn default_task_size_hint() -> usize {
    8
}

fn default_commit_workers() -> usize {
    num_cpus::get().max(1)
}

fn default_rack_attribute_key() -> String {
    "rack".to_string()
}

fn default_rack_id() -> String {
    "DEFAULT".to_string()
}

/// Offer cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferCacheConfig {
    /// Cache offers between passes; when false the null cache is used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Offers older than this at checkout or return are declined.
    #[serde(default = "default_max_offer_age_ms")]
    pub max_offer_age_ms: u64,
    /// Decline every available offer as soon as caching is disabled.
    #[serde(default = "default_true")]
    pub flush_on_disable: bool,
}

impl Default for OfferCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_offer_age_ms: default_max_offer_age_ms(),
            flush_on_disable: true,
        }
    }
}

impl OfferCacheConfig {
    /// Validate cache configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_offer_age_ms == 0 {
            return Err("max_offer_age_ms must be greater than 0".into());
        }
        Ok(())
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Offer cache settings.
    #[serde(default)]
    pub cache: OfferCacheConfig,
    /// Expected number of tasks matched per agent per pass.
    #[serde(default = "default_task_size_hint")]
    pub task_size_hint: usize,
    /// Threads used to issue launch calls in parallel.
    #[serde(default = "default_commit_workers")]
    pub commit_workers: usize,
    /// Offer attribute holding the agent's rack id.
    #[serde(default = "default_rack_attribute_key")]
    pub rack_attribute_key: String,
    /// Rack id used when an agent advertises none.
    #[serde(default = "default_rack_id")]
    pub default_rack_id: String,
    /// Agent attributes that reserve an agent for tasks requiring them.
    #[serde(default)]
    pub reserved_agent_attributes: BTreeMap<String, String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cache: OfferCacheConfig::default(),
            task_size_hint: default_task_size_hint(),
            commit_workers: default_commit_workers(),
            rack_attribute_key: default_rack_attribute_key(),
            default_rack_id: default_rack_id(),
            reserved_agent_attributes: BTreeMap::new(),
        }
    }
}

impl SchedulerConfig {
    /// Validate the scheduler and cache settings.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending field.
    pub fn validate(&self) -> Result<(), String> {
        self.cache
            .validate()
            .map_err(|e| format!("cache invalid: {e}"))?;
        if self.commit_workers == 0 {
            return Err("commit_workers must be greater than 0".into());
        }
        if self.rack_attribute_key.is_empty() {
            return Err("rack_attribute_key must not be empty".into());
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message for parse or validation failures.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `OFFER_*` environment variables, loading a
    /// `.env` file first if one is present. Unset variables keep defaults.
    ///
    /// # Errors
    ///
    /// Returns a message for unparsable values or validation failures.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();
        if let Some(enabled) = env_var::<bool>("OFFER_CACHE_ENABLED")? {
            cfg.cache.enabled = enabled;
        }
        if let Some(age) = env_var::<u64>("OFFER_MAX_AGE_MS")? {
            cfg.cache.max_offer_age_ms = age;
        }
        if let Some(flush) = env_var::<bool>("OFFER_FLUSH_ON_DISABLE")? {
            cfg.cache.flush_on_disable = flush;
        }
        if let Some(hint) = env_var::<usize>("OFFER_TASK_SIZE_HINT")? {
            cfg.task_size_hint = hint;
        }
        if let Some(workers) = env_var::<usize>("OFFER_COMMIT_WORKERS")? {
            cfg.commit_workers = workers;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn env_var<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{name}: {e}")),
        Err(_) => Ok(None),
    }
}

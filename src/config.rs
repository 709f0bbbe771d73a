//! Runtime configuration.
//!
//! Built-in defaults, overridden by an optional TOML file, overridden by
//! environment variables. Every field has a working default so the CLI runs
//! with no configuration at all.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default User-Agent sent to both public APIs. The MediaWiki etiquette
/// asks for a contact URL in the agent string.
pub const DEFAULT_USER_AGENT: &str = "chronomap/0.1 (https://github.com/chronomap/chronomap)";

const DEFAULT_CONFIG_FILE: &str = "chronomap.toml";

/// Wikidata SPARQL client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WikidataConfig {
    /// SPARQL endpoint URL
    pub endpoint: String,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Deadline in seconds, both per request and per operation
    pub timeout_secs: u64,
    /// Extra attempts after a retryable failure
    pub max_retries: u32,
    /// Linear backoff unit in seconds; attempt n sleeps n times this
    pub backoff_secs: u64,
    /// LIMIT clause of the event query
    pub event_limit: u32,
}

impl Default for WikidataConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://query.wikidata.org/sparql".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 15,
            max_retries: 3,
            backoff_secs: 2,
            event_limit: 100,
        }
    }
}

/// Wikipedia search client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WikipediaConfig {
    /// MediaWiki action API URL
    pub endpoint: String,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Per-request deadline in seconds
    pub timeout_secs: u64,
    /// Hits requested per search query
    pub search_limit: u32,
    /// Page ids per bulk request; the API caps generous batches
    pub batch_size: usize,
    /// Fixed pause between requests in milliseconds
    pub request_delay_ms: u64,
    /// Pause after an HTTP 429 before continuing, in seconds
    pub rate_limit_backoff_secs: u64,
    /// Total pages processed per fetch, including link expansion
    pub max_pages: usize,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ru.wikipedia.org/w/api.php".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            search_limit: 50,
            batch_size: 35,
            request_delay_ms: 1000,
            rate_limit_backoff_secs: 5,
            max_pages: 60,
        }
    }
}

/// Supplemental info lookup settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// MediaWiki action API URL
    pub endpoint: String,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Per-request deadline in seconds
    pub timeout_secs: u64,
    /// Concurrent lookups during the enrichment fan-out
    pub concurrency: usize,
    /// Requested thumbnail width in pixels
    pub thumbnail_width: u32,
    /// Candidate images inspected when no thumbnail exists
    pub image_candidates: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ru.wikipedia.org/w/api.php".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 20,
            concurrency: 4,
            thumbnail_width: 400,
            image_candidates: 5,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub wikidata: WikidataConfig,
    pub wikipedia: WikipediaConfig,
    pub enrichment: EnrichmentConfig,
    /// Where the user profile JSON lives
    pub profile_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            wikidata: WikidataConfig::default(),
            wikipedia: WikipediaConfig::default(),
            enrichment: EnrichmentConfig::default(),
            profile_path: PathBuf::from("chronomap_profile.json"),
        }
    }
}

impl AppConfig {
    /// Load the effective configuration.
    ///
    /// Order, later layers winning: built-in defaults, the TOML file, then
    /// environment variables.
    ///
    /// # Environment Variables
    /// - `CHRONOMAP_CONFIG` (optional, default: `chronomap.toml`): config file path
    /// - `CHRONOMAP_WIKIDATA_ENDPOINT` (optional): SPARQL endpoint override
    /// - `CHRONOMAP_WIKIPEDIA_ENDPOINT` (optional): MediaWiki API override,
    ///   applied to both the fetcher and the enrichment lookup
    /// - `CHRONOMAP_USER_AGENT` (optional): agent string for every client
    /// - `CHRONOMAP_PROFILE_PATH` (optional): user profile location
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, String> {
        let path = env::var("CHRONOMAP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::from_file_or_default(Path::new(&path))?;
        config.apply_env();
        Ok(config)
    }

    /// Parse the file at `path`, or fall back to defaults when it does not
    /// exist.
    pub fn from_file_or_default(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
        Self::from_toml(&raw).map_err(|e| format!("invalid config {}: {e}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }

    fn apply_env(&mut self) {
        if let Ok(endpoint) = env::var("CHRONOMAP_WIKIDATA_ENDPOINT") {
            self.wikidata.endpoint = endpoint;
        }
        if let Ok(endpoint) = env::var("CHRONOMAP_WIKIPEDIA_ENDPOINT") {
            self.wikipedia.endpoint = endpoint.clone();
            self.enrichment.endpoint = endpoint;
        }
        if let Ok(agent) = env::var("CHRONOMAP_USER_AGENT") {
            self.wikidata.user_agent = agent.clone();
            self.wikipedia.user_agent = agent.clone();
            self.enrichment.user_agent = agent;
        }
        if let Ok(path) = env::var("CHRONOMAP_PROFILE_PATH") {
            self.profile_path = PathBuf::from(path);
        }
    }
}

//! Application configuration for sitebrief.
//!
//! User config lives at `~/.sitebrief/sitebrief.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteBriefError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitebrief.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitebrief";

// ---------------------------------------------------------------------------
// Config structs (matching sitebrief.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Crawl policies.
    #[serde(default)]
    pub crawl_policies: CrawlPoliciesConfig,

    /// Deduplication tuning.
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Classifier tuning.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// OpenRouter settings for Q&A generation.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default maximum crawl depth from the seed.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Default maximum number of pages fetched per run.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Default concurrent crawl workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Hard upper bound on tokens in the compiled prompt.
    #[serde(default = "default_token_ceiling")]
    pub token_ceiling: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            concurrency: default_concurrency(),
            token_ceiling: default_token_ceiling(),
        }
    }
}

fn default_max_depth() -> u32 {
    3
}
fn default_max_pages() -> usize {
    200
}
fn default_concurrency() -> usize {
    4
}
fn default_token_ceiling() -> usize {
    6000
}

/// `[crawl_policies]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlPoliciesConfig {
    /// Whether subdomains of the seed host are in scope.
    #[serde(default)]
    pub include_subdomains: bool,

    /// Minimum ms between requests to the same host.
    #[serde(default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Retry count for transient fetch failures.
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,

    /// Base backoff delay in ms (doubled per retry).
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Wall-clock budget for the whole run, in seconds.
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

impl Default for CrawlPoliciesConfig {
    fn default() -> Self {
        Self {
            include_subdomains: false,
            politeness_delay_ms: default_politeness_delay_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            fetch_retries: default_fetch_retries(),
            retry_base_ms: default_retry_base_ms(),
            max_body_bytes: default_max_body_bytes(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

fn default_politeness_delay_ms() -> u64 {
    500
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_fetch_retries() -> u32 {
    2
}
fn default_retry_base_ms() -> u64 {
    500
}
fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024
}
fn default_run_timeout_secs() -> u64 {
    300
}

/// `[dedup]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Enable shingled near-duplicate detection (trades determinism for recall).
    #[serde(default)]
    pub near_duplicate: bool,

    /// Jaccard similarity above which a page counts as a near-duplicate.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Words per shingle.
    #[serde(default = "default_shingle_size")]
    pub shingle_size: usize,

    /// How many recently registered pages to compare against.
    #[serde(default = "default_dedup_window")]
    pub window: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            near_duplicate: false,
            similarity_threshold: default_similarity_threshold(),
            shingle_size: default_shingle_size(),
            window: default_dedup_window(),
        }
    }
}

fn default_similarity_threshold() -> f64 {
    0.9
}
fn default_shingle_size() -> usize {
    4
}
fn default_dedup_window() -> usize {
    64
}

/// `[classifier]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Segments shorter than this many characters are dropped as noise.
    #[serde(default = "default_min_segment_chars")]
    pub min_segment_chars: usize,

    /// Minimum normalized score a category must reach; below it, `Other`.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_segment_chars: default_min_segment_chars(),
            min_score: default_min_score(),
        }
    }
}

fn default_min_segment_chars() -> usize {
    20
}
fn default_min_score() -> f32 {
    0.05
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Default model to use for Q&A generation.
    #[serde(default = "default_model")]
    pub default_model: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            default_model: default_model(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "moonshotai/kimi-k2.5".into()
}

// ---------------------------------------------------------------------------
// Compile config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one compile run — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Maximum crawl depth from the seed URL.
    pub max_depth: u32,
    /// Maximum pages fetched per run.
    pub max_pages: usize,
    /// Concurrent crawl workers.
    pub concurrency: usize,
    /// Hard token ceiling for the compiled prompt.
    pub token_ceiling: usize,
    /// Whether subdomains of the seed are in scope.
    pub include_subdomains: bool,
    /// Minimum ms between requests to the same host.
    pub politeness_delay_ms: u64,
    /// Per-request timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// Retry count for transient fetch failures.
    pub fetch_retries: u32,
    /// Base backoff delay in ms.
    pub retry_base_ms: u64,
    /// Maximum response body size in bytes.
    pub max_body_bytes: usize,
    /// Wall-clock budget for the run, in seconds.
    pub run_timeout_secs: u64,
    /// Dedup tuning.
    pub dedup: DedupConfig,
    /// Classifier tuning.
    pub classifier: ClassifierConfig,
}

impl From<&AppConfig> for CompileConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_depth: config.defaults.max_depth,
            max_pages: config.defaults.max_pages,
            concurrency: config.defaults.concurrency,
            token_ceiling: config.defaults.token_ceiling,
            include_subdomains: config.crawl_policies.include_subdomains,
            politeness_delay_ms: config.crawl_policies.politeness_delay_ms,
            fetch_timeout_secs: config.crawl_policies.fetch_timeout_secs,
            fetch_retries: config.crawl_policies.fetch_retries,
            retry_base_ms: config.crawl_policies.retry_base_ms,
            max_body_bytes: config.crawl_policies.max_body_bytes,
            run_timeout_secs: config.crawl_policies.run_timeout_secs,
            dedup: config.dedup.clone(),
            classifier: config.classifier.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sitebrief/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SiteBriefError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sitebrief/sitebrief.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteBriefError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SiteBriefError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SiteBriefError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SiteBriefError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SiteBriefError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the OpenRouter API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(SiteBriefError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable,\n\
             or pass --offline to use the extractive generator."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("max_depth"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.max_depth, 3);
        assert_eq!(parsed.defaults.max_pages, 200);
        assert_eq!(parsed.crawl_policies.politeness_delay_ms, 500);
        assert_eq!(parsed.dedup.shingle_size, 4);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
max_depth = 1
token_ceiling = 2000

[dedup]
near_duplicate = true
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.max_depth, 1);
        assert_eq!(config.defaults.token_ceiling, 2000);
        // Untouched sections keep their defaults
        assert_eq!(config.defaults.max_pages, 200);
        assert!(config.dedup.near_duplicate);
        assert_eq!(config.dedup.window, 64);
        assert_eq!(config.classifier.min_segment_chars, 20);
    }

    #[test]
    fn compile_config_from_app_config() {
        let app = AppConfig::default();
        let compile = CompileConfig::from(&app);
        assert_eq!(compile.max_depth, 3);
        assert_eq!(compile.concurrency, 4);
        assert_eq!(compile.max_body_bytes, 5 * 1024 * 1024);
        assert!(!compile.include_subdomains);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openrouter.api_key_env = "SB_TEST_NONEXISTENT_KEY_98765".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}

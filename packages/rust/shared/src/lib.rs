//! Shared types, error model, and configuration for sitebrief.
//!
//! This crate is the foundation depended on by all other sitebrief crates.
//! It provides:
//! - [`SiteBriefError`] / [`FetchError`] — the unified error taxonomy
//! - Domain types ([`PageRecord`], [`ContentBlock`], [`FactUnit`], [`CompiledPrompt`])
//! - Configuration ([`AppConfig`], [`CompileConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ClassifierConfig, CompileConfig, CrawlPoliciesConfig, DedupConfig, DefaultsConfig,
    OpenRouterConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_api_key,
};
pub use error::{FetchError, Result, SiteBriefError};
pub use types::{
    Category, CompiledPrompt, ContentBlock, FactUnit, PageRecord, QaPair, RunId, RunMetrics,
    RunReport,
};

//! Bounded, scope-aware crawling primitives.
//!
//! This crate provides:
//! - [`normalizer`] — URL canonicalization and validation
//! - [`frontier`] — the crawl queue + visited set with scope/depth/page bounds
//! - [`fetcher`] — single-page retrieval with timeout, retry, and size limits
//! - [`extractor`] — boilerplate-stripping text and link extraction
//!
//! Scope filtering is the frontier's responsibility alone; the extractor is
//! scope-agnostic so it stays reusable.

pub mod extractor;
pub mod fetcher;
pub mod frontier;
pub mod normalizer;

pub use extractor::{Extraction, extract};
pub use fetcher::{FetchedPage, Fetcher};
pub use frontier::{CrawlTarget, Frontier, FrontierConfig, RunState};
pub use normalizer::normalize;

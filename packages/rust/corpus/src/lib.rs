//! Corpus refinement: deduplication and relevance classification.
//!
//! This crate provides:
//! - [`dedup`] — content fingerprinting and (opt-in) near-duplicate detection
//! - [`classifier`] — heading-boundary segmentation and category scoring

pub mod classifier;
pub mod dedup;

pub use classifier::classify;
pub use dedup::{ContentFingerprint, DedupIndex, Verdict, fingerprint};

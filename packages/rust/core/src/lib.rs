//! Core pipeline orchestration for sitebrief.
//!
//! This crate ties crawling, deduplication, classification, synthesis, and
//! prompt assembly into the end-to-end `compile` workflow.

pub mod assembler;
pub mod pipeline;

pub use assembler::assemble;
pub use pipeline::{ProgressReporter, SilentProgress, compile};

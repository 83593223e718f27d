//! Q&A synthesis: collaborator traits and the thin adapter over them.
//!
//! The pipeline's only nondeterministic dependency — the external text
//! generation service — is isolated behind the [`Generator`] trait so the
//! rest of the pipeline stays deterministic and testable with a stub.
//! Token accounting goes through [`TokenCounter`] for the same reason: it
//! must match whatever scheme the prompt's eventual consumer uses.
//!
//! This crate provides:
//! - [`Generator`] / [`TokenCounter`] — the collaborator traits
//! - [`openrouter`] — a `Generator` speaking OpenRouter's chat API
//! - [`extractive`] — a deterministic offline `Generator`
//! - [`synthesizer`] — ContentBlock → FactUnit adaptation
//! - [`tokenizer`] — the default heuristic `TokenCounter`

pub mod extractive;
pub mod openrouter;
pub mod synthesizer;
pub mod tokenizer;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use sitebrief_shared::error::Result;
use sitebrief_shared::types::{Category, QaPair};

pub use extractive::ExtractiveGenerator;
pub use openrouter::OpenRouterGenerator;
pub use synthesizer::Synthesizer;
pub use tokenizer::HeuristicTokenCounter;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// One generation request, carrying its stable idempotency key.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Classified block text to derive facts from.
    pub text: String,
    /// Category hint for the generator's prompt.
    pub category: Category,
    /// Stable key over (text, category): identical input always produces
    /// the identical key, so retries and caching collaborators never see
    /// divergent requests for the same block.
    pub request_key: String,
}

/// External text-generation collaborator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Derive question/answer or fact units from one content block.
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<QaPair>>;
}

/// External tokenizer collaborator.
///
/// Must approximate the token accounting of the prompt's eventual consumer
/// closely enough that the budgeter's ceiling is not violated downstream.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Compute the stable request key for a block's generation call.
pub fn request_key(text: &str, category: Category) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(category.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_key_is_deterministic() {
        let a = request_key("We sell chairs.", Category::Product);
        let b = request_key("We sell chairs.", Category::Product);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn request_key_differs_by_category() {
        let a = request_key("We sell chairs.", Category::Product);
        let b = request_key("We sell chairs.", Category::Service);
        assert_ne!(a, b);
    }
}

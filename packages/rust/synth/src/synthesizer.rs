//! ContentBlock → FactUnit adaptation.
//!
//! The synthesizer is deliberately thin: it formats one generation request
//! per block, hands it to the [`Generator`] collaborator, and prices each
//! returned unit via the [`TokenCounter`]. Each unit's estimate covers its
//! rendered form plus the separator the assembler will join it with, so the
//! sum of estimates bounds the final prompt's cost from above.

use tracing::debug;

use sitebrief_shared::error::Result;
use sitebrief_shared::types::{ContentBlock, FactUnit};

use crate::{GenerationRequest, Generator, TokenCounter, request_key};

/// Separator the assembler joins units with; priced into each estimate.
pub const UNIT_SEPARATOR: &str = "\n\n";

/// Thin adapter from classified blocks to priced fact units.
pub struct Synthesizer<'a> {
    generator: &'a dyn Generator,
    tokens: &'a dyn TokenCounter,
}

impl<'a> Synthesizer<'a> {
    pub fn new(generator: &'a dyn Generator, tokens: &'a dyn TokenCounter) -> Self {
        Self { generator, tokens }
    }

    /// Derive fact units from one block.
    ///
    /// Errors from the generator propagate; the caller treats them as
    /// non-fatal for the block and never for the run.
    pub async fn synthesize(&self, block: &ContentBlock) -> Result<Vec<FactUnit>> {
        let request = GenerationRequest {
            text: block.text.clone(),
            category: block.category,
            request_key: request_key(&block.text, block.category),
        };

        let pairs = self.generator.generate(&request).await?;

        let units: Vec<FactUnit> = pairs
            .into_iter()
            .filter(|pair| !pair.answer.trim().is_empty())
            .enumerate()
            .map(|(unit_index, pair)| {
                let rendered =
                    FactUnit::render_parts(pair.question.as_deref(), &pair.answer);
                let estimated_tokens = self
                    .tokens
                    .count_tokens(&format!("{rendered}{UNIT_SEPARATOR}"));

                FactUnit {
                    question: pair.question,
                    answer: pair.answer,
                    category: block.category,
                    relevance_score: block.relevance_score,
                    source_url: block.source_url.clone(),
                    depth: block.depth,
                    block_index: block.block_index,
                    unit_index,
                    estimated_tokens,
                }
            })
            .collect();

        debug!(
            source = %block.source_url,
            block = block.block_index,
            units = units.len(),
            "block synthesized"
        );
        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractive::ExtractiveGenerator;
    use crate::tokenizer::HeuristicTokenCounter;
    use sitebrief_shared::types::Category;
    use url::Url;

    fn block(text: &str, category: Category) -> ContentBlock {
        ContentBlock {
            source_url: Url::parse("https://shop.example/faq").unwrap(),
            depth: 1,
            block_index: 3,
            category,
            text: text.into(),
            relevance_score: 0.8,
        }
    }

    #[tokio::test]
    async fn units_inherit_block_provenance() {
        let generator = ExtractiveGenerator;
        let tokens = HeuristicTokenCounter::new();
        let synthesizer = Synthesizer::new(&generator, &tokens);

        let units = synthesizer
            .synthesize(&block(
                "Do you ship internationally? Yes, to most countries.",
                Category::Faq,
            ))
            .await
            .unwrap();

        assert_eq!(units.len(), 1);
        let unit = &units[0];
        assert_eq!(unit.category, Category::Faq);
        assert_eq!(unit.relevance_score, 0.8);
        assert_eq!(unit.block_index, 3);
        assert_eq!(unit.unit_index, 0);
        assert_eq!(unit.id(), "https://shop.example/faq#3.0");
    }

    #[tokio::test]
    async fn estimates_cover_rendered_form_and_separator() {
        let generator = ExtractiveGenerator;
        let tokens = HeuristicTokenCounter::new();
        let synthesizer = Synthesizer::new(&generator, &tokens);

        let units = synthesizer
            .synthesize(&block("Delivery takes two weeks.", Category::Other))
            .await
            .unwrap();

        assert_eq!(units.len(), 1);
        let rendered = units[0].render();
        let expected = tokens.count_tokens(&format!("{rendered}{UNIT_SEPARATOR}"));
        assert_eq!(units[0].estimated_tokens, expected);
        assert!(units[0].estimated_tokens > 0);
    }

    #[tokio::test]
    async fn unit_indices_are_sequential() {
        let generator = ExtractiveGenerator;
        let tokens = HeuristicTokenCounter::new();
        let synthesizer = Synthesizer::new(&generator, &tokens);

        let units = synthesizer
            .synthesize(&block(
                "We build oak furniture by hand. Delivery takes two weeks. \
                 Returns are accepted for thirty days.",
                Category::Product,
            ))
            .await
            .unwrap();

        assert_eq!(units.len(), 3);
        for (i, unit) in units.iter().enumerate() {
            assert_eq!(unit.unit_index, i);
        }
    }
}

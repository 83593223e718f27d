//! Deterministic offline generator.
//!
//! Derives fact units directly from block text with no external calls:
//! existing question/answer shapes are preserved, everything else becomes
//! bare facts, one per sentence. Used by `--offline` runs and as the stub
//! that keeps the rest of the pipeline independently testable.

use async_trait::async_trait;

use sitebrief_shared::error::Result;
use sitebrief_shared::types::QaPair;

use crate::{GenerationRequest, Generator};

/// Cap on units derived from a single block.
const MAX_UNITS_PER_BLOCK: usize = 5;

/// Sentences shorter than this are dropped as fragments.
const MIN_SENTENCE_CHARS: usize = 15;

/// Extractive, deterministic [`Generator`] implementation.
#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator;

#[async_trait]
impl Generator for ExtractiveGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<QaPair>> {
        Ok(extract_units(&request.text))
    }
}

fn extract_units(text: &str) -> Vec<QaPair> {
    let sentences = split_sentences(text);
    let mut units = Vec::new();
    let mut i = 0;

    while i < sentences.len() && units.len() < MAX_UNITS_PER_BLOCK {
        let sentence = &sentences[i];

        // A question followed by prose keeps its Q&A shape
        if sentence.ends_with('?') && i + 1 < sentences.len() {
            units.push(QaPair {
                question: Some(strip_qa_marker(sentence).to_string()),
                answer: strip_qa_marker(&sentences[i + 1]).to_string(),
            });
            i += 2;
            continue;
        }

        if sentence.chars().count() >= MIN_SENTENCE_CHARS && !sentence.ends_with('?') {
            units.push(QaPair {
                question: None,
                answer: sentence.clone(),
            });
        }
        i += 1;
    }

    units
}

/// Drop a leading `Q:`/`A:` marker so rendered units do not repeat it.
fn strip_qa_marker(sentence: &str) -> &str {
    for marker in ["Q:", "q:", "A:", "a:"] {
        if let Some(rest) = sentence.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    sentence
}

/// Split text into trimmed sentences at terminal punctuation and newlines.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch == '\n' {
            flush(&mut current, &mut sentences);
            continue;
        }
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            flush(&mut current, &mut sentences);
        }
    }
    flush(&mut current, &mut sentences);

    sentences
}

fn flush(current: &mut String, sentences: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}

//! Heuristic relevance classification of extracted page text.
//!
//! Splits a page's text content at heading-like boundaries into candidate
//! segments, scores each against per-category keyword sets, and emits
//! [`ContentBlock`]s. `Other` is the floor when no category clears the
//! minimum score; relevance is the normalized keyword-density score
//! clamped to `[0, 1]`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use sitebrief_shared::config::ClassifierConfig;
use sitebrief_shared::types::{Category, ContentBlock, PageRecord};

/// A heading-like block: short, few words, no terminal sentence punctuation.
const HEADING_MAX_CHARS: usize = 80;
const HEADING_MAX_WORDS: usize = 12;

/// Multiplier turning raw keyword density into the `[0, 1]` relevance scale.
/// One hit per ten words saturates the score.
const DENSITY_SCALE: f32 = 10.0;

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\d[\d\s().-]{6,}\d").expect("valid regex")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Keyword sets
// ---------------------------------------------------------------------------

const PRODUCT_WORDS: &[&str] = &[
    "product", "products", "price", "prices", "pricing", "buy", "shop", "order", "catalog",
    "catalogue", "stock", "sale", "warranty", "shipping", "delivery",
];
const PRODUCT_PHRASES: &[&str] = &["add to cart", "in stock", "free shipping"];

const SERVICE_WORDS: &[&str] = &[
    "service", "services", "appointment", "booking", "consultation", "repair", "installation",
    "maintenance", "support", "estimate", "quote",
];
const SERVICE_PHRASES: &[&str] = &["we offer", "book now", "schedule a"];

const FAQ_WORDS: &[&str] = &["faq", "faqs"];
const FAQ_PHRASES: &[&str] = &[
    "frequently asked",
    "q:",
    "how do i",
    "how can i",
    "what is",
    "can i",
    "do you",
];

const CONTACT_WORDS: &[&str] = &[
    "contact", "phone", "email", "address", "hours", "location", "directions", "call", "visit",
];
const CONTACT_PHRASES: &[&str] = &["get in touch", "reach us", "find us"];

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify a deduplicated page into zero or more content blocks.
///
/// Segments shorter than the configured minimum are discarded as noise.
pub fn classify(page: &PageRecord, config: &ClassifierConfig) -> Vec<ContentBlock> {
    let segments = segment(&page.text_content);

    let mut blocks = Vec::new();
    for text in segments {
        if text.chars().count() < config.min_segment_chars {
            continue;
        }

        let (category, relevance) = score_segment(&text, config.min_score);
        blocks.push(ContentBlock {
            source_url: page.url.clone(),
            depth: page.depth,
            block_index: blocks.len(),
            category,
            text,
            relevance_score: relevance,
        });
    }

    debug!(url = %page.url, blocks = blocks.len(), "page classified");
    blocks
}

/// Split text content into segments at heading-like boundaries.
///
/// The extractor joins structural blocks with blank lines; a heading starts
/// a new segment and is kept as its first line so the generator sees the
/// section context.
fn segment(text_content: &str) -> Vec<String> {
    let mut segments: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for block in text_content.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        if is_heading_like(block) && !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
        current.push(block);
    }
    if !current.is_empty() {
        segments.push(current);
    }

    segments.into_iter().map(|s| s.join("\n")).collect()
}

fn is_heading_like(block: &str) -> bool {
    block.chars().count() <= HEADING_MAX_CHARS
        && block.split_whitespace().count() <= HEADING_MAX_WORDS
        && !block.ends_with(['.', '!', '?', ':', ';', ','])
}

/// Score a segment against every category; highest wins, `Other` is the
/// floor below `min_score`. Ties resolve by category priority so the
/// outcome never depends on evaluation order.
fn score_segment(text: &str, min_score: f32) -> (Category, f32) {
    let lower = text.to_lowercase();
    let word_count = lower.split_whitespace().count().max(1);

    let scored = [
        (Category::Product, keyword_hits(&lower, PRODUCT_WORDS, PRODUCT_PHRASES)),
        (Category::Service, keyword_hits(&lower, SERVICE_WORDS, SERVICE_PHRASES)),
        (Category::Faq, faq_hits(&lower)),
        (Category::Contact, contact_hits(&lower)),
    ];

    let mut best = (Category::Other, 0.0f32);
    for (category, hits) in scored {
        let density = hits as f32 / word_count as f32;
        let score = (density * DENSITY_SCALE).clamp(0.0, 1.0);
        let better = score > best.1
            || (score == best.1 && score > 0.0 && category.priority() < best.0.priority());
        if better {
            best = (category, score);
        }
    }

    if best.1 < min_score {
        (Category::Other, best.1)
    } else {
        best
    }
}

fn keyword_hits(lower: &str, words: &[&str], phrases: &[&str]) -> usize {
    let word_hits = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| words.contains(w))
        .count();
    let phrase_hits: usize = phrases.iter().map(|p| lower.matches(p).count()).sum();
    word_hits + phrase_hits
}

fn faq_hits(lower: &str) -> usize {
    keyword_hits(lower, FAQ_WORDS, FAQ_PHRASES) + lower.matches('?').count()
}

fn contact_hits(lower: &str) -> usize {
    keyword_hits(lower, CONTACT_WORDS, CONTACT_PHRASES)
        + PHONE_RE.find_iter(lower).count()
        + EMAIL_RE.find_iter(lower).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use url::Url;

    fn page(text: &str) -> PageRecord {
        PageRecord {
            url: Url::parse("https://shop.example/page").unwrap(),
            depth: 1,
            http_status: 200,
            fetched_at: Utc::now(),
            raw_size: text.len(),
            title: None,
            text_content: text.to_string(),
            outbound_links: vec![],
        }
    }

    fn config() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    #[test]
    fn faq_page_classifies_as_faq() {
        let text = "Frequently Asked Questions\n\n\
                    Q: Do you ship internationally?\n\n\
                    Yes, we ship to most countries within two weeks.";
        let blocks = classify(&page(text), &config());

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].category, Category::Faq);
        assert!(blocks[0].relevance_score > 0.0);
    }

    #[test]
    fn contact_details_classify_as_contact() {
        let text = "Contact Us\n\n\
                    Call us on +1 (555) 010-7788 or email hello@shop.example. \
                    Our address is 12 Mill Lane and our opening hours are 9 to 5.";
        let blocks = classify(&page(text), &config());

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].category, Category::Contact);
    }

    #[test]
    fn product_copy_classifies_as_product() {
        let text = "Oak Chairs\n\n\
                    Browse our catalog of handmade products. Every chair ships with a \
                    five year warranty and free shipping on orders over fifty dollars.";
        let blocks = classify(&page(text), &config());

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].category, Category::Product);
    }

    #[test]
    fn plain_prose_falls_back_to_other() {
        let text = "Our Story\n\n\
                    The workshop was founded in 1998 by two brothers who loved wood. \
                    It has grown slowly and deliberately ever since.";
        let blocks = classify(&page(text), &config());

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].category, Category::Other);
    }

    #[test]
    fn headings_start_new_segments() {
        let text = "Products\n\n\
                    We sell oak chairs and walnut tables at fair prices.\n\n\
                    Contact\n\n\
                    Email hello@shop.example or call +1 555 010 7788 to reach us.";
        let blocks = classify(&page(text), &config());

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].category, Category::Product);
        assert_eq!(blocks[0].block_index, 0);
        assert_eq!(blocks[1].category, Category::Contact);
        assert_eq!(blocks[1].block_index, 1);
        assert!(blocks[0].text.starts_with("Products"));
    }

    #[test]
    fn short_segments_are_discarded_as_noise() {
        let text = "Menu\n\nHome";
        let blocks = classify(&page(text), &config());
        assert!(blocks.is_empty());
    }

    #[test]
    fn relevance_is_clamped_to_unit_interval() {
        let text = "buy buy buy buy buy buy buy buy buy buy buy buy buy buy buy buy";
        let blocks = classify(&page(text), &config());
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].relevance_score <= 1.0);
        assert!(blocks[0].relevance_score > 0.0);
    }

    #[test]
    fn classification_is_deterministic() {
        let text = "Products\n\nWe sell chairs at good prices.\n\nContact\n\nEmail hi@shop.example today.";
        let a = classify(&page(text), &config());
        let b = classify(&page(text), &config());
        let pairs: Vec<_> = a.iter().zip(b.iter()).collect();
        assert_eq!(a.len(), b.len());
        for (x, y) in pairs {
            assert_eq!(x.category, y.category);
            assert_eq!(x.relevance_score, y.relevance_score);
            assert_eq!(x.text, y.text);
        }
    }
}

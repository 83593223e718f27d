//! Core domain types for the sitebrief compilation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Content category assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Product,
    Service,
    Faq,
    Contact,
    Other,
}

impl Category {
    /// Assembly priority rank — lower packs first on relevance ties.
    ///
    /// FAQ content is ranked highest: it is already in question/answer
    /// shape, which is what a voice agent answers with.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Faq => 0,
            Self::Product => 1,
            Self::Service => 2,
            Self::Contact => 3,
            Self::Other => 4,
        }
    }

    /// Stable lowercase name, used in prompts and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Service => "service",
            Self::Faq => "faq",
            Self::Contact => "contact",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PageRecord
// ---------------------------------------------------------------------------

/// One successfully fetched and extracted page. Immutable after extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// Final URL after redirects — this is what scope checks apply to.
    pub url: Url,
    /// Crawl depth at which the page was scheduled.
    pub depth: u32,
    /// HTTP status of the successful response.
    pub http_status: u16,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
    /// Raw response body size in bytes.
    pub raw_size: usize,
    /// Page title, if one was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Normalized text content (structural blocks joined by blank lines).
    pub text_content: String,
    /// Outbound links, already resolved and normalized.
    pub outbound_links: Vec<Url>,
}

// ---------------------------------------------------------------------------
// ContentBlock
// ---------------------------------------------------------------------------

/// A classified, deduplicated unit of page text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Page the block came from.
    pub source_url: Url,
    /// Crawl depth of the source page.
    pub depth: u32,
    /// Position of the block within its page (0-based).
    pub block_index: usize,
    /// Assigned category.
    pub category: Category,
    /// Segment text.
    pub text: String,
    /// Normalized keyword-density score in `[0, 1]`.
    pub relevance_score: f32,
}

// ---------------------------------------------------------------------------
// FactUnit
// ---------------------------------------------------------------------------

/// A question/answer pair returned by the generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaPair {
    /// Question text; absent for bare facts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Answer or fact text.
    pub answer: String,
}

/// A fact derived from a [`ContentBlock`], carrying its token cost. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactUnit {
    /// Question text, when the unit is in Q&A form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Answer or fact text.
    pub answer: String,
    /// Category inherited from the source block.
    pub category: Category,
    /// Relevance inherited from the source block.
    pub relevance_score: f32,
    /// Source page URL.
    pub source_url: Url,
    /// Crawl depth of the source page.
    pub depth: u32,
    /// Source block position within its page.
    pub block_index: usize,
    /// Position within the units generated for the block.
    pub unit_index: usize,
    /// Token cost of the rendered unit, including its joining separator.
    pub estimated_tokens: usize,
}

impl FactUnit {
    /// Stable identifier, unique within a run and deterministic across runs.
    pub fn id(&self) -> String {
        format!(
            "{}#{}.{}",
            self.source_url, self.block_index, self.unit_index
        )
    }

    /// Render a question/answer pair (or bare fact) as prompt text.
    pub fn render_parts(question: Option<&str>, answer: &str) -> String {
        match question {
            Some(q) => format!("Q: {q}\nA: {answer}"),
            None => format!("- {answer}"),
        }
    }

    /// Render the unit as prompt text.
    pub fn render(&self) -> String {
        Self::render_parts(self.question.as_deref(), &self.answer)
    }
}

// ---------------------------------------------------------------------------
// CompiledPrompt
// ---------------------------------------------------------------------------

/// The terminal artifact of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledPrompt {
    /// Assembled prompt text. Never exceeds the token ceiling.
    pub text: String,
    /// IDs of the included fact units, in assembly order.
    pub included: Vec<String>,
    /// Total estimated tokens of the assembled text.
    pub total_tokens: usize,
    /// True iff at least one unit was skipped for budget reasons.
    pub truncated: bool,
}

// ---------------------------------------------------------------------------
// RunMetrics / RunReport
// ---------------------------------------------------------------------------

/// Per-run observability counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Pages fetched and processed successfully.
    pub pages_visited: usize,
    /// Pages skipped: fetch failures, out-of-scope redirects, empty extractions.
    pub pages_skipped: usize,
    /// Pages dropped as exact or near duplicates.
    pub duplicates_dropped: usize,
    /// Content blocks produced by the classifier.
    pub blocks_classified: usize,
    /// Fact units produced by the synthesizer.
    pub fact_units_synthesized: usize,
    /// Blocks whose generation call failed (skipped, non-fatal).
    pub generation_failures: usize,
}

/// Full result of one compile run, serialized as `report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: RunId,
    /// Seed URL the crawl started from.
    pub seed: Url,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Observability counters.
    pub metrics: RunMetrics,
    /// The compiled prompt.
    pub prompt: CompiledPrompt,
}

//! Token budgeter / prompt assembler.
//!
//! Ranks fact units deterministically and greedily packs them under the
//! hard token ceiling. Units are skipped whole, never truncated mid-text —
//! a clipped sentence is worse for a voice agent than a missing one. The
//! output is a pure function of the unit multiset: worker scheduling during
//! the crawl cannot change a byte of it.

use std::cmp::Ordering;

use tracing::{debug, instrument};

use sitebrief_shared::types::{CompiledPrompt, FactUnit};
use sitebrief_synth::synthesizer::UNIT_SEPARATOR;

/// Total order over fact units: relevance first, then category priority,
/// then discovery order — (depth, source URL, block, unit), which is stable
/// across runs regardless of how workers interleaved.
fn rank(a: &FactUnit, b: &FactUnit) -> Ordering {
    b.relevance_score
        .total_cmp(&a.relevance_score)
        .then_with(|| a.category.priority().cmp(&b.category.priority()))
        .then_with(|| a.depth.cmp(&b.depth))
        .then_with(|| a.source_url.as_str().cmp(b.source_url.as_str()))
        .then_with(|| a.block_index.cmp(&b.block_index))
        .then_with(|| a.unit_index.cmp(&b.unit_index))
}

/// Assemble fact units into a prompt under `ceiling` tokens.
///
/// `truncated` is set iff at least one unit was skipped for budget reasons;
/// running out of units does not set it. A unit whose own estimate exceeds
/// the ceiling is always skipped, regardless of position.
#[instrument(skip_all, fields(units = units.len(), ceiling))]
pub fn assemble(units: &[FactUnit], ceiling: usize) -> CompiledPrompt {
    let mut ranked: Vec<&FactUnit> = units.iter().collect();
    ranked.sort_by(|a, b| rank(a, b));

    let mut included = Vec::new();
    let mut parts: Vec<String> = Vec::new();
    let mut total_tokens = 0usize;
    let mut truncated = false;

    for unit in ranked {
        if unit.estimated_tokens > ceiling
            || total_tokens + unit.estimated_tokens > ceiling
        {
            truncated = true;
            continue;
        }
        total_tokens += unit.estimated_tokens;
        included.push(unit.id());
        parts.push(unit.render());
    }

    debug!(
        included = included.len(),
        skipped = units.len() - included.len(),
        total_tokens,
        truncated,
        "prompt assembled"
    );

    CompiledPrompt {
        text: parts.join(UNIT_SEPARATOR),
        included,
        total_tokens,
        truncated,
    }
}

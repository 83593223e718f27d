//! End-to-end `compile` pipeline: seed URL → crawl → dedup → classify →
//! synthesize → assemble.
//!
//! A bounded worker pool drains the frontier concurrently; each worker runs
//! fetch → extract → dedup-check → classify for one target and feeds newly
//! discovered links back. The frontier owns all shared crawl state; blocks
//! and metrics sit behind their own mutexes. Per-page and per-block failures
//! never abort a run in progress — partial results always beat total failure.
//! Only a seed failure (`Aborted`) or an empty corpus (`EmptyResult`)
//! surfaces to the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use sitebrief_corpus::classifier;
use sitebrief_corpus::dedup::{DedupIndex, Verdict};
use sitebrief_crawler::fetcher::Fetcher;
use sitebrief_crawler::frontier::{CrawlTarget, Frontier, FrontierConfig, RunState};
use sitebrief_crawler::{extractor, normalizer};
use sitebrief_shared::config::CompileConfig;
use sitebrief_shared::error::{Result, SiteBriefError};
use sitebrief_shared::types::{ContentBlock, FactUnit, PageRecord, RunId, RunMetrics, RunReport};
use sitebrief_synth::{Generator, Synthesizer, TokenCounter};

use crate::assembler;

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each page fetch attempt.
    fn page_fetched(&self, url: &str, visited: usize);
    /// Called per block during synthesis.
    fn block_synthesized(&self, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_fetched(&self, _url: &str, _visited: usize) {}
    fn block_synthesized(&self, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Worker context
// ---------------------------------------------------------------------------

/// State shared by the crawl workers.
struct WorkerCtx {
    config: CompileConfig,
    frontier: Frontier,
    fetcher: Fetcher,
    dedup: Mutex<DedupIndex>,
    blocks: Mutex<Vec<ContentBlock>>,
    metrics: Mutex<RunMetrics>,
    /// Seed failure captured by whichever worker hits it.
    abort_reason: Mutex<Option<String>>,
    progress: Arc<dyn ProgressReporter>,
}

// ---------------------------------------------------------------------------
// Pipeline entry point
// ---------------------------------------------------------------------------

/// Run the full compile pipeline for one seed URL.
///
/// 1. Crawl within scope/depth/page bounds
/// 2. Deduplicate and classify page content
/// 3. Synthesize fact units via the generation collaborator
/// 4. Assemble the prompt under the token ceiling
#[instrument(skip_all, fields(seed = seed_raw))]
pub async fn compile(
    seed_raw: &str,
    config: &CompileConfig,
    generator: &dyn Generator,
    tokens: &dyn TokenCounter,
    progress: Arc<dyn ProgressReporter>,
) -> Result<RunReport> {
    let started_at = Utc::now();
    let run_id = RunId::new();

    let Some(seed) = normalizer::normalize(seed_raw) else {
        return Err(SiteBriefError::aborted(format!(
            "seed URL failed normalization: {seed_raw}"
        )));
    };

    info!(%run_id, %seed, "starting compile run");

    // --- Phase 1: Crawl ---
    progress.phase("Crawling site");
    let ctx = Arc::new(WorkerCtx {
        config: config.clone(),
        frontier: Frontier::new(&seed, FrontierConfig::from(config)),
        fetcher: Fetcher::new(config)?,
        dedup: Mutex::new(DedupIndex::new(config.dedup.clone())),
        blocks: Mutex::new(Vec::new()),
        metrics: Mutex::new(RunMetrics::default()),
        abort_reason: Mutex::new(None),
        progress: progress.clone(),
    });

    // The whole run carries one cancellation deadline; when it fires the
    // frontier stops issuing targets and in-flight fetches finish normally.
    let deadline = {
        let ctx = ctx.clone();
        let timeout = Duration::from_secs(config.run_timeout_secs);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!("run timeout reached, cancelling crawl");
            ctx.frontier.cancel().await;
        })
    };

    let workers: Vec<_> = (0..config.concurrency.max(1))
        .map(|_| {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                while let Some(target) = ctx.frontier.next().await {
                    process_target(&ctx, &target).await;
                    ctx.frontier.task_done().await;
                }
            })
        })
        .collect();

    for worker in workers {
        let _ = worker.await;
    }
    deadline.abort();

    if ctx.frontier.state().await == RunState::Aborted {
        let reason = ctx
            .abort_reason
            .lock()
            .await
            .take()
            .unwrap_or_else(|| "seed fetch failed".into());
        return Err(SiteBriefError::aborted(reason));
    }

    let mut blocks = std::mem::take(&mut *ctx.blocks.lock().await);
    let mut metrics = ctx.metrics.lock().await.clone();

    info!(
        pages_visited = metrics.pages_visited,
        pages_skipped = metrics.pages_skipped,
        duplicates_dropped = metrics.duplicates_dropped,
        blocks = blocks.len(),
        "crawl finished"
    );

    // Collection order depends on worker scheduling; synthesis walks the
    // blocks in a stable order so request sequencing is reproducible.
    blocks.sort_by(|a, b| {
        a.depth
            .cmp(&b.depth)
            .then_with(|| a.source_url.as_str().cmp(b.source_url.as_str()))
            .then_with(|| a.block_index.cmp(&b.block_index))
    });

    // --- Phase 2: Synthesize ---
    progress.phase("Synthesizing fact units");
    let synthesizer = Synthesizer::new(generator, tokens);
    let mut units: Vec<FactUnit> = Vec::new();
    let total_blocks = blocks.len();

    for (i, block) in blocks.iter().enumerate() {
        progress.block_synthesized(i + 1, total_blocks);
        match synthesizer.synthesize(block).await {
            Ok(block_units) => units.extend(block_units),
            Err(e) => {
                warn!(source = %block.source_url, block = block.block_index, error = %e,
                    "generation failed, skipping block");
                metrics.generation_failures += 1;
            }
        }
    }
    metrics.fact_units_synthesized = units.len();

    if units.is_empty() {
        return Err(SiteBriefError::EmptyResult);
    }

    // --- Phase 3: Assemble ---
    progress.phase("Assembling prompt");
    let prompt = assembler::assemble(&units, config.token_ceiling);

    let report = RunReport {
        run_id,
        seed,
        started_at,
        finished_at: Utc::now(),
        metrics,
        prompt,
    };

    info!(
        run_id = %report.run_id,
        fact_units = report.metrics.fact_units_synthesized,
        total_tokens = report.prompt.total_tokens,
        truncated = report.prompt.truncated,
        "compile run finished"
    );

    Ok(report)
}

// ---------------------------------------------------------------------------
// Per-target processing
// ---------------------------------------------------------------------------

/// Fetch → extract → dedup-check → classify for one target.
///
/// All failures are contained here: the worst outcome for a non-seed page is
/// a bumped `pages_skipped` counter.
async fn process_target(ctx: &WorkerCtx, target: &CrawlTarget) {
    let fetched = match ctx.fetcher.fetch(&target.url).await {
        Ok(fetched) => fetched,
        Err(e) => {
            warn!(url = %target.url, depth = target.depth, error = %e, "page fetch failed");
            ctx.metrics.lock().await.pages_skipped += 1;
            if target.depth == 0 {
                *ctx.abort_reason.lock().await =
                    Some(format!("seed fetch failed: {e} ({})", target.url));
                ctx.frontier.abort().await;
            }
            return;
        }
    };

    ctx.progress.page_fetched(fetched.url.as_str(), {
        ctx.metrics.lock().await.pages_visited + 1
    });

    // Redirects may have moved us. The resolved URL is what gets
    // scope-checked, and its normal form joins the visited set so another
    // redirect chain cannot land on the same page twice.
    let resolved =
        normalizer::normalize(fetched.url.as_str()).unwrap_or_else(|| fetched.url.clone());
    if resolved != target.url && !ctx.frontier.mark_visited(&resolved).await {
        ctx.metrics.lock().await.pages_skipped += 1;
        return;
    }
    if !ctx.frontier.in_scope(&resolved) {
        warn!(requested = %target.url, resolved = %resolved, "redirect left scope, page dropped");
        ctx.metrics.lock().await.pages_skipped += 1;
        return;
    }

    let extraction = extractor::extract(&fetched.body, &resolved);

    let page = PageRecord {
        url: resolved,
        depth: target.depth,
        http_status: fetched.status,
        fetched_at: fetched.fetched_at,
        raw_size: fetched.raw_size,
        title: extraction.title,
        text_content: extraction.text_content,
        outbound_links: extraction.outbound_links,
    };

    // Links feed back even off duplicate pages — boilerplate copy can still
    // link somewhere new. The frontier dedups URLs itself.
    ctx.frontier
        .record_discovered(&page.outbound_links, target.depth, &page.url)
        .await;

    if page.text_content.is_empty() {
        ctx.metrics.lock().await.pages_skipped += 1;
        return;
    }

    let verdict = ctx
        .dedup
        .lock()
        .await
        .check_and_register(&page.text_content);

    let mut metrics = ctx.metrics.lock().await;
    metrics.pages_visited += 1;
    match verdict {
        Verdict::Exact | Verdict::Near(_) => {
            metrics.duplicates_dropped += 1;
        }
        Verdict::Fresh(_) => {
            drop(metrics);
            let blocks = classifier::classify(&page, &ctx.config.classifier);
            let mut metrics = ctx.metrics.lock().await;
            metrics.blocks_classified += blocks.len();
            drop(metrics);
            ctx.blocks.lock().await.extend(blocks);
        }
    }
}

//! Crawl frontier: the to-visit queue plus visited set.
//!
//! The frontier is the single owner of all cross-worker crawl state
//! (queue, seen set, page counter, politeness slots) behind one mutex.
//! It enforces every termination guarantee the pipeline makes: scope,
//! depth, page count, and cancellation. Targets are served breadth-first —
//! ascending depth, then discovery order — so shallow pages are processed
//! before the page budget runs out.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, trace};
use url::Url;

use sitebrief_shared::config::CompileConfig;

// ---------------------------------------------------------------------------
// CrawlTarget
// ---------------------------------------------------------------------------

/// A scheduled page fetch. Immutable once created by the frontier.
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    /// Normalized absolute URL.
    pub url: Url,
    /// Distance from the seed.
    pub depth: u32,
    /// The page that linked here; `None` for the seed.
    pub origin: Option<Url>,
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Lifecycle of one crawl run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Constructed but not yet seeded.
    Idle,
    /// Serving targets.
    Running,
    /// All reachable in-scope work finished, or budget/cancellation drained it.
    Completed,
    /// The seed itself failed; pending work discarded.
    Aborted,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Bounds the frontier enforces.
#[derive(Debug, Clone)]
pub struct FrontierConfig {
    /// Targets deeper than this are rejected.
    pub max_depth: u32,
    /// Hard cap on targets issued per run.
    pub max_pages: usize,
    /// Whether subdomains of the seed host are in scope.
    pub include_subdomains: bool,
    /// Minimum spacing between requests to one host.
    pub politeness_delay: Duration,
}

impl From<&CompileConfig> for FrontierConfig {
    fn from(config: &CompileConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_pages: config.max_pages,
            include_subdomains: config.include_subdomains,
            politeness_delay: Duration::from_millis(config.politeness_delay_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// Queue entry (BFS priority)
// ---------------------------------------------------------------------------

struct QueueEntry {
    depth: u32,
    seq: u64,
    target: CrawlTarget,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.depth == other.depth && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // BinaryHeap is a max-heap; invert so the smallest (depth, seq) pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .depth
            .cmp(&self.depth)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ---------------------------------------------------------------------------
// Frontier
// ---------------------------------------------------------------------------

struct FrontierState {
    state: RunState,
    queue: BinaryHeap<QueueEntry>,
    /// Normalized URLs that were enqueued or visited. Nothing in here is
    /// ever fetched twice.
    seen: HashSet<String>,
    /// Targets handed out so far; bounded by `max_pages`.
    issued: usize,
    /// Targets handed out but not yet reported done.
    in_flight: usize,
    /// Monotonic discovery counter for the BFS tie-break.
    seq: u64,
    /// Earliest next request time per host.
    next_allowed: HashMap<String, Instant>,
    /// Links dropped for scope/depth reasons, for observability.
    dropped: usize,
    cancelled: bool,
}

/// The crawl queue + visited set governing crawl progress.
pub struct Frontier {
    config: FrontierConfig,
    seed_host: String,
    inner: Mutex<FrontierState>,
    notify: Notify,
}

impl Frontier {
    /// Create a frontier seeded with `seed` at depth 0.
    pub fn new(seed: &Url, config: FrontierConfig) -> Self {
        let seed_host = seed.host_str().unwrap_or_default().to_ascii_lowercase();

        let mut queue = BinaryHeap::new();
        let mut seen = HashSet::new();
        seen.insert(seed.as_str().to_string());
        queue.push(QueueEntry {
            depth: 0,
            seq: 0,
            target: CrawlTarget {
                url: seed.clone(),
                depth: 0,
                origin: None,
            },
        });

        Self {
            config,
            seed_host,
            inner: Mutex::new(FrontierState {
                state: RunState::Running,
                queue,
                seen,
                issued: 0,
                in_flight: 0,
                seq: 1,
                next_allowed: HashMap::new(),
                dropped: 0,
                cancelled: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Whether `url` belongs to the crawl's scope.
    ///
    /// Scope is the seed's host, optionally including its subdomains.
    pub fn in_scope(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        host == self.seed_host
            || (self.config.include_subdomains
                && host.ends_with(&format!(".{}", self.seed_host)))
    }

    /// Pop the next target, suspending for politeness or queue availability.
    ///
    /// Returns `None` once the run is terminal: page budget exhausted, queue
    /// drained with no work in flight, cancelled, or aborted.
    pub async fn next(&self) -> Option<CrawlTarget> {
        loop {
            let (slot, target) = {
                let mut st = self.inner.lock().await;

                match st.state {
                    RunState::Completed | RunState::Aborted => return None,
                    RunState::Idle | RunState::Running => {}
                }

                if st.cancelled || st.issued >= self.config.max_pages {
                    st.state = RunState::Completed;
                    st.queue.clear();
                    self.notify.notify_waiters();
                    return None;
                }

                match st.queue.pop() {
                    Some(entry) => {
                        st.issued += 1;
                        st.in_flight += 1;

                        // Reserve this host's next send slot while holding the
                        // lock; sleep happens outside it.
                        let host = entry
                            .target
                            .url
                            .host_str()
                            .unwrap_or_default()
                            .to_ascii_lowercase();
                        let now = Instant::now();
                        let slot = st.next_allowed.get(&host).copied().unwrap_or(now).max(now);
                        st.next_allowed
                            .insert(host, slot + self.config.politeness_delay);

                        trace!(url = %entry.target.url, depth = entry.depth, "issuing target");
                        (slot, entry.target)
                    }
                    None if st.in_flight > 0 => {
                        // Queue is empty but workers may still discover links.
                        let notified = self.notify.notified();
                        tokio::pin!(notified);
                        notified.as_mut().enable();
                        drop(st);
                        notified.await;
                        continue;
                    }
                    None => {
                        st.state = RunState::Completed;
                        self.notify.notify_waiters();
                        return None;
                    }
                }
            };

            tokio::time::sleep_until(slot).await;
            return Some(target);
        }
    }

    /// Feed links discovered on a page at `from_depth` back into the queue.
    ///
    /// Applies the scope and depth policies; out-of-policy and already-seen
    /// URLs are dropped, never fetched.
    pub async fn record_discovered(&self, links: &[Url], from_depth: u32, origin: &Url) {
        let depth = from_depth + 1;
        let mut st = self.inner.lock().await;

        if st.state != RunState::Running || st.cancelled {
            return;
        }

        let mut enqueued = 0usize;
        for url in links {
            if depth > self.config.max_depth || !self.in_scope(url) {
                st.dropped += 1;
                continue;
            }
            if !st.seen.insert(url.as_str().to_string()) {
                continue;
            }

            let seq = st.seq;
            st.seq += 1;
            st.queue.push(QueueEntry {
                depth,
                seq,
                target: CrawlTarget {
                    url: url.clone(),
                    depth,
                    origin: Some(origin.clone()),
                },
            });
            enqueued += 1;
        }

        if enqueued > 0 {
            debug!(enqueued, depth, origin = %origin, "links enqueued");
            self.notify.notify_waiters();
        }
    }

    /// Record a resolved URL (e.g. a redirect target) as visited.
    ///
    /// Returns `false` if it was already known, in which case the caller
    /// should treat the page as a duplicate fetch.
    pub async fn mark_visited(&self, url: &Url) -> bool {
        let mut st = self.inner.lock().await;
        st.seen.insert(url.as_str().to_string())
    }

    /// Report that an issued target finished processing (success or failure).
    pub async fn task_done(&self) {
        let mut st = self.inner.lock().await;
        st.in_flight = st.in_flight.saturating_sub(1);
        if st.state == RunState::Running && st.in_flight == 0 && st.queue.is_empty() {
            st.state = RunState::Completed;
        }
        self.notify.notify_waiters();
    }

    /// Stop issuing new targets; in-flight work finishes normally.
    ///
    /// Cancellation yields a completed (possibly smaller) run, not a failure.
    pub async fn cancel(&self) {
        let mut st = self.inner.lock().await;
        st.cancelled = true;
        self.notify.notify_waiters();
    }

    /// Abort the run after a fatal seed failure; pending work is discarded.
    pub async fn abort(&self) {
        let mut st = self.inner.lock().await;
        st.state = RunState::Aborted;
        st.queue.clear();
        self.notify.notify_waiters();
    }

    /// Current run state.
    pub async fn state(&self) -> RunState {
        self.inner.lock().await.state
    }

    /// Number of targets issued so far.
    pub async fn issued(&self) -> usize {
        self.inner.lock().await.issued
    }

    /// Links dropped for scope/depth reasons.
    pub async fn dropped(&self) -> usize {
        self.inner.lock().await.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FrontierConfig {
        FrontierConfig {
            max_depth: 3,
            max_pages: 200,
            include_subdomains: false,
            politeness_delay: Duration::ZERO,
        }
    }

    fn seed() -> Url {
        Url::parse("https://shop.example/").unwrap()
    }

    fn links(paths: &[&str]) -> Vec<Url> {
        paths
            .iter()
            .map(|p| Url::parse(&format!("https://shop.example{p}")).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn serves_breadth_first() {
        let frontier = Frontier::new(&seed(), config());

        let root = frontier.next().await.expect("seed issued");
        assert_eq!(root.depth, 0);

        frontier
            .record_discovered(&links(&["/a", "/b"]), 0, &root.url)
            .await;

        let a = frontier.next().await.unwrap();
        // Deeper links discovered before /b is served must not jump the queue
        frontier.record_discovered(&links(&["/a/deep"]), 1, &a.url).await;

        let b = frontier.next().await.unwrap();
        assert_eq!(b.depth, 1);
        assert_eq!(b.url.path(), "/b");

        let deep = frontier.next().await.unwrap();
        assert_eq!(deep.depth, 2);
        assert_eq!(deep.url.path(), "/a/deep");
    }

    #[tokio::test]
    async fn depth_limit_is_never_exceeded() {
        let frontier = Frontier::new(
            &seed(),
            FrontierConfig {
                max_depth: 1,
                ..config()
            },
        );

        let root = frontier.next().await.unwrap();
        frontier.record_discovered(&links(&["/a"]), 0, &root.url).await;
        let a = frontier.next().await.unwrap();
        assert_eq!(a.depth, 1);

        // Links found at depth 1 would be depth 2 — rejected
        frontier.record_discovered(&links(&["/a/b"]), 1, &a.url).await;
        frontier.task_done().await;
        frontier.task_done().await;

        assert!(frontier.next().await.is_none());
        assert_eq!(frontier.issued().await, 2);
        assert_eq!(frontier.dropped().await, 1);
    }

    #[tokio::test]
    async fn page_budget_is_never_exceeded() {
        let frontier = Frontier::new(
            &seed(),
            FrontierConfig {
                max_pages: 3,
                ..config()
            },
        );

        let root = frontier.next().await.unwrap();
        let many: Vec<String> = (0..10).map(|i| format!("/p{i}")).collect();
        let many: Vec<&str> = many.iter().map(String::as_str).collect();
        frontier.record_discovered(&links(&many), 0, &root.url).await;

        let mut issued = 1;
        while frontier.next().await.is_some() {
            issued += 1;
        }

        assert_eq!(issued, 3);
        assert_eq!(frontier.state().await, RunState::Completed);
        // Terminal state is sticky
        assert!(frontier.next().await.is_none());
    }

    #[tokio::test]
    async fn off_scope_links_are_dropped() {
        let frontier = Frontier::new(&seed(), config());
        let root = frontier.next().await.unwrap();

        let mixed = vec![
            Url::parse("https://shop.example/ok").unwrap(),
            Url::parse("https://other.example/nope").unwrap(),
            Url::parse("https://blog.shop.example/nope-either").unwrap(),
        ];
        frontier.record_discovered(&mixed, 0, &root.url).await;

        let next = frontier.next().await.unwrap();
        assert_eq!(next.url.path(), "/ok");
        frontier.task_done().await;
        frontier.task_done().await;
        assert!(frontier.next().await.is_none());
        assert_eq!(frontier.dropped().await, 2);
    }

    #[tokio::test]
    async fn subdomains_in_scope_when_enabled() {
        let frontier = Frontier::new(
            &seed(),
            FrontierConfig {
                include_subdomains: true,
                ..config()
            },
        );
        assert!(frontier.in_scope(&Url::parse("https://blog.shop.example/x").unwrap()));
        assert!(!frontier.in_scope(&Url::parse("https://evilshop.example/x").unwrap()));
        assert!(!frontier.in_scope(&Url::parse("https://shop.example.evil/x").unwrap()));
    }

    #[tokio::test]
    async fn duplicate_urls_enqueue_once() {
        let frontier = Frontier::new(&seed(), config());
        let root = frontier.next().await.unwrap();

        frontier.record_discovered(&links(&["/a", "/a"]), 0, &root.url).await;
        frontier.record_discovered(&links(&["/a"]), 0, &root.url).await;

        assert!(frontier.next().await.is_some());
        frontier.task_done().await;
        frontier.task_done().await;
        assert!(frontier.next().await.is_none());
        assert_eq!(frontier.issued().await, 2);
    }

    #[tokio::test]
    async fn mark_visited_detects_redirect_convergence() {
        let frontier = Frontier::new(&seed(), config());
        let resolved = Url::parse("https://shop.example/landing").unwrap();
        assert!(frontier.mark_visited(&resolved).await);
        assert!(!frontier.mark_visited(&resolved).await);
        // The seed itself is pre-seen
        assert!(!frontier.mark_visited(&seed()).await);
    }

    #[tokio::test]
    async fn completes_when_queue_drains_and_work_finishes() {
        let frontier = std::sync::Arc::new(Frontier::new(&seed(), config()));
        let root = frontier.next().await.unwrap();

        // A second consumer blocks on the empty queue until task_done
        let waiter = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.next().await })
        };

        frontier.record_discovered(&[], 0, &root.url).await;
        frontier.task_done().await;

        assert!(waiter.await.unwrap().is_none());
        assert_eq!(frontier.state().await, RunState::Completed);
    }

    #[tokio::test]
    async fn cancel_stops_issuing_but_is_not_an_abort() {
        let frontier = Frontier::new(&seed(), config());
        let root = frontier.next().await.unwrap();
        frontier.record_discovered(&links(&["/a", "/b"]), 0, &root.url).await;

        frontier.cancel().await;
        assert!(frontier.next().await.is_none());
        assert_eq!(frontier.state().await, RunState::Completed);
    }

    #[tokio::test]
    async fn abort_discards_pending_work() {
        let frontier = Frontier::new(&seed(), config());
        let root = frontier.next().await.unwrap();
        frontier.record_discovered(&links(&["/a"]), 0, &root.url).await;

        frontier.abort().await;
        assert!(frontier.next().await.is_none());
        assert_eq!(frontier.state().await, RunState::Aborted);
    }

    #[tokio::test(start_paused = true)]
    async fn politeness_spaces_same_host_requests() {
        let frontier = Frontier::new(
            &seed(),
            FrontierConfig {
                politeness_delay: Duration::from_millis(500),
                ..config()
            },
        );

        let start = Instant::now();
        let root = frontier.next().await.unwrap();
        frontier.record_discovered(&links(&["/a"]), 0, &root.url).await;

        frontier.next().await.unwrap();
        // Second same-host request waits for the reserved slot
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}

//! Content fingerprinting and duplicate suppression.
//!
//! Pages are keyed by a SHA-256 digest of their normalized text (lowercased,
//! punctuation and whitespace variance stripped), so the same copy rendered
//! with different markup still collides. The first page to register a
//! fingerprint wins; later arrivals are dropped.
//!
//! Near-duplicate mode additionally shingles the normalized text into word
//! n-grams and compares Jaccard similarity against a bounded window of
//! recently registered pages, catching boilerplate that differs only by a
//! timestamp or an ad slot. It is opt-in: retention becomes sensitive to
//! arrival order, so exact mode stays the default.

use std::collections::{HashSet, VecDeque};

use sha2::{Digest, Sha256};
use tracing::debug;

use sitebrief_shared::config::DedupConfig;

// ---------------------------------------------------------------------------
// ContentFingerprint
// ---------------------------------------------------------------------------

/// Fixed-size digest of normalized page text, used as the dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentFingerprint([u8; 32]);

impl std::fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Fingerprint normalized text.
pub fn fingerprint(text: &str) -> ContentFingerprint {
    let normalized = normalize_for_fingerprint(text);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    ContentFingerprint(hasher.finalize().into())
}

/// Lowercase and strip punctuation/whitespace variance: the canonical form
/// is alphanumeric words joined by single spaces.
fn normalize_for_fingerprint(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// DedupIndex
// ---------------------------------------------------------------------------

/// Outcome of checking a page against the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Unseen content; the page should be retained.
    Fresh(ContentFingerprint),
    /// Byte-for-byte (post-normalization) duplicate of a registered page.
    Exact,
    /// Similar above the configured threshold to a recently registered page.
    Near(f64),
}

/// Per-run duplicate index. One instance per pipeline run.
pub struct DedupIndex {
    config: DedupConfig,
    registered: HashSet<ContentFingerprint>,
    /// Shingle sets of recently registered pages, oldest first.
    recent: VecDeque<HashSet<u64>>,
}

impl DedupIndex {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            registered: HashSet::new(),
            recent: VecDeque::new(),
        }
    }

    /// Whether this fingerprint has already been registered.
    pub fn is_duplicate(&self, fp: &ContentFingerprint) -> bool {
        self.registered.contains(fp)
    }

    /// Check a page's text and, if fresh, register it. The first page with
    /// a given fingerprint wins; everything after is a duplicate.
    pub fn check_and_register(&mut self, text: &str) -> Verdict {
        let fp = fingerprint(text);
        if self.registered.contains(&fp) {
            return Verdict::Exact;
        }

        let shingles = if self.config.near_duplicate {
            let normalized = normalize_for_fingerprint(text);
            let shingles = shingle(&normalized, self.config.shingle_size);

            for seen in &self.recent {
                let similarity = jaccard(&shingles, seen);
                if similarity >= self.config.similarity_threshold {
                    debug!(similarity, "near-duplicate page dropped");
                    return Verdict::Near(similarity);
                }
            }
            Some(shingles)
        } else {
            None
        };

        self.registered.insert(fp);
        if let Some(shingles) = shingles {
            self.recent.push_back(shingles);
            while self.recent.len() > self.config.window {
                self.recent.pop_front();
            }
        }

        Verdict::Fresh(fp)
    }
}

/// Hash each overlapping `size`-word window of the normalized text.
fn shingle(normalized: &str, size: usize) -> HashSet<u64> {
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
    let size = size.max(1);

    if words.len() < size {
        if words.is_empty() {
            return HashSet::new();
        }
        return std::iter::once(hash_words(&words)).collect();
    }

    words.windows(size).map(hash_words).collect()
}

// FNV-1a: stable across processes, unlike the std hasher's random keys.
fn hash_words(words: &[&str]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for word in words {
        for byte in word.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash ^= u64::from(b' ');
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn jaccard(a: &HashSet<u64>, b: &HashSet<u64>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

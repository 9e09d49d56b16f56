//! Thread-safe, hot-reloadable matcher handle.
//!
//! The service holds the current artifact set behind
//! `RwLock<Option<Arc<Matcher>>>`. A reload builds the replacement matcher
//! entirely off-lock, then swaps the pointer under the write lock; readers
//! clone the inner `Arc` under the read lock, so a match that began before
//! the swap finishes on the old artifact set and one that begins after sees
//! the new one. No in-flight match can observe a mix.

use crate::artifact::ArtifactPaths;
use crate::matcher::stats::{MatchCounters, MatcherStats};
use crate::matcher::{MatchPolicy, Matcher, MatcherError, PhraseMatch};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

pub struct MatcherService {
    current: RwLock<Option<Arc<Matcher>>>,
    counters: MatchCounters,
}

impl MatcherService {
    /// An empty service; every match fails with `NotLoaded` until the first
    /// successful [`load`](Self::load).
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            counters: MatchCounters::new(),
        }
    }

    /// Load an artifact set and atomically swap it in. On failure the
    /// previous artifact set stays active.
    pub fn load(&self, paths: &ArtifactPaths) -> Result<(), MatcherError> {
        let matcher = Matcher::load(paths)?;
        *self.current.write() = Some(Arc::new(matcher));
        Ok(())
    }

    /// Like [`load`](Self::load), but refuse a replacement whose tokenizer
    /// or separator disagrees with the currently loaded build. Clients that
    /// cache encoded IDs across reloads should prefer this.
    pub fn reload(&self, paths: &ArtifactPaths) -> Result<(), MatcherError> {
        let matcher = Matcher::load(paths)?;
        if let Ok(current) = self.matcher() {
            current.manifest().validate_compatible(matcher.manifest())?;
        }
        *self.current.write() = Some(Arc::new(matcher));
        Ok(())
    }

    /// Snapshot the active matcher.
    pub fn matcher(&self) -> Result<Arc<Matcher>, MatcherError> {
        self.current
            .read()
            .as_ref()
            .cloned()
            .ok_or(MatcherError::NotLoaded)
    }

    pub fn match_tokens(
        &self,
        token_ids: &[u32],
        policy: MatchPolicy,
        max: usize,
    ) -> Result<Vec<PhraseMatch>, MatcherError> {
        let matcher = self.matcher()?;
        let started = Instant::now();
        let spans = matcher.match_tokens(token_ids, policy, max);
        self.counters
            .record(spans.len(), started.elapsed().as_micros() as u64);
        Ok(spans)
    }

    pub fn match_text_tokens<S: AsRef<str>>(
        &self,
        tokens: &[S],
        policy: MatchPolicy,
        max: usize,
    ) -> Result<Vec<PhraseMatch>, MatcherError> {
        let matcher = self.matcher()?;
        let started = Instant::now();
        let spans = matcher.match_text_tokens(tokens, policy, max);
        self.counters
            .record(spans.len(), started.elapsed().as_micros() as u64);
        Ok(spans)
    }

    pub fn encode_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<u32>, MatcherError> {
        Ok(self.matcher()?.encode_tokens(tokens))
    }

    pub fn stats(&self) -> Result<MatcherStats, MatcherError> {
        let matcher = self.matcher()?;
        let (p50_us, p95_us, p99_us) = self.counters.latency_percentiles();

        Ok(MatcherStats {
            version: matcher.manifest().version.clone(),
            loaded_at_ms: matcher.loaded_at_ms(),
            num_patterns: matcher.num_patterns(),
            heap_mb: matcher.heap_mb(),
            hits_total: self.counters.hits_total(),
            p50_us,
            p95_us,
            p99_us,
        })
    }

    /// True only when an artifact set is loaded and reports at least one
    /// pattern.
    pub fn healthcheck(&self) -> bool {
        self.matcher()
            .map(|m| m.num_patterns() > 0)
            .unwrap_or(false)
    }
}

impl Default for MatcherService {
    fn default() -> Self {
        Self::new()
    }
}

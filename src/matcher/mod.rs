//! Artifact loading and the core match loop.
//!
//! A [`Matcher`] owns one immutable artifact set: the deserialized
//! double-array Aho-Corasick automaton, the memory-mapped payload table,
//! the vocabulary, and the manifest. All operations after load are
//! read-only, so a `Matcher` behind an `Arc` is safe to share across any
//! number of matching threads. [`MatcherService`] layers hot reload and
//! observability on top.

pub mod policy;
pub mod service;
pub mod stats;

pub use policy::MatchPolicy;
pub use service::MatcherService;
pub use stats::MatcherStats;

use crate::artifact::manifest::{Manifest, ManifestError};
use crate::artifact::pattern;
use crate::artifact::payload::PayloadTable;
use crate::artifact::vocab::{Vocabulary, VocabError};
use crate::artifact::ArtifactPaths;
use daachorse::DoubleArrayAhoCorasick;
use policy::Hit;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Vocabulary error: {0}")]
    Vocab(#[from] VocabError),

    #[error("Automaton error: {0}")]
    Automaton(String),

    #[error("Artifact mismatch: {0}")]
    Mismatch(String),

    #[error("Matcher not loaded")]
    NotLoaded,
}

impl MatcherError {
    /// Whether the caller can recover by loading an artifact set and
    /// retrying, as opposed to the artifacts themselves being bad.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MatcherError::NotLoaded)
    }
}

/// A resolved span over the input token sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhraseMatch {
    pub start: usize,
    pub end: usize,
    pub phrase_id: u32,
    pub salience: f32,
    pub count: u32,
    pub n: u8,
}

/// One loaded artifact set, immutable after construction.
pub struct Matcher {
    automaton: DoubleArrayAhoCorasick<u32>,
    payloads: PayloadTable,
    vocab: Vocabulary,
    manifest: Manifest,
    loaded_at: SystemTime,
    heap_bytes: usize,
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("payloads", &self.payloads)
            .field("vocab", &self.vocab)
            .field("manifest", &self.manifest)
            .field("loaded_at", &self.loaded_at)
            .field("heap_bytes", &self.heap_bytes)
            .finish()
    }
}

impl Matcher {
    /// Load and cross-validate an artifact set.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, MatcherError> {
        let manifest = Manifest::load(&paths.manifest)?;

        // The three bulk loads are independent; overlap them.
        let (automaton_bytes, (payloads, vocab)) = rayon::join(
            || fs::read(&paths.automaton),
            || {
                rayon::join(
                    || PayloadTable::open(&paths.payloads),
                    || Vocabulary::load(&paths.vocab),
                )
            },
        );

        let automaton_bytes = automaton_bytes?;
        let payloads = payloads?;
        let vocab = vocab?;

        if automaton_bytes.len() < 16 {
            return Err(MatcherError::Automaton(format!(
                "automaton file too small ({} bytes)",
                automaton_bytes.len()
            )));
        }

        // The serialized form carries no checksum; the payload table is the
        // cross-check that the automaton belongs to this manifest.
        let (automaton, _) = unsafe {
            DoubleArrayAhoCorasick::<u32>::deserialize_unchecked(&automaton_bytes)
        };

        if payloads.len() != manifest.num_patterns {
            return Err(MatcherError::Mismatch(format!(
                "payload count mismatch: manifest says {}, table has {}",
                manifest.num_patterns,
                payloads.len()
            )));
        }

        if vocab.separator_id != manifest.separator_id {
            return Err(MatcherError::Mismatch(format!(
                "separator_id mismatch: manifest {}, vocab {}",
                manifest.separator_id, vocab.separator_id
            )));
        }

        let heap_bytes = automaton.heap_bytes()
            + payloads.bytes_len()
            + vocab.tokens.keys().map(|k| k.len() + 16).sum::<usize>();

        Ok(Self {
            automaton,
            payloads,
            vocab,
            manifest,
            loaded_at: SystemTime::now(),
            heap_bytes,
        })
    }

    /// Match a token-ID sequence and resolve overlaps under `policy`,
    /// returning at most `max` spans.
    pub fn match_tokens(
        &self,
        token_ids: &[u32],
        policy: MatchPolicy,
        max: usize,
    ) -> Vec<PhraseMatch> {
        if token_ids.is_empty() {
            return Vec::new();
        }

        let haystack = pattern::encode_ids(token_ids, self.manifest.separator_id);

        let hits: Vec<Hit> = self
            .automaton
            .find_overlapping_iter(&haystack)
            .filter_map(|m| {
                let pattern_index = m.value() as usize;
                self.payloads.get(pattern_index).map(|payload| Hit {
                    start: pattern::token_start(m.start()),
                    end: pattern::token_end(m.end()),
                    pattern_index,
                    payload,
                })
            })
            .collect();

        let mut resolved = policy::resolve_overlaps(hits, policy);
        resolved.truncate(max);

        resolved
            .into_iter()
            .map(|h| PhraseMatch {
                start: h.start,
                end: h.end,
                phrase_id: h.payload.phrase_id,
                salience: h.payload.salience,
                count: h.payload.count,
                n: h.payload.n,
            })
            .collect()
    }

    /// Encode token strings to IDs via the vocabulary; unknown tokens map
    /// to the `<UNK>` sentinel and can never match.
    pub fn encode_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<u32> {
        self.vocab.encode(tokens)
    }

    /// Encode-then-match convenience for string input.
    pub fn match_text_tokens<S: AsRef<str>>(
        &self,
        tokens: &[S],
        policy: MatchPolicy,
        max: usize,
    ) -> Vec<PhraseMatch> {
        let ids = self.encode_tokens(tokens);
        self.match_tokens(&ids, policy, max)
    }

    pub fn num_patterns(&self) -> usize {
        self.payloads.len()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn loaded_at(&self) -> SystemTime {
        self.loaded_at
    }

    pub fn loaded_at_ms(&self) -> u64 {
        self.loaded_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// Approximate resident size of the loaded artifacts.
    pub fn heap_mb(&self) -> f64 {
        self.heap_bytes as f64 / 1_048_576.0
    }
}

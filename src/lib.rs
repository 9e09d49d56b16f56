//! # phrasal - Phrase Discovery and Span Tagging
//!
//! phrasal is a weak-supervision toolkit that discovers domain-specific
//! multi-token phrases from a pre-tokenized corpus and annotates documents
//! with span labels pointing at the discovered phrases.
//!
//! ## Architecture
//!
//! Four stages compose a linear pipeline; each writes a durable artifact
//! consumed by the next:
//!
//! - [`mine`] - Stream documents and count n-grams above a frequency floor
//! - [`score`] - Score candidates against a background distribution
//! - [`build`] - Compile the phrase set into a matching artifact set
//! - [`matcher`] - Load artifacts and resolve spans over token streams
//! - [`tag`] - Batch driver that streams a corpus through the matcher
//!
//! ## Quick Start
//!
//! ```ignore
//! use phrasal::artifact::ArtifactPaths;
//! use phrasal::matcher::{Matcher, MatchPolicy};
//!
//! let paths = ArtifactPaths::in_dir("/path/to/artifacts");
//! let matcher = Matcher::load(&paths).unwrap();
//!
//! let tokens = vec!["machine".to_string(), "learning".to_string()];
//! let spans = matcher.match_text_tokens(&tokens, MatchPolicy::LeftmostLongest, 100);
//!
//! for span in spans {
//!     println!("[{}, {}) phrase_id={}", span.start, span.end, span.phrase_id);
//! }
//! ```
//!
//! ## Performance
//!
//! Matching drives a double-array Aho-Corasick automaton over the byte
//! representation of the token-ID stream, so a single pass reports every
//! phrase occurrence regardless of pattern count. Artifacts are loaded once
//! (the payload table stays memory-mapped) and are safe for concurrent
//! readers; [`matcher::MatcherService`] adds atomic hot reload on top.

pub mod artifact;
pub mod build;
pub mod corpus;
pub mod matcher;
pub mod mine;
pub mod pipeline;
pub mod score;
pub mod tag;

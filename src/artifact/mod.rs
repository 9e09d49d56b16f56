//! Shared artifact-set types: manifest, payload table, vocabulary, and the
//! byte encoding that bridges token IDs and the automaton.
//!
//! An artifact set is four co-located files produced atomically by the
//! builder and consumed read-only by the matcher:
//!
//! - `automaton.daac` - serialized double-array Aho-Corasick automaton
//! - `payloads.bin` - fixed 17-byte records indexed by pattern insertion order
//! - `manifest.json` - build metadata and the separator ID
//! - `vocab.json` - token string to token ID mapping

pub mod manifest;
pub mod pattern;
pub mod payload;
pub mod vocab;

use std::path::{Path, PathBuf};

/// Reserved token ID for the unknown-token sentinel.
pub const UNK_ID: u32 = 0;

/// Spelling of the unknown-token sentinel in `vocab.json`.
pub const UNK_TOKEN: &str = "<UNK>";

/// Default inter-phrase separator ID. Must never collide with a real token
/// ID; real IDs are assigned densely from 1 so a collision requires a
/// vocabulary of ~4.29 billion tokens.
pub const DEFAULT_SEPARATOR_ID: u32 = 4_294_967_294;

pub const AUTOMATON_FILE: &str = "automaton.daac";
pub const PAYLOADS_FILE: &str = "payloads.bin";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const VOCAB_FILE: &str = "vocab.json";

/// Locations of the four artifact files.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub automaton: PathBuf,
    pub payloads: PathBuf,
    pub manifest: PathBuf,
    pub vocab: PathBuf,
}

impl ArtifactPaths {
    /// Standard file names inside a single artifact directory.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            automaton: dir.join(AUTOMATON_FILE),
            payloads: dir.join(PAYLOADS_FILE),
            manifest: dir.join(MANIFEST_FILE),
            vocab: dir.join(VOCAB_FILE),
        }
    }
}

//! Batch tagger: stream a corpus through a loaded matcher and emit span
//! annotations per document.

use crate::artifact::ArtifactPaths;
use crate::corpus;
use crate::matcher::{MatchPolicy, Matcher};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagConfig {
    pub automaton_path: PathBuf,
    pub payloads_path: PathBuf,
    pub manifest_path: PathBuf,
    pub vocab_path: PathBuf,
    #[serde(default = "default_policy")]
    pub policy: String,
    #[serde(default = "default_max_spans")]
    pub max_spans: usize,
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_policy() -> String {
    "leftmost_longest".to_string()
}

fn default_max_spans() -> usize {
    100
}

fn default_label() -> String {
    "PHRASE".to_string()
}

impl TagConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open config: {}", path.display()))?;
        serde_json::from_reader(file)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            automaton: self.automaton_path.clone(),
            payloads: self.payloads_path.clone(),
            manifest: self.manifest_path.clone(),
            vocab: self.vocab_path.clone(),
        }
    }
}

/// A labeled span in tagged output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub phrase_id: u32,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaggedDocument {
    pub doc_id: String,
    pub tokens: Vec<String>,
    pub spans: Vec<Span>,
}

#[derive(Debug, Default)]
pub struct TagStats {
    pub documents: u64,
    pub total_spans: u64,
    pub docs_with_spans: u64,
}

impl TagStats {
    pub fn avg_spans_per_doc(&self) -> f64 {
        if self.documents == 0 {
            0.0
        } else {
            self.total_spans as f64 / self.documents as f64
        }
    }
}

/// Tag every document in a corpus file, preserving input order.
pub fn run_tag(corpus_path: &Path, config: &TagConfig, output_path: &Path) -> Result<TagStats> {
    let policy = MatchPolicy::from_str(&config.policy)
        .with_context(|| format!("invalid policy: {}", config.policy))?;

    let matcher = Matcher::load(&config.artifact_paths())
        .context("failed to load matcher artifacts")?;

    let reader = corpus::open_corpus(corpus_path)?;
    let output = File::create(output_path)
        .with_context(|| format!("failed to create output: {}", output_path.display()))?;
    let mut writer = BufWriter::with_capacity(65536, output);

    let mut stats = TagStats::default();

    for item in reader {
        let (line_no, doc) = item?;
        let Some(doc_id) = doc.doc_id else {
            bail!("line {}: missing doc_id", line_no);
        };

        let matches = matcher.match_text_tokens(&doc.tokens, policy, config.max_spans);

        let spans: Vec<Span> = matches
            .into_iter()
            .map(|m| Span {
                start: m.start,
                end: m.end,
                phrase_id: m.phrase_id,
                label: config.label.clone(),
            })
            .collect();

        stats.total_spans += spans.len() as u64;
        if !spans.is_empty() {
            stats.docs_with_spans += 1;
        }
        stats.documents += 1;

        let tagged = TaggedDocument {
            doc_id,
            tokens: doc.tokens,
            spans,
        };
        serde_json::to_writer(&mut writer, &tagged)?;
        writeln!(writer)?;

        if stats.documents % 1000 == 0 {
            eprintln!("  tagged {} documents...", stats.documents);
        }
    }

    writer.flush()?;
    Ok(stats)
}

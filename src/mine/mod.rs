//! Streaming n-gram miner: count every n-gram of length `[min_n, max_n]`
//! across a corpus and emit those at or above a frequency floor.

use crate::corpus;
use ahash::AHashMap;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MineConfig {
    #[serde(default = "default_min_n")]
    pub min_n: usize,
    #[serde(default = "default_max_n")]
    pub max_n: usize,
    #[serde(default = "default_min_count")]
    pub min_count: u32,
}

fn default_min_n() -> usize {
    2
}

fn default_max_n() -> usize {
    5
}

fn default_min_count() -> u32 {
    10
}

impl Default for MineConfig {
    fn default() -> Self {
        Self {
            min_n: default_min_n(),
            max_n: default_max_n(),
            min_count: default_min_count(),
        }
    }
}

impl MineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open config: {}", path.display()))?;
        let config: MineConfig = serde_json::from_reader(file)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_n < 1 || self.max_n > 10 || self.min_n > self.max_n {
            bail!(
                "invalid mining config: require 1 <= min_n <= max_n <= 10, got min_n={} max_n={}",
                self.min_n,
                self.max_n
            );
        }
        Ok(())
    }
}

/// Candidate phrase record: miner output, scorer input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NgramRecord {
    pub tokens: Vec<String>,
    pub count: u32,
}

#[derive(Debug, Default)]
pub struct MineStats {
    pub documents: u64,
    pub tokens: u64,
    pub ngrams_extracted: u64,
    pub unique_ngrams: usize,
    pub emitted: usize,
}

/// Mine a corpus file and write the filtered n-gram table.
pub fn run_mine(corpus_path: &Path, config: &MineConfig, output_path: &Path) -> Result<MineStats> {
    config.validate()?;

    let reader = corpus::open_corpus(corpus_path)?;
    let mut counts: AHashMap<Vec<String>, u64> = AHashMap::new();
    let mut stats = MineStats::default();

    for item in reader {
        let (_, doc) = item?;

        if doc.tokens.is_empty() {
            continue;
        }

        stats.documents += 1;
        stats.tokens += doc.tokens.len() as u64;

        // Lowercase once per document, not once per n-gram position.
        let lowered: Vec<String> = doc.tokens.iter().map(|t| t.to_lowercase()).collect();

        for n in config.min_n..=config.max_n {
            if lowered.len() < n {
                break;
            }
            for window in lowered.windows(n) {
                *counts.entry(window.to_vec()).or_insert(0) += 1;
                stats.ngrams_extracted += 1;
            }
        }

        if stats.documents % 10000 == 0 {
            eprintln!("  processed {} documents...", stats.documents);
        }
    }

    stats.unique_ngrams = counts.len();
    stats.emitted = write_ngrams(output_path, counts, config.min_count)?;

    Ok(stats)
}

/// Emit entries at or above the count floor, sorted by descending count.
/// Counts accumulate in u64 and must fit the u32 wire format; the scorer
/// consumes raw counts in ratios, so a saturated count is a hard error.
fn write_ngrams(
    output_path: &Path,
    counts: AHashMap<Vec<String>, u64>,
    min_count: u32,
) -> Result<usize> {
    let file = File::create(output_path)
        .with_context(|| format!("failed to create output: {}", output_path.display()))?;
    let mut writer = BufWriter::with_capacity(65536, file);

    let mut filtered: Vec<(Vec<String>, u64)> = counts
        .into_iter()
        .filter(|(_, count)| *count >= min_count as u64)
        .collect();

    filtered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let emitted = filtered.len();
    for (tokens, count) in filtered {
        let count = u32::try_from(count)
            .map_err(|_| anyhow::anyhow!("n-gram count overflows u32: {:?}", tokens))?;
        let record = NgramRecord { tokens, count };
        serde_json::to_writer(&mut writer, &record)?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(emitted)
}

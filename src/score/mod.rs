//! Salience scoring: compare a domain n-gram table against a background
//! table and keep the phrases that are concentrated in the domain.

use crate::mine::NgramRecord;
use ahash::AHashMap;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// How salience is computed from the two count tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMethod {
    /// `domain / (background + 1)`. Linear and unnormalized.
    #[default]
    Ratio,
    /// `log2(P(w|domain) / P(w|background))` with a half-count for phrases
    /// absent from the background.
    Pmi,
    /// `tf * ln((1 + total_background) / (1 + background))`, approximating
    /// document frequency by the background count.
    Tfidf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreConfig {
    #[serde(default)]
    pub method: ScoreMethod,
    #[serde(default = "default_min_salience")]
    pub min_salience: f32,
    #[serde(default = "default_min_domain_count")]
    pub min_domain_count: u32,
    #[serde(default = "default_assign_phrase_ids")]
    pub assign_phrase_ids: bool,
    #[serde(default = "default_starting_phrase_id")]
    pub starting_phrase_id: u32,
}

fn default_min_salience() -> f32 {
    2.0
}

fn default_min_domain_count() -> u32 {
    10
}

fn default_assign_phrase_ids() -> bool {
    true
}

fn default_starting_phrase_id() -> u32 {
    1000
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            method: ScoreMethod::default(),
            min_salience: default_min_salience(),
            min_domain_count: default_min_domain_count(),
            assign_phrase_ids: default_assign_phrase_ids(),
            starting_phrase_id: default_starting_phrase_id(),
        }
    }
}

impl ScoreConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open config: {}", path.display()))?;
        serde_json::from_reader(file)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }
}

/// Scored phrase record: scorer output, builder input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPhrase {
    pub tokens: Vec<String>,
    pub salience: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase_id: Option<u32>,
    pub domain_count: u32,
    pub background_count: u32,
}

#[derive(Debug, Default)]
pub struct ScoreStats {
    pub domain_phrases: usize,
    pub background_phrases: usize,
    pub after_domain_filter: usize,
    pub after_salience_filter: usize,
}

/// Score the domain table against the background table and write survivors.
pub fn run_score(
    domain_path: &Path,
    background_path: &Path,
    config: &ScoreConfig,
    output_path: &Path,
) -> Result<ScoreStats> {
    let domain = load_table(domain_path)?;
    let background = load_table(background_path)?;

    let mut stats = ScoreStats {
        domain_phrases: domain.len(),
        background_phrases: background.len(),
        ..Default::default()
    };

    let total_domain: u64 = domain.values().sum();
    let total_background: u64 = background.values().sum();

    let mut scored = Vec::new();
    for (tokens, domain_count) in domain {
        if domain_count < config.min_domain_count as u64 {
            continue;
        }
        stats.after_domain_filter += 1;

        let background_count = background.get(&tokens).copied().unwrap_or(0);
        let salience = salience(
            config.method,
            domain_count,
            background_count,
            total_domain,
            total_background,
        );

        if salience < config.min_salience {
            continue;
        }
        stats.after_salience_filter += 1;

        scored.push(ScoredPhrase {
            tokens,
            salience,
            phrase_id: None,
            domain_count: domain_count as u32,
            background_count: background_count as u32,
        });
    }

    // Descending salience with lexicographic tiebreak keeps ID assignment
    // deterministic across rebuilds from identical inputs.
    scored.sort_by(|a, b| {
        b.salience
            .partial_cmp(&a.salience)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.tokens.cmp(&b.tokens))
    });

    if config.assign_phrase_ids {
        for (i, phrase) in scored.iter_mut().enumerate() {
            phrase.phrase_id = Some(config.starting_phrase_id + i as u32);
        }
    }

    write_phrases(output_path, &scored)?;
    Ok(stats)
}

/// Load a `{tokens, count}` table, lowercasing on ingress. Duplicate
/// sequences after normalization merge by summing counts.
fn load_table(path: &Path) -> Result<AHashMap<Vec<String>, u64>> {
    let file =
        File::open(path).with_context(|| format!("failed to open table: {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut table: AHashMap<Vec<String>, u64> = AHashMap::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: NgramRecord = serde_json::from_str(&line).with_context(|| {
            format!("{}: line {}: malformed phrase record", path.display(), line_no + 1)
        })?;

        let tokens: Vec<String> = record.tokens.iter().map(|t| t.to_lowercase()).collect();
        let entry = table.entry(tokens).or_insert(0);
        *entry += record.count as u64;
        if *entry > u32::MAX as u64 {
            bail!(
                "{}: line {}: merged count overflows u32",
                path.display(),
                line_no + 1
            );
        }
    }

    Ok(table)
}

fn salience(
    method: ScoreMethod,
    domain_count: u64,
    background_count: u64,
    total_domain: u64,
    total_background: u64,
) -> f32 {
    match method {
        ScoreMethod::Ratio => domain_count as f32 / (background_count + 1) as f32,
        ScoreMethod::Pmi => {
            let p_domain = domain_count as f64 / total_domain.max(1) as f64;
            // Half-count smoothing for phrases the background never saw.
            let bg = if background_count == 0 {
                0.5
            } else {
                background_count as f64
            };
            let p_background = bg / total_background.max(1) as f64;
            (p_domain / p_background).log2() as f32
        }
        ScoreMethod::Tfidf => {
            let tf = domain_count as f64 / total_domain.max(1) as f64;
            let idf =
                ((1 + total_background) as f64 / (1 + background_count) as f64).ln();
            (tf * idf) as f32
        }
    }
}

fn write_phrases(output_path: &Path, phrases: &[ScoredPhrase]) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("failed to create output: {}", output_path.display()))?;
    let mut writer = BufWriter::with_capacity(65536, file);

    for phrase in phrases {
        serde_json::to_writer(&mut writer, phrase)?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

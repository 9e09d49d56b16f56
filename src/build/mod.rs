//! Artifact builder: compile scored phrases into the four-file artifact set
//! the matcher loads.
//!
//! The build staggers into vocabulary construction, pattern encoding,
//! automaton construction, and serialization. All four files are staged
//! under temporary names and renamed into place only after every write
//! succeeds, so a crashed build never exposes a torn artifact set.

use crate::artifact::manifest::Manifest;
use crate::artifact::pattern;
use crate::artifact::payload::Payload;
use crate::artifact::vocab::Vocabulary;
use crate::artifact::{ArtifactPaths, DEFAULT_SEPARATOR_ID};
use crate::score::ScoredPhrase;
use anyhow::{bail, Context, Result};
use daachorse::DoubleArrayAhoCorasick;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    pub version: String,
    pub tokenizer: String,
    #[serde(default = "default_separator_id")]
    pub separator_id: u32,
    #[serde(default)]
    pub min_count: Option<u32>,
    #[serde(default)]
    pub salience_threshold: Option<f32>,
}

fn default_separator_id() -> u32 {
    DEFAULT_SEPARATOR_ID
}

impl BuildConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open config: {}", path.display()))?;
        let config: BuildConfig = serde_json::from_reader(file)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        if config.separator_id == 0 {
            bail!("invalid build config: separator_id must be non-zero");
        }
        Ok(config)
    }
}

#[derive(Debug, Default)]
pub struct BuildStats {
    pub total_input: usize,
    pub filtered_low_count: usize,
    pub filtered_low_salience: usize,
    pub built: usize,
}

/// Validated phrase ready for pattern encoding.
struct BuildPhrase {
    tokens: Vec<String>,
    phrase_id: u32,
    salience: f32,
    count: u32,
}

/// Build the artifact set from a scored-phrase file.
pub fn run_build(input_path: &Path, config: &BuildConfig, output_dir: &Path) -> Result<BuildStats> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let (phrases, mut stats) = load_phrases(input_path, config)?;

    if phrases.is_empty() {
        bail!("no phrases to build after filtering");
    }

    // Vocabulary over the distinct tokens of every phrase, alphabetical IDs.
    let vocab = Vocabulary::from_phrases(
        phrases.iter().map(|p| p.tokens.as_slice()),
        config.separator_id,
    )?;

    // Encode each phrase in input order; pattern index = insertion order.
    let mut seen_patterns: HashSet<Vec<u8>> = HashSet::with_capacity(phrases.len());
    let mut patterns: Vec<Vec<u8>> = Vec::with_capacity(phrases.len());
    for phrase in &phrases {
        let ids: Vec<u32> = phrase
            .tokens
            .iter()
            .map(|t| {
                vocab
                    .token_id(t)
                    .expect("vocabulary covers every phrase token")
            })
            .collect();

        let bytes = pattern::encode_ids(&ids, config.separator_id);
        if !seen_patterns.insert(bytes.clone()) {
            bail!("duplicate pattern: {:?}", phrase.tokens);
        }
        patterns.push(bytes);
    }

    let automaton: DoubleArrayAhoCorasick<u32> = DoubleArrayAhoCorasick::new(patterns)
        .map_err(|e| anyhow::anyhow!("failed to build automaton: {e}"))?;

    stats.built = phrases.len();

    let staged = StagedArtifacts::new(output_dir);
    staged.write_automaton(&automaton)?;
    staged.write_payloads(&phrases)?;
    staged.write_manifest(config, phrases.len())?;
    staged.write_vocab(&vocab)?;
    staged.commit()?;

    Ok(stats)
}

/// Load, normalize, and validate scorer output. Fatal: malformed lines,
/// missing phrase IDs, empty token sequences, duplicate phrase IDs.
fn load_phrases(path: &Path, config: &BuildConfig) -> Result<(Vec<BuildPhrase>, BuildStats)> {
    let file =
        File::open(path).with_context(|| format!("failed to open input: {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut phrases = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut stats = BuildStats::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        stats.total_input += 1;

        let record: ScoredPhrase = serde_json::from_str(&line)
            .with_context(|| format!("line {}: malformed phrase record", line_no + 1))?;

        if let Some(min_count) = config.min_count {
            if record.domain_count < min_count {
                stats.filtered_low_count += 1;
                continue;
            }
        }

        if let Some(threshold) = config.salience_threshold {
            if record.salience < threshold {
                stats.filtered_low_salience += 1;
                continue;
            }
        }

        if record.tokens.is_empty() {
            bail!("line {}: empty token sequence", line_no + 1);
        }

        let phrase_id = record
            .phrase_id
            .with_context(|| format!("line {}: missing phrase_id", line_no + 1))?;

        if !seen_ids.insert(phrase_id) {
            bail!("line {}: duplicate phrase_id {}", line_no + 1, phrase_id);
        }

        phrases.push(BuildPhrase {
            tokens: record.tokens.iter().map(|t| t.to_lowercase()).collect(),
            phrase_id,
            salience: record.salience,
            count: record.domain_count,
        });
    }

    Ok((phrases, stats))
}

/// Write-then-rename staging for the four artifact files.
struct StagedArtifacts {
    final_paths: ArtifactPaths,
    staged_paths: ArtifactPaths,
}

impl StagedArtifacts {
    fn new(output_dir: &Path) -> Self {
        let final_paths = ArtifactPaths::in_dir(output_dir);
        let staged_paths = ArtifactPaths {
            automaton: tmp_name(&final_paths.automaton),
            payloads: tmp_name(&final_paths.payloads),
            manifest: tmp_name(&final_paths.manifest),
            vocab: tmp_name(&final_paths.vocab),
        };
        Self {
            final_paths,
            staged_paths,
        }
    }

    fn write_automaton(&self, automaton: &DoubleArrayAhoCorasick<u32>) -> Result<()> {
        let bytes = automaton.serialize();
        fs::write(&self.staged_paths.automaton, &bytes)
            .with_context(|| format!("failed to write {}", self.staged_paths.automaton.display()))
    }

    fn write_payloads(&self, phrases: &[BuildPhrase]) -> Result<()> {
        let file = File::create(&self.staged_paths.payloads)
            .with_context(|| format!("failed to create {}", self.staged_paths.payloads.display()))?;
        let mut writer = BufWriter::with_capacity(65536, file);

        for phrase in phrases {
            let payload = Payload::new(
                phrase.phrase_id,
                phrase.salience,
                phrase.count,
                phrase.tokens.len() as u8,
            );
            payload.write_to(&mut writer)?;
        }

        writer.flush()?;
        Ok(())
    }

    fn write_manifest(&self, config: &BuildConfig, num_patterns: usize) -> Result<()> {
        let manifest = Manifest {
            version: config.version.clone(),
            tokenizer: config.tokenizer.clone(),
            num_patterns,
            min_count: config.min_count,
            salience_threshold: config.salience_threshold,
            built_at: chrono::Utc::now().to_rfc3339(),
            separator_id: config.separator_id,
        };

        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(&self.staged_paths.manifest, json)
            .with_context(|| format!("failed to write {}", self.staged_paths.manifest.display()))
    }

    fn write_vocab(&self, vocab: &Vocabulary) -> Result<()> {
        let json = serde_json::to_string_pretty(vocab)?;
        fs::write(&self.staged_paths.vocab, json)
            .with_context(|| format!("failed to write {}", self.staged_paths.vocab.display()))
    }

    /// Rename every staged file into place. Only runs after all writes
    /// succeeded, so a partially staged build leaves the previous set
    /// untouched.
    fn commit(&self) -> Result<()> {
        fs::rename(&self.staged_paths.automaton, &self.final_paths.automaton)?;
        fs::rename(&self.staged_paths.payloads, &self.final_paths.payloads)?;
        fs::rename(&self.staged_paths.manifest, &self.final_paths.manifest)?;
        fs::rename(&self.staged_paths.vocab, &self.final_paths.vocab)?;
        Ok(())
    }
}

fn tmp_name(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

//! In-process pipeline driver: mine, score, and build in one call.
//!
//! Stage boundaries stay on disk for durability, but errors and statistics
//! flow structurally instead of through process exit codes, so an embedding
//! application can run a full artifact build without shelling out to the
//! stage binaries.

use crate::build::{self, BuildConfig, BuildStats};
use crate::mine::{self, MineConfig, MineStats};
use crate::score::{self, ScoreConfig, ScoreStats};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub mine: MineConfig,
    #[serde(default)]
    pub score: ScoreConfig,
    pub build: BuildConfig,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open config: {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_reader(file)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        config.mine.validate()?;
        Ok(config)
    }
}

/// Statistics from each completed stage.
#[derive(Debug)]
pub struct PipelineReport {
    pub mine: MineStats,
    pub score: ScoreStats,
    pub build: BuildStats,
    pub candidates_path: PathBuf,
    pub scored_path: PathBuf,
}

/// Run mine -> score -> build. Intermediate tables land next to the final
/// artifact set so a failed stage leaves its inputs inspectable.
pub fn run_pipeline(
    corpus_path: &Path,
    background_path: &Path,
    config: &PipelineConfig,
    output_dir: &Path,
) -> Result<PipelineReport> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let candidates_path = output_dir.join("candidates.jsonl");
    let scored_path = output_dir.join("phrases.jsonl");

    let mine_stats = mine::run_mine(corpus_path, &config.mine, &candidates_path)
        .context("mining stage failed")?;

    let score_stats = score::run_score(
        &candidates_path,
        background_path,
        &config.score,
        &scored_path,
    )
    .context("scoring stage failed")?;

    let build_stats = build::run_build(&scored_path, &config.build, output_dir)
        .context("build stage failed")?;

    Ok(PipelineReport {
        mine: mine_stats,
        score: score_stats,
        build: build_stats,
        candidates_path,
        scored_path,
    })
}

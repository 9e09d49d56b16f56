use anyhow::Result;
use clap::Parser;
use phrasal::artifact::ArtifactPaths;
use phrasal::build::{self, BuildConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "phrasal-build")]
#[command(about = "Compile scored phrases into a matcher artifact set")]
struct Cli {
    /// Scored phrases (JSONL from phrasal-score, phrase IDs assigned)
    phrases: PathBuf,

    /// Build configuration (JSON)
    config: PathBuf,

    /// Output directory for the artifact set
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = BuildConfig::load(&cli.config)?;

    println!("Building artifacts");
    println!("  input:   {}", cli.phrases.display());
    println!("  version: {} (tokenizer: {})", config.version, config.tokenizer);

    let stats = build::run_build(&cli.phrases, &config, &cli.output_dir)?;

    let paths = ArtifactPaths::in_dir(&cli.output_dir);
    println!("Built {} patterns", stats.built);
    println!("  {}", paths.automaton.display());
    println!("  {}", paths.payloads.display());
    println!("  {}", paths.manifest.display());
    println!("  {}", paths.vocab.display());

    eprintln!("Total input phrases: {}", stats.total_input);
    if stats.filtered_low_count > 0 {
        eprintln!("Filtered (low count): {}", stats.filtered_low_count);
    }
    if stats.filtered_low_salience > 0 {
        eprintln!("Filtered (low salience): {}", stats.filtered_low_salience);
    }
    eprintln!("Built patterns: {}", stats.built);

    Ok(())
}

use anyhow::Result;
use clap::Parser;
use phrasal::mine::{self, MineConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "phrasal-mine")]
#[command(about = "Mine candidate n-grams from a pre-tokenized corpus")]
struct Cli {
    /// Input corpus (JSONL, one {"tokens": [...]} object per line)
    corpus: PathBuf,

    /// Mining configuration (JSON)
    config: PathBuf,

    /// Output path for the candidate n-gram table (JSONL)
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = MineConfig::load(&cli.config)?;

    println!("Mining n-grams");
    println!("  corpus: {}", cli.corpus.display());
    println!(
        "  min_n={} max_n={} min_count={}",
        config.min_n, config.max_n, config.min_count
    );

    let stats = mine::run_mine(&cli.corpus, &config, &cli.output)?;

    println!("Wrote {} n-grams to {}", stats.emitted, cli.output.display());

    eprintln!("Total documents: {}", stats.documents);
    eprintln!("Total tokens: {}", stats.tokens);
    eprintln!("Unique n-grams: {}", stats.unique_ngrams);
    eprintln!("After min_count={}: {}", config.min_count, stats.emitted);

    Ok(())
}

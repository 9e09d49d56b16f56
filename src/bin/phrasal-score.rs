use anyhow::Result;
use clap::Parser;
use phrasal::score::{self, ScoreConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "phrasal-score")]
#[command(about = "Score candidate phrases against a background distribution")]
struct Cli {
    /// Domain n-gram table (JSONL from phrasal-mine)
    domain: PathBuf,

    /// Background n-gram table (JSONL)
    background: PathBuf,

    /// Scoring configuration (JSON)
    config: PathBuf,

    /// Output path for scored phrases (JSONL)
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ScoreConfig::load(&cli.config)?;

    println!("Scoring phrases");
    println!("  domain:     {}", cli.domain.display());
    println!("  background: {}", cli.background.display());
    println!(
        "  method={:?} min_salience={} min_domain_count={}",
        config.method, config.min_salience, config.min_domain_count
    );

    let stats = score::run_score(&cli.domain, &cli.background, &config, &cli.output)?;

    println!(
        "Wrote {} phrases to {}",
        stats.after_salience_filter,
        cli.output.display()
    );
    if config.assign_phrase_ids && stats.after_salience_filter > 0 {
        let end_id = config.starting_phrase_id + stats.after_salience_filter as u32 - 1;
        println!(
            "Phrase IDs assigned: {} - {}",
            config.starting_phrase_id, end_id
        );
    }

    eprintln!("Domain phrases: {}", stats.domain_phrases);
    eprintln!("Background phrases: {}", stats.background_phrases);
    eprintln!("After domain filter: {}", stats.after_domain_filter);
    eprintln!("After salience filter: {}", stats.after_salience_filter);

    Ok(())
}

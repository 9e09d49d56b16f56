use anyhow::Result;
use clap::Parser;
use phrasal::tag::{self, TagConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "phrasal-tag")]
#[command(about = "Annotate a pre-tokenized corpus with phrase spans")]
struct Cli {
    /// Input corpus (JSONL, {"doc_id": ..., "tokens": [...]} per line)
    corpus: PathBuf,

    /// Tagging configuration (JSON, includes artifact paths)
    config: PathBuf,

    /// Output path for the tagged corpus (JSONL)
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = TagConfig::load(&cli.config)?;

    println!("Tagging corpus");
    println!("  corpus: {}", cli.corpus.display());
    println!(
        "  policy={} max_spans={} label={}",
        config.policy, config.max_spans, config.label
    );

    let stats = tag::run_tag(&cli.corpus, &config, &cli.output)?;

    println!("Wrote tagged corpus to {}", cli.output.display());

    eprintln!("Documents: {}", stats.documents);
    eprintln!("Total spans: {}", stats.total_spans);
    eprintln!("Documents with spans: {}", stats.docs_with_spans);
    eprintln!("Avg spans per document: {:.2}", stats.avg_spans_per_doc());

    Ok(())
}

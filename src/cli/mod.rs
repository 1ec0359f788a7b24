// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, built on clap.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `prepare` — preprocesses a source/target corpus pair and
//                  writes vocabularies, embeddings and a report
//   2. `embed`   — embeds one example and prints its vectors

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EmbedArgs, PrepareArgs};

#[derive(Parser, Debug)]
#[command(
    name = "text-dataset",
    version,
    about = "Build vocabularies and embeddings for paired text corpora."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args) => run_prepare(args),
            Commands::Embed(args)   => run_embed(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    tracing::info!(
        "Preparing '{}' → '{}'",
        args.corpus.source.display(),
        args.corpus.target.display()
    );
    let out_dir = args.out.clone();
    let summary = PrepareUseCase::new(args.into()).execute()?;

    println!("Prepared {} sentence pairs into '{}'", summary.pairs, out_dir.display());
    for (side, stats) in [("source", summary.source), ("target", summary.target)] {
        println!(
            "  {side}: {} sentences, vocab {}, dim {}, {} unknown of {} tokens",
            stats.sentences,
            stats.vocab_size,
            stats.embedding_dim,
            stats.unknown_tokens,
            stats.tokens,
        );
    }
    Ok(())
}

fn run_embed(args: EmbedArgs) -> Result<()> {
    use crate::application::embed_use_case::EmbedUseCase;

    let example = EmbedUseCase::new(args.into()).execute()?;

    println!(
        "{} example {}: {} × {}",
        example.side, example.index, example.shape.0, example.shape.1
    );
    println!("tokens: {}", example.tokens.join(" "));
    if let Some(first) = example.vectors.first() {
        let values: Vec<String> = first.iter().map(|v| format!("{v:.4}")).collect();
        println!("first vector: [{}]", values.join(", "));
    }
    Ok(())
}

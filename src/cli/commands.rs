// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the `prepare` and `embed` subcommands and their
// flags. Everything tunable per side lives in the JSON settings
// file (see application/settings.rs); the flags only name files.

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::embed_use_case::EmbedConfig;
use crate::application::prepare_use_case::PrepareConfig;
use crate::data::dataset::Side;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Preprocess a source/target corpus pair
    Prepare(PrepareArgs),

    /// Embed one example and print its vectors
    Embed(EmbedArgs),
}

/// Corpus files shared by both subcommands. A directory is scanned
/// for .docx files; anything else is read one sentence per line.
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    #[arg(long)]
    pub source: PathBuf,

    #[arg(long)]
    pub target: PathBuf,

    /// JSON settings file with per-side options
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// GloVe / word2vec text file used for both sides
    #[arg(long)]
    pub pretrained: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Directory for vocabularies, embeddings and report.csv
    #[arg(long, default_value = "prepared")]
    pub out: PathBuf,

    /// Also write each vocabulary as a HuggingFace tokenizer.json
    #[arg(long)]
    pub export_tokenizers: bool,
}

impl From<PrepareArgs> for PrepareConfig {
    fn from(a: PrepareArgs) -> Self {
        PrepareConfig {
            source:            a.corpus.source,
            target:            a.corpus.target,
            settings:          a.corpus.settings,
            pretrained:        a.corpus.pretrained,
            out_dir:           a.out,
            export_tokenizers: a.export_tokenizers,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideArg {
    Source,
    Target,
}

impl From<SideArg> for Side {
    fn from(s: SideArg) -> Self {
        match s {
            SideArg::Source => Side::Source,
            SideArg::Target => Side::Target,
        }
    }
}

#[derive(Args, Debug)]
pub struct EmbedArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Position of the example in its corpus
    #[arg(long)]
    pub index: usize,

    #[arg(long, value_enum, default_value_t = SideArg::Source)]
    pub side: SideArg,

    /// Output directory of an earlier `prepare` run to restore weights from
    #[arg(long)]
    pub from: Option<PathBuf>,
}

impl From<EmbedArgs> for EmbedConfig {
    fn from(a: EmbedArgs) -> Self {
        EmbedConfig {
            source:     a.corpus.source,
            target:     a.corpus.target,
            settings:   a.corpus.settings,
            pretrained: a.corpus.pretrained,
            from:       a.from,
            index:      a.index,
            side:       a.side.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_parse_prepare() {
        let cli = Cli::try_parse_from([
            "text-dataset", "prepare", "--source", "s.txt", "--target", "t.txt", "--out", "o",
        ])
        .unwrap();
        let Commands::Prepare(args) = cli.command else {
            panic!("expected prepare");
        };
        let cfg: PrepareConfig = args.into();
        assert_eq!(cfg.source, PathBuf::from("s.txt"));
        assert_eq!(cfg.out_dir, PathBuf::from("o"));
        assert!(cfg.settings.is_none());
        assert!(!cfg.export_tokenizers);
    }

    #[test]
    fn test_parse_embed_side() {
        let cli = Cli::try_parse_from([
            "text-dataset", "embed", "--source", "s.txt", "--target", "t.txt",
            "--index", "3", "--side", "target",
        ])
        .unwrap();
        let Commands::Embed(args) = cli.command else {
            panic!("expected embed");
        };
        let cfg: EmbedConfig = args.into();
        assert_eq!(cfg.index, 3);
        assert_eq!(cfg.side, Side::Target);
    }

    #[test]
    fn test_embed_requires_index() {
        assert!(Cli::try_parse_from([
            "text-dataset", "embed", "--source", "s.txt", "--target", "t.txt",
        ])
        .is_err());
    }
}

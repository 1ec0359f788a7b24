// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Orchestrates a full preprocessing run in order:
//
//   Step 1: Load settings              (Layer 2 - settings)
//   Step 2: Build the dataset          (Layer 4 - data)
//   Step 3: Load both corpora          (Layer 4 - data)
//   Step 4: Preprocess both sides      (Layer 4 - data)
//   Step 5: Save vocabularies          (Layer 6 - infra)
//   Step 6: Save trainable embeddings  (Layer 6 - infra)
//   Step 7: Append the report          (Layer 6 - infra)

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use std::path::PathBuf;

use crate::application::settings::DatasetSettings;
use crate::data::dataset::{Side, TextDataset};
use crate::data::loader::load_sentences;
use crate::data::text_data::TextStatistics;
use crate::infra::{
    checkpoint::EmbeddingCheckpoint,
    report::{ReportLogger, SideReport},
    vocab_store::VocabularyStore,
};

#[derive(Debug, Clone)]
pub struct PrepareConfig {
    pub source:     PathBuf,
    pub target:     PathBuf,
    pub settings:   Option<PathBuf>,
    /// Pretrained vectors for both sides; overrides the settings file
    pub pretrained: Option<PathBuf>,
    pub out_dir:    PathBuf,
    /// Also write each vocabulary as a HuggingFace tokenizer.json
    pub export_tokenizers: bool,
}

#[derive(Debug, Clone)]
pub struct PrepareSummary {
    pub source: TextStatistics,
    pub target: TextStatistics,
    pub pairs:  usize,
}

pub struct PrepareUseCase {
    config: PrepareConfig,
}

impl PrepareUseCase {
    pub fn new(config: PrepareConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PrepareSummary> {
        let cfg = &self.config;

        // ── Step 1: Settings ──────────────────────────────────────────────────
        let mut settings = DatasetSettings::load_or_default(cfg.settings.as_deref())?;
        if let Some(path) = &cfg.pretrained {
            settings = settings.with_pretrained(path);
        }

        // ── Step 2: Dataset ───────────────────────────────────────────────────
        let mut dataset = build_dataset(&settings)?;

        // ── Steps 3-4: Load and preprocess each side ──────────────────────────
        for (side, path) in [(Side::Source, &cfg.source), (Side::Target, &cfg.target)] {
            let sentences = load_sentences(path)?;
            tracing::info!("{} corpus: {} sentences", side, sentences.len());
            dataset
                .preprocess(&sentences, side)
                .with_context(|| format!("Failed to preprocess {side} side"))?;
        }

        // ── Steps 5-7: Persist ────────────────────────────────────────────────
        let vocab_store = VocabularyStore::new(&cfg.out_dir);
        let checkpoint  = EmbeddingCheckpoint::new(cfg.out_dir.join("embeddings"))?;
        let report      = ReportLogger::new(&cfg.out_dir)?;

        for side in [Side::Source, Side::Target] {
            let name  = side.as_str();
            let vocab = dataset.get_vocabulary(side)?;
            vocab_store.save(&format!("{name}_vocab"), vocab)?;
            if cfg.export_tokenizers {
                vocab_store.export_tokenizer(name, vocab)?;
            }

            if let Some(matrix) = dataset.get_text_embedding(side)?.as_trainable() {
                checkpoint.save(name, matrix, 0)?;
            }

            report.log(&SideReport::new(side, dataset.statistics(side)?))?;
        }

        let summary = PrepareSummary {
            source: dataset.statistics(Side::Source)?,
            target: dataset.statistics(Side::Target)?,
            pairs:  dataset.len(),
        };
        tracing::info!(
            "Prepared {} pairs, outputs in '{}'",
            summary.pairs,
            cfg.out_dir.display()
        );
        Ok(summary)
    }
}

/// Build an unprocessed dataset from settings.
pub fn build_dataset(settings: &DatasetSettings) -> Result<TextDataset> {
    let (source, target) = settings.to_configs()?;

    Ok(TextDataset::builder()
        .source_configuration(source)
        .target_configuration(target)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vocabulary::Vocabulary;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_prepare_writes_all_outputs() {
        let dir = tempdir().unwrap();
        let source   = dir.path().join("source.txt");
        let target   = dir.path().join("target.txt");
        let settings = dir.path().join("settings.json");
        fs::write(&source, "the cat sat\nthe dog ran\n").unwrap();
        fs::write(&target, "le chat\nle chien\nde plus\n").unwrap();
        fs::write(
            &settings,
            r#"{ "source": { "min_frequency": 1 }, "target": { "min_frequency": 1, "seed": 3 } }"#,
        )
        .unwrap();

        let out = dir.path().join("out");
        let summary = PrepareUseCase::new(PrepareConfig {
            source,
            target,
            settings: Some(settings),
            pretrained: None,
            out_dir: out.clone(),
            export_tokenizers: true,
        })
        .execute()
        .unwrap();

        assert_eq!(summary.pairs, 2);
        assert_eq!(summary.source.sentences, 2);
        assert_eq!(summary.target.sentences, 3);

        let vocab = VocabularyStore::new(&out).load("source_vocab").unwrap();
        assert!(vocab.contains("cat"));
        assert_eq!(vocab.size(), summary.source.vocab_size);
        assert!(out.join("source.tokenizer.json").exists());

        let ckpt = EmbeddingCheckpoint::new(out.join("embeddings")).unwrap();
        assert_eq!(ckpt.load_latest("target").unwrap().shape(), (summary.target.vocab_size, 15));

        let csv = fs::read_to_string(out.join("report.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_prepare_with_pretrained_skips_checkpoint() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("s.txt");
        let target = dir.path().join("t.txt");
        let glove  = dir.path().join("glove.txt");
        fs::write(&source, "the cat sat\n").unwrap();
        fs::write(&target, "the cat\n").unwrap();
        fs::write(&glove, "the 1 0 0\ncat 0 1 0\n").unwrap();

        let out = dir.path().join("out");
        let summary = PrepareUseCase::new(PrepareConfig {
            source,
            target,
            settings: None,
            pretrained: Some(glove),
            out_dir: out.clone(),
            export_tokenizers: false,
        })
        .execute()
        .unwrap();

        assert_eq!(summary.source.embedding_dim, 3);
        assert_eq!(summary.source.unknown_tokens, 1);
        assert!(!out.join("embeddings").join("source_latest.json").exists());

        let vocab: Vocabulary = VocabularyStore::new(&out).load("target_vocab").unwrap();
        assert_eq!(vocab.size(), 6);
    }

    #[test]
    fn test_missing_corpus_fails() {
        let dir = tempdir().unwrap();
        let result = PrepareUseCase::new(PrepareConfig {
            source: dir.path().join("absent.txt"),
            target: dir.path().join("absent.txt"),
            settings: None,
            pretrained: None,
            out_dir: dir.path().join("out"),
            export_tokenizers: false,
        })
        .execute();
        assert!(result.is_err());
    }
}

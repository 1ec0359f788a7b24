// ============================================================
// Layer 2 — EmbedUseCase
// ============================================================
// Rebuilds a dataset from the same corpora and settings as a
// `prepare` run and embeds one example.
//
//   Step 1: Build and preprocess the dataset  (Layer 4 - data)
//   Step 2: Restore saved weights, if any     (Layer 6 - infra)
//   Step 3: Embed the requested example       (Layer 4 - data)
//
// Vocabulary building is deterministic, so the rebuilt vocabulary
// matches the saved one as long as corpus and settings match;
// restoring checks this before touching the weights.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::application::prepare_use_case::build_dataset;
use crate::application::settings::DatasetSettings;
use crate::data::dataset::Side;
use crate::data::loader::load_sentences;
use crate::infra::{checkpoint::EmbeddingCheckpoint, vocab_store::VocabularyStore};

#[derive(Debug, Clone)]
pub struct EmbedConfig {
    pub source:     PathBuf,
    pub target:     PathBuf,
    pub settings:   Option<PathBuf>,
    pub pretrained: Option<PathBuf>,
    /// Output directory of an earlier `prepare` run
    pub from:       Option<PathBuf>,
    pub index:      usize,
    pub side:       Side,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedExample {
    pub side:    Side,
    pub index:   usize,
    pub tokens:  Vec<String>,
    pub shape:   (usize, usize),
    pub vectors: Vec<Vec<f32>>,
}

pub struct EmbedUseCase {
    config: EmbedConfig,
}

impl EmbedUseCase {
    pub fn new(config: EmbedConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EmbeddedExample> {
        let cfg = &self.config;

        // ── Step 1: Rebuild ───────────────────────────────────────────────────
        let mut settings = DatasetSettings::load_or_default(cfg.settings.as_deref())?;
        if let Some(path) = &cfg.pretrained {
            settings = settings.with_pretrained(path);
        }
        let mut dataset = build_dataset(&settings)?;
        let corpus: &Path = match cfg.side {
            Side::Source => &cfg.source,
            Side::Target => &cfg.target,
        };
        let sentences = load_sentences(corpus)?;
        dataset.preprocess(&sentences, cfg.side)?;

        // ── Step 2: Restore ───────────────────────────────────────────────────
        if let Some(dir) = &cfg.from {
            let name  = cfg.side.as_str();
            let saved = VocabularyStore::new(dir).load(&format!("{name}_vocab"))?;
            if &saved != dataset.get_vocabulary(cfg.side)? {
                anyhow::bail!(
                    "Saved {name} vocabulary in '{}' does not match this corpus and settings",
                    dir.display()
                );
            }
            if let Some(matrix) = dataset.get_text_embedding(cfg.side)?.as_trainable() {
                EmbeddingCheckpoint::new(dir.join("embeddings"))?.restore_into(name, matrix)?;
            }
        }

        // ── Step 3: Embed ─────────────────────────────────────────────────────
        let embedded = dataset
            .embed_text(cfg.index, cfg.side)
            .with_context(|| format!("Cannot embed {} example {}", cfg.side, cfg.index))?;

        let indices = dataset.text_data(cfg.side).token_indices(cfg.index)?;
        let tokens  = dataset
            .get_vocabulary(cfg.side)?
            .decode(indices)?
            .into_iter()
            .map(String::from)
            .collect();

        Ok(EmbeddedExample {
            side:    cfg.side,
            index:   cfg.index,
            tokens,
            shape:   embedded.dim(),
            vectors: embedded.rows().into_iter().map(|r| r.to_vec()).collect(),
        })
    }
}

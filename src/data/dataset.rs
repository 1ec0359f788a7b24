// ============================================================
// Layer 4 — TextDataset
// ============================================================
// Pairs a source-side and a target-side TextData. Each side is
// configured independently: the builder merges whatever the
// caller sets over TextDataConfig::default_configuration().
//
// Implements burn's Dataset trait so a prepared dataset can be
// handed straight to burn's data loaders; one item is the pair of
// index sequences at the same position on both sides.

use std::fmt;

use burn::data::dataset::Dataset;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::embedding::TextEmbedding;
use crate::data::text_data::{TextData, TextDataConfig, TextStatistics};
use crate::data::vocabulary::Vocabulary;
use crate::domain::error::Result;

/// Which half of the dataset an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Target => "target",
        }
    }
}

/// `true` selects the source side, `false` the target side.
impl From<bool> for Side {
    fn from(source: bool) -> Self {
        if source { Side::Source } else { Side::Target }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dataset item: aligned source and target index sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPair {
    pub source: Vec<usize>,
    pub target: Vec<usize>,
}

// ─── Builder ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default)]
pub struct TextDatasetBuilder {
    source: TextDataConfig,
    target: TextDataConfig,
}

impl TextDatasetBuilder {
    pub fn source_configuration(mut self, config: TextDataConfig) -> Self {
        self.source = config;
        self
    }

    pub fn target_configuration(mut self, config: TextDataConfig) -> Self {
        self.target = config;
        self
    }

    pub fn build(self) -> TextDataset {
        let defaults = TextDataConfig::default_configuration();
        TextDataset {
            source: TextData::new(defaults.update(&self.source)),
            target: TextData::new(defaults.update(&self.target)),
        }
    }
}

// ─── TextDataset ──────────────────────────────────────────────────────────────
#[derive(Debug)]
pub struct TextDataset {
    source: TextData,
    target: TextData,
}

impl TextDataset {
    pub fn builder() -> TextDatasetBuilder {
        TextDatasetBuilder::default()
    }

    pub fn text_data(&self, side: impl Into<Side>) -> &TextData {
        match side.into() {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }

    fn text_data_mut(&mut self, side: Side) -> &mut TextData {
        match side {
            Side::Source => &mut self.source,
            Side::Target => &mut self.target,
        }
    }

    /// Preprocess one side; the other side is untouched.
    pub fn preprocess<S: AsRef<str>>(
        &mut self,
        sentences: &[S],
        side: impl Into<Side>,
    ) -> Result<()> {
        let side = side.into();
        tracing::debug!("Preprocessing {} side ({} sentences)", side, sentences.len());
        self.text_data_mut(side).preprocess(sentences)
    }

    pub fn embed_text(&self, index: usize, side: impl Into<Side>) -> Result<Array2<f32>> {
        self.text_data(side).embed_text(index)
    }

    pub fn get_vocabulary(&self, side: impl Into<Side>) -> Result<&Vocabulary> {
        self.text_data(side).get_vocabulary()
    }

    pub fn get_text_embedding(&self, side: impl Into<Side>) -> Result<&TextEmbedding> {
        self.text_data(side).get_text_embedding()
    }

    pub fn statistics(&self, side: impl Into<Side>) -> Result<TextStatistics> {
        self.text_data(side).statistics()
    }

    /// Make the target side look up through the source side's embedding.
    /// Both sides must already be preprocessed.
    pub fn tie_embeddings(&mut self) -> Result<()> {
        let shared = self.source.get_text_embedding()?.clone();
        self.target.share_embedding(shared)?;
        tracing::info!("Target side now shares the source embedding");
        Ok(())
    }
}

impl Dataset<TextPair> for TextDataset {
    fn get(&self, index: usize) -> Option<TextPair> {
        let source = self.source.token_indices(index).ok()?;
        let target = self.target.token_indices(index).ok()?;
        Some(TextPair {
            source: source.to_vec(),
            target: target.to_vec(),
        })
    }

    fn len(&self) -> usize {
        self.source.len().min(self.target.len())
    }
}

// ============================================================
// Layer 2 — Dataset Settings
// ============================================================
// The JSON settings file the CLI accepts. It mirrors
// TextDataConfig with plain serialisable fields: processors are
// named by kind and the pretrained embedding is a file path.
//
// Example:
//
//   {
//     "source": {
//       "min_frequency": 1,
//       "processors": [
//         { "kind": "cleaner" },
//         { "kind": "whitespace" },
//         { "kind": "lowercase" },
//         { "kind": "stop_words", "words": ["a", "the"] }
//       ]
//     },
//     "target": {
//       "fixed_length": 32,
//       "add_sequence_markers": true,
//       "initializer": { "type": "xavier_uniform" },
//       "seed": 7
//     }
//   }
//
// Every field is optional; unset fields fall back to the
// defaults when the dataset builder merges the configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::data::embedding::Initializer;
use crate::data::processor::{
    LowerCaseConvertor, PretrainedTokenizer, ProcessorChain, PunctuationSeparator,
    StopWordFilter, TextCleaner, TextTruncator, WhitespaceTokenizer,
};
use crate::data::text_data::TextDataConfig;
use crate::data::vocabulary::ReservedTokens;
use crate::domain::traits::{EmbeddingSource, TextProcessor};
use crate::infra::glove::load_glove;

/// One processor in a settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessorKind {
    Cleaner,
    Whitespace,
    Lowercase,
    Punctuation,
    Truncate { max_len: usize },
    StopWords { words: Vec<String> },
    /// HuggingFace tokenizer.json
    Tokenizer { path: PathBuf },
}

impl ProcessorKind {
    pub fn build(&self) -> Result<Arc<dyn TextProcessor>> {
        let processor: Arc<dyn TextProcessor> = match self {
            Self::Cleaner => Arc::new(TextCleaner::new()),
            Self::Whitespace => Arc::new(WhitespaceTokenizer),
            Self::Lowercase => Arc::new(LowerCaseConvertor),
            Self::Punctuation => Arc::new(PunctuationSeparator),
            Self::Truncate { max_len } => Arc::new(TextTruncator::new(*max_len)),
            Self::StopWords { words } => Arc::new(StopWordFilter::new(words.iter().cloned())),
            Self::Tokenizer { path } => Arc::new(PretrainedTokenizer::from_file(path)?),
        };
        Ok(processor)
    }
}

/// Serialisable options for one side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextDataSettings {
    pub min_frequency:        Option<usize>,
    pub max_vocab_size:       Option<usize>,
    pub embedding_size:       Option<usize>,
    pub processors:           Option<Vec<ProcessorKind>>,
    /// GloVe / word2vec text file
    pub pretrained:           Option<PathBuf>,
    pub reserved_tokens:      Option<ReservedTokens>,
    pub fixed_length:         Option<usize>,
    pub add_sequence_markers: Option<bool>,
    pub initializer:          Option<Initializer>,
    pub seed:                 Option<u64>,
}

impl TextDataSettings {
    /// Turn the settings into a configuration, loading any files they name.
    pub fn to_config(&self) -> Result<TextDataConfig> {
        self.to_config_with(&mut HashMap::new())
    }

    /// Like `to_config`, reusing pretrained sources already in `loaded`.
    fn to_config_with(
        &self,
        loaded: &mut HashMap<PathBuf, Arc<dyn EmbeddingSource>>,
    ) -> Result<TextDataConfig> {
        let text_processors = match &self.processors {
            Some(kinds) => {
                let processors = kinds
                    .iter()
                    .map(ProcessorKind::build)
                    .collect::<Result<Vec<_>>>()?;
                Some(ProcessorChain::new(processors))
            }
            None => None,
        };

        let pretrained_embedding = match &self.pretrained {
            Some(path) => match loaded.get(path) {
                Some(source) => Some(Arc::clone(source)),
                None => {
                    let source: Arc<dyn EmbeddingSource> = Arc::new(load_glove(path)?);
                    loaded.insert(path.clone(), Arc::clone(&source));
                    Some(source)
                }
            },
            None => None,
        };

        Ok(TextDataConfig {
            min_frequency: self.min_frequency,
            max_vocab_size: self.max_vocab_size,
            embedding_size: self.embedding_size,
            text_processors,
            pretrained_embedding,
            reserved_tokens: self.reserved_tokens.clone(),
            fixed_length: self.fixed_length,
            add_sequence_markers: self.add_sequence_markers,
            initializer: self.initializer,
            seed: self.seed,
        })
    }
}

/// Settings for both sides of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetSettings {
    pub source: TextDataSettings,
    pub target: TextDataSettings,
}

impl DatasetSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read settings from '{}'", path.display()))?;
        let settings = serde_json::from_str(&json)
            .with_context(|| format!("Invalid settings file '{}'", path.display()))?;
        tracing::debug!("Loaded settings from '{}'", path.display());
        Ok(settings)
    }

    /// Settings from `path`, or all defaults when no file is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Configurations for (source, target). A pretrained file named
    /// on both sides is parsed once and shared.
    pub fn to_configs(&self) -> Result<(TextDataConfig, TextDataConfig)> {
        let mut loaded = HashMap::new();
        let source = self
            .source
            .to_config_with(&mut loaded)
            .context("Invalid source settings")?;
        let target = self
            .target
            .to_config_with(&mut loaded)
            .context("Invalid target settings")?;
        Ok((source, target))
    }

    /// Use the same pretrained vectors on both sides.
    pub fn with_pretrained(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.source.pretrained = Some(path.clone());
        self.target.pretrained = Some(path);
        self
    }
}

// ============================================================
// Layer 4 — TextData
// ============================================================
// Per-side owner of the text pipeline state. One call to
// `preprocess` runs the whole flow:
//
//   raw sentences
//       │ ProcessorChain        → token lists
//       │ Vocabulary            → from corpus frequencies, or
//       │                         from the pretrained source's
//       │                         own tokens
//       │ TextEmbedding         → TrainableMatrix sized to the
//       │                         vocabulary, or PretrainedLookup
//       ▼ SequenceLayout        → index sequences (markers,
//                                 truncation, padding)
//
// Everything is built off to the side and swapped in at the end,
// so a failed run leaves the previous state untouched and a
// successful one replaces it wholesale.

use std::sync::Arc;

use ndarray::Array2;
use serde::Serialize;

use crate::data::embedding::{Initializer, PretrainedLookup, TextEmbedding, TrainableMatrix};
use crate::data::processor::ProcessorChain;
use crate::data::vocabulary::{ReservedTokens, Vocabulary};
use crate::domain::error::{Result, TextDataError};
use crate::domain::traits::EmbeddingSource;

pub const DEFAULT_MIN_FREQUENCY:  usize = 3;
pub const DEFAULT_EMBEDDING_SIZE: usize = 15;

// ─── Configuration ────────────────────────────────────────────────────────────
/// Options for one side of a text dataset.
///
/// Every field is optional so a partial configuration can be merged
/// over `default_configuration()` with `update`.
#[derive(Debug, Clone, Default)]
pub struct TextDataConfig {
    pub min_frequency:        Option<usize>,
    /// Total vocabulary size cap, reserved tokens included; unset means unbounded
    pub max_vocab_size:       Option<usize>,
    /// Trainable embedding width; ignored when a pretrained source is set
    pub embedding_size:       Option<usize>,
    pub text_processors:      Option<ProcessorChain>,
    pub pretrained_embedding: Option<Arc<dyn EmbeddingSource>>,
    pub reserved_tokens:      Option<ReservedTokens>,
    /// Pad or truncate every sequence to exactly this many indices
    pub fixed_length:         Option<usize>,
    /// Wrap each sequence in begin/end-of-sequence markers
    pub add_sequence_markers: Option<bool>,
    pub initializer:          Option<Initializer>,
    pub seed:                 Option<u64>,
}

impl TextDataConfig {
    /// An empty configuration with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The documented defaults every side starts from.
    pub fn default_configuration() -> Self {
        Self {
            min_frequency:        Some(DEFAULT_MIN_FREQUENCY),
            max_vocab_size:       None,
            embedding_size:       Some(DEFAULT_EMBEDDING_SIZE),
            text_processors:      Some(ProcessorChain::standard()),
            pretrained_embedding: None,
            reserved_tokens:      Some(ReservedTokens::default()),
            fixed_length:         None,
            add_sequence_markers: Some(false),
            initializer:          Some(Initializer::default()),
            seed:                 None,
        }
    }

    /// Field-wise merge: every field set in `other` wins.
    pub fn update(&self, other: &TextDataConfig) -> TextDataConfig {
        TextDataConfig {
            min_frequency:        other.min_frequency.or(self.min_frequency),
            max_vocab_size:       other.max_vocab_size.or(self.max_vocab_size),
            embedding_size:       other.embedding_size.or(self.embedding_size),
            text_processors:      other
                .text_processors
                .clone()
                .or_else(|| self.text_processors.clone()),
            pretrained_embedding: other
                .pretrained_embedding
                .clone()
                .or_else(|| self.pretrained_embedding.clone()),
            reserved_tokens:      other
                .reserved_tokens
                .clone()
                .or_else(|| self.reserved_tokens.clone()),
            fixed_length:         other.fixed_length.or(self.fixed_length),
            add_sequence_markers: other.add_sequence_markers.or(self.add_sequence_markers),
            initializer:          other.initializer.or(self.initializer),
            seed:                 other.seed.or(self.seed),
        }
    }

    pub fn with_min_frequency(mut self, value: usize) -> Self {
        self.min_frequency = Some(value);
        self
    }

    pub fn with_max_vocab_size(mut self, value: usize) -> Self {
        self.max_vocab_size = Some(value);
        self
    }

    pub fn with_embedding_size(mut self, value: usize) -> Self {
        self.embedding_size = Some(value);
        self
    }

    pub fn with_text_processors(mut self, chain: ProcessorChain) -> Self {
        self.text_processors = Some(chain);
        self
    }

    pub fn with_pretrained_embedding(mut self, source: Arc<dyn EmbeddingSource>) -> Self {
        self.pretrained_embedding = Some(source);
        self
    }

    pub fn with_reserved_tokens(mut self, reserved: ReservedTokens) -> Self {
        self.reserved_tokens = Some(reserved);
        self
    }

    pub fn with_fixed_length(mut self, value: usize) -> Self {
        self.fixed_length = Some(value);
        self
    }

    pub fn with_sequence_markers(mut self, enabled: bool) -> Self {
        self.add_sequence_markers = Some(enabled);
        self
    }

    pub fn with_initializer(mut self, initializer: Initializer) -> Self {
        self.initializer = Some(initializer);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

// ─── Statistics ───────────────────────────────────────────────────────────────
/// Summary of one preprocessing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextStatistics {
    pub sentences:      usize,
    /// Tokens produced by the processor chain, before truncation
    pub tokens:         usize,
    pub unknown_tokens: usize,
    pub truncated:      usize,
    pub vocab_size:     usize,
    pub embedding_dim:  usize,
}

// ─── Sequence layout ──────────────────────────────────────────────────────────
/// How token indices are framed into stored sequences.
#[derive(Debug, Clone, Copy)]
struct SequenceLayout {
    fixed_length: Option<usize>,
    begin:        Option<usize>,
    end:          Option<usize>,
    padding:      usize,
}

impl SequenceLayout {
    fn resolve(config: &TextDataConfig, vocab: &Vocabulary) -> Result<Self> {
        let (begin, end) = if config.add_sequence_markers.unwrap_or(false) {
            match (vocab.begin_index(), vocab.end_index()) {
                (Some(b), Some(e)) => (Some(b), Some(e)),
                _ => {
                    return Err(TextDataError::Configuration(
                        "sequence markers need begin and end of sequence tokens".to_string(),
                    ))
                }
            }
        } else {
            (None, None)
        };

        let markers = usize::from(begin.is_some()) + usize::from(end.is_some());
        let padding = match config.fixed_length {
            Some(len) => {
                if len == 0 || len < markers {
                    return Err(TextDataError::Configuration(format!(
                        "fixed length {len} cannot hold {markers} sequence markers"
                    )));
                }
                vocab.padding_index().ok_or_else(|| {
                    TextDataError::Configuration(
                        "fixed length needs a padding token".to_string(),
                    )
                })?
            }
            None => vocab.unknown_index(),
        };

        Ok(Self {
            fixed_length: config.fixed_length,
            begin,
            end,
            padding,
        })
    }

    fn markers(&self) -> usize {
        usize::from(self.begin.is_some()) + usize::from(self.end.is_some())
    }

    /// Frame `body`; returns the sequence and whether it was truncated.
    fn assemble(&self, mut body: Vec<usize>) -> (Vec<usize>, bool) {
        let mut truncated = false;
        if let Some(len) = self.fixed_length {
            let room = len - self.markers();
            truncated = body.len() > room;
            body.truncate(room);
        }

        let mut seq = Vec::with_capacity(body.len() + self.markers());
        seq.extend(self.begin);
        seq.extend(body);
        seq.extend(self.end);

        if let Some(len) = self.fixed_length {
            seq.resize(len, self.padding);
        }
        (seq, truncated)
    }
}

// ─── TextData ─────────────────────────────────────────────────────────────────
#[derive(Debug)]
struct PreparedText {
    vocabulary: Vocabulary,
    embedding:  TextEmbedding,
    corpus:     Vec<Vec<usize>>,
    statistics: TextStatistics,
}

#[derive(Debug)]
pub struct TextData {
    config: TextDataConfig,
    state:  Option<PreparedText>,
}

impl TextData {
    pub fn new(config: TextDataConfig) -> Self {
        Self { config, state: None }
    }

    pub fn config(&self) -> &TextDataConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    fn prepared(&self, accessor: &'static str) -> Result<&PreparedText> {
        self.state
            .as_ref()
            .ok_or(TextDataError::NotInitialized(accessor))
    }

    /// Tokenise `raw_sentences`, build the vocabulary and embedding, and
    /// store one index sequence per sentence. Replaces any earlier state.
    pub fn preprocess<S: AsRef<str>>(&mut self, raw_sentences: &[S]) -> Result<()> {
        let cfg      = &self.config;
        let chain    = cfg.text_processors.clone().unwrap_or_default();
        let reserved = cfg.reserved_tokens.clone().unwrap_or_default();

        let token_lists = chain.process_all(raw_sentences);
        tracing::debug!(
            "Processed {} sentences through [{}]",
            token_lists.len(),
            chain.names().join(", ")
        );

        let vocabulary = match &cfg.pretrained_embedding {
            Some(source) => {
                Vocabulary::from_tokens(source.tokens(), &reserved, cfg.max_vocab_size)?
            }
            None => Vocabulary::build(
                &token_lists,
                cfg.min_frequency.unwrap_or(DEFAULT_MIN_FREQUENCY),
                cfg.max_vocab_size,
                &reserved,
            )?,
        };
        let layout = SequenceLayout::resolve(cfg, &vocabulary)?;

        let embedding = match &cfg.pretrained_embedding {
            Some(source) => {
                TextEmbedding::Pretrained(PretrainedLookup::new(&**source, &vocabulary)?)
            }
            None => TextEmbedding::Trainable(TrainableMatrix::new(
                vocabulary.size(),
                cfg.embedding_size.unwrap_or(DEFAULT_EMBEDDING_SIZE),
                &cfg.initializer.unwrap_or_default(),
                cfg.seed,
            )?),
        };

        let unknown    = vocabulary.unknown_index();
        let mut tokens = 0;
        let mut unknown_tokens = 0;
        let mut truncated = 0;
        let mut corpus = Vec::with_capacity(token_lists.len());
        for list in &token_lists {
            let body = vocabulary.encode(list);
            tokens += body.len();
            unknown_tokens += body.iter().filter(|&&i| i == unknown).count();

            let (seq, was_truncated) = layout.assemble(body);
            truncated += usize::from(was_truncated);
            corpus.push(seq);
        }

        let statistics = TextStatistics {
            sentences: corpus.len(),
            tokens,
            unknown_tokens,
            truncated,
            vocab_size: vocabulary.size(),
            embedding_dim: embedding.dimension(),
        };
        tracing::info!(
            "Preprocessed {} sentences: vocab_size={}, embedding={} (dim {}), unknown={}/{}",
            statistics.sentences,
            statistics.vocab_size,
            if embedding.is_trainable() { "trainable" } else { "pretrained" },
            statistics.embedding_dim,
            statistics.unknown_tokens,
            statistics.tokens,
        );

        self.state = Some(PreparedText {
            vocabulary,
            embedding,
            corpus,
            statistics,
        });
        Ok(())
    }

    /// Embed the stored sequence of example `index`, one row per position.
    ///
    /// # Errors
    /// `NotInitialized` before `preprocess`, `OutOfRange` if `index` is past
    /// the corpus, and `Embedding` wrapping the cause if a position cannot
    /// be embedded.
    pub fn embed_text(&self, index: usize) -> Result<Array2<f32>> {
        let state   = self.prepared("embed_text")?;
        let indices = state
            .corpus
            .get(index)
            .ok_or_else(|| TextDataError::out_of_range("corpus", index, state.corpus.len()))?;

        state
            .embedding
            .embed(indices)
            .map_err(|e| TextDataError::Embedding {
                example: index,
                source:  Box::new(e),
            })
    }

    /// Stored index sequence of example `index`.
    pub fn token_indices(&self, index: usize) -> Result<&[usize]> {
        let state = self.prepared("token_indices")?;
        state
            .corpus
            .get(index)
            .map(Vec::as_slice)
            .ok_or_else(|| TextDataError::out_of_range("corpus", index, state.corpus.len()))
    }

    pub fn get_vocabulary(&self) -> Result<&Vocabulary> {
        Ok(&self.prepared("get_vocabulary")?.vocabulary)
    }

    pub fn get_text_embedding(&self) -> Result<&TextEmbedding> {
        Ok(&self.prepared("get_text_embedding")?.embedding)
    }

    pub fn statistics(&self) -> Result<TextStatistics> {
        Ok(self.prepared("statistics")?.statistics)
    }

    /// Point this side at another embedding, e.g. to tie source and
    /// target to one trainable matrix. The vocabulary and stored sequences
    /// stay as they are; examples whose indices fall outside the new
    /// embedding fail individually in `embed_text`.
    pub fn share_embedding(&mut self, embedding: TextEmbedding) -> Result<()> {
        let state = self
            .state
            .as_mut()
            .ok_or(TextDataError::NotInitialized("share_embedding"))?;
        if embedding.vocab_size() < state.vocabulary.size() {
            tracing::warn!(
                "Shared embedding has {} rows but the vocabulary has {} entries",
                embedding.vocab_size(),
                state.vocabulary.size()
            );
        }
        state.statistics.embedding_dim = embedding.dimension();
        state.embedding = embedding;
        Ok(())
    }

    /// Number of stored examples; zero before `preprocess`.
    pub fn len(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.corpus.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

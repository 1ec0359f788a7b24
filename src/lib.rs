// ============================================================
// text-dataset
// ============================================================
// Turns raw paired corpora (source/target sentences) into
// vocabularies, index sequences and embedding matrices.
//
// Layers, outermost first:
//
//   Layer 1 — cli          argument parsing, printing
//   Layer 2 — application  prepare / embed workflows, settings
//   Layer 3 — domain       error kinds, documents, core traits
//   Layer 4 — data         processors, vocabulary, embeddings,
//                          TextData, TextDataset, loaders
//   Layer 5 — ml           SGD for trainable embeddings
//   Layer 6 — infra        JSON/CSV persistence, GloVe files

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;

pub use data::dataset::{Side, TextDataset, TextPair};
pub use data::embedding::{Initializer, PretrainedLookup, TextEmbedding, TrainableMatrix};
pub use data::processor::ProcessorChain;
pub use data::text_data::{TextData, TextDataConfig};
pub use data::vocabulary::{ReservedTokens, Vocabulary};
pub use domain::error::{Result, TextDataError};

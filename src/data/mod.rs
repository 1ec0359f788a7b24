// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw sentences to embedded examples:
//
//   corpus files
//       │
//       ▼
//   LineFileLoader / DocxLoader → raw sentences
//       │
//       ▼
//   ProcessorChain              → token lists
//       │
//       ▼
//   Vocabulary                  → token ↔ index
//       │
//       ▼
//   TextEmbedding               → index → vector
//       │
//       ▼
//   TextData (one per side)     → stored index sequences
//       │
//       ▼
//   TextDataset                 → burn Dataset of source/target pairs
//
// Each module is responsible for exactly one step.

/// Plain-text and .docx corpus loaders
pub mod loader;

/// Text processors and the chain that runs them
pub mod processor;

/// Token ↔ index mapping with reserved tokens
pub mod vocabulary;

/// In-memory pretrained vector source
pub mod source;

/// Pretrained lookup and trainable embedding matrix
pub mod embedding;

/// Per-side preprocessing state and configuration
pub mod text_data;

/// Paired source/target dataset, implements burn's Dataset trait
pub mod dataset;

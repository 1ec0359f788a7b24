// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File formats and persistence that the data layer itself
// stays ignorant of:
//
//   vocab_store.rs — Vocabulary persistence
//                    JSON save/load of token lists and reserved
//                    tokens, plus export to a HuggingFace
//                    tokenizer.json that loads back as a
//                    PretrainedTokenizer processor.
//
//   checkpoint.rs  — Trainable embedding persistence
//                    Saves weight matrices per step and tracks
//                    the latest one, like a training checkpoint.
//
//   report.rs      — Preprocessing report
//                    Appends per-side statistics to a CSV file.
//
//   glove.rs       — Pretrained vector files
//                    Parses GloVe / word2vec text files into an
//                    in-memory embedding source.

/// Vocabulary and tokenizer JSON persistence
pub mod vocab_store;

/// Trainable embedding checkpoints
pub mod checkpoint;

/// Per-side statistics CSV logger
pub mod report;

/// GloVe text format loader
pub mod glove;

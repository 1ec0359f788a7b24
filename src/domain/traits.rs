// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams of the pipeline. Each trait has at least one
// implementation elsewhere in the crate:
//
//   CorpusSource     → LineFileLoader, DocxLoader   (data/loader.rs)
//   TextProcessor    → the processors in data/processor.rs
//   EmbeddingSource  → InMemorySource (data/source.rs),
//                      loaded from GloVe files by infra/glove.rs
//   Persistable      → Vocabulary (infra/vocab_store.rs),
//                      TrainableMatrix (infra/checkpoint.rs)

use std::fmt::Debug;
use std::path::Path;

use anyhow::Result;

use crate::domain::document::Document;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can load raw sentences from somewhere.
pub trait CorpusSource {
    /// Load every available document from this source.
    fn load_all(&self) -> Result<Vec<Document>>;
}

// ─── TextProcessor ────────────────────────────────────────────────────────────
/// One step of a processor chain.
///
/// A processor receives the token list produced by the previous
/// step and returns a new one. Implementations must be pure and
/// deterministic, and must never fail: malformed input is
/// normalised rather than rejected.
pub trait TextProcessor: Debug + Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    fn process(&self, tokens: Vec<String>) -> Vec<String>;
}

// ─── EmbeddingSource ──────────────────────────────────────────────────────────
/// An external provider of pretrained token vectors.
pub trait EmbeddingSource: Debug + Send + Sync {
    /// Length of every vector this source returns
    fn dimension(&self) -> usize;

    /// Every token the source knows, in a stable order
    fn tokens(&self) -> Vec<&str>;

    /// Vector for `token`, or `None` if the source does not know it
    fn resolve(&self, token: &str) -> Option<Vec<f32>>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved and restored from disk.
pub trait Persistable: Sized {
    fn save(&self, path: &Path) -> Result<()>;

    fn load(path: &Path) -> Result<Self>;
}

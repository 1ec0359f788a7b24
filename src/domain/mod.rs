// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits that describe the text pipeline:
// what a document is, what a text processor promises, what a
// pretrained embedding source must provide, and the error kinds
// every other layer reports through.
//
// Rules for this layer:
//   - NO burn, tokenizers or ndarray types here
//   - NO file I/O
//   - Only structs, enums and traits

/// A raw document loaded from a corpus source
pub mod document;

/// Error kinds shared by the whole pipeline
pub mod error;

/// Core abstractions (traits) that other layers implement
pub mod traits;

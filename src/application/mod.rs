// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish a
// specific goal (preparing a dataset or embedding one example).
//
// Rules for this layer:
//   - No text processing or embedding math here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

/// JSON settings file → per-side configuration
pub mod settings;

/// The preprocessing workflow
pub mod prepare_use_case;

/// The single-example embedding workflow
pub mod embed_use_case;

// ============================================================
// Layer 5 — ML Layer
// ============================================================
// Training-side code that acts on trainable embeddings.
//
//   sgd.rs — SGD with weight decay, momentum, gradient rescaling
//            and clipping, and lazy row updates. Steps a
//            TrainableMatrix through its shared handle, so every
//            TextData holding that handle sees the new weights.

/// SGD optimiser for trainable embedding matrices
pub mod sgd;

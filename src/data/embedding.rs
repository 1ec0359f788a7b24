// ============================================================
// Layer 4 — Text Embeddings
// ============================================================
// Maps vocabulary indices to dense vectors. Two variants sit
// behind one `embed(indices)` call:
//
//   PretrainedLookup  immutable table resolved from an external
//                     EmbeddingSource, one row per vocabulary
//                     index; reserved rows (unknown, padding,
//                     ...) hold a fixed default vector
//
//   TrainableMatrix   (vocab_size × dim) parameter matrix behind
//                     a shared handle; lookups take a read lock,
//                     the optimizer writes under the write lock,
//                     so a lookup never sees half an update
//
// Lookups outside the table fail with OutOfRange; they never
// clamp.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ndarray::{Array2, ArrayView2};
use rand::{distributions::Uniform, rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::data::vocabulary::Vocabulary;
use crate::domain::error::{Result, TextDataError};
use crate::domain::traits::EmbeddingSource;

// ─── Initializer ──────────────────────────────────────────────────────────────
/// Random distribution used to fill a fresh trainable matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Initializer {
    Normal { mean: f32, std: f32 },
    Uniform { low: f32, high: f32 },
    /// Uniform in ±sqrt(6 / (rows + cols))
    XavierUniform,
}

impl Default for Initializer {
    fn default() -> Self {
        Self::Normal { mean: 0.0, std: 0.02 }
    }
}

impl Initializer {
    /// Sample a matrix of the given shape. A seed makes the result reproducible.
    pub fn sample(&self, shape: (usize, usize), seed: Option<u64>) -> Result<Array2<f32>> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        match *self {
            Self::Normal { mean, std } => {
                if !mean.is_finite() || !std.is_finite() || std < 0.0 {
                    return Err(TextDataError::Configuration(format!(
                        "normal initializer needs a finite mean and std >= 0, got mean {mean}, std {std}"
                    )));
                }
                let dist = Normal::new(mean, std).map_err(|e| {
                    TextDataError::Configuration(format!("invalid normal initializer: {e}"))
                })?;
                Ok(Array2::from_shape_fn(shape, |_| dist.sample(&mut rng)))
            }
            Self::Uniform { low, high } => {
                if !(low < high) {
                    return Err(TextDataError::Configuration(format!(
                        "uniform initializer needs low < high, got [{low}, {high})"
                    )));
                }
                // Uniform::new panics when the width overflows f32
                if !low.is_finite() || !high.is_finite() || !(high - low).is_finite() {
                    return Err(TextDataError::Configuration(format!(
                        "uniform initializer range [{low}, {high}) is not representable"
                    )));
                }
                let dist = Uniform::new(low, high);
                Ok(Array2::from_shape_fn(shape, |_| dist.sample(&mut rng)))
            }
            Self::XavierUniform => {
                let bound = (6.0 / (shape.0 + shape.1) as f32).sqrt();
                let dist  = Uniform::new_inclusive(-bound, bound);
                Ok(Array2::from_shape_fn(shape, |_| dist.sample(&mut rng)))
            }
        }
    }
}

/// Copy the rows named by `indices` out of `table`.
fn gather_rows(table: &Array2<f32>, indices: &[usize]) -> Result<Array2<f32>> {
    let rows    = table.nrows();
    let mut out = Array2::<f32>::zeros((indices.len(), table.ncols()));
    for (i, &index) in indices.iter().enumerate() {
        if index >= rows {
            return Err(TextDataError::out_of_range("embedding", index, rows));
        }
        out.row_mut(i).assign(&table.row(index));
    }
    Ok(out)
}

// ─── TrainableMatrix ──────────────────────────────────────────────────────────
#[derive(Debug)]
struct MatrixState {
    weights:  Array2<f32>,
    /// Accumulated gradient, same shape as `weights`
    gradient: Array2<f32>,
}

/// Handle to a trainable (vocab_size × dim) embedding matrix.
///
/// Cloning the handle shares the matrix: an update made through one
/// clone is visible to lookups through every other.
#[derive(Debug, Clone)]
pub struct TrainableMatrix {
    state: Arc<RwLock<MatrixState>>,
}

impl TrainableMatrix {
    pub fn new(
        vocab_size:     usize,
        embedding_size: usize,
        initializer:    &Initializer,
        seed:           Option<u64>,
    ) -> Result<Self> {
        if vocab_size == 0 || embedding_size == 0 {
            return Err(TextDataError::Configuration(format!(
                "trainable embedding needs a positive shape, got ({vocab_size}, {embedding_size})"
            )));
        }
        let weights = initializer.sample((vocab_size, embedding_size), seed)?;
        Self::from_weights(weights)
    }

    /// Wrap an existing weight matrix, e.g. one restored from a checkpoint.
    pub fn from_weights(weights: Array2<f32>) -> Result<Self> {
        if weights.nrows() == 0 || weights.ncols() == 0 {
            return Err(TextDataError::Configuration(
                "trainable embedding cannot be empty".to_string(),
            ));
        }
        let gradient = Array2::zeros(weights.dim());
        Ok(Self {
            state: Arc::new(RwLock::new(MatrixState { weights, gradient })),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, MatrixState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MatrixState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.read().weights.dim()
    }

    pub fn vocab_size(&self) -> usize {
        self.shape().0
    }

    pub fn dimension(&self) -> usize {
        self.shape().1
    }

    pub fn embed(&self, indices: &[usize]) -> Result<Array2<f32>> {
        gather_rows(&self.read().weights, indices)
    }

    /// Copy of the current weights.
    pub fn snapshot(&self) -> Array2<f32> {
        self.read().weights.clone()
    }

    /// Swap in a whole new weight matrix of the same shape.
    pub fn replace(&self, weights: Array2<f32>) -> Result<()> {
        let mut state = self.write();
        if weights.dim() != state.weights.dim() {
            return Err(TextDataError::Configuration(format!(
                "replacement shape {:?} does not match {:?}",
                weights.dim(),
                state.weights.dim()
            )));
        }
        state.weights = weights;
        Ok(())
    }

    /// Scatter-add per-position gradients into the rows named by `indices`.
    ///
    /// `grads` has one row per index; repeated indices accumulate.
    pub fn accumulate_gradient(&self, indices: &[usize], grads: ArrayView2<'_, f32>) -> Result<()> {
        let mut state = self.write();
        let (rows, cols) = state.gradient.dim();
        if grads.nrows() != indices.len() || grads.ncols() != cols {
            return Err(TextDataError::Configuration(format!(
                "gradient shape {:?} does not match {} indices × {} columns",
                grads.dim(),
                indices.len(),
                cols
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= rows) {
            return Err(TextDataError::out_of_range("embedding", bad, rows));
        }
        for (i, &index) in indices.iter().enumerate() {
            let mut row = state.gradient.row_mut(index);
            row += &grads.row(i);
        }
        Ok(())
    }

    /// Copy of the accumulated gradient.
    pub fn gradient(&self) -> Array2<f32> {
        self.read().gradient.clone()
    }

    /// Run `f` on the weights and the accumulated gradient under the
    /// write lock. The gradient is reset to zero once `f` succeeds.
    pub fn apply_gradient<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Array2<f32>, &Array2<f32>) -> Result<()>,
    {
        let mut guard = self.write();
        let MatrixState { weights, gradient } = &mut *guard;
        f(weights, gradient)?;
        gradient.fill(0.0);
        Ok(())
    }

    /// True if both handles point at the same matrix.
    pub fn ptr_eq(&self, other: &TrainableMatrix) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

// ─── PretrainedLookup ─────────────────────────────────────────────────────────
/// Immutable embedding table aligned to a vocabulary.
#[derive(Debug, Clone)]
pub struct PretrainedLookup {
    table:          Arc<Array2<f32>>,
    default_vector: Vec<f32>,
}

impl PretrainedLookup {
    /// Resolve every vocabulary entry through `source`; reserved entries
    /// get a zero vector.
    pub fn new(source: &dyn EmbeddingSource, vocabulary: &Vocabulary) -> Result<Self> {
        Self::with_default_vector(source, vocabulary, vec![0.0; source.dimension()])
    }

    /// Like `new`, with an explicit vector for reserved entries.
    ///
    /// # Errors
    /// `EmbeddingLoad` if the source has no dimension, a non-reserved
    /// token cannot be resolved, or a vector has the wrong length.
    pub fn with_default_vector(
        source:         &dyn EmbeddingSource,
        vocabulary:     &Vocabulary,
        default_vector: Vec<f32>,
    ) -> Result<Self> {
        let dim = source.dimension();
        if dim == 0 {
            return Err(TextDataError::EmbeddingLoad(
                "pretrained source reports dimension 0".to_string(),
            ));
        }
        if default_vector.len() != dim {
            return Err(TextDataError::EmbeddingLoad(format!(
                "default vector has {} values, source dimension is {}",
                default_vector.len(),
                dim
            )));
        }

        let mut table = Array2::<f32>::zeros((vocabulary.size(), dim));
        for (index, token) in vocabulary.tokens().iter().enumerate() {
            let mut row = table.row_mut(index);
            if index < vocabulary.reserved_count() {
                row.assign(&ndarray::ArrayView1::from(&default_vector[..]));
                continue;
            }
            let vector = source.resolve(token).ok_or_else(|| {
                TextDataError::EmbeddingLoad(format!("token '{token}' cannot be resolved"))
            })?;
            if vector.len() != dim {
                return Err(TextDataError::EmbeddingLoad(format!(
                    "vector for '{}' has {} values, expected {}",
                    token,
                    vector.len(),
                    dim
                )));
            }
            row.assign(&ndarray::ArrayView1::from(&vector[..]));
        }

        Ok(Self {
            table: Arc::new(table),
            default_vector,
        })
    }

    pub fn embed(&self, indices: &[usize]) -> Result<Array2<f32>> {
        gather_rows(&self.table, indices)
    }

    pub fn dimension(&self) -> usize {
        self.table.ncols()
    }

    pub fn vocab_size(&self) -> usize {
        self.table.nrows()
    }

    pub fn default_vector(&self) -> &[f32] {
        &self.default_vector
    }
}

// ─── TextEmbedding ────────────────────────────────────────────────────────────
/// The embedding a TextData uses; callers never need to branch on the variant.
#[derive(Debug, Clone)]
pub enum TextEmbedding {
    Pretrained(PretrainedLookup),
    Trainable(TrainableMatrix),
}

impl TextEmbedding {
    /// One vector (row) per index, in order.
    pub fn embed(&self, indices: &[usize]) -> Result<Array2<f32>> {
        match self {
            Self::Pretrained(lookup) => lookup.embed(indices),
            Self::Trainable(matrix) => matrix.embed(indices),
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            Self::Pretrained(lookup) => lookup.dimension(),
            Self::Trainable(matrix) => matrix.dimension(),
        }
    }

    pub fn vocab_size(&self) -> usize {
        match self {
            Self::Pretrained(lookup) => lookup.vocab_size(),
            Self::Trainable(matrix) => matrix.vocab_size(),
        }
    }

    pub fn is_trainable(&self) -> bool {
        matches!(self, Self::Trainable(_))
    }

    /// Handle to the trainable matrix, for the optimizer.
    pub fn as_trainable(&self) -> Option<&TrainableMatrix> {
        match self {
            Self::Trainable(matrix) => Some(matrix),
            Self::Pretrained(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::InMemorySource;
    use crate::data::vocabulary::ReservedTokens;
    use ndarray::array;

    #[test]
    fn test_trainable_shape_and_lookup() {
        let m   = TrainableMatrix::new(10, 4, &Initializer::default(), Some(7)).unwrap();
        let out = m.embed(&[0, 3, 3, 9]).unwrap();
        assert_eq!(out.dim(), (4, 4));
        assert_eq!(out.row(1), out.row(2));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = TrainableMatrix::new(5, 3, &Initializer::default(), Some(42)).unwrap();
        let b = TrainableMatrix::new(5, 3, &Initializer::default(), Some(42)).unwrap();
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_trainable_out_of_range_does_not_clamp() {
        let m   = TrainableMatrix::new(3, 2, &Initializer::default(), Some(1)).unwrap();
        let err = m.embed(&[0, 3]).unwrap_err();
        assert!(matches!(err, TextDataError::OutOfRange { index: 3, len: 3, .. }));
    }

    #[test]
    fn test_zero_shape_rejected() {
        assert!(matches!(
            TrainableMatrix::new(0, 4, &Initializer::default(), None),
            Err(TextDataError::Configuration(_))
        ));
    }

    #[test]
    fn test_uniform_initializer_bounds() {
        let init = Initializer::Uniform { low: -0.5, high: 0.5 };
        let w    = init.sample((20, 20), Some(3)).unwrap();
        assert!(w.iter().all(|&x| (-0.5..0.5).contains(&x)));

        let bad = Initializer::Uniform { low: 1.0, high: 1.0 };
        assert!(matches!(bad.sample((1, 1), None), Err(TextDataError::Configuration(_))));
    }

    #[test]
    fn test_xavier_initializer_bounds() {
        let w     = Initializer::XavierUniform.sample((4, 2), Some(9)).unwrap();
        let bound = (6.0f32 / 6.0).sqrt();
        assert!(w.iter().all(|&x| x.abs() <= bound));
    }

    #[test]
    fn test_uniform_overflowing_range_rejected() {
        let init: Initializer =
            serde_json::from_str(r#"{"type":"uniform","low":-3e38,"high":3e38}"#).unwrap();
        assert!(matches!(init.sample((1, 1), Some(1)), Err(TextDataError::Configuration(_))));

        let infinite = Initializer::Uniform { low: 0.0, high: f32::INFINITY };
        assert!(matches!(infinite.sample((1, 1), None), Err(TextDataError::Configuration(_))));
    }

    #[test]
    fn test_invalid_normal_rejected() {
        let init = Initializer::Normal { mean: 0.0, std: -1.0 };
        assert!(matches!(init.sample((1, 1), None), Err(TextDataError::Configuration(_))));

        let nan_mean = Initializer::Normal { mean: f32::NAN, std: 1.0 };
        assert!(matches!(nan_mean.sample((1, 1), None), Err(TextDataError::Configuration(_))));
    }

    #[test]
    fn test_lookup_never_sees_partial_replace() {
        let m      = TrainableMatrix::from_weights(Array2::zeros((8, 16))).unwrap();
        let writer = m.clone();
        let rounds = 200;

        std::thread::scope(|scope| {
            scope.spawn(move || {
                for k in 1..=rounds {
                    writer.replace(Array2::from_elem((8, 16), k as f32)).unwrap();
                }
            });
            scope.spawn(|| {
                for _ in 0..rounds {
                    let rows = m.embed(&[0, 3, 7]).unwrap();
                    let first = rows[[0, 0]];
                    assert!(
                        rows.iter().all(|&x| x == first),
                        "lookup saw a mixed update: {rows:?}"
                    );
                }
            });
        });
        assert_eq!(m.snapshot()[[7, 15]], rounds as f32);
    }

    #[test]
    fn test_cloned_handle_shares_updates() {
        let m     = TrainableMatrix::from_weights(array![[1.0f32, 1.0], [2.0, 2.0]]).unwrap();
        let other = m.clone();
        assert!(m.ptr_eq(&other));

        m.replace(array![[5.0f32, 5.0], [6.0, 6.0]]).unwrap();
        assert_eq!(other.embed(&[1]).unwrap(), array![[6.0f32, 6.0]]);
    }

    #[test]
    fn test_replace_rejects_other_shape() {
        let m = TrainableMatrix::from_weights(array![[1.0f32, 1.0]]).unwrap();
        assert!(matches!(
            m.replace(array![[1.0f32, 1.0, 1.0]]),
            Err(TextDataError::Configuration(_))
        ));
    }

    #[test]
    fn test_accumulate_gradient_scatter_adds() {
        let m = TrainableMatrix::from_weights(Array2::zeros((3, 2))).unwrap();
        let grads = array![[1.0f32, 2.0], [0.5, 0.5], [1.0, 1.0]];
        m.accumulate_gradient(&[2, 0, 2], grads.view()).unwrap();
        assert_eq!(m.gradient(), array![[0.5f32, 0.5], [0.0, 0.0], [2.0, 3.0]]);

        let err = m.accumulate_gradient(&[5], array![[1.0f32, 1.0]].view()).unwrap_err();
        assert!(matches!(err, TextDataError::OutOfRange { .. }));
    }

    #[test]
    fn test_apply_gradient_resets_only_on_success() {
        let m = TrainableMatrix::from_weights(Array2::zeros((1, 1))).unwrap();
        m.accumulate_gradient(&[0], array![[2.0f32]].view()).unwrap();

        let failed = m.apply_gradient(|_, _| Err(TextDataError::Configuration("boom".into())));
        assert!(failed.is_err());
        assert_eq!(m.gradient(), array![[2.0f32]]);

        m.apply_gradient(|w, g| {
            *w -= g;
            Ok(())
        })
        .unwrap();
        assert_eq!(m.snapshot(), array![[-2.0f32]]);
        assert_eq!(m.gradient(), array![[0.0f32]]);
    }

    fn the_cat_source() -> InMemorySource {
        InMemorySource::from_pairs([("the", vec![1.0, 2.0]), ("cat", vec![3.0, 4.0])]).unwrap()
    }

    #[test]
    fn test_pretrained_lookup_rows() {
        let source = the_cat_source();
        let vocab  = Vocabulary::from_tokens(source.tokens(), &ReservedTokens::default(), None)
            .unwrap();
        let lookup = PretrainedLookup::new(&source, &vocab).unwrap();

        let out = lookup
            .embed(&[vocab.index_of("cat"), vocab.unknown_index()])
            .unwrap();
        assert_eq!(out, array![[3.0f32, 4.0], [0.0, 0.0]]);
        assert_eq!(lookup.dimension(), 2);
        assert_eq!(lookup.vocab_size(), 6);
    }

    #[test]
    fn test_pretrained_custom_default_vector() {
        let source = the_cat_source();
        let vocab  = Vocabulary::from_tokens(source.tokens(), &ReservedTokens::new("<unk>"), None)
            .unwrap();
        let lookup = PretrainedLookup::with_default_vector(&source, &vocab, vec![9.0, 9.0])
            .unwrap();
        assert_eq!(lookup.embed(&[0]).unwrap(), array![[9.0f32, 9.0]]);
        assert_eq!(lookup.default_vector(), &[9.0, 9.0]);
    }

    #[test]
    fn test_pretrained_unresolvable_token_fails() {
        let source = the_cat_source();
        // A vocabulary built elsewhere may hold tokens the source never saw
        let vocab = Vocabulary::from_tokens(["the", "dog"], &ReservedTokens::default(), None)
            .unwrap();
        let err = PretrainedLookup::new(&source, &vocab).unwrap_err();
        assert!(matches!(err, TextDataError::EmbeddingLoad(_)));
    }

    #[test]
    fn test_text_embedding_dispatch() {
        let trainable = TextEmbedding::Trainable(
            TrainableMatrix::new(4, 3, &Initializer::default(), Some(0)).unwrap(),
        );
        assert!(trainable.is_trainable());
        assert!(trainable.as_trainable().is_some());
        assert_eq!(trainable.dimension(), 3);
        assert_eq!(trainable.vocab_size(), 4);
        assert_eq!(trainable.embed(&[1, 2]).unwrap().nrows(), 2);
        assert!(trainable.embed(&[]).unwrap().is_empty());
    }
}

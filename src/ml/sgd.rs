// ============================================================
// Layer 5 — SGD Optimiser
// ============================================================
// Stochastic gradient descent for trainable embedding matrices.
//
//   g' = clip(rescale_grad · g)
//
//   plain:     w ← w − lr · (g' + wd · w)
//   momentum:  m ← momentum · m − lr · (g' + wd · w)
//              w ← w + m
//
// lr follows the schedule, driven by the update count, which
// starts at begin_num_update so a resumed run picks up the
// schedule where it stopped:
//
//   constant:  lr
//   factor:    max(lr · factor^⌊n / step⌋, min_lr)
//
// Momentum state is kept per parameter index and allocated
// lazily (zeros shaped like the weight) the first time that
// parameter is updated. With lazy_update on, rows whose gradient
// is entirely zero are left alone, so rows of tokens that did
// not appear in the batch neither decay nor carry momentum.

use ndarray::{Array2, ArrayView1, ArrayViewMut1, Zip};
use serde::{Deserialize, Serialize};

use crate::data::embedding::TrainableMatrix;
use crate::domain::error::{Result, TextDataError};

/// How the learning rate changes with the update count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LearningRateSchedule {
    #[default]
    Constant,
    /// Multiply by `factor` every `step` updates, never going below `min_lr`
    Factor { factor: f32, step: usize, min_lr: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SgdConfig {
    pub learning_rate: f32,
    pub schedule:      LearningRateSchedule,
    /// Update count the optimiser starts from
    pub begin_num_update: usize,
    pub weight_decay:  f32,
    /// Zero disables momentum
    pub momentum:      f32,
    pub rescale_grad:  f32,
    /// Clamp rescaled gradients to ±value; unset means no clipping
    pub clip_gradient: Option<f32>,
    pub lazy_update:   bool,
}

impl SgdConfig {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            schedule:      LearningRateSchedule::Constant,
            begin_num_update: 0,
            weight_decay:  0.0,
            momentum:      0.0,
            rescale_grad:  1.0,
            clip_gradient: None,
            lazy_update:   true,
        }
    }

    pub fn with_schedule(mut self, schedule: LearningRateSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_begin_num_update(mut self, value: usize) -> Self {
        self.begin_num_update = value;
        self
    }

    /// Learning rate in effect after `num_update` updates.
    pub fn learning_rate_at(&self, num_update: usize) -> f32 {
        match self.schedule {
            LearningRateSchedule::Constant => self.learning_rate,
            LearningRateSchedule::Factor { factor, step, min_lr } => {
                let drops = (num_update / step.max(1)).min(i32::MAX as usize) as i32;
                (self.learning_rate * factor.powi(drops)).max(min_lr)
            }
        }
    }

    pub fn with_weight_decay(mut self, value: f32) -> Self {
        self.weight_decay = value;
        self
    }

    pub fn with_momentum(mut self, value: f32) -> Self {
        self.momentum = value;
        self
    }

    pub fn with_rescale_grad(mut self, value: f32) -> Self {
        self.rescale_grad = value;
        self
    }

    pub fn with_clip_gradient(mut self, value: f32) -> Self {
        self.clip_gradient = Some(value.abs());
        self
    }

    pub fn with_lazy_update(mut self, enabled: bool) -> Self {
        self.lazy_update = enabled;
        self
    }

    pub fn init(&self) -> Sgd {
        Sgd {
            config:          *self,
            momentum_states: Vec::new(),
            update_count:    self.begin_num_update,
        }
    }

    fn prepare(&self, g: f32) -> f32 {
        let g = g * self.rescale_grad;
        match self.clip_gradient {
            Some(c) => g.clamp(-c, c),
            None => g,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sgd {
    config:          SgdConfig,
    momentum_states: Vec<Option<Array2<f32>>>,
    update_count:    usize,
}

impl Sgd {
    pub fn config(&self) -> &SgdConfig {
        &self.config
    }

    /// Update count: `begin_num_update` plus successful `update` calls.
    pub fn update_count(&self) -> usize {
        self.update_count
    }

    /// Momentum buffer of parameter `index`, if one has been allocated.
    pub fn momentum_state(&self, index: usize) -> Option<&Array2<f32>> {
        self.momentum_states.get(index).and_then(Option::as_ref)
    }

    fn momentum_buffer(&mut self, index: usize, shape: (usize, usize)) -> Result<&mut Array2<f32>> {
        if self.momentum_states.len() <= index {
            self.momentum_states.resize(index + 1, None);
        }
        let state = self.momentum_states[index].get_or_insert_with(|| Array2::zeros(shape));
        if state.dim() != shape {
            return Err(TextDataError::Configuration(format!(
                "parameter {index} changed shape from {:?} to {:?}",
                state.dim(),
                shape
            )));
        }
        Ok(state)
    }

    /// Apply one update to parameter `index`.
    pub fn update(&mut self, index: usize, weight: &mut Array2<f32>, grad: &Array2<f32>) -> Result<()> {
        if weight.dim() != grad.dim() {
            return Err(TextDataError::Configuration(format!(
                "gradient shape {:?} does not match weight shape {:?}",
                grad.dim(),
                weight.dim()
            )));
        }

        let cfg  = self.config;
        let lr   = cfg.learning_rate_at(self.update_count);
        let grad = grad.mapv(|g| cfg.prepare(g));
        let mut momentum = if cfg.momentum != 0.0 {
            Some(self.momentum_buffer(index, weight.dim())?)
        } else {
            None
        };

        let mut skipped = 0;
        for r in 0..weight.nrows() {
            let g_row = grad.row(r);
            if cfg.lazy_update && g_row.iter().all(|&g| g == 0.0) {
                skipped += 1;
                continue;
            }
            match momentum.as_deref_mut() {
                Some(m) => momentum_row(&cfg, lr, weight.row_mut(r), m.row_mut(r), g_row),
                None => plain_row(&cfg, lr, weight.row_mut(r), g_row),
            }
        }

        self.update_count += 1;
        tracing::debug!(
            "SGD update #{} on parameter {} (lr {}): {} rows skipped",
            self.update_count,
            index,
            lr,
            skipped
        );
        Ok(())
    }

    /// Apply the gradient accumulated in `matrix` and reset it.
    pub fn step(&mut self, index: usize, matrix: &TrainableMatrix) -> Result<()> {
        matrix.apply_gradient(|weight, grad| self.update(index, weight, grad))
    }
}

fn plain_row(cfg: &SgdConfig, lr: f32, w: ArrayViewMut1<'_, f32>, g: ArrayView1<'_, f32>) {
    Zip::from(w).and(g).for_each(|w, &g| {
        *w -= lr * (g + cfg.weight_decay * *w);
    });
}

fn momentum_row(
    cfg: &SgdConfig,
    lr:  f32,
    w:   ArrayViewMut1<'_, f32>,
    m:   ArrayViewMut1<'_, f32>,
    g:   ArrayView1<'_, f32>,
) {
    Zip::from(w).and(m).and(g).for_each(|w, m, &g| {
        *m = cfg.momentum * *m - lr * (g + cfg.weight_decay * *w);
        *w += *m;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(actual: &Array2<f32>, expected: &Array2<f32>) {
        assert_eq!(actual.dim(), expected.dim());
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_plain_update() {
        let mut sgd = SgdConfig::new(0.1).init();
        let mut w   = array![[1.0f32, 2.0]];
        sgd.update(0, &mut w, &array![[0.5f32, -1.0]]).unwrap();
        assert_close(&w, &array![[0.95f32, 2.1]]);
        assert_eq!(sgd.update_count(), 1);
        assert!(sgd.momentum_state(0).is_none());
    }

    #[test]
    fn test_weight_decay_pulls_towards_zero() {
        let mut sgd = SgdConfig::new(0.1)
            .with_weight_decay(0.1)
            .with_lazy_update(false)
            .init();
        let mut w = array![[1.0f32]];
        sgd.update(0, &mut w, &array![[0.0f32]]).unwrap();
        assert_close(&w, &array![[0.99f32]]);
    }

    #[test]
    fn test_momentum_accumulates() {
        let mut sgd = SgdConfig::new(0.1).with_momentum(0.9).init();
        let mut w   = array![[1.0f32]];
        let g       = array![[0.5f32]];

        sgd.update(0, &mut w, &g).unwrap();
        assert_close(&w, &array![[0.95f32]]);
        sgd.update(0, &mut w, &g).unwrap();
        assert_close(&w, &array![[0.855f32]]);
        assert_close(sgd.momentum_state(0).unwrap(), &array![[-0.095f32]]);
    }

    #[test]
    fn test_momentum_state_is_per_parameter() {
        let mut sgd = SgdConfig::new(0.1).with_momentum(0.5).init();
        let mut a   = array![[0.0f32]];
        let mut b   = array![[0.0f32, 0.0]];
        sgd.update(2, &mut b, &array![[1.0f32, 1.0]]).unwrap();
        assert!(sgd.momentum_state(0).is_none());
        sgd.update(0, &mut a, &array![[1.0f32]]).unwrap();
        assert_eq!(sgd.momentum_state(0).unwrap().dim(), (1, 1));
        assert_eq!(sgd.momentum_state(2).unwrap().dim(), (1, 2));
    }

    #[test]
    fn test_rescale_and_clip() {
        let mut sgd = SgdConfig::new(1.0)
            .with_rescale_grad(0.5)
            .with_clip_gradient(1.0)
            .init();
        let mut w = array![[0.0f32, 0.0]];
        sgd.update(0, &mut w, &array![[10.0f32, 1.0]]).unwrap();
        assert_close(&w, &array![[-1.0f32, -0.5]]);
    }

    #[test]
    fn test_lazy_update_skips_zero_rows() {
        let cfg = SgdConfig::new(0.1).with_weight_decay(0.5);
        let g   = array![[1.0f32], [0.0]];

        let mut lazy = array![[1.0f32], [1.0]];
        cfg.init().update(0, &mut lazy, &g).unwrap();
        assert_eq!(lazy[[1, 0]], 1.0);

        let mut eager = array![[1.0f32], [1.0]];
        cfg.with_lazy_update(false).init().update(0, &mut eager, &g).unwrap();
        assert!(eager[[1, 0]] < 1.0);
        assert_eq!(lazy[[0, 0]], eager[[0, 0]]);
    }

    #[test]
    fn test_factor_schedule_decays_with_update_count() {
        let cfg = SgdConfig::new(1.0).with_schedule(LearningRateSchedule::Factor {
            factor: 0.5,
            step:   2,
            min_lr: 0.2,
        });
        assert_eq!(cfg.learning_rate_at(0), 1.0);
        assert_eq!(cfg.learning_rate_at(1), 1.0);
        assert_eq!(cfg.learning_rate_at(2), 0.5);
        assert_eq!(cfg.learning_rate_at(4), 0.25);
        assert_eq!(cfg.learning_rate_at(100), 0.2);
        assert_eq!(SgdConfig::new(0.3).learning_rate_at(1_000), 0.3);
    }

    #[test]
    fn test_begin_num_update_resumes_schedule() {
        let schedule = LearningRateSchedule::Factor { factor: 0.1, step: 1, min_lr: 0.0 };
        let mut sgd  = SgdConfig::new(1.0)
            .with_schedule(schedule)
            .with_begin_num_update(1)
            .init();
        assert_eq!(sgd.update_count(), 1);

        let mut w = array![[1.0f32]];
        sgd.update(0, &mut w, &array![[1.0f32]]).unwrap();
        assert_close(&w, &array![[0.9f32]]);
        sgd.update(0, &mut w, &array![[1.0f32]]).unwrap();
        assert_close(&w, &array![[0.89f32]]);
        assert_eq!(sgd.update_count(), 3);
    }

    #[test]
    fn test_schedule_from_json() {
        let schedule: LearningRateSchedule =
            serde_json::from_str(r#"{"type":"factor","factor":0.5,"step":10,"min_lr":0.001}"#).unwrap();
        assert_eq!(
            schedule,
            LearningRateSchedule::Factor { factor: 0.5, step: 10, min_lr: 0.001 }
        );
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let mut sgd = SgdConfig::new(0.1).init();
        let mut w   = array![[1.0f32, 2.0]];
        let err     = sgd.update(0, &mut w, &array![[1.0f32]]).unwrap_err();
        assert!(matches!(err, TextDataError::Configuration(_)));
        assert_eq!(sgd.update_count(), 0);
    }

    #[test]
    fn test_step_applies_accumulated_gradient() {
        let matrix = TrainableMatrix::from_weights(array![[1.0f32, 1.0], [2.0, 2.0]]).unwrap();
        matrix
            .accumulate_gradient(&[1, 1], array![[1.0f32, 0.0], [1.0, 0.0]].view())
            .unwrap();

        let mut sgd = SgdConfig::new(0.5).init();
        sgd.step(0, &matrix).unwrap();

        assert_close(&matrix.snapshot(), &array![[1.0f32, 1.0], [1.0, 2.0]]);
        assert!(matrix.gradient().iter().all(|&g| g == 0.0));
    }
}

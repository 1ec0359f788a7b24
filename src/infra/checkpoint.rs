// ============================================================
// Layer 6 — Embedding Checkpoints
// ============================================================
// Saves and restores trainable embedding matrices as JSON.
//
// The weight matrix goes through ndarray's serde support, which
// writes the shape followed by the row-major data:
//
//   { "weights": { "v": 1, "dim": [rows, cols], "data": [...] } }
//
// File naming convention:
//   checkpoints/
//     source_step_0.json     ← weights of "source" at step 0
//     source_step_100.json   ← weights after 100 optimiser steps
//     source_latest.json     ← number of the latest saved step
//     target_step_0.json
//     ...

use anyhow::{Context, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::embedding::TrainableMatrix;
use crate::domain::traits::Persistable;

#[derive(Serialize, Deserialize)]
struct MatrixFile {
    weights: Array2<f32>,
}

impl Persistable for TrainableMatrix {
    fn save(&self, path: &Path) -> Result<()> {
        let file = MatrixFile { weights: self.snapshot() };
        let json = serde_json::to_string(&file)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write embedding to '{}'", path.display()))?;
        Ok(())
    }

    fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read embedding from '{}'", path.display()))?;
        let file: MatrixFile = serde_json::from_str(&json)
            .with_context(|| format!("Malformed embedding file '{}'", path.display()))?;
        Ok(TrainableMatrix::from_weights(file.weights)?)
    }
}

/// Manages saved embedding matrices in one directory.
pub struct EmbeddingCheckpoint {
    dir: PathBuf,
}

impl EmbeddingCheckpoint {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    fn step_path(&self, name: &str, step: usize) -> PathBuf {
        self.dir.join(format!("{name}_step_{step}.json"))
    }

    /// Save `matrix` under `name` and mark `step` as the latest.
    pub fn save(&self, name: &str, matrix: &TrainableMatrix, step: usize) -> Result<PathBuf> {
        let path = self.step_path(name, step);
        matrix.save(&path)?;

        let latest = self.dir.join(format!("{name}_latest.json"));
        fs::write(&latest, serde_json::to_string(&step)?)
            .with_context(|| format!("Failed to write '{}'", latest.display()))?;

        tracing::debug!(
            "Saved embedding '{}' {:?} at step {}",
            name,
            matrix.shape(),
            step
        );
        Ok(path)
    }

    /// Load the most recently saved matrix for `name`.
    pub fn load_latest(&self, name: &str) -> Result<TrainableMatrix> {
        let step = self.latest_step(name)?;
        tracing::info!("Loading embedding '{}' from step {}", name, step);
        let path = self.step_path(name, step);
        TrainableMatrix::load(&path)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))
    }

    /// Restore the latest saved weights for `name` into an existing
    /// matrix; every handle sharing it sees the restored weights.
    pub fn restore_into(&self, name: &str, matrix: &TrainableMatrix) -> Result<()> {
        let saved = self.load_latest(name)?;
        matrix
            .replace(saved.snapshot())
            .with_context(|| format!("Checkpoint '{name}' does not fit this embedding"))?;
        Ok(())
    }

    pub fn latest_step(&self, name: &str) -> Result<usize> {
        let path = self.dir.join(format!("{name}_latest.json"));
        let s = fs::read_to_string(&path).with_context(|| {
            format!("Cannot find '{}'. Have you run 'prepare' first?", path.display())
        })?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

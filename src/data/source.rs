// ============================================================
// Layer 4 — In-Memory Embedding Source
// ============================================================
// The simplest EmbeddingSource: a token → vector map that
// remembers insertion order. The GloVe loader in infra/ parses
// a file into one of these.

use std::collections::HashMap;

use crate::domain::error::{Result, TextDataError};
use crate::domain::traits::EmbeddingSource;

#[derive(Debug, Clone)]
pub struct InMemorySource {
    dimension: usize,
    order:     Vec<String>,
    vectors:   HashMap<String, Vec<f32>>,
}

impl InMemorySource {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(TextDataError::EmbeddingLoad(
                "embedding dimension must be positive".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            order:   Vec::new(),
            vectors: HashMap::new(),
        })
    }

    /// Build a source from `(token, vector)` pairs; the first vector
    /// fixes the dimension.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let mut pairs = pairs.into_iter();
        let (token, vector) = pairs.next().ok_or_else(|| {
            TextDataError::EmbeddingLoad("embedding source is empty".to_string())
        })?;

        let mut source = Self::new(vector.len())?;
        source.insert(token, vector)?;
        for (token, vector) in pairs {
            source.insert(token, vector)?;
        }
        Ok(source)
    }

    /// Add or replace a vector. A replaced token keeps its original position.
    pub fn insert(&mut self, token: impl Into<String>, vector: Vec<f32>) -> Result<()> {
        let token = token.into();
        if vector.len() != self.dimension {
            return Err(TextDataError::EmbeddingLoad(format!(
                "vector for '{}' has {} values, expected {}",
                token,
                vector.len(),
                self.dimension
            )));
        }
        if self.vectors.insert(token.clone(), vector).is_none() {
            self.order.push(token);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl EmbeddingSource for InMemorySource {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn tokens(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    fn resolve(&self, token: &str) -> Option<Vec<f32>> {
        self.vectors.get(token).cloned()
    }
}

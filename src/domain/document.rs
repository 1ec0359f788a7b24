// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// A document is the unit a corpus source hands back: where the
// text came from plus the sentences extracted from it. Sentences
// are still raw here; cleaning and tokenisation happen later in
// the processor chain.

use serde::{Deserialize, Serialize};

/// A raw document loaded from a corpus source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// File name or other identifier, kept for traceability
    pub source: String,

    /// Raw sentences in reading order
    pub sentences: Vec<String>,
}

impl Document {
    pub fn new(source: impl Into<String>, sentences: Vec<String>) -> Self {
        Self {
            source: source.into(),
            sentences,
        }
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    /// Flatten a list of documents into one ordered list of sentences.
    pub fn flatten(docs: Vec<Document>) -> Vec<String> {
        docs.into_iter().flat_map(|d| d.sentences).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_keeps_document_order() {
        let docs = vec![
            Document::new("a.txt", vec!["one".into(), "two".into()]),
            Document::new("b.txt", vec!["three".into()]),
        ];
        assert_eq!(Document::flatten(docs), vec!["one", "two", "three"]);
    }
}

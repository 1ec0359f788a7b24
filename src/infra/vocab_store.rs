// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Saves and restores vocabularies so a later run indexes text
// exactly the way the run that built them did.
//
// On-disk format ({name}.json):
//
//   {
//     "reserved": { "unknown": "<unk>", "padding": "<pad>", ... },
//     "tokens":   ["<pad>", "<unk>", "<bos>", "<eos>", "the", ...]
//   }
//
// Tokens are stored in index order, reserved block included.
//
// A vocabulary can also be exported as a HuggingFace
// tokenizer.json (WordLevel model, whitespace pre-tokenizer),
// and such a file loads back as a PretrainedTokenizer processor.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::processor::PretrainedTokenizer;
use crate::data::vocabulary::{ReservedTokens, Vocabulary};
use crate::domain::traits::Persistable;

#[derive(Serialize, Deserialize)]
struct VocabularyFile {
    reserved: ReservedTokens,
    tokens:   Vec<String>,
}

impl Persistable for Vocabulary {
    fn save(&self, path: &Path) -> Result<()> {
        let file = VocabularyFile {
            reserved: self.reserved().clone(),
            tokens:   self.tokens().to_vec(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))?;
        tracing::debug!("Saved vocabulary ({} entries) to '{}'", self.size(), path.display());
        Ok(())
    }

    fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read vocabulary from '{}'", path.display()))?;
        let file: VocabularyFile = serde_json::from_str(&json)
            .with_context(|| format!("Malformed vocabulary file '{}'", path.display()))?;

        let vocab = Vocabulary::from_tokens(&file.tokens, &file.reserved, None)?;
        // Indices must come back exactly as saved: reserved block first, no duplicates
        if vocab.tokens() != file.tokens.as_slice() {
            anyhow::bail!(
                "Vocabulary file '{}' is not in index order (reserved tokens first, each token once)",
                path.display()
            );
        }
        Ok(vocab)
    }
}

pub struct VocabularyStore {
    dir: PathBuf,
}

impl VocabularyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    pub fn save(&self, name: &str, vocab: &Vocabulary) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path_for(name);
        vocab.save(&path)?;
        tracing::info!("Vocabulary '{}' saved to '{}'", name, path.display());
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<Vocabulary> {
        let path = self.path_for(name);
        Vocabulary::load(&path).with_context(|| {
            format!("Cannot load vocabulary '{name}'. Have you run 'prepare' first?")
        })
    }

    /// Write `vocab` as a HuggingFace WordLevel tokenizer at
    /// `{name}.tokenizer.json`.
    pub fn export_tokenizer(&self, name: &str, vocab: &Vocabulary) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let mut entries = serde_json::Map::new();
        for (index, token) in vocab.tokens().iter().enumerate() {
            entries.insert(token.clone(), serde_json::json!(index));
        }

        let reserved: Vec<_> = vocab
            .reserved()
            .ordered()
            .into_iter()
            .map(|token| {
                serde_json::json!({
                    "id": vocab.index_of(&token),
                    "content": token,
                    "single_word": false,
                    "lstrip": false,
                    "rstrip": false,
                    "normalized": false,
                    "special": true
                })
            })
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": reserved,
            "normalizer": null,
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": entries,
                "unk_token": vocab.reserved().unknown
            }
        });

        let path = self.dir.join(format!("{name}.tokenizer.json"));
        fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON to '{}'", path.display()))?;
        tracing::info!("Tokenizer for '{}' written to '{}'", name, path.display());
        Ok(path)
    }

    /// Load `{name}.tokenizer.json` as a processor.
    pub fn load_tokenizer(&self, name: &str) -> Result<PretrainedTokenizer> {
        let path = self.dir.join(format!("{name}.tokenizer.json"));
        Ok(PretrainedTokenizer::from_file(&path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::TextProcessor;
    use tempfile::tempdir;

    fn vocab() -> Vocabulary {
        let corpus = vec![
            vec!["the".to_string(), "cat".to_string(), "the".to_string()],
            vec!["sat".to_string()],
        ];
        Vocabulary::build(&corpus, 1, None, &ReservedTokens::default()).unwrap()
    }

    #[test]
    fn test_save_then_load_preserves_indices() {
        let dir   = tempdir().unwrap();
        let store = VocabularyStore::new(dir.path());
        let vocab = vocab();

        store.save("source_vocab", &vocab).unwrap();
        assert!(store.exists("source_vocab"));

        let loaded = store.load("source_vocab").unwrap();
        assert_eq!(loaded, vocab);
        assert_eq!(loaded.index_of("the"), vocab.index_of("the"));
        assert_eq!(loaded.padding_index(), Some(0));
    }

    #[test]
    fn test_load_missing_vocabulary_fails() {
        let dir = tempdir().unwrap();
        assert!(VocabularyStore::new(dir.path()).load("absent").is_err());
    }

    #[test]
    fn test_load_rejects_duplicate_tokens() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("dup.json");
        let json = serde_json::json!({
            "reserved": ReservedTokens::new("<unk>"),
            "tokens": ["<unk>", "a", "a"]
        });
        fs::write(&path, json.to_string()).unwrap();
        assert!(Vocabulary::load(&path).is_err());
    }

    #[test]
    fn test_load_rejects_reordered_reserved_tokens() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("shifted.json");
        let json = serde_json::json!({
            "reserved": ReservedTokens::new("<unk>"),
            "tokens": ["hello", "<unk>", "world"]
        });
        fs::write(&path, json.to_string()).unwrap();
        assert!(Vocabulary::load(&path).is_err());
    }

    #[test]
    fn test_exported_tokenizer_round_trips_through_processor() {
        let dir   = tempdir().unwrap();
        let store = VocabularyStore::new(dir.path());
        let vocab = vocab();

        store.export_tokenizer("source", &vocab).unwrap();
        let tok = store.load_tokenizer("source").unwrap();

        let out = tok.process(vec!["the".into(), "dog".into(), "sat".into()]);
        assert_eq!(out, vec!["the", "<unk>", "sat"]);
    }
}

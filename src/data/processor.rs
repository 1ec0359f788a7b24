// ============================================================
// Layer 4 — Text Processors
// ============================================================
// Turns a raw sentence into a list of tokens.
//
// A chain starts from a one-element list holding the whole
// sentence and passes it through each processor in order:
//
//   ["The cat, sat."]
//       │ TextCleaner           → ["The cat, sat."]
//       │ WhitespaceTokenizer   → ["The", "cat,", "sat."]
//       │ LowerCaseConvertor    → ["the", "cat,", "sat."]
//       ▼ PunctuationSeparator  → ["the", "cat", ",", "sat", "."]
//
// An empty chain falls back to plain whitespace tokenisation.
// Processors are pure and never fail; input they cannot make
// sense of is normalised, not rejected.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokenizers::Tokenizer;

use crate::domain::error::{Result, TextDataError};
use crate::domain::traits::TextProcessor;

// ─── TextCleaner ──────────────────────────────────────────────────────────────
/// Normalises whitespace and strips control characters.
///
/// Tabs, non-breaking spaces, zero-width spaces, byte order marks,
/// line breaks and other control characters all become a plain
/// space, runs of spaces collapse to one, and the ends are trimmed.
/// Tokens that end up empty are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCleaner;

impl TextCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Clean one piece of text.
    pub fn clean(&self, text: &str) -> String {
        let mut out        = String::with_capacity(text.len());
        let mut last_space = false;

        for c in text.chars() {
            let c = match c {
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() || c.is_whitespace() => ' ',
                c => c,
            };
            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        out.trim().to_string()
    }
}

impl TextProcessor for TextCleaner {
    fn name(&self) -> &str {
        "cleaner"
    }

    fn process(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
            .iter()
            .map(|t| self.clean(t))
            .filter(|t| !t.is_empty())
            .collect()
    }
}

// ─── WhitespaceTokenizer ──────────────────────────────────────────────────────
/// Splits every incoming token on whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl TextProcessor for WhitespaceTokenizer {
    fn name(&self) -> &str {
        "whitespace"
    }

    fn process(&self, tokens: Vec<String>) -> Vec<String> {
        whitespace_split(&tokens)
    }
}

fn whitespace_split(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .flat_map(|t| t.split_whitespace().map(String::from))
        .collect()
}

// ─── LowerCaseConvertor ───────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default)]
pub struct LowerCaseConvertor;

impl TextProcessor for LowerCaseConvertor {
    fn name(&self) -> &str {
        "lowercase"
    }

    fn process(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter().map(|t| t.to_lowercase()).collect()
    }
}

// ─── PunctuationSeparator ─────────────────────────────────────────────────────
/// Splits punctuation off into standalone single-character tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationSeparator;

impl PunctuationSeparator {
    fn is_punctuation(c: char) -> bool {
        c.is_ascii_punctuation()
            || matches!(
                c,
                '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}' // curly quotes
                    | '\u{2013}' | '\u{2014}'                     // en/em dash
                    | '\u{2026}'                                  // ellipsis
                    | '\u{00AB}' | '\u{00BB}' | '\u{00BF}' | '\u{00A1}'
            )
    }
}

impl TextProcessor for PunctuationSeparator {
    fn name(&self) -> &str {
        "punctuation"
    }

    fn process(&self, tokens: Vec<String>) -> Vec<String> {
        let mut out = Vec::with_capacity(tokens.len());
        for token in tokens {
            let mut word = String::new();
            for c in token.chars() {
                if Self::is_punctuation(c) {
                    if !word.is_empty() {
                        out.push(std::mem::take(&mut word));
                    }
                    out.push(c.to_string());
                } else {
                    word.push(c);
                }
            }
            if !word.is_empty() {
                out.push(word);
            }
        }
        out
    }
}

// ─── TextTruncator ────────────────────────────────────────────────────────────
/// Keeps only the first `max_len` tokens.
#[derive(Debug, Clone, Copy)]
pub struct TextTruncator {
    max_len: usize,
}

impl TextTruncator {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }
}

impl TextProcessor for TextTruncator {
    fn name(&self) -> &str {
        "truncate"
    }

    fn process(&self, mut tokens: Vec<String>) -> Vec<String> {
        tokens.truncate(self.max_len);
        tokens
    }
}

// ─── StopWordFilter ───────────────────────────────────────────────────────────
/// Drops every token found in the stop list. Matching is exact, so
/// put this after `LowerCaseConvertor` for case-insensitive filtering.
#[derive(Debug, Clone, Default)]
pub struct StopWordFilter {
    words: HashSet<String>,
}

impl StopWordFilter {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { words: words.into_iter().map(Into::into).collect() }
    }
}

impl TextProcessor for StopWordFilter {
    fn name(&self) -> &str {
        "stop_words"
    }

    fn process(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
            .into_iter()
            .filter(|t| !self.words.contains(t))
            .collect()
    }
}

// ─── PretrainedTokenizer ──────────────────────────────────────────────────────
/// Tokenises with a HuggingFace tokenizer loaded from `tokenizer.json`.
///
/// Incoming tokens are joined with single spaces and re-encoded.
/// If the tokenizer reports an error the step falls back to
/// whitespace splitting so the chain never fails.
#[derive(Clone)]
pub struct PretrainedTokenizer {
    tokenizer: Tokenizer,
}

impl PretrainedTokenizer {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            TextDataError::Configuration(format!(
                "cannot load tokenizer from '{}': {}",
                path.display(),
                e
            ))
        })?;
        tracing::debug!(
            "Loaded tokenizer from '{}' ({} entries)",
            path.display(),
            tokenizer.get_vocab_size(true)
        );
        Ok(Self::new(tokenizer))
    }
}

impl fmt::Debug for PretrainedTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PretrainedTokenizer")
            .field("vocab_size", &self.tokenizer.get_vocab_size(true))
            .finish()
    }
}

impl TextProcessor for PretrainedTokenizer {
    fn name(&self) -> &str {
        "tokenizer"
    }

    fn process(&self, tokens: Vec<String>) -> Vec<String> {
        let text = tokens.join(" ");
        match self.tokenizer.encode(text.as_str(), false) {
            Ok(encoding) => encoding.get_tokens().to_vec(),
            Err(e) => {
                tracing::warn!("Tokenizer failed, falling back to whitespace: {e}");
                whitespace_split(&tokens)
            }
        }
    }
}

// ─── ProcessorChain ───────────────────────────────────────────────────────────
/// An ordered list of processors applied left to right.
#[derive(Debug, Clone, Default)]
pub struct ProcessorChain {
    processors: Vec<Arc<dyn TextProcessor>>,
}

impl ProcessorChain {
    pub fn new(processors: Vec<Arc<dyn TextProcessor>>) -> Self {
        Self { processors }
    }

    /// Cleaner, whitespace tokenizer, lowercase, punctuation separator.
    pub fn standard() -> Self {
        Self::default()
            .with(TextCleaner)
            .with(WhitespaceTokenizer)
            .with(LowerCaseConvertor)
            .with(PunctuationSeparator)
    }

    /// Append a processor at the end of the chain.
    pub fn with(mut self, processor: impl TextProcessor + 'static) -> Self {
        self.processors.push(Arc::new(processor));
        self
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Run one sentence through the chain.
    pub fn process(&self, sentence: &str) -> Vec<String> {
        if self.processors.is_empty() {
            return sentence.split_whitespace().map(String::from).collect();
        }
        self.processors
            .iter()
            .fold(vec![sentence.to_string()], |tokens, p| p.process(tokens))
    }

    /// Run every sentence through the chain, preserving order.
    pub fn process_all<S: AsRef<str>>(&self, sentences: &[S]) -> Vec<Vec<String>> {
        sentences.iter().map(|s| self.process(s.as_ref())).collect()
    }
}

/// Fold `sentence` through every processor of `chain`.
pub fn apply(chain: &ProcessorChain, sentence: &str) -> Vec<String> {
    chain.process(sentence)
}

// ============================================================
// Layer 4 — Vocabulary
// ============================================================
// Bidirectional mapping between token strings and dense integer
// indices.
//
// Index layout:
//
//   0 .. reserved_count          reserved tokens, in this order:
//                                padding, unknown, begin, end,
//                                then any additional ones
//   reserved_count .. size       corpus tokens, most frequent first
//
// A vocabulary never grows after it is built. Any token it has
// not seen resolves to the unknown index.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::{Result, TextDataError};

pub const PAD_TOKEN: &str = "<pad>";
pub const UNK_TOKEN: &str = "<unk>";
pub const BOS_TOKEN: &str = "<bos>";
pub const EOS_TOKEN: &str = "<eos>";

// ─── ReservedTokens ───────────────────────────────────────────────────────────
/// Fixed-purpose vocabulary entries that always get the lowest indices.
///
/// Only the unknown token is mandatory. The default set carries
/// all four (`<pad>`, `<unk>`, `<bos>`, `<eos>`), which gives
/// padding index 0 and unknown index 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedTokens {
    pub unknown:           String,
    pub padding:           Option<String>,
    pub begin_of_sequence: Option<String>,
    pub end_of_sequence:   Option<String>,
    #[serde(default)]
    pub additional:        Vec<String>,
}

impl ReservedTokens {
    /// A set holding only the unknown token.
    pub fn new(unknown: impl Into<String>) -> Self {
        Self {
            unknown:           unknown.into(),
            padding:           None,
            begin_of_sequence: None,
            end_of_sequence:   None,
            additional:        Vec::new(),
        }
    }

    pub fn with_padding(mut self, padding: impl Into<String>) -> Self {
        self.padding = Some(padding.into());
        self
    }

    pub fn with_sequence_markers(
        mut self,
        begin: impl Into<String>,
        end:   impl Into<String>,
    ) -> Self {
        self.begin_of_sequence = Some(begin.into());
        self.end_of_sequence = Some(end.into());
        self
    }

    pub fn with_additional(mut self, token: impl Into<String>) -> Self {
        self.additional.push(token.into());
        self
    }

    /// Reserved tokens in index order, duplicates removed.
    pub fn ordered(&self) -> Vec<String> {
        let candidates = self
            .padding
            .iter()
            .chain(std::iter::once(&self.unknown))
            .chain(self.begin_of_sequence.iter())
            .chain(self.end_of_sequence.iter())
            .chain(self.additional.iter());

        let mut out: Vec<String> = Vec::new();
        for token in candidates {
            if !out.contains(token) {
                out.push(token.clone());
            }
        }
        out
    }
}

impl Default for ReservedTokens {
    fn default() -> Self {
        Self::new(UNK_TOKEN)
            .with_padding(PAD_TOKEN)
            .with_sequence_markers(BOS_TOKEN, EOS_TOKEN)
    }
}

// ─── Vocabulary ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    token_to_index: HashMap<String, usize>,
    index_to_token: Vec<String>,
    reserved:       ReservedTokens,
    reserved_count: usize,
    unknown_index:  usize,
}

impl Vocabulary {
    /// Build a vocabulary from token frequencies over `corpus`.
    ///
    /// Tokens seen fewer than `min_frequency` times are dropped. At
    /// most `max_size` entries are kept in total, reserved tokens
    /// included; equally frequent tokens keep their first-seen order.
    ///
    /// # Errors
    /// `Configuration` if `max_size` cannot even hold the reserved tokens.
    pub fn build(
        corpus:        &[Vec<String>],
        min_frequency: usize,
        max_size:      Option<usize>,
        reserved:      &ReservedTokens,
    ) -> Result<Self> {
        let mut vocab = Self::with_reserved(reserved, max_size)?;

        // Count in first-seen order so the stable sort below keeps ties ordered
        let mut counts:   Vec<(&str, usize)>     = Vec::new();
        let mut position: HashMap<&str, usize>   = HashMap::new();
        for sentence in corpus {
            for token in sentence {
                match position.get(token.as_str()) {
                    Some(&i) => counts[i].1 += 1,
                    None => {
                        position.insert(token.as_str(), counts.len());
                        counts.push((token.as_str(), 1));
                    }
                }
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));

        for (token, count) in counts {
            if count < min_frequency || vocab.is_full(max_size) {
                break;
            }
            vocab.push(token);
        }

        tracing::debug!(
            "Vocabulary built: {} entries ({} reserved, min_frequency={}, max_size={:?})",
            vocab.size(),
            vocab.reserved_count,
            min_frequency,
            max_size,
        );
        Ok(vocab)
    }

    /// Build a vocabulary over an explicit token list, e.g. the tokens a
    /// pretrained embedding knows. No frequency filter is applied;
    /// duplicates and reserved tokens are skipped.
    pub fn from_tokens<I, S>(
        tokens:   I,
        reserved: &ReservedTokens,
        max_size: Option<usize>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocab = Self::with_reserved(reserved, max_size)?;
        for token in tokens {
            if vocab.is_full(max_size) {
                break;
            }
            vocab.push(token.as_ref());
        }
        Ok(vocab)
    }

    fn with_reserved(reserved: &ReservedTokens, max_size: Option<usize>) -> Result<Self> {
        let ordered = reserved.ordered();
        if let Some(max) = max_size {
            if max < ordered.len() {
                return Err(TextDataError::Configuration(format!(
                    "max vocabulary size {} is smaller than the {} reserved tokens",
                    max,
                    ordered.len()
                )));
            }
        }

        let mut vocab = Self {
            token_to_index: HashMap::with_capacity(ordered.len()),
            index_to_token: Vec::with_capacity(ordered.len()),
            reserved:       reserved.clone(),
            reserved_count: ordered.len(),
            unknown_index:  0,
        };
        for token in &ordered {
            vocab.push(token);
        }
        vocab.unknown_index = vocab.token_to_index[&reserved.unknown];
        Ok(vocab)
    }

    /// Append a token unless it is already present.
    fn push(&mut self, token: &str) {
        if self.token_to_index.contains_key(token) {
            return;
        }
        self.token_to_index
            .insert(token.to_string(), self.index_to_token.len());
        self.index_to_token.push(token.to_string());
    }

    fn is_full(&self, max_size: Option<usize>) -> bool {
        max_size.is_some_and(|max| self.size() >= max)
    }

    /// Index of `token`, or the unknown index if it is not in the vocabulary.
    pub fn index_of(&self, token: &str) -> usize {
        self.token_to_index
            .get(token)
            .copied()
            .unwrap_or(self.unknown_index)
    }

    /// Token stored at `index`.
    pub fn token_of(&self, index: usize) -> Result<&str> {
        self.index_to_token
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| TextDataError::out_of_range("vocabulary", index, self.size()))
    }

    pub fn size(&self) -> usize {
        self.index_to_token.len()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.token_to_index.contains_key(token)
    }

    /// All tokens in index order.
    pub fn tokens(&self) -> &[String] {
        &self.index_to_token
    }

    pub fn reserved(&self) -> &ReservedTokens {
        &self.reserved
    }

    pub fn reserved_count(&self) -> usize {
        self.reserved_count
    }

    pub fn unknown_index(&self) -> usize {
        self.unknown_index
    }

    pub fn padding_index(&self) -> Option<usize> {
        self.reserved_index(self.reserved.padding.as_deref())
    }

    pub fn begin_index(&self) -> Option<usize> {
        self.reserved_index(self.reserved.begin_of_sequence.as_deref())
    }

    pub fn end_index(&self) -> Option<usize> {
        self.reserved_index(self.reserved.end_of_sequence.as_deref())
    }

    fn reserved_index(&self, token: Option<&str>) -> Option<usize> {
        token.and_then(|t| self.token_to_index.get(t).copied())
    }

    /// Map a token sequence to indices.
    pub fn encode<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<usize> {
        tokens.iter().map(|t| self.index_of(t.as_ref())).collect()
    }

    /// Map indices back to tokens.
    pub fn decode(&self, indices: &[usize]) -> Result<Vec<&str>> {
        indices.iter().map(|&i| self.token_of(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(sentences: &[&str]) -> Vec<Vec<String>> {
        sentences
            .iter()
            .map(|s| s.split_whitespace().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_cat_sat_scenario() {
        let c     = corpus(&["the cat sat", "the dog ran"]);
        let vocab = Vocabulary::build(&c, 1, None, &ReservedTokens::default()).unwrap();

        // 4 reserved + the, cat, sat, dog, ran
        assert_eq!(vocab.size(), 9);
        for token in ["the", "cat", "sat", "dog", "ran"] {
            assert!(vocab.contains(token), "missing {token}");
        }
        // "the" is the most frequent corpus token, so it comes right after the reserved block
        assert_eq!(vocab.index_of("the"), 4);
        assert_eq!(vocab.index_of("the"), vocab.index_of("the"));
    }

    #[test]
    fn test_reserved_tokens_at_low_indices() {
        let vocab = Vocabulary::build(&corpus(&["a b"]), 1, None, &ReservedTokens::default())
            .unwrap();
        assert_eq!(vocab.padding_index(), Some(0));
        assert_eq!(vocab.unknown_index(), 1);
        assert_eq!(vocab.begin_index(), Some(2));
        assert_eq!(vocab.end_index(), Some(3));
        assert_eq!(vocab.reserved_count(), 4);
    }

    #[test]
    fn test_reserved_present_even_if_frequency_filter_drops_everything() {
        let vocab = Vocabulary::build(&corpus(&["rare words only"]), 5, None, &ReservedTokens::default())
            .unwrap();
        assert_eq!(vocab.size(), 4);
        assert!(vocab.contains(UNK_TOKEN));
        assert!(vocab.contains(PAD_TOKEN));
    }

    #[test]
    fn test_round_trip_every_index() {
        let c     = corpus(&["x y z x y x", "w v"]);
        let vocab = Vocabulary::build(&c, 1, None, &ReservedTokens::default()).unwrap();
        for i in 0..vocab.size() {
            let token = vocab.token_of(i).unwrap();
            assert_eq!(vocab.index_of(token), i);
        }
    }

    #[test]
    fn test_unknown_token_maps_to_unknown_index() {
        let vocab = Vocabulary::build(&corpus(&["known"]), 1, None, &ReservedTokens::default())
            .unwrap();
        assert_eq!(vocab.index_of("never-seen"), vocab.unknown_index());
        assert_eq!(vocab.index_of(""), vocab.unknown_index());
    }

    #[test]
    fn test_min_frequency_filters() {
        let c     = corpus(&["a a a b b c"]);
        let vocab = Vocabulary::build(&c, 2, None, &ReservedTokens::new("<unk>")).unwrap();
        assert!(vocab.contains("a"));
        assert!(vocab.contains("b"));
        assert!(!vocab.contains("c"));
    }

    #[test]
    fn test_max_size_keeps_most_frequent_with_first_seen_ties() {
        // b and c both appear twice; b was seen first
        let c     = corpus(&["a b c a b c a d"]);
        let vocab = Vocabulary::build(&c, 1, Some(3), &ReservedTokens::new("<unk>")).unwrap();
        assert_eq!(vocab.tokens(), &["<unk>", "a", "b"]);
    }

    #[test]
    fn test_max_size_smaller_than_reserved_fails() {
        let reserved = ReservedTokens::new("<unk>").with_padding("<pad>");
        let err = Vocabulary::build(&corpus(&["a"]), 1, Some(1), &reserved).unwrap_err();
        assert!(matches!(err, TextDataError::Configuration(_)));
    }

    #[test]
    fn test_token_of_out_of_range() {
        let vocab = Vocabulary::build(&corpus(&["a"]), 1, None, &ReservedTokens::default())
            .unwrap();
        let err = vocab.token_of(vocab.size()).unwrap_err();
        assert!(matches!(err, TextDataError::OutOfRange { index: 5, len: 5, .. }));
    }

    #[test]
    fn test_corpus_token_equal_to_reserved_is_not_duplicated() {
        let vocab = Vocabulary::build(&corpus(&["<unk> hello"]), 1, None, &ReservedTokens::default())
            .unwrap();
        assert_eq!(vocab.size(), 5);
        assert_eq!(vocab.index_of("<unk>"), 1);
    }

    #[test]
    fn test_duplicate_reserved_tokens_collapse() {
        let reserved = ReservedTokens::new("<unk>").with_sequence_markers("<s>", "<s>");
        assert_eq!(reserved.ordered(), vec!["<unk>", "<s>"]);
        let vocab = Vocabulary::from_tokens(Vec::<String>::new(), &reserved, None).unwrap();
        assert_eq!(vocab.begin_index(), vocab.end_index());
    }

    #[test]
    fn test_from_tokens_preserves_order_and_cap() {
        let vocab = Vocabulary::from_tokens(
            ["the", "cat", "the", "mat"],
            &ReservedTokens::new("<unk>"),
            Some(3),
        )
        .unwrap();
        assert_eq!(vocab.tokens(), &["<unk>", "the", "cat"]);
    }

    #[test]
    fn test_encode_decode() {
        let vocab = Vocabulary::build(&corpus(&["hello world"]), 1, None, &ReservedTokens::default())
            .unwrap();
        let ids = vocab.encode(&["hello", "mars"]);
        assert_eq!(ids[1], vocab.unknown_index());
        assert_eq!(vocab.decode(&ids).unwrap(), vec!["hello", "<unk>"]);
    }
}

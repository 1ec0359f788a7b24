// ============================================================
// Layer 6 — GloVe Loader
// ============================================================
// Reads pretrained vectors in the plain-text GloVe format:
//
//   the 0.418 0.24968 -0.41242 ...
//   cat 0.45281 -0.50108 -0.53714 ...
//
// Files converted from word2vec start with a header line
// "<count> <dimension>", which is checked and skipped.
//
// Anything malformed (a token with no values, a non-numeric
// value, a line whose width differs from the rest, an empty
// file) is reported as EmbeddingLoad with the line number.

use anyhow::Context;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::data::source::InMemorySource;
use crate::domain::error::{Result, TextDataError};
use crate::domain::traits::EmbeddingSource;

/// Open and parse a GloVe file.
pub fn load_glove(path: &Path) -> anyhow::Result<InMemorySource> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open embedding file '{}'", path.display()))?;
    let source = parse_glove(BufReader::new(file))
        .with_context(|| format!("Cannot parse embedding file '{}'", path.display()))?;
    tracing::info!(
        "Loaded {} pretrained vectors (dim {}) from '{}'",
        source.len(),
        source.dimension(),
        path.display()
    );
    Ok(source)
}

fn malformed(line_no: usize, what: impl std::fmt::Display) -> TextDataError {
    TextDataError::EmbeddingLoad(format!("line {line_no}: {what}"))
}

/// Parse GloVe text from any buffered reader.
pub fn parse_glove<R: BufRead>(reader: R) -> Result<InMemorySource> {
    let mut source: Option<InMemorySource> = None;
    let mut expected_count = None;

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.map_err(|e| malformed(line_no, e))?;
        let mut fields = line.split_whitespace();
        let Some(token) = fields.next() else {
            continue;
        };
        let rest: Vec<&str> = fields.collect();

        if line_no == 1 {
            if let Some((count, dim)) = parse_header(token, &rest) {
                tracing::debug!("word2vec header: {} vectors of dimension {}", count, dim);
                expected_count = Some(count);
                source = Some(InMemorySource::new(dim)?);
                continue;
            }
        }

        if rest.is_empty() {
            return Err(malformed(line_no, format!("token '{token}' has no values")));
        }
        let vector = rest
            .iter()
            .map(|v| {
                v.parse::<f32>()
                    .map_err(|_| malformed(line_no, format!("'{v}' is not a number")))
            })
            .collect::<Result<Vec<f32>>>()?;

        if source.is_none() {
            source = Some(InMemorySource::new(vector.len())?);
        }
        if let Some(target) = source.as_mut() {
            target
                .insert(token, vector)
                .map_err(|e| malformed(line_no, e))?;
        }
    }

    let source = source
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TextDataError::EmbeddingLoad("embedding file has no vectors".to_string()))?;

    if let Some(count) = expected_count {
        if count != source.len() {
            tracing::warn!(
                "Header announced {} vectors but {} were read",
                count,
                source.len()
            );
        }
    }
    Ok(source)
}

fn parse_header(first: &str, rest: &[&str]) -> Option<(usize, usize)> {
    match rest {
        [dim] => Some((first.parse().ok()?, dim.parse().ok()?)),
        _ => None,
    }
}

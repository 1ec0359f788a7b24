// ============================================================
// Layer 6 — Preprocessing Report
// ============================================================
// Appends one CSV row per preprocessed side, so repeated runs
// over different corpora build up a comparable record.
//
// Output file: {out}/report.csv
//
// Example CSV output:
//   side,sentences,tokens,unknown_tokens,vocab_size,embedding_dim
//   source,1200,14873,312,2051,15
//   target,1200,16022,288,2310,15
//
// A high unknown_tokens / tokens ratio usually means min_frequency
// is too strict for the corpus, or the pretrained source does not
// cover its vocabulary.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::data::dataset::Side;
use crate::data::text_data::TextStatistics;

const HEADER: &str = "side,sentences,tokens,unknown_tokens,vocab_size,embedding_dim";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SideReport {
    pub side:  Side,
    #[serde(flatten)]
    pub stats: TextStatistics,
}

impl SideReport {
    pub fn new(side: Side, stats: TextStatistics) -> Self {
        Self { side, stats }
    }

    /// Fraction of corpus tokens that fell back to the unknown token.
    pub fn unknown_rate(&self) -> f64 {
        if self.stats.tokens == 0 {
            0.0
        } else {
            self.stats.unknown_tokens as f64 / self.stats.tokens as f64
        }
    }
}

pub struct ReportLogger {
    csv_path: PathBuf,
}

impl ReportLogger {
    /// Create the logger, writing the CSV header if the file is new.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create report dir '{}'", dir.display()))?;

        let csv_path = dir.join("report.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created report CSV: '{}'", csv_path.display());
        }
        Ok(Self { csv_path })
    }

    pub fn log(&self, report: &SideReport) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        let s = &report.stats;
        writeln!(
            f,
            "{},{},{},{},{},{}",
            report.side, s.sentences, s.tokens, s.unknown_tokens, s.vocab_size, s.embedding_dim,
        )?;

        tracing::debug!(
            "Logged {} report: vocab_size={}, unknown_rate={:.4}",
            report.side,
            s.vocab_size,
            report.unknown_rate(),
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

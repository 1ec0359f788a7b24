// ============================================================
// Layer 4 — Corpus Loaders
// ============================================================
// Two CorpusSource implementations:
//
//   LineFileLoader → one sentence per non-empty line of a text file
//   DocxLoader     → one sentence per non-empty paragraph of every
//                    .docx file in a directory
//
// A .docx file is a ZIP archive of XML parts. docx-rs parses it
// into a typed tree and we only walk the part we need:
//
//   Document
//     └── Paragraph
//           └── Run
//                 └── Text   (the actual words)
//
// Runs inside one paragraph are concatenated without a separator
// because they are fragments of the same sentence.

use anyhow::{Context, Result};
use docx_rs::{read_docx, ReaderError};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::document::Document;
use crate::domain::traits::CorpusSource;

// ─── Plain text ───────────────────────────────────────────────────────────────
pub struct LineFileLoader {
    path: PathBuf,
}

impl LineFileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusSource for LineFileLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read corpus file '{}'", self.path.display()))?;

        let sentences: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();

        tracing::info!(
            "Loaded {} sentences from '{}'",
            sentences.len(),
            self.path.display()
        );
        Ok(vec![Document::new(file_label(&self.path), sentences)])
    }
}

// ─── Word documents ───────────────────────────────────────────────────────────
pub struct DocxLoader {
    dir: PathBuf,
}

impl DocxLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl CorpusSource for DocxLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        if !self.dir.exists() {
            tracing::warn!(
                "Corpus directory '{}' does not exist, returning empty corpus",
                self.dir.display()
            );
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("docx") {
                paths.push(path);
            }
        }
        // read_dir order is platform dependent
        paths.sort();

        let mut docs = Vec::new();
        for path in paths {
            match load_single_docx(&path) {
                Ok(doc) => {
                    tracing::debug!("Loaded: {} ({} paragraphs)", doc.source, doc.sentence_count());
                    docs.push(doc);
                }
                Err(e) => tracing::warn!("Skipping '{}': {}", path.display(), e),
            }
        }

        tracing::info!("Successfully loaded {} documents", docs.len());
        Ok(docs)
    }
}

fn load_single_docx(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    let docx = read_docx(&bytes).map_err(|e: ReaderError| {
        anyhow::anyhow!("docx-rs parse error in '{}': {:?}", path.display(), e)
    })?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        use docx_rs::DocumentChild;

        // Tables, section properties and the like carry no sentences
        if let DocumentChild::Paragraph(para) = child {
            let text = extract_paragraph_text(para);
            let text = text.trim();
            if !text.is_empty() {
                paragraphs.push(text.to_string());
            }
        }
    }

    Ok(Document::new(file_label(path), paragraphs))
}

fn extract_paragraph_text(para: &docx_rs::Paragraph) -> String {
    use docx_rs::{ParagraphChild, RunChild};

    let mut text = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                if let RunChild::Text(t) = rc {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Pick a loader for `path`: a directory is scanned for .docx files,
/// anything else is read line by line.
pub fn corpus_from_path(path: &Path) -> Box<dyn CorpusSource> {
    if path.is_dir() {
        Box::new(DocxLoader::new(path))
    } else {
        Box::new(LineFileLoader::new(path))
    }
}

/// Load every sentence reachable from `path`, in document order.
pub fn load_sentences(path: &Path) -> Result<Vec<String>> {
    let docs = corpus_from_path(path).load_all()?;
    Ok(Document::flatten(docs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph, Run};
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_line_loader_skips_blank_lines() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        fs::write(&path, "the cat sat\n\n  the dog ran  \n").unwrap();

        let docs = LineFileLoader::new(&path).load_all().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "corpus.txt");
        assert_eq!(docs[0].sentences, vec!["the cat sat", "the dog ran"]);
    }

    #[test]
    fn test_missing_line_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(LineFileLoader::new(dir.path().join("nope.txt")).load_all().is_err());
    }

    #[test]
    fn test_missing_docx_dir_is_empty() {
        let dir  = tempdir().unwrap();
        let docs = DocxLoader::new(dir.path().join("absent")).load_all().unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_docx_loader_reads_paragraphs_and_skips_bad_files() {
        let dir = tempdir().unwrap();

        let file = File::create(dir.path().join("a.docx")).unwrap();
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Hello world")))
            .add_paragraph(Paragraph::new())
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Second line")))
            .build()
            .pack(file)
            .unwrap();
        fs::write(dir.path().join("broken.docx"), b"not a zip").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = DocxLoader::new(dir.path()).load_all().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "a.docx");
        assert_eq!(docs[0].sentences, vec!["Hello world", "Second line"]);
    }

    #[test]
    fn test_load_sentences_from_file() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("s.txt");
        fs::write(&path, "one\ntwo\n").unwrap();
        assert_eq!(load_sentences(&path).unwrap(), vec!["one", "two"]);
    }
}

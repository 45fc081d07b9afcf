//! Source discovery and document loading.
//!
//! Walks the content directory, keeps files whose path relative to the
//! content root matches the configured pattern, and loads each one through
//! the document store.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use rayon::prelude::*;
use regex::Regex;
use tagpress_core::{CoreError, Document, DocumentStore};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Content collection errors.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Directory walk failed.
    #[error("cannot walk content directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A document failed to load.
    #[error(transparent)]
    Document(#[from] CoreError),

    /// The filename pattern is not a valid regex.
    #[error("invalid text pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Finds and loads source documents.
#[derive(Debug)]
pub struct ContentCollector {
    content_dir: PathBuf,
    pattern: Regex,
    store: DocumentStore,
}

impl ContentCollector {
    /// Create a collector for `content_dir` keeping paths matching `pattern`.
    pub fn new(content_dir: impl Into<PathBuf>, pattern: &str) -> Result<Self> {
        Ok(Self {
            content_dir: content_dir.into(),
            pattern: Regex::new(pattern)?,
            store: DocumentStore::new(),
        })
    }

    /// Candidate source files, sorted by path. Hidden entries are skipped.
    pub fn find_files(&self) -> Result<Vec<PathBuf>> {
        if !self.content_dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.content_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.content_dir)
                .unwrap_or(entry.path());
            if self.pattern.is_match(&relative.to_string_lossy()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Load every candidate file. Each file is loaded exactly once; the
    /// first failure aborts collection.
    pub fn collect(&self) -> Result<Vec<Arc<Document>>> {
        info!(dir = %self.content_dir.display(), "collecting documents");
        let files = self.find_files()?;
        info!(count = files.len(), "found source files");

        let documents = files
            .par_iter()
            .map(|path| {
                debug!(path = %path.display(), "loading document");
                self.store.load(path).map(Arc::new)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(documents)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

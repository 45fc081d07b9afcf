//! Feed selection and canonical structure.
//!
//! A [`Feed`] is the runtime side of a [`FeedConfig`]: the documents selected
//! into it, in index order, and the aggregators they are streamed through.

use std::{collections::BTreeMap, sync::Arc};

use tagpress_core::{
    CollisionPolicy, CoreError, Document, FeedConfig, SortOrder, path::resolve_path,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregator::{Aggregator, AggregatorError, Emitter};

/// Feed engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("feed {feed}: {source}")]
    Aggregator {
        feed: String,
        #[source]
        source: AggregatorError,
    },

    /// Two documents resolved to the same output file.
    #[error("feed {feed}: {path} is claimed by both {first} and {second}")]
    Collision {
        feed: String,
        path: String,
        first: String,
        second: String,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Directory and file layout of a feed.
#[derive(Debug, Clone, Default)]
pub struct FeedStructure {
    /// Directory prefix (`a`, `a/b`) to the documents below it, in index
    /// order. The feed root and full file paths have no entry.
    pub segments: BTreeMap<String, Vec<Arc<Document>>>,
    /// Full file path (`a/b/x.html`) to its document.
    pub files: BTreeMap<String, Arc<Document>>,
}

impl FeedStructure {
    /// Published path of the document with `id`.
    pub fn path_of(&self, id: Uuid) -> Option<&str> {
        self.files
            .iter()
            .find(|(_, doc)| doc.id == id)
            .map(|(path, _)| path.as_str())
    }
}

/// A feed during one run.
#[derive(Debug)]
pub struct Feed {
    pub name: String,
    pub config: FeedConfig,
    /// Selected documents; scan order until sorted.
    pub index: Vec<Arc<Document>>,
    aggregators: Vec<Aggregator>,
}

impl Feed {
    pub fn new(name: impl Into<String>, config: FeedConfig) -> Self {
        let aggregators = config.aggregators.iter().map(Aggregator::from_config).collect();
        Self {
            name: name.into(),
            config,
            index: Vec::new(),
            aggregators,
        }
    }

    pub fn aggregator_count(&self) -> usize {
        self.aggregators.len()
    }

    /// Whether `doc` belongs to this feed: at least one shared tag.
    pub fn selects(&self, doc: &Document) -> bool {
        doc.is_tagged(&self.config.tags)
    }

    pub fn init(&mut self, emitter: &Emitter<'_>) -> Result<()> {
        for (position, aggregator) in self.aggregators.iter_mut().enumerate() {
            aggregator
                .init(&self.config, emitter)
                .map_err(|source| EngineError::Aggregator {
                    feed: self.name.clone(),
                    source: AggregatorError {
                        position,
                        kind: aggregator.kind(),
                        source,
                    },
                })?;
        }
        Ok(())
    }

    /// Append `doc` to the index and hand it to every aggregator in order.
    ///
    /// The first failing aggregator stops the iteration; aggregators before
    /// it keep the document.
    pub fn add(&mut self, doc: &Arc<Document>, emitter: &Emitter<'_>) -> Result<()> {
        self.index.push(Arc::clone(doc));
        for (position, aggregator) in self.aggregators.iter_mut().enumerate() {
            aggregator
                .add_document(&self.config, doc, emitter)
                .map_err(|source| EngineError::Aggregator {
                    feed: self.name.clone(),
                    source: AggregatorError {
                        position,
                        kind: aggregator.kind(),
                        source,
                    },
                })?;
        }
        Ok(())
    }

    /// Stable sort of the index by creation time.
    pub fn sort_by_created(&mut self, order: SortOrder) {
        match order {
            SortOrder::OldestFirst => self.index.sort_by(|a, b| a.created.cmp(&b.created)),
            SortOrder::NewestFirst => self.index.sort_by(|a, b| b.created.cmp(&a.created)),
        }
    }

    /// Resolve every indexed document into the feed's directory layout.
    pub fn canonical_structure(&self, collisions: CollisionPolicy) -> Result<FeedStructure> {
        let mut structure = FeedStructure::default();
        for doc in &self.index {
            let resolved = resolve_path(&self.config, doc)?;
            for depth in 1..=resolved.dirs.len() {
                structure
                    .segments
                    .entry(resolved.dirs[..depth].join("/"))
                    .or_default()
                    .push(Arc::clone(doc));
            }

            let path = resolved.file_path("html");
            if let Some(previous) = structure.files.get(&path)
                && previous.id != doc.id
            {
                match collisions {
                    CollisionPolicy::Error => {
                        return Err(EngineError::Collision {
                            feed: self.name.clone(),
                            path,
                            first: previous.identity(),
                            second: doc.identity(),
                        });
                    }
                    CollisionPolicy::Warn => warn!(
                        feed = %self.name,
                        path = %path,
                        first = %previous.identity(),
                        second = %doc.identity(),
                        "canonical path collision, keeping the later document"
                    ),
                }
            }
            structure.files.insert(path, Arc::clone(doc));
        }
        debug!(
            feed = %self.name,
            files = structure.files.len(),
            segments = structure.segments.len(),
            "built canonical structure"
        );
        Ok(structure)
    }

    /// Published path of the indexed document with `id`.
    pub fn path_of(&self, id: Uuid) -> Result<Option<String>> {
        self.index
            .iter()
            .find(|doc| doc.id == id)
            .map(|doc| Ok(resolve_path(&self.config, doc)?.file_path("html")))
            .transpose()
    }

    /// Flush every aggregator. All are closed even if one fails; the first
    /// error is returned.
    pub fn close(&mut self, emitter: &Emitter<'_>) -> Result<()> {
        let mut first_error = None;
        for (position, aggregator) in self.aggregators.iter_mut().enumerate() {
            if let Err(source) = aggregator.close(&self.config, emitter) {
                warn!(feed = %self.name, position, kind = aggregator.kind(), error = %source, "aggregator close failed");
                first_error.get_or_insert(EngineError::Aggregator {
                    feed: self.name.clone(),
                    source: AggregatorError {
                        position,
                        kind: aggregator.kind(),
                        source,
                    },
                });
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Stream every document into every feed that selects it.
pub fn scan(feeds: &mut [Feed], documents: &[Arc<Document>], emitter: &Emitter<'_>) -> Result<()> {
    for feed in feeds.iter_mut() {
        for doc in documents {
            if feed.selects(doc) {
                feed.add(doc, emitter)?;
            }
        }
        info!(feed = %feed.name, documents = feed.index.len(), "scanned feed");
    }
    Ok(())
}

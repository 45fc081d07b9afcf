//! Build orchestration.
//!
//! Loads feeds, templates and documents, streams documents through every
//! feed, renders each canonical file and finally closes the aggregators.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use tagpress_core::{BuildMeta, Config, ContentTypes, CoreError, Document, FeedSet, SortOrder};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    aggregator::{EmitError, Emitter},
    collector::{CollectorError, ContentCollector},
    engine::{self, EngineError, Feed, FeedStructure},
    markdown::MarkdownRenderer,
    output::{ManifestEntry, OutputError, OutputManager},
    template::{TemplateError, TemplateRegistry},
};

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Collector(#[from] CollectorError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Output(#[from] OutputError),

    /// Rendering a document page failed.
    #[error("cannot render {path}: {source}")]
    Render {
        path: String,
        #[source]
        source: EmitError,
    },
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Build statistics.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Number of source documents loaded.
    pub documents: usize,

    /// Number of feeds processed.
    pub feeds: usize,

    /// Number of document pages rendered.
    pub files: usize,

    /// Build duration in milliseconds.
    pub duration_ms: u64,

    /// Every output path written, with its content type.
    pub manifest: Vec<ManifestEntry>,
}

/// Outcome of a dry run.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub documents: usize,
    pub feeds: usize,
    /// Canonical files the build would render.
    pub files: usize,
    /// Non-fatal findings.
    pub warnings: Vec<String>,
}

/// Site builder that orchestrates the build process.
#[derive(Debug)]
pub struct Builder {
    config: Config,
    root: PathBuf,
    output_dir: PathBuf,
    meta: BuildMeta,
}

impl Builder {
    /// Create a builder for the site rooted at `root`. Relative directories
    /// in the configuration are resolved against it.
    #[must_use]
    pub fn new(config: Config, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let output_dir = root.join(&config.build.output_dir);
        Self {
            config,
            root,
            output_dir,
            meta: BuildMeta::default(),
        }
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_meta(mut self, meta: BuildMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Execute the full build process.
    pub fn build(&self) -> Result<BuildStats> {
        let start = Instant::now();
        info!(
            root = %self.root.display(),
            output = %self.output_dir.display(),
            "starting build"
        );

        // 1. Feeds and templates
        let feed_set = self.load_feeds()?;
        let templates =
            TemplateRegistry::load_dir(&self.root.join(&self.config.build.templates_dir))?;

        // 2. Documents
        let documents = self.collect()?;

        // 3. Output
        let output = OutputManager::new(
            &self.output_dir,
            ContentTypes::new(&self.config.content_types),
        );
        output.create_dir(std::iter::empty::<&str>())?;
        let emitter = Emitter {
            output: &output,
            templates: &templates,
            meta: &self.meta,
            config: &self.config,
            markdown: MarkdownRenderer::new(),
        };

        // 4. Feeds
        let mut feeds: Vec<Feed> = feed_set
            .feeds
            .into_iter()
            .map(|(name, config)| Feed::new(name, config))
            .collect();
        for feed in &mut feeds {
            feed.init(&emitter)?;
        }
        engine::scan(&mut feeds, &documents, &emitter)?;

        // 5. Pages
        let mut files = 0;
        for feed in &mut feeds {
            feed.sort_by_created(SortOrder::NewestFirst);
            let structure = feed.canonical_structure(self.config.build.path_collisions)?;
            files += self.render_feed(feed, &structure, &emitter)?;
        }

        // 6. Aggregators
        for feed in &mut feeds {
            feed.close(&emitter)?;
        }

        let stats = BuildStats {
            documents: documents.len(),
            feeds: feeds.len(),
            files,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            manifest: output.manifest(),
        };
        info!(
            documents = stats.documents,
            feeds = stats.feeds,
            files = stats.files,
            outputs = stats.manifest.len(),
            duration_ms = stats.duration_ms,
            "build complete"
        );
        Ok(stats)
    }

    /// Load and resolve everything the build would, without writing output.
    ///
    /// Documents still pass through the checksum gate, so stale sources are
    /// rewritten.
    pub fn check(&self) -> Result<CheckReport> {
        let feed_set = self.load_feeds()?;
        let templates =
            TemplateRegistry::load_dir(&self.root.join(&self.config.build.templates_dir))?;
        let documents = self.collect()?;

        let mut report = CheckReport {
            documents: documents.len(),
            feeds: feed_set.len(),
            ..Default::default()
        };
        let mut selected = vec![false; documents.len()];

        for (name, config) in feed_set.feeds {
            let mut feed = Feed::new(name, config);
            for (i, doc) in documents.iter().enumerate() {
                if feed.selects(doc) {
                    selected[i] = true;
                    feed.index.push(Arc::clone(doc));
                }
            }
            feed.sort_by_created(SortOrder::NewestFirst);
            let structure = feed.canonical_structure(self.config.build.path_collisions)?;
            report.files += structure.files.len();

            for (path, doc) in &structure.files {
                let template = document_template(&feed, doc);
                if resolve_template(&templates, &template).is_none() {
                    report
                        .warnings
                        .push(format!("{path}: template {template} not found"));
                }
            }
        }

        for (doc, _) in documents.iter().zip(&selected).filter(|(_, s)| !**s) {
            report.warnings.push(format!(
                "{} is not selected by any feed",
                doc.source.display()
            ));
        }
        for warning in &report.warnings {
            warn!("{warning}");
        }
        Ok(report)
    }

    fn load_feeds(&self) -> Result<FeedSet> {
        let path = self.root.join(&self.config.build.feeds_file);
        let feeds = FeedSet::load(&path)?;
        info!(path = %path.display(), count = feeds.len(), "loaded feeds");
        Ok(feeds)
    }

    fn collect(&self) -> Result<Vec<Arc<Document>>> {
        let collector = ContentCollector::new(
            self.root.join(&self.config.build.content_dir),
            &self.config.build.text_pattern,
        )?;
        Ok(collector.collect()?)
    }

    /// Render every canonical file of `feed`.
    fn render_feed(
        &self,
        feed: &Feed,
        structure: &FeedStructure,
        emitter: &Emitter<'_>,
    ) -> Result<usize> {
        for segment in structure.segments.keys() {
            emitter.output.create_dir(segment.split('/'))?;
        }

        for (path, doc) in &structure.files {
            let wanted = document_template(feed, doc);
            let template = resolve_template(emitter.templates, &wanted)
                .ok_or_else(|| TemplateError::NotFound(wanted.clone()))?;

            let resolved = tagpress_core::path::resolve_path(&feed.config, doc)?;
            let mut ctx = emitter.document_context(&feed.config, doc, &resolved);
            ctx.insert("content", emitter.markdown.document_html(doc));

            debug!(feed = %feed.name, path = %path, template = %template, "rendering document");
            let segments: Vec<&str> = path.split('/').collect();
            emitter
                .render(&template, &ctx, doc.modified, &segments)
                .map_err(|source| BuildError::Render {
                    path: path.clone(),
                    source,
                })?;
        }
        Ok(structure.files.len())
    }
}

/// Template named by the document, else the feed default, else
/// `document.html`.
fn document_template(feed: &Feed, doc: &Document) -> String {
    doc.template
        .clone()
        .or_else(|| feed.config.default_template.clone())
        .unwrap_or_else(|| "document.html".to_string())
}

/// Registered name for `name`, accepting it with or without `.html`.
fn resolve_template<'a>(
    templates: &TemplateRegistry,
    name: &'a str,
) -> Option<std::borrow::Cow<'a, str>> {
    if templates.contains(name) {
        return Some(name.into());
    }
    let with_ext = format!("{name}.html");
    templates.contains(&with_ext).then(|| with_ext.into())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_resolve_template() {
        let mut templates = TemplateRegistry::new();
        templates.register(crate::template::Template::new("post.html", "x"));
        assert_eq!(resolve_template(&templates, "post").as_deref(), Some("post.html"));
        assert_eq!(resolve_template(&templates, "post.html").as_deref(), Some("post.html"));
        assert_eq!(resolve_template(&templates, "missing"), None);
    }

    #[test]
    fn test_build_empty_site() {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::write(dir.path().join("_feeds.yaml"), "").expect("write feeds");
        let config: Config =
            toml::from_str("[site]\ntitle = \"T\"\nbase_url = \"https://example.com\"\n")
                .expect("config");

        let stats = Builder::new(config, dir.path()).build().expect("build");
        assert_eq!(stats.documents, 0);
        assert_eq!(stats.feeds, 0);
        assert!(stats.manifest.is_empty());
        assert!(dir.path().join("public").is_dir());
    }

    #[test]
    fn test_missing_feeds_file_fails() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config: Config =
            toml::from_str("[site]\ntitle = \"T\"\nbase_url = \"https://example.com\"\n")
                .expect("config");
        let err = Builder::new(config, dir.path()).build().unwrap_err();
        assert!(matches!(err, BuildError::Core(CoreError::Io { .. })));
    }
}

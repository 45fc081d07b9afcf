//! Per-feed output generators.
//!
//! Every aggregator follows the same protocol: [`Aggregator::init`] once,
//! [`Aggregator::add_document`] for every document selected into the feed
//! (in any order), then [`Aggregator::close`] once to emit its artifacts.
//! The variant set is closed; dispatch is a plain `match`.

mod atom;
mod index;
mod robots;
mod rss;
mod search;
mod sitemap;

use std::{io::Write, sync::Arc};

use chrono::{DateTime, Utc};
use tagpress_core::{
    BuildMeta, Config, CoreError, Document, FeedConfig, ResolvedPath, feeds::AggregatorConfig,
    path::resolve_path,
};
use thiserror::Error;

pub use self::{
    atom::AtomAggregator, index::IndexAggregator, robots::RobotsExcludeAggregator,
    rss::RssAggregator, search::SearchAggregator, sitemap::SitemapAggregator,
};
use crate::{
    markdown::MarkdownRenderer,
    output::{OutputError, OutputManager},
    template::{TemplateContext, TemplateError, TemplateRegistry},
};

/// Failure inside one aggregator step.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Serializing an artifact failed.
    #[error("cannot encode {format}: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },
}

/// An aggregator failure, tagged with the aggregator's position in the
/// feed's configured list.
#[derive(Debug, Error)]
#[error("aggregator {position} ({kind}) failed: {source}")]
pub struct AggregatorError {
    pub position: usize,
    pub kind: &'static str,
    #[source]
    pub source: EmitError,
}

/// Result type for aggregator steps.
pub type Result<T> = std::result::Result<T, EmitError>;

/// Everything an aggregator needs to write output.
#[derive(Debug, Clone, Copy)]
pub struct Emitter<'a> {
    pub output: &'a OutputManager,
    pub templates: &'a TemplateRegistry,
    pub meta: &'a BuildMeta,
    pub config: &'a Config,
    pub markdown: MarkdownRenderer,
}

impl Emitter<'_> {
    /// Render a named template into an output file whose modification time
    /// is set to `modified`.
    pub fn render<S: AsRef<str>>(
        &self,
        template: &str,
        context: &TemplateContext,
        modified: DateTime<Utc>,
        segments: &[S],
    ) -> Result<()> {
        let html = self.templates.render(template, context)?;
        self.write(segments, None, modified, html.as_bytes())
    }

    /// Write a complete artifact through the output manager.
    pub fn write<S: AsRef<str>>(
        &self,
        segments: &[S],
        content_type: Option<&str>,
        modified: DateTime<Utc>,
        bytes: &[u8],
    ) -> Result<()> {
        let mut file = self.output.create(segments).at(modified);
        if let Some(content_type) = content_type {
            file = file.as_content_type(content_type);
        }
        let written = file.write_all(bytes);
        // A failed write has already been recorded on the handle; close
        // reports it with the path attached.
        file.close()?;
        written.map_err(|e| EmitError::Encode {
            format: "output",
            message: e.to_string(),
        })
    }

    /// Variables shared by every template.
    pub fn base_context(&self, feed: &FeedConfig) -> TemplateContext {
        let site = &self.config.site;
        let mut ctx = TemplateContext::new();
        ctx.insert_text("site_title", &site.title);
        ctx.insert_text("base_url", &site.base_url);
        ctx.insert_text("site_description", site.description.as_deref().unwrap_or_default());
        ctx.insert_text("site_author", site.author.as_deref().unwrap_or_default());
        ctx.insert_text("generator", &self.meta.generator());
        ctx.insert_text("feed_slug", feed.slug.as_deref().unwrap_or_default());
        ctx.insert_text(
            "feed_id",
            &feed.id.map(|id| id.to_string()).unwrap_or_default(),
        );
        ctx.insert_text("feed_tags", &feed.tags.join(", "));
        ctx
    }

    /// Variables describing one document published at `path`.
    pub fn document_context(
        &self,
        feed: &FeedConfig,
        doc: &Document,
        path: &ResolvedPath,
    ) -> TemplateContext {
        let mut ctx = self.base_context(feed);
        ctx.insert_text("title", &doc.title);
        ctx.insert_text("slug", &doc.slug);
        ctx.insert_text("id", &doc.id.to_string());
        ctx.insert_text("url", &self.config.url_for(&path.file_path("html")));
        ctx.insert_text("path", &path.file_path("html"));
        ctx.insert_text("created_iso", &doc.created.to_rfc3339());
        ctx.insert_text("created_date", &doc.created.format("%Y-%m-%d").to_string());
        ctx.insert_text("modified_iso", &doc.modified.to_rfc3339());
        ctx.insert_text("modified_date", &doc.modified.format("%Y-%m-%d").to_string());
        ctx.insert_text("tags", &doc.tags.join(", "));
        for (key, value) in &doc.extra {
            if let Some(text) = scalar_text(value) {
                ctx.insert_text(format!("extra_{key}"), &text);
            }
        }
        ctx
    }
}

fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Optional directory depth bounds shared by the grouping aggregators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepthWindow {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl DepthWindow {
    pub fn contains(&self, depth: usize) -> bool {
        self.min.is_none_or(|min| depth >= min) && self.max.is_none_or(|max| depth <= max)
    }

    /// Directory prefixes of `doc`'s canonical path that fall in the window.
    pub fn groups(&self, feed: &FeedConfig, doc: &Document) -> Result<Vec<String>> {
        let resolved = resolve_path(feed, doc)?;
        Ok(resolved
            .prefixes()
            .filter(|(depth, _)| self.contains(*depth))
            .map(|(_, prefix)| prefix)
            .collect())
    }
}

/// Output segments for `filename` inside the directory `prefix`.
pub(crate) fn segments_in(prefix: &str, filename: &str) -> Vec<String> {
    prefix
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .chain(std::iter::once(filename.to_string()))
        .collect()
}

/// Absolute URL of `path` under `base`, or under the site base URL.
pub(crate) fn public_url(base: Option<&str>, config: &Config, path: &str) -> String {
    match base {
        Some(base) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
        None => config.url_for(path),
    }
}

/// Track the newest `created`/`modified` timestamp seen.
pub(crate) fn bump_newest(newest: &mut Option<DateTime<Utc>>, doc: &Document) {
    let candidate = doc.created.max(doc.modified);
    if newest.is_none_or(|n| candidate > n) {
        *newest = Some(candidate);
    }
}

/// A configured aggregator with its accumulated state.
#[derive(Debug)]
pub enum Aggregator {
    Index(IndexAggregator),
    Rss(RssAggregator),
    Atom(AtomAggregator),
    RobotsExclude(RobotsExcludeAggregator),
    Sitemap(SitemapAggregator),
    Search(SearchAggregator),
}

impl Aggregator {
    /// Instantiate an aggregator from its configuration.
    pub fn from_config(config: &AggregatorConfig) -> Self {
        match config {
            AggregatorConfig::Index(c) => Self::Index(IndexAggregator::new(c.clone())),
            AggregatorConfig::Rss(c) => Self::Rss(RssAggregator::new(c.clone())),
            AggregatorConfig::Atom(c) => Self::Atom(AtomAggregator::new(c.clone())),
            AggregatorConfig::RobotsExclude(c) => {
                Self::RobotsExclude(RobotsExcludeAggregator::new(c.clone()))
            }
            AggregatorConfig::Sitemap(c) => Self::Sitemap(SitemapAggregator::new(c.clone())),
            AggregatorConfig::Search(c) => Self::Search(SearchAggregator::new(c.clone())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Index(_) => "index",
            Self::Rss(_) => "rss",
            Self::Atom(_) => "atom",
            Self::RobotsExclude(_) => "robotsexclude",
            Self::Sitemap(_) => "sitemap",
            Self::Search(_) => "search",
        }
    }

    /// Bind configuration defaults and open any shared resources.
    pub fn init(&mut self, feed: &FeedConfig, emitter: &Emitter<'_>) -> Result<()> {
        match self {
            Self::Index(a) => a.init(feed),
            Self::Rss(a) => a.init(feed, emitter),
            Self::Atom(a) => a.init(feed, emitter),
            Self::RobotsExclude(a) => a.init(emitter),
            Self::Sitemap(a) => a.init(feed, emitter),
            Self::Search(a) => a.init(feed),
        }
        Ok(())
    }

    /// Incorporate one document.
    pub fn add_document(
        &mut self,
        feed: &FeedConfig,
        doc: &Arc<Document>,
        emitter: &Emitter<'_>,
    ) -> Result<()> {
        match self {
            Self::Index(a) => a.add(feed, doc),
            Self::Rss(a) => a.add(feed, doc, emitter),
            Self::Atom(a) => a.add(feed, doc, emitter),
            Self::RobotsExclude(a) => a.add(feed, doc),
            Self::Sitemap(a) => a.add(feed, doc, emitter),
            Self::Search(a) => a.add(feed, doc, emitter),
        }
    }

    /// Emit all accumulated output.
    pub fn close(&mut self, feed: &FeedConfig, emitter: &Emitter<'_>) -> Result<()> {
        match self {
            Self::Index(a) => a.close(feed, emitter),
            Self::Rss(a) => a.close(emitter),
            Self::Atom(a) => a.close(emitter),
            Self::RobotsExclude(a) => a.close(),
            Self::Sitemap(a) => a.close(emitter),
            Self::Search(a) => a.close(emitter),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use chrono::TimeZone;
    use tagpress_core::{ContentTypes, FeedSet, Frontmatter};

    use super::*;

    pub struct Fixture {
        pub output: OutputManager,
        pub templates: TemplateRegistry,
        pub meta: BuildMeta,
        pub config: Config,
    }

    impl Fixture {
        pub fn new(root: &Path) -> Self {
            let config: Config = toml::from_str(
                "[site]\ntitle = \"Test Site\"\nbase_url = \"https://example.com\"\n",
            )
            .expect("config");
            Self {
                output: OutputManager::new(root, ContentTypes::default()),
                templates: TemplateRegistry::new(),
                meta: BuildMeta::new("tagpress", "0.1.0", None),
                config,
            }
        }

        pub fn emitter(&self) -> Emitter<'_> {
            Emitter {
                output: &self.output,
                templates: &self.templates,
                meta: &self.meta,
                config: &self.config,
                markdown: MarkdownRenderer::new(),
            }
        }
    }

    pub fn feed(yaml: &str) -> FeedConfig {
        FeedSet::from_yaml(&format!("f:\n{}", indent(yaml)))
            .expect("feed")
            .feeds
            .remove("f")
            .expect("feed f")
    }

    fn indent(yaml: &str) -> String {
        yaml.lines().map(|l| format!("  {l}\n")).collect()
    }

    pub fn doc(slug: &str, day: u32, tags: &[&str]) -> Arc<Document> {
        let created = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
        Arc::new(Document::new(
            format!("content/{slug}.md"),
            Frontmatter {
                title: Some(format!("Title {slug}")),
                slug: Some(slug.to_string()),
                created: Some(created),
                modified: Some(created),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            },
            format!("Body of {slug}\n"),
        ))
    }
}

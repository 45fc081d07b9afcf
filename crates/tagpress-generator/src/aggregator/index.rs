//! HTML listing pages, one per directory prefix of the feed.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use tagpress_core::{Document, FeedConfig, SortOrder, feeds::IndexConfig, path::resolve_path};
use tracing::debug;

use super::{DepthWindow, Emitter, Result, bump_newest, segments_in};
use crate::template::escape_html;

#[derive(Debug)]
pub struct IndexAggregator {
    config: IndexConfig,
    window: DepthWindow,
    newest: Option<DateTime<Utc>>,
    groups: BTreeMap<String, Vec<Arc<Document>>>,
}

impl IndexAggregator {
    pub fn new(config: IndexConfig) -> Self {
        let window = DepthWindow {
            min: config.min_path,
            max: config.max_path,
        };
        Self {
            config,
            window,
            newest: None,
            groups: BTreeMap::new(),
        }
    }

    pub(super) fn init(&mut self, _feed: &FeedConfig) {
        self.groups.clear();
        self.newest = None;
    }

    pub(super) fn add(&mut self, feed: &FeedConfig, doc: &Arc<Document>) -> Result<()> {
        let groups = self.window.groups(feed, doc)?;
        bump_newest(&mut self.newest, doc);
        for prefix in groups {
            self.groups.entry(prefix).or_default().push(Arc::clone(doc));
        }
        Ok(())
    }

    pub(super) fn close(&mut self, feed: &FeedConfig, emitter: &Emitter<'_>) -> Result<()> {
        let newest = self.newest.unwrap_or_else(Utc::now);
        for (prefix, docs) in &mut self.groups {
            match self.config.sort {
                SortOrder::NewestFirst => docs.sort_by(|a, b| b.created.cmp(&a.created)),
                SortOrder::OldestFirst => docs.sort_by(|a, b| a.created.cmp(&b.created)),
            }

            let per_page = self.config.paginate.filter(|n| *n > 0).unwrap_or(docs.len().max(1));
            let pages: Vec<&[Arc<Document>]> = docs.chunks(per_page).collect();
            let total = pages.len();

            for (number, page) in pages.iter().enumerate().map(|(i, p)| (i + 1, p)) {
                let mut items = String::new();
                for doc in page.iter() {
                    let path = resolve_path(feed, doc)?;
                    let ctx = emitter.document_context(feed, doc, &path);
                    items.push_str(&emitter.templates.render("index-item.html", &ctx)?);
                }

                let mut ctx = emitter.base_context(feed);
                ctx.insert("items", items);
                ctx.insert_text("prefix", prefix);
                ctx.insert_text("page", &number.to_string());
                ctx.insert_text("pages", &total.to_string());
                if let Some(nav) = pagination_html(&self.config.filename, number, total) {
                    ctx.insert("pagination", nav);
                }

                let filename = page_filename(&self.config.filename, number);
                debug!(prefix = %prefix, page = number, count = page.len(), "rendering index page");
                emitter.render(
                    &self.config.template,
                    &ctx,
                    newest,
                    &segments_in(prefix, &filename),
                )?;
            }
        }
        Ok(())
    }
}

/// File name of page `number`; page 1 keeps the configured name.
///
/// `index.html` page 3 is `index-3.html`.
pub fn page_filename(filename: &str, number: usize) -> String {
    if number <= 1 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{number}.{ext}"),
        _ => format!("{filename}-{number}"),
    }
}

fn pagination_html(filename: &str, current: usize, total: usize) -> Option<String> {
    if total <= 1 {
        return None;
    }
    let mut nav = String::new();
    if current > 1 {
        nav.push_str(&format!(
            r#"<a href="{}" rel="prev">Newer</a>"#,
            escape_html(&page_filename(filename, current - 1))
        ));
    }
    nav.push_str(&format!(r#" <span>{current} / {total}</span> "#));
    if current < total {
        nav.push_str(&format!(
            r#"<a href="{}" rel="next">Older</a>"#,
            escape_html(&page_filename(filename, current + 1))
        ));
    }
    Some(nav)
}

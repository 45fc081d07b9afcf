//! XML sitemap covering every document of a feed, plus a `Sitemap:` pointer
//! in `robots.txt`.

use std::{io::Write, sync::Arc};

use chrono::{DateTime, Utc};
use tagpress_core::{Document, FeedConfig, feeds::SitemapConfig, path::resolve_path};
use tracing::debug;

use super::{EmitError, Emitter, Result, bump_newest, robots::ROBOTS_FILE};
use crate::output::OutputFile;

#[derive(Debug)]
struct SitemapUrl {
    loc: String,
    lastmod: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SitemapAggregator {
    config: SitemapConfig,
    filename: String,
    robots: Option<OutputFile>,
    newest: Option<DateTime<Utc>>,
    urls: Vec<SitemapUrl>,
}

impl SitemapAggregator {
    pub fn new(config: SitemapConfig) -> Self {
        Self {
            config,
            filename: String::new(),
            robots: None,
            newest: None,
            urls: Vec::new(),
        }
    }

    pub(super) fn init(&mut self, feed: &FeedConfig, emitter: &Emitter<'_>) {
        self.filename = self.config.filename.clone().unwrap_or_else(|| {
            format!("sitemap-{}.xml", feed.slug.as_deref().unwrap_or("feed"))
        });
        self.urls.clear();
        self.newest = None;
        self.robots = Some(emitter.output.create([ROBOTS_FILE]));
    }

    pub(super) fn add(
        &mut self,
        feed: &FeedConfig,
        doc: &Arc<Document>,
        emitter: &Emitter<'_>,
    ) -> Result<()> {
        let path = resolve_path(feed, doc)?;
        bump_newest(&mut self.newest, doc);
        self.urls.push(SitemapUrl {
            loc: emitter.config.url_for(&path.file_path("html")),
            lastmod: doc.modified,
        });
        Ok(())
    }

    pub(super) fn close(&mut self, emitter: &Emitter<'_>) -> Result<()> {
        self.urls.sort_by(|a, b| a.loc.cmp(&b.loc));

        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        xml.push('\n');
        for url in &self.urls {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&url.loc)));
            xml.push_str(&format!(
                "    <lastmod>{}</lastmod>\n",
                url.lastmod.format("%Y-%m-%d")
            ));
            xml.push_str("  </url>\n");
        }
        xml.push_str("</urlset>\n");

        debug!(file = %self.filename, count = self.urls.len(), "writing sitemap");
        emitter.write(
            &[self.filename.as_str()],
            Some("application/xml"),
            self.newest.unwrap_or_else(Utc::now),
            xml.as_bytes(),
        )?;

        if let Some(mut robots) = self.robots.take() {
            let pointer = format!("Sitemap: {}\n\n", emitter.config.url_for(&self.filename));
            let written = robots.write_all(pointer.as_bytes());
            robots.close()?;
            written.map_err(|e| EmitError::Encode {
                format: "robots.txt",
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Escape special XML characters.
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

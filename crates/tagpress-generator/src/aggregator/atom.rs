//! Atom 1.0 feeds, one per directory prefix.

use std::{collections::BTreeMap, sync::Arc};

use atom_syndication::{Entry, Feed, Link, Text};
use chrono::{DateTime, Utc};
use tagpress_core::{Document, FeedConfig, feeds::AtomConfig, path::resolve_path};
use tracing::debug;

use super::{DepthWindow, Emitter, Result, bump_newest, public_url, segments_in};

const DEFAULT_FILENAME: &str = "atom.xml";

#[derive(Debug, Default)]
struct FeedDraft {
    newest: Option<DateTime<Utc>>,
    entries: Vec<(DateTime<Utc>, Entry)>,
}

#[derive(Debug)]
pub struct AtomAggregator {
    config: AtomConfig,
    window: DepthWindow,
    filename: String,
    title: String,
    subtitle: String,
    feed_id: String,
    drafts: BTreeMap<String, FeedDraft>,
}

impl AtomAggregator {
    pub fn new(config: AtomConfig) -> Self {
        let window = DepthWindow {
            min: config.min_path,
            max: config.max_path,
        };
        Self {
            config,
            window,
            filename: String::new(),
            title: String::new(),
            subtitle: String::new(),
            feed_id: String::new(),
            drafts: BTreeMap::new(),
        }
    }

    pub(super) fn init(&mut self, feed: &FeedConfig, emitter: &Emitter<'_>) {
        let slug = feed.slug.as_deref().unwrap_or_default();
        self.filename = self
            .config
            .filename
            .clone()
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
        self.title = self
            .config
            .title
            .clone()
            .unwrap_or_else(|| format!("Feed: {slug}"));
        self.subtitle = emitter.config.site.title.clone();
        self.feed_id = feed
            .id
            .map(|id| format!("urn:uuid:{id}"))
            .unwrap_or_else(|| emitter.config.url_for(slug));
        self.drafts.clear();
    }

    pub(super) fn add(
        &mut self,
        feed: &FeedConfig,
        doc: &Arc<Document>,
        emitter: &Emitter<'_>,
    ) -> Result<()> {
        let path = resolve_path(feed, doc)?;
        let href = public_url(
            self.config.public_base_url.as_deref(),
            emitter.config,
            &path.file_path("html"),
        );

        let mut entry = Entry::default();
        entry.set_title(doc.title.as_str());
        entry.set_id(format!("urn:uuid:{}", doc.id));
        entry.set_links(vec![Link {
            href,
            rel: "alternate".to_string(),
            mime_type: Some("text/html".to_string()),
            hreflang: None,
            title: None,
            length: None,
        }]);
        entry.set_published(Some(doc.created.into()));
        entry.set_updated(doc.modified);
        entry.set_categories(
            doc.tags
                .iter()
                .map(|tag| atom_syndication::Category {
                    term: tag.clone(),
                    scheme: None,
                    label: Some(tag.clone()),
                })
                .collect::<Vec<_>>(),
        );

        for prefix in self.window.groups(feed, doc)? {
            let draft = self.drafts.entry(prefix).or_default();
            bump_newest(&mut draft.newest, doc);
            draft.entries.push((doc.created, entry.clone()));
        }
        Ok(())
    }

    pub(super) fn close(&mut self, emitter: &Emitter<'_>) -> Result<()> {
        for (prefix, draft) in &mut self.drafts {
            draft.entries.sort_by(|a, b| b.0.cmp(&a.0));
            if let Some(limit) = self.config.limit {
                draft.entries.truncate(limit);
            }
            let newest = draft.newest.unwrap_or_else(Utc::now);
            let segments = segments_in(prefix, &self.filename);

            let mut feed = Feed::default();
            feed.set_title(self.title.as_str());
            feed.set_subtitle(Text::plain(self.subtitle.as_str()));
            feed.set_id(if prefix.is_empty() {
                self.feed_id.clone()
            } else {
                format!("{}/{prefix}", self.feed_id)
            });
            feed.set_links(vec![Link {
                href: public_url(
                    self.config.public_base_url.as_deref(),
                    emitter.config,
                    &segments.join("/"),
                ),
                rel: "self".to_string(),
                mime_type: Some("application/atom+xml".to_string()),
                hreflang: None,
                title: None,
                length: None,
            }]);
            feed.set_updated(newest);
            feed.set_entries(
                draft
                    .entries
                    .iter()
                    .map(|(_, entry)| entry.clone())
                    .collect::<Vec<_>>(),
            );

            debug!(prefix = %prefix, count = draft.entries.len(), "writing atom feed");
            emitter.write(
                &segments,
                Some("application/atom+xml"),
                newest,
                feed.to_string().as_bytes(),
            )?;
        }
        Ok(())
    }
}

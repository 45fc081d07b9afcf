//! RSS 2.0 channels, one per directory prefix.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use rss::{ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use tagpress_core::{Document, FeedConfig, feeds::RssConfig, path::resolve_path};
use tracing::debug;

use super::{DepthWindow, Emitter, Result, bump_newest, public_url, segments_in};

const DEFAULT_FILENAME: &str = "rss.xml";

#[derive(Debug)]
struct ChannelDraft {
    newest: Option<DateTime<Utc>>,
    items: Vec<(DateTime<Utc>, Item)>,
}

#[derive(Debug)]
pub struct RssAggregator {
    config: RssConfig,
    window: DepthWindow,
    filename: String,
    title: String,
    description: String,
    channels: BTreeMap<String, ChannelDraft>,
}

impl RssAggregator {
    pub fn new(config: RssConfig) -> Self {
        let window = DepthWindow {
            min: config.min_path,
            max: config.max_path,
        };
        Self {
            config,
            window,
            filename: String::new(),
            title: String::new(),
            description: String::new(),
            channels: BTreeMap::new(),
        }
    }

    pub(super) fn init(&mut self, feed: &FeedConfig, _emitter: &Emitter<'_>) {
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
        self.description = self
            .config
            .description
            .clone()
            .unwrap_or_else(|| default_description(slug, &feed.tags));
        self.channels.clear();
    }

    pub(super) fn add(
        &mut self,
        feed: &FeedConfig,
        doc: &Arc<Document>,
        emitter: &Emitter<'_>,
    ) -> Result<()> {
        let path = resolve_path(feed, doc)?;
        let link = public_url(
            self.config.public_base_url.as_deref(),
            emitter.config,
            &path.file_path("html"),
        );

        let mut builder = ItemBuilder::default();
        builder.title(Some(doc.title.clone()));
        builder.link(Some(link));
        builder.pub_date(Some(doc.created.to_rfc2822()));
        builder.guid(Some(
            GuidBuilder::default()
                .value(doc.id.to_string())
                .permalink(false)
                .build(),
        ));
        let categories: Vec<_> = doc
            .tags
            .iter()
            .map(|tag| rss::Category {
                name: tag.clone(),
                domain: None,
            })
            .collect();
        if !categories.is_empty() {
            builder.categories(categories);
        }
        let item = builder.build();

        for prefix in self.window.groups(feed, doc)? {
            let draft = self.channels.entry(prefix).or_insert_with(|| ChannelDraft {
                newest: None,
                items: Vec::new(),
            });
            bump_newest(&mut draft.newest, doc);
            draft.items.push((doc.created, item.clone()));
        }
        Ok(())
    }

    pub(super) fn close(&mut self, emitter: &Emitter<'_>) -> Result<()> {
        let generator = emitter.meta.generator();
        for (prefix, draft) in &mut self.channels {
            draft.items.sort_by(|a, b| b.0.cmp(&a.0));
            if let Some(limit) = self.config.limit {
                draft.items.truncate(limit);
            }
            let newest = draft.newest.unwrap_or_else(Utc::now);

            let link = public_url(
                self.config.public_base_url.as_deref(),
                emitter.config,
                &segments_in(prefix, "").join("/"),
            );
            let channel = ChannelBuilder::default()
                .title(self.title.as_str())
                .link(link)
                .description(self.description.as_str())
                .last_build_date(Some(newest.to_rfc2822()))
                .ttl(self.config.ttl.map(|ttl| ttl.to_string()))
                .generator(Some(generator.clone()))
                .items(draft.items.iter().map(|(_, item)| item.clone()).collect::<Vec<_>>())
                .build();

            debug!(prefix = %prefix, count = draft.items.len(), "writing rss channel");
            emitter.write(
                &segments_in(prefix, &self.filename),
                Some("application/rss+xml"),
                newest,
                channel.to_string().as_bytes(),
            )?;
        }
        Ok(())
    }
}

/// "The latest posts tagged as a, b, or c", or the feed slug when the feed
/// selects no tags.
fn default_description(slug: &str, tags: &[String]) -> String {
    let selection = match tags {
        [] => return format!("The latest posts in the {slug} feed"),
        [only] => only.clone(),
        [first, second] => format!("{first} or {second}"),
        [rest @ .., last] => format!("{}, or {last}", rest.join(", ")),
    };
    format!("The latest posts tagged as {selection}")
}

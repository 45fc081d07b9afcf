//! JSON token index for client-side search.
//!
//! The whole index is loaded by the browser, so it is kept small: each
//! document carries its URL, title, date and deduplicated terms, and an
//! inverted index maps every term to document positions.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tagpress_core::{Document, FeedConfig, feeds::SearchConfig, path::resolve_path};
use tracing::{info, warn};

use super::{EmitError, Emitter, Result, bump_newest};

/// Maximum recommended size for the serialized index (500KB).
pub const MAX_INDEX_SIZE: usize = 500 * 1024;

/// One searchable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub date: String,
    pub terms: Vec<String>,
}

/// Serialized search index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchIndex {
    pub version: u32,
    pub documents: Vec<SearchDocument>,
    /// Term to document positions, sorted and deduplicated.
    pub index: BTreeMap<String, Vec<usize>>,
}

impl SearchIndex {
    /// Build the inverted index over `documents`.
    pub fn build(documents: Vec<SearchDocument>) -> Self {
        let mut index: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (position, doc) in documents.iter().enumerate() {
            for term in &doc.terms {
                index.entry(term.clone()).or_default().push(position);
            }
        }
        for postings in index.values_mut() {
            postings.sort_unstable();
            postings.dedup();
        }
        Self {
            version: 1,
            documents,
            index,
        }
    }

    /// Documents containing every term of `query`.
    pub fn search(&self, query: &str) -> Vec<&SearchDocument> {
        let terms = tokenize_text(query);
        let Some((first, rest)) = terms.split_first() else {
            return Vec::new();
        };
        let Some(mut hits) = self.index.get(first).cloned() else {
            return Vec::new();
        };
        for term in rest {
            match self.index.get(term) {
                Some(postings) => hits.retain(|p| postings.binary_search(p).is_ok()),
                None => return Vec::new(),
            }
        }
        hits.iter().filter_map(|&p| self.documents.get(p)).collect()
    }
}

#[derive(Debug)]
pub struct SearchAggregator {
    config: SearchConfig,
    filename: String,
    newest: Option<DateTime<Utc>>,
    documents: Vec<SearchDocument>,
}

impl SearchAggregator {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            filename: String::new(),
            newest: None,
            documents: Vec::new(),
        }
    }

    pub(super) fn init(&mut self, feed: &FeedConfig) {
        self.filename = self.config.filename.clone().unwrap_or_else(|| {
            format!("search-{}.json", feed.slug.as_deref().unwrap_or("feed"))
        });
        self.documents.clear();
        self.newest = None;
    }

    pub(super) fn add(
        &mut self,
        feed: &FeedConfig,
        doc: &Arc<Document>,
        emitter: &Emitter<'_>,
    ) -> Result<()> {
        let path = resolve_path(feed, doc)?;
        bump_newest(&mut self.newest, doc);

        let html = emitter.markdown.document_html(doc);
        let mut terms = tokenize_text(&doc.title);
        terms.extend(tokenize_text(&strip_html(&html)));
        terms.extend(doc.tags.iter().map(|t| normalize_term(t)));
        terms.sort();
        terms.dedup();

        self.documents.push(SearchDocument {
            url: emitter.config.url_for(&path.file_path("html")),
            title: doc.title.clone(),
            tags: doc.tags.clone(),
            date: doc.created.to_rfc3339(),
            terms,
        });
        Ok(())
    }

    pub(super) fn close(&mut self, emitter: &Emitter<'_>) -> Result<()> {
        self.documents.sort_by(|a, b| a.url.cmp(&b.url));
        let index = SearchIndex::build(std::mem::take(&mut self.documents));
        let json = serde_json::to_string(&index).map_err(|e| EmitError::Encode {
            format: "search index",
            message: e.to_string(),
        })?;
        if json.len() > MAX_INDEX_SIZE {
            warn!(
                size = json.len(),
                max = MAX_INDEX_SIZE,
                "search index exceeds recommended size"
            );
        }

        info!(
            file = %self.filename,
            documents = index.documents.len(),
            terms = index.index.len(),
            "built search index"
        );
        emitter.write(
            &[self.filename.as_str()],
            Some("application/json"),
            self.newest.unwrap_or_else(Utc::now),
            json.as_bytes(),
        )
    }
}

fn tokenize_text(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(normalize_term)
        .collect()
}

fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{super::test_support::*, *};

    #[test]
    fn test_tokenize_and_strip() {
        assert_eq!(tokenize_text("Hello, big World! a"), vec!["hello", "big", "world"]);
        assert_eq!(strip_html("<p>Hi <b>there</b></p>").split_whitespace().collect::<Vec<_>>(), vec!["Hi", "there"]);
    }

    #[test]
    fn test_search_index_written() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let fx = Fixture::new(dir.path());
        let em = fx.emitter();
        let f = feed("slug: blog\ncanonical_path: [{attr: slug}]\n");

        let mut agg = SearchAggregator::new(SearchConfig::default());
        agg.init(&f);
        agg.add(&f, &doc("alpha", 1, &["rust"]), &em).expect("add");
        agg.add(&f, &doc("beta", 2, &[]), &em).expect("add");
        agg.close(&em).expect("close");

        let json = fs::read_to_string(dir.path().join("search-blog.json")).expect("read");
        let index: SearchIndex = serde_json::from_str(&json).expect("parse");
        assert_eq!(index.documents.len(), 2);

        let hits = index.search("body alpha");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://example.com/alpha.html");
        assert_eq!(index.search("rust").len(), 1);
        assert_eq!(index.search("body").len(), 2);
        assert!(index.search("missing").is_empty());
    }
}

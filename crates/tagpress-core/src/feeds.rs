//! Feed definitions and their aggregator configuration.
//!
//! Feeds live in a YAML mapping from feed name to [`FeedConfig`]. Identity
//! fields missing from the file are generated on load and persisted back.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{CoreError, Result},
    path::PathComponent,
    slug::slugify,
};

/// One feed: a tag selection rule plus an output rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    /// Documents carrying any of these tags join the feed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Directory components followed by the filename stem.
    #[serde(default, alias = "canonicalpath", skip_serializing_if = "Vec::is_empty")]
    pub canonical_path: Vec<PathComponent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    /// Output generators, run in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregators: Vec<AggregatorConfig>,

    /// Template used for documents that do not name one.
    #[serde(default, alias = "defaulttemplate", skip_serializing_if = "Option::is_none")]
    pub default_template: Option<String>,
}

impl FeedConfig {
    /// Human-readable identity used in error messages.
    pub fn identity(&self) -> String {
        match (&self.slug, &self.id) {
            (Some(slug), Some(id)) => format!("{slug} ({id})"),
            (Some(slug), None) => slug.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => "<unnamed>".to_string(),
        }
    }

    /// Fill in a missing id or slug. Returns true if anything changed.
    fn assign_identity(&mut self, name: &str) -> bool {
        let mut changed = false;
        if self.id.is_none() {
            self.id = Some(Uuid::new_v4());
            changed = true;
        }
        if self.slug.as_deref().is_none_or(str::is_empty) {
            self.slug = Some(slugify(name));
            changed = true;
        }
        changed
    }
}

/// Order of documents in a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// HTML listing pages, one per directory prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_path: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_path: Option<usize>,
    /// Documents per page; unset renders a single page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paginate: Option<usize>,
    #[serde(default = "default_index_filename")]
    pub filename: String,
    #[serde(default = "default_index_template")]
    pub template: String,
    #[serde(default)]
    pub sort: SortOrder,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            min_path: None,
            max_path: None,
            paginate: None,
            filename: default_index_filename(),
            template: default_index_template(),
            sort: SortOrder::default(),
        }
    }
}

/// RSS 2.0 channels, one per directory prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RssConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_path: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_path: Option<usize>,
    /// Defaults to `rss.xml`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Prefix for item links; defaults to the site base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
    /// Minutes a reader may cache the channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Maximum number of items per channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Atom 1.0 feeds, one per directory prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AtomConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_path: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_path: Option<usize>,
    /// Defaults to `atom.xml`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Crawler exclusion of a path prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RobotsExcludeConfig {
    /// Number of directory segments kept in the excluded prefix.
    #[serde(default)]
    pub min_path: usize,
}

/// A URL set covering every published document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SitemapConfig {
    /// Defaults to `sitemap-<feed slug>.xml`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// A JSON token index for client-side search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Defaults to `search-<feed slug>.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Configuration of one aggregator, selected by its `kind` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AggregatorConfig {
    Index(IndexConfig),
    Rss(RssConfig),
    Atom(AtomConfig),
    RobotsExclude(RobotsExcludeConfig),
    Sitemap(SitemapConfig),
    Search(SearchConfig),
}

impl AggregatorConfig {
    /// The `kind` discriminator of this entry.
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
}

impl<'de> Deserialize<'de> for AggregatorConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut value = serde_yaml::Value::deserialize(deserializer)?;
        let kind = value
            .get("kind")
            .and_then(serde_yaml::Value::as_str)
            .ok_or_else(|| D::Error::custom("aggregator entry has no `kind` field"))?
            .to_string();
        if let serde_yaml::Value::Mapping(fields) = &mut value {
            fields.remove("kind");
        }

        let decoded = match kind.as_str() {
            "index" => serde_yaml::from_value(value).map(Self::Index),
            "rss" => serde_yaml::from_value(value).map(Self::Rss),
            "atom" => serde_yaml::from_value(value).map(Self::Atom),
            "robotsexclude" => serde_yaml::from_value(value).map(Self::RobotsExclude),
            "sitemap" => serde_yaml::from_value(value).map(Self::Sitemap),
            "search" => serde_yaml::from_value(value).map(Self::Search),
            other => {
                return Err(D::Error::custom(format!(
                    "unknown aggregator kind {other:?}"
                )));
            }
        };
        decoded.map_err(|e| D::Error::custom(format!("invalid {kind} aggregator: {e}")))
    }
}

fn default_index_filename() -> String {
    "index.html".to_string()
}

fn default_index_template() -> String {
    "index.html".to_string()
}

/// All feeds of a site, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSet {
    pub feeds: BTreeMap<String, FeedConfig>,
}

impl FeedSet {
    /// Parse feed definitions from YAML without touching storage.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let feeds = serde_yaml::from_str(content)
            .map_err(|e| CoreError::config_with_source("invalid feed configuration", e))?;
        Ok(Self { feeds })
    }

    /// Load feeds, generating and persisting any missing ids or slugs.
    ///
    /// When anything was generated the whole file is rewritten before
    /// returning.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CoreError::io("read", path, e))?;
        let mut set = Self::from_yaml(&content)?;

        let mut generated = Vec::new();
        for (name, feed) in &mut set.feeds {
            if feed.assign_identity(name) {
                generated.push(name.clone());
            }
        }

        if !generated.is_empty() {
            let yaml = serde_yaml::to_string(&set.feeds)?;
            std::fs::write(path, yaml).map_err(|e| CoreError::io("write", path, e))?;
            info!(path = %path.display(), feeds = ?generated, "persisted generated feed identities");
        }

        Ok(set)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FeedConfig)> {
        self.feeds.iter()
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

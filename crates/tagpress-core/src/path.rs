//! Path expressions resolving a document's public location within a feed.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    document::Document,
    error::{CoreError, Result},
    feeds::FeedConfig,
};

/// An attribute a path component may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Document slug.
    Slug,
    /// Document id.
    Id,
    /// Document template, falling back to the feed default.
    Template,
    /// Four digit year of `created`.
    Year,
    /// Two digit month of `created`.
    Month,
    /// Two digit day of `created`.
    Day,
    /// Abbreviated weekday of `created`, e.g. `Sat`.
    DayOfWeek,
    /// `created` as `YYYYMMDD`.
    Date,
    /// Feed slug.
    FeedSlug,
    /// Feed id.
    FeedId,
}

impl Attribute {
    /// Name used in feed configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slug => "slug",
            Self::Id => "id",
            Self::Template => "template",
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::DayOfWeek => "dow",
            Self::Date => "date",
            Self::FeedSlug => "feedslug",
            Self::FeedId => "feedid",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "slug" => Self::Slug,
            "id" => Self::Id,
            "template" => Self::Template,
            "year" => Self::Year,
            "month" => Self::Month,
            "day" => Self::Day,
            "dow" => Self::DayOfWeek,
            "date" => Self::Date,
            "feedslug" => Self::FeedSlug,
            "feedid" => Self::FeedId,
            other => {
                return Err(CoreError::config(format!(
                    "unknown path attribute {other:?}"
                )));
            }
        })
    }
}

/// One element of a canonical path expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPathComponent", into = "RawPathComponent")]
pub enum PathComponent {
    /// A fixed string.
    Literal(String),
    /// A document or feed attribute.
    Attr(Attribute),
}

/// Wire shape of a path component: exactly one key must be set.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPathComponent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attr: Option<String>,
}

impl TryFrom<RawPathComponent> for PathComponent {
    type Error = CoreError;

    fn try_from(raw: RawPathComponent) -> Result<Self> {
        match (raw.string, raw.attr) {
            (Some(literal), None) => Ok(Self::Literal(literal)),
            (None, Some(attr)) => Ok(Self::Attr(attr.parse()?)),
            (Some(literal), Some(attr)) => Err(CoreError::config(format!(
                "path component defines both string {literal:?} and attr {attr:?}"
            ))),
            (None, None) => Err(CoreError::config(
                "path component defines neither a string nor an attr",
            )),
        }
    }
}

impl From<PathComponent> for RawPathComponent {
    fn from(component: PathComponent) -> Self {
        match component {
            PathComponent::Literal(s) => Self {
                string: Some(s),
                ..Default::default()
            },
            PathComponent::Attr(a) => Self {
                attr: Some(a.as_str().to_string()),
                ..Default::default()
            },
        }
    }
}

/// A resolved canonical path: directory segments plus the filename stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub dirs: Vec<String>,
    pub stem: String,
}

impl ResolvedPath {
    /// Filename with the given extension appended to the stem.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.stem)
    }

    /// Every directory segment followed by the filename, joined with `/`.
    pub fn file_path(&self, extension: &str) -> String {
        let mut parts = self.dirs.clone();
        parts.push(self.file_name(extension));
        parts.join("/")
    }

    /// Directory prefixes joined with `/`, from depth 0 (the feed root, `""`)
    /// up to the full directory path.
    pub fn prefixes(&self) -> impl Iterator<Item = (usize, String)> + '_ {
        (0..=self.dirs.len()).map(|depth| (depth, self.dirs[..depth].join("/")))
    }
}

/// Resolve a single component for `doc` within `feed`.
pub fn resolve(component: &PathComponent, feed: &FeedConfig, doc: &Document) -> Result<String> {
    let value = match component {
        PathComponent::Literal(s) => s.clone(),
        PathComponent::Attr(attr) => resolve_attribute(*attr, feed, doc)?,
    };
    check_segment(&value, feed, doc)?;
    Ok(value)
}

/// Resolve every component of the feed's canonical path in order.
///
/// The last component is the filename stem; the rest are directories.
pub fn resolve_path(feed: &FeedConfig, doc: &Document) -> Result<ResolvedPath> {
    let Some((last, dirs)) = feed.canonical_path.split_last() else {
        return Err(CoreError::config(format!(
            "feed {} has an empty canonical_path",
            feed.identity()
        )));
    };
    let dirs = dirs
        .iter()
        .map(|c| resolve(c, feed, doc))
        .collect::<Result<Vec<_>>>()?;
    let stem = resolve(last, feed, doc)?;
    Ok(ResolvedPath { dirs, stem })
}

fn resolve_attribute(attr: Attribute, feed: &FeedConfig, doc: &Document) -> Result<String> {
    let created = doc.created;
    let value = match attr {
        Attribute::Slug => Some(doc.slug.clone()),
        Attribute::Id => Some(doc.id.to_string()),
        Attribute::Template => doc
            .template
            .clone()
            .or_else(|| feed.default_template.clone()),
        Attribute::Year => Some(created.format("%Y").to_string()),
        Attribute::Month => Some(created.format("%m").to_string()),
        Attribute::Day => Some(created.format("%d").to_string()),
        Attribute::DayOfWeek => Some(created.format("%a").to_string()),
        Attribute::Date => Some(created.format("%Y%m%d").to_string()),
        Attribute::FeedSlug => feed.slug.clone(),
        Attribute::FeedId => feed.id.map(|id| id.to_string()),
    };
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CoreError::Resolve {
            attribute: attr.to_string(),
            document: doc.identity(),
            feed: feed.identity(),
        })
}

fn check_segment(value: &str, feed: &FeedConfig, doc: &Document) -> Result<()> {
    let unsafe_segment = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if unsafe_segment {
        return Err(CoreError::UnsafeSegment {
            value: value.to_string(),
            document: doc.identity(),
            feed: feed.identity(),
        });
    }
    Ok(())
}

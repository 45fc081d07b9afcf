//! Tagpress Core Library
//!
//! Documents, configuration, path resolution and error handling for the
//! tagpress publishing engine.

pub mod checksum;
pub mod config;
pub mod content_type;
pub mod document;
pub mod error;
pub mod feeds;
pub mod frontmatter;
pub mod meta;
pub mod path;
pub mod slug;

pub use config::{BuildConfig, CollisionPolicy, Config, SiteConfig};
pub use content_type::ContentTypes;
pub use document::{Document, DocumentStore};
pub use error::{CoreError, Result};
pub use feeds::{AggregatorConfig, FeedConfig, FeedSet, SortOrder};
pub use frontmatter::Frontmatter;
pub use meta::BuildMeta;
pub use path::{Attribute, PathComponent, ResolvedPath};

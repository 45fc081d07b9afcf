//! Tagpress Generator Library
//!
//! Feed engine and output generation for tagpress.
//!
//! # Modules
//!
//! - [`collector`] - Source discovery and document loading
//! - [`engine`] - Feed selection, ordering and canonical structure
//! - [`aggregator`] - Index, RSS, Atom, robots, sitemap and search outputs
//! - [`output`] - Reference-counted output files and the build manifest
//! - [`template`] - HTML template system with variable interpolation
//! - [`markdown`] - Markdown to HTML rendering
//! - [`build`] - Build orchestration

pub mod aggregator;
pub mod build;
pub mod collector;
pub mod engine;
pub mod markdown;
pub mod output;
pub mod template;

pub use aggregator::{Aggregator, AggregatorError, Emitter};
pub use build::{BuildError, BuildStats, Builder, CheckReport};
pub use collector::ContentCollector;
pub use engine::{Feed, FeedStructure, scan};
pub use markdown::MarkdownRenderer;
pub use output::{ManifestEntry, OutputFile, OutputManager};
pub use template::{Template, TemplateContext, TemplateRegistry};

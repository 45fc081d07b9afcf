//! Crawler exclusion directives in `robots.txt`.

use std::{collections::BTreeSet, io::Write, sync::Arc};

use tagpress_core::{Document, FeedConfig, feeds::RobotsExcludeConfig, path::resolve_path};
use tracing::debug;

use super::{EmitError, Emitter, Result};
use crate::output::OutputFile;

/// Name of the shared crawler directives file.
pub const ROBOTS_FILE: &str = "robots.txt";

#[derive(Debug)]
pub struct RobotsExcludeAggregator {
    config: RobotsExcludeConfig,
    robots: Option<OutputFile>,
    /// Directory prefixes to disallow.
    paths: BTreeSet<String>,
}

impl RobotsExcludeAggregator {
    pub fn new(config: RobotsExcludeConfig) -> Self {
        Self {
            config,
            robots: None,
            paths: BTreeSet::new(),
        }
    }

    pub(super) fn init(&mut self, emitter: &Emitter<'_>) {
        self.paths.clear();
        self.robots = Some(emitter.output.create([ROBOTS_FILE]));
    }

    pub(super) fn add(&mut self, feed: &FeedConfig, doc: &Arc<Document>) -> Result<()> {
        let resolved = resolve_path(feed, doc)?;
        let depth = self.config.min_path.min(resolved.dirs.len());
        self.paths.insert(resolved.dirs[..depth].join("/"));
        Ok(())
    }

    pub(super) fn close(&mut self) -> Result<()> {
        let Some(mut robots) = self.robots.take() else {
            return Ok(());
        };

        let mut text = String::new();
        for path in &self.paths {
            let path = if path.is_empty() {
                String::new()
            } else {
                format!("{path}/")
            };
            text.push_str(&format!("User-Agent: *\nDisallow: /{path}\n\n"));
        }
        debug!(count = self.paths.len(), "writing robots exclusions");

        let written = robots.write_all(text.as_bytes());
        robots.close()?;
        written.map_err(|e| EmitError::Encode {
            format: "robots.txt",
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{super::test_support::*, *};

    #[test]
    fn test_excludes_prefixes() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let fx = Fixture::new(dir.path());
        let em = fx.emitter();
        let f = feed("slug: drafts\ncanonical_path: [{string: drafts}, {attr: year}, {attr: slug}]\n");

        let mut agg = RobotsExcludeAggregator::new(RobotsExcludeConfig { min_path: 1 });
        agg.init(&em);
        agg.add(&f, &doc("a", 1, &[])).expect("add");
        agg.add(&f, &doc("b", 2, &[])).expect("add");
        agg.close().expect("close");

        let robots = fs::read_to_string(dir.path().join("robots.txt")).expect("read");
        assert_eq!(robots, "User-Agent: *\nDisallow: /drafts/\n\n");
    }

    #[test]
    fn test_two_feeds_share_robots_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let fx = Fixture::new(dir.path());
        let em = fx.emitter();
        let drafts = feed("slug: drafts\ncanonical_path: [{string: drafts}, {attr: slug}]\n");
        let private = feed("slug: private\ncanonical_path: [{string: private}, {attr: slug}]\n");

        let mut first = RobotsExcludeAggregator::new(RobotsExcludeConfig { min_path: 1 });
        let mut second = RobotsExcludeAggregator::new(RobotsExcludeConfig { min_path: 1 });
        first.init(&em);
        second.init(&em);
        first.add(&drafts, &doc("a", 1, &[])).expect("add");
        second.add(&private, &doc("b", 1, &[])).expect("add");

        first.close().expect("close");
        assert!(fx.output.is_open("robots.txt"));
        second.close().expect("close");
        assert!(!fx.output.is_open("robots.txt"));

        let robots = fs::read_to_string(dir.path().join("robots.txt")).expect("read");
        assert!(robots.contains("Disallow: /drafts/\n"));
        assert!(robots.contains("Disallow: /private/\n"));
    }

    #[test]
    fn test_min_path_zero_excludes_everything() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let fx = Fixture::new(dir.path());
        let em = fx.emitter();
        let f = feed("slug: hidden\ncanonical_path: [{attr: slug}]\n");

        let mut agg = RobotsExcludeAggregator::new(RobotsExcludeConfig::default());
        agg.init(&em);
        agg.add(&f, &doc("a", 1, &[])).expect("add");
        agg.close().expect("close");

        let robots = fs::read_to_string(dir.path().join("robots.txt")).expect("read");
        assert_eq!(robots, "User-Agent: *\nDisallow: /\n\n");
    }
}

//! End-to-end builds of small sites.

use std::{fs, path::Path};

use tagpress_core::{BuildMeta, Config, FeedSet};
use tagpress_generator::{Builder, build::BuildError};

const SITE: &str = r#"
[site]
title = "Example"
base_url = "https://example.com"
"#;

const FEEDS: &str = r#"
blog:
  tags: [blog]
  canonical_path:
    - attr: year
    - attr: month
    - attr: slug
  aggregators:
    - kind: index
    - kind: rss
      min_path: 0
      max_path: 0
    - kind: atom
      max_path: 0
    - kind: sitemap
    - kind: search
drafts:
  tags: [draft]
  canonical_path:
    - string: drafts
    - attr: slug
  aggregators:
    - kind: robotsexclude
      min_path: 1
"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

fn site(root: &Path) -> Config {
    write(root, "_feeds.yaml", FEEDS);
    write(
        root,
        "content/hello.md",
        "---\ntitle: Hello World\ncreated: 2024-03-02T10:00:00Z\ntags: [blog]\n---\n# Hello\n\nFirst post.\n",
    );
    write(
        root,
        "content/later.md",
        "---\ntitle: Later\ncreated: 2024-04-10T10:00:00Z\ntags: [blog, draft]\n---\nSecond post.\n",
    );
    write(root, "content/notes.txt", "not a document");
    toml::from_str(SITE).expect("config")
}

#[test]
fn test_build_site() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root = dir.path();
    let config = site(root);

    let stats = Builder::new(config, root)
        .with_meta(BuildMeta::new("tagpress", "1.2.3", None))
        .build()
        .expect("build");
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.feeds, 2);
    assert_eq!(stats.files, 3);

    let public = root.join("public");
    let page = fs::read_to_string(public.join("2024/03/hello-world.html")).expect("page");
    assert!(page.contains("<h1>Hello</h1>"));
    assert!(page.contains("tagpress/1.2.3"));
    assert!(public.join("2024/04/later.html").exists());
    assert!(public.join("drafts/later.html").exists());

    let index = fs::read_to_string(public.join("index.html")).expect("index");
    assert!(index.find("Later").expect("later") < index.find("Hello World").expect("hello"));
    assert!(public.join("2024/index.html").exists());
    assert!(public.join("2024/03/index.html").exists());

    let rss = fs::read_to_string(public.join("rss.xml")).expect("rss");
    assert!(rss.contains("The latest posts tagged as blog"));
    assert!(!public.join("2024/rss.xml").exists());
    assert!(public.join("atom.xml").exists());
    assert!(public.join("search-blog.json").exists());

    let robots = fs::read_to_string(public.join("robots.txt")).expect("robots");
    assert!(robots.contains("Disallow: /drafts/\n"));
    assert!(robots.contains("Sitemap: https://example.com/sitemap-blog.xml"));

    let feed_xml = stats
        .manifest
        .iter()
        .find(|e| e.path.ends_with("rss.xml"))
        .expect("rss in manifest");
    assert_eq!(feed_xml.content_type.as_deref(), Some("application/rss+xml"));
    let html = stats
        .manifest
        .iter()
        .find(|e| e.path.ends_with("hello-world.html"))
        .expect("page in manifest");
    assert_eq!(html.content_type.as_deref(), Some("text/html"));
}

#[test]
fn test_build_persists_identities() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root = dir.path();
    let config = site(root);
    Builder::new(config, root).build().expect("build");

    let feeds = FeedSet::load(&root.join("_feeds.yaml")).expect("feeds");
    let blog = &feeds.feeds["blog"];
    assert!(blog.id.is_some());
    assert_eq!(blog.slug.as_deref(), Some("blog"));

    let source = fs::read_to_string(root.join("content/hello.md")).expect("source");
    assert!(source.starts_with("---\n"));
    assert!(source.contains("slug: hello-world"));
    assert!(source.contains("checksum: sha1:"));
    assert!(source.ends_with("# Hello\n\nFirst post.\n"));
}

#[test]
fn test_rebuild_leaves_sources_untouched() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root = dir.path();
    let config = site(root);
    Builder::new(config.clone(), root).build().expect("first build");

    let before = fs::read(root.join("content/hello.md")).expect("read");
    let mtime = fs::metadata(root.join("content/hello.md"))
        .and_then(|m| m.modified())
        .expect("stat");

    Builder::new(config, root).build().expect("second build");
    assert_eq!(fs::read(root.join("content/hello.md")).expect("read"), before);
    assert_eq!(
        fs::metadata(root.join("content/hello.md"))
            .and_then(|m| m.modified())
            .expect("stat"),
        mtime
    );
}

#[test]
fn test_collision_fails_build() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root = dir.path();
    write(
        root,
        "_feeds.yaml",
        "blog:\n  tags: [blog]\n  canonical_path:\n    - string: same\n",
    );
    write(root, "content/a.md", "---\ntags: [blog]\n---\na\n");
    write(root, "content/b.md", "---\ntags: [blog]\n---\nb\n");
    let config: Config = toml::from_str(SITE).expect("config");

    let err = Builder::new(config, root).build().unwrap_err();
    assert!(matches!(err, BuildError::Engine(_)), "unexpected error: {err}");
}

#[test]
fn test_check_reports_without_writing() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root = dir.path();
    let config = site(root);
    write(root, "content/orphan.md", "---\ntags: [misc]\n---\nalone\n");

    let report = Builder::new(config, root).check().expect("check");
    assert_eq!(report.documents, 3);
    assert_eq!(report.files, 3);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("orphan.md"));
    assert!(!root.join("public").exists());
}

#[test]
fn test_output_override() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root = dir.path();
    let config = site(root);
    let out = root.join("dist");

    Builder::new(config, root)
        .with_output_dir(&out)
        .build()
        .expect("build");
    assert!(out.join("index.html").exists());
    assert!(!root.join("public").exists());
}

#[test]
fn test_two_feeds_writing_one_path_fail() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root = dir.path();
    write(
        root,
        "_feeds.yaml",
        "a:\n  tags: [a]\n  canonical_path: [{attr: slug}]\n  aggregators: [{kind: index}, {kind: rss}]\n\
         b:\n  tags: [b]\n  canonical_path: [{attr: slug}]\n  aggregators: [{kind: index}, {kind: rss}]\n",
    );
    write(root, "content/x.md", "---\ntitle: X\ntags: [a, b]\n---\nbody\n");
    let config: Config = toml::from_str(SITE).expect("config");

    let err = Builder::new(config, root).build().unwrap_err();
    assert!(
        err.to_string().contains("already written and closed"),
        "unexpected error: {err}"
    );

    let page = fs::read_to_string(root.join("public/x.html")).expect("page");
    assert_eq!(page.matches("<!DOCTYPE html>").count(), 1);
}

#[test]
fn test_two_feeds_sharing_index_fail() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root = dir.path();
    write(
        root,
        "_feeds.yaml",
        "a:\n  tags: [a]\n  canonical_path: [{string: a}, {attr: slug}]\n  aggregators: [{kind: index, max_path: 0}]\n\
         b:\n  tags: [b]\n  canonical_path: [{string: b}, {attr: slug}]\n  aggregators: [{kind: index, max_path: 0}]\n",
    );
    write(root, "content/x.md", "---\ntitle: X\ntags: [a, b]\n---\nbody\n");
    let config: Config = toml::from_str(SITE).expect("config");

    assert!(Builder::new(config, root).build().is_err());
    assert!(root.join("public/a/x.html").exists());
    assert!(root.join("public/b/x.html").exists());
    let index = fs::read_to_string(root.join("public/index.html")).expect("index");
    assert_eq!(index.matches("<!DOCTYPE html>").count(), 1);
}

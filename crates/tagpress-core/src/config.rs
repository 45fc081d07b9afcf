//! Site configuration management.

use std::{collections::HashMap, io, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Main configuration structure for tagpress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Site-wide settings.
    pub site: SiteConfig,

    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Extension to content-type overrides, consulted before the built-in table.
    #[serde(default)]
    pub content_types: HashMap<String, String>,
}

/// Site-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title.
    pub title: String,

    /// Base URL for the site (e.g., "https://example.com").
    pub base_url: String,

    /// Site description for meta tags.
    #[serde(default)]
    pub description: Option<String>,

    /// Site author name.
    #[serde(default)]
    pub author: Option<String>,
}

/// Build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory scanned for source documents.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Output directory for the generated tree.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory holding user templates.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,

    /// YAML file holding the feed definitions.
    #[serde(default = "default_feeds_file")]
    pub feeds_file: String,

    /// Regular expression matched against paths relative to the content dir.
    #[serde(default = "default_text_pattern")]
    pub text_pattern: String,

    /// What to do when two documents resolve to the same output file.
    #[serde(default)]
    pub path_collisions: CollisionPolicy,
}

/// Handling of two documents resolving to one canonical file path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Abort the build.
    #[default]
    Error,
    /// Log a warning and keep the last document.
    Warn,
}

// Default value functions
fn default_content_dir() -> String {
    "content".to_string()
}

fn default_output_dir() -> String {
    "public".to_string()
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_feeds_file() -> String {
    "_feeds.yaml".to_string()
}

fn default_text_pattern() -> String {
    r"\.md$".to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            output_dir: default_output_dir(),
            templates_dir: default_templates_dir(),
            feeds_file: default_feeds_file(),
            text_pattern: default_text_pattern(),
            path_collisions: CollisionPolicy::default(),
        }
    }
}

impl Config {
    /// Load and validate a `tagpress.toml`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CoreError::config(format!(
                    "no site configuration at {}",
                    path.display()
                )));
            }
            Err(e) => return Err(CoreError::io("read", path, e)),
        };
        let config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(format!("cannot parse {}", path.display()), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `TAGPRESS__SECTION__KEY` environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("TAGPRESS").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings a build depends on before anything is read or
    /// written.
    pub fn validate(&self) -> Result<()> {
        if self.site.title.trim().is_empty() {
            return Err(CoreError::config("site.title cannot be empty"));
        }
        let base = &self.site.base_url;
        let host = base
            .strip_prefix("https://")
            .or_else(|| base.strip_prefix("http://"))
            .map(|rest| rest.split('/').next().unwrap_or_default());
        if host.is_none_or(str::is_empty) {
            return Err(CoreError::config(format!(
                "site.base_url {base:?} must be an absolute http(s) URL"
            )));
        }

        let build = &self.build;
        for (key, value) in [
            ("build.content_dir", &build.content_dir),
            ("build.output_dir", &build.output_dir),
            ("build.templates_dir", &build.templates_dir),
            ("build.feeds_file", &build.feeds_file),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::config(format!("{key} cannot be empty")));
            }
        }
        // Generated files must never be collected as sources.
        if Path::new(&build.output_dir).starts_with(&build.content_dir) {
            return Err(CoreError::config(format!(
                "build.output_dir {:?} must not be inside build.content_dir {:?}",
                build.output_dir, build.content_dir
            )));
        }

        regex::Regex::new(&build.text_pattern).map_err(|e| {
            CoreError::config_with_source(
                format!("build.text_pattern {:?} is not a valid regex", build.text_pattern),
                e,
            )
        })?;
        Ok(())
    }

    /// Public URL of an output path relative to the output root. Empty and
    /// repeated separators are dropped.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.site.base_url.trim_end_matches('/');
        let path: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        format!("{base}/{}", path.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn create_test_config() -> String {
        r#"
[site]
title = "Test Site"
base_url = "https://example.com"
author = "Someone"

[build]
content_dir = "texts"
output_dir = "dist"
feeds_file = "feeds.yaml"
text_pattern = '\.(md|txt)$'
path_collisions = "warn"

[content_types]
gmi = "text/gemini"
"#
        .to_string()
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("tagpress.toml");
        let mut file = std::fs::File::create(&config_path).expect("create file");
        file.write_all(create_test_config().as_bytes())
            .expect("write");

        let config = Config::load(&config_path).expect("load config");

        assert_eq!(config.site.title, "Test Site");
        assert_eq!(config.site.author.as_deref(), Some("Someone"));
        assert_eq!(config.build.content_dir, "texts");
        assert_eq!(config.build.output_dir, "dist");
        assert_eq!(config.build.feeds_file, "feeds.yaml");
        assert_eq!(config.build.text_pattern, r"\.(md|txt)$");
        assert_eq!(config.build.path_collisions, CollisionPolicy::Warn);
        assert_eq!(config.content_types["gmi"], "text/gemini");
    }

    #[test]
    fn test_config_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("tagpress.toml");
        let minimal_config = r#"
[site]
title = "Minimal Site"
base_url = "https://example.com"
"#;
        std::fs::write(&config_path, minimal_config).expect("write");

        let config = Config::load(&config_path).expect("load config");

        assert_eq!(config.build.content_dir, "content");
        assert_eq!(config.build.output_dir, "public");
        assert_eq!(config.build.templates_dir, "templates");
        assert_eq!(config.build.feeds_file, "_feeds.yaml");
        assert_eq!(config.build.text_pattern, r"\.md$");
        assert_eq!(config.build.path_collisions, CollisionPolicy::Error);
        assert!(config.content_types.is_empty());
    }

    #[test]
    fn test_url_for() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("tagpress.toml");
        let config_content = r#"
[site]
title = "Test"
base_url = "https://example.com"
"#;
        std::fs::write(&config_path, config_content).expect("write");

        let config = Config::load(&config_path).expect("load config");

        assert_eq!(
            config.url_for("/posts/hello.html"),
            "https://example.com/posts/hello.html"
        );
        assert_eq!(
            config.url_for("posts/hello.html"),
            "https://example.com/posts/hello.html"
        );
        assert_eq!(config.url_for("a//b.html"), "https://example.com/a/b.html");
        assert_eq!(config.url_for(""), "https://example.com/");
    }

    fn validate(toml_text: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_text).expect("parse");
        config.validate().map(|()| config)
    }

    const SITE: &str = "[site]\ntitle = \"T\"\nbase_url = \"https://example.com/\"\n";

    #[test]
    fn test_config_validation_base_url() {
        assert!(validate(SITE).is_ok());
        assert!(validate("[site]\ntitle = \"T\"\nbase_url = \"http://localhost:8080\"\n").is_ok());
        for bad in ["example.com", "ftp://example.com", "https://", "https:///x"] {
            let err = validate(&format!("[site]\ntitle = \"T\"\nbase_url = \"{bad}\"\n"))
                .unwrap_err();
            assert!(err.to_string().contains("base_url"), "{bad}: {err}");
        }
    }

    #[test]
    fn test_config_validation_build_paths() {
        let err = validate(&format!("{SITE}[build]\nfeeds_file = \"\"\n")).unwrap_err();
        assert!(err.to_string().contains("build.feeds_file cannot be empty"));

        let err = validate(&format!("{SITE}[build]\ncontent_dir = \" \"\n")).unwrap_err();
        assert!(err.to_string().contains("build.content_dir"));

        let err = validate(&format!("{SITE}[build]\noutput_dir = \"content\"\n")).unwrap_err();
        assert!(err.to_string().contains("must not be inside"));

        let err =
            validate(&format!("{SITE}[build]\noutput_dir = \"content/public\"\n")).unwrap_err();
        assert!(err.to_string().contains("must not be inside"));

        assert!(validate(&format!("{SITE}[build]\noutput_dir = \"content-out\"\n")).is_ok());
    }

    #[test]
    fn test_config_validation_empty_title() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("tagpress.toml");
        let config_content = r#"
[site]
title = ""
base_url = "https://example.com"
"#;
        std::fs::write(&config_path, config_content).expect("write");

        let result = Config::load(&config_path);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("title cannot be empty")
        );
    }

    #[test]
    fn test_config_validation_bad_pattern() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("tagpress.toml");
        let config_content = r#"
[site]
title = "T"
base_url = "https://example.com"

[build]
text_pattern = "(unclosed"
"#;
        std::fs::write(&config_path, config_content).expect("write");

        let err = Config::load(&config_path).unwrap_err();
        assert!(err.to_string().contains("text_pattern"));
    }

    #[test]
    fn test_config_not_found() {
        let result = Config::load(Path::new("/nonexistent/tagpress.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no site configuration"));
    }
}

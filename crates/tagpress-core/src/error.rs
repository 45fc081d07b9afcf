//! Error types for the tagpress core library.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types for tagpress.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration loading, parsing or validation error.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// File system error, tagged with the failed action and the path involved.
    #[error("cannot {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Front matter could not be decoded or encoded.
    #[error("Frontmatter error in {path}: {message}")]
    Frontmatter { path: PathBuf, message: String },

    /// A path expression referenced an attribute with no value.
    #[error("cannot resolve attribute {attribute:?} for document {document} in feed {feed}")]
    Resolve {
        attribute: String,
        document: String,
        feed: String,
    },

    /// A resolved path segment would escape its directory.
    #[error("unsafe path segment {value:?} for document {document} in feed {feed}")]
    UnsafeSegment {
        value: String,
        document: String,
        feed: String,
    },

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic configuration crate error.
    #[error("Config crate error: {0}")]
    ConfigCrate(#[from] config::ConfigError),
}

impl CoreError {
    /// Create a new configuration error with a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new configuration error with source.
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap an I/O error with the action that failed and the path involved.
    pub fn io(action: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a new frontmatter error.
    pub fn frontmatter(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Frontmatter {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CoreError::config("missing field");
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn test_io_error_names_action_and_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CoreError::io("open", "content/post.md", io_err);
        let msg = err.to_string();
        assert!(msg.starts_with("cannot open content/post.md"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn test_frontmatter_error() {
        let err = CoreError::frontmatter("content/post.md", "bad mapping");
        assert!(err.to_string().contains("Frontmatter error"));
        assert!(err.to_string().contains("bad mapping"));
    }

    #[test]
    fn test_resolve_error_names_attribute() {
        let err = CoreError::Resolve {
            attribute: "slug".into(),
            document: "content/a.md".into(),
            feed: "blog".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"slug\""));
        assert!(msg.contains("content/a.md"));
        assert!(msg.contains("blog"));
    }
}

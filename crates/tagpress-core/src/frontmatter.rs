//! Front matter splitting and encoding for source documents.
//!
//! A header is delimited by lines of three or more dashes. The opening
//! delimiter must be the first line of the file; the first later delimiter
//! line closes the block. Everything after the closing line is the raw body
//! and is never touched by tagpress.

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Delimiter written when a header is re-encoded.
pub const DELIMITER_LINE: &str = "---\n";

/// Structured header stored at the top of every document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// URL-friendly name, derived from the title when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    /// First time the document was processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Most recent time the body changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    /// Stable identity, assigned once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    /// Output template selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Feed membership labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// `algorithm:hex-digest` of the raw body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// Fields tagpress does not interpret; preserved across rewrites.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Split file content into the header bytes and the raw body.
///
/// Returns `None` for the header when the content does not open with a
/// delimiter or the block is never closed; the whole content is then body.
pub fn split_frontmatter(content: &[u8]) -> (Option<&[u8]>, &[u8]) {
    let Some(open) = delimiter_end(content) else {
        return (None, content);
    };
    match find_delimiter(content, open) {
        Some((start, end)) => (Some(&content[open..start]), &content[end..]),
        None => (None, content),
    }
}

/// Length of the delimiter at the start of `line`: three or more dashes,
/// optional blanks, then at least one line break. Consecutive line breaks
/// belong to the delimiter.
fn delimiter_end(line: &[u8]) -> Option<usize> {
    let dashes = line.iter().take_while(|&&b| b == b'-').count();
    if dashes < 3 {
        return None;
    }
    let blanks = line[dashes..]
        .iter()
        .take_while(|&&b| b == b' ' || b == b'\t')
        .count();
    let at = dashes + blanks;
    let breaks = line[at..]
        .iter()
        .take_while(|&&b| b == b'\r' || b == b'\n')
        .count();
    (breaks > 0).then_some(at + breaks)
}

/// First delimiter line at or after the line starting at `from`.
fn find_delimiter(content: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut start = from;
    loop {
        if let Some(len) = delimiter_end(&content[start..]) {
            return Some((start, start + len));
        }
        let newline = content[start..].iter().position(|&b| b == b'\n')?;
        start += newline + 1;
    }
}

/// Decode header bytes. An empty header decodes to the default.
pub fn parse_frontmatter(header: &[u8], path: &Path) -> Result<Frontmatter> {
    let text = std::str::from_utf8(header)
        .map_err(|e| CoreError::frontmatter(path, format!("header is not UTF-8: {e}")))?;
    if text.trim().is_empty() {
        return Ok(Frontmatter::default());
    }
    serde_yaml::from_str(text).map_err(|e| CoreError::frontmatter(path, e.to_string()))
}

/// Encode a header block including both delimiter lines.
pub fn encode_frontmatter(frontmatter: &Frontmatter, path: &Path) -> Result<String> {
    let yaml =
        serde_yaml::to_string(frontmatter).map_err(|e| CoreError::frontmatter(path, e.to_string()))?;
    Ok(format!("{DELIMITER_LINE}{yaml}{DELIMITER_LINE}"))
}

impl Frontmatter {
    /// True when any of `tags` is one of this document's tags.
    pub fn is_tagged<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter()
            .any(|t| self.tags.iter().any(|own| own == t.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_with_header() {
        let content = b"---\ntitle: Hello\n---\nBody text\n";
        let (header, body) = split_frontmatter(content);
        assert_eq!(header, Some(&b"title: Hello\n"[..]));
        assert_eq!(body, b"Body text\n");
    }

    #[test]
    fn test_split_long_delimiters_and_crlf() {
        let content = b"-----\r\ntitle: Hello\r\n------\r\nBody";
        let (header, body) = split_frontmatter(content);
        assert_eq!(header, Some(&b"title: Hello\r\n"[..]));
        assert_eq!(body, b"Body");
    }

    #[test]
    fn test_split_without_header() {
        let content = b"Just text\n\n---\n\nmore text\n";
        let (header, body) = split_frontmatter(content);
        assert!(header.is_none());
        assert_eq!(body, &content[..]);
    }

    #[test]
    fn test_split_unclosed_header() {
        let content = b"---\ntitle: Hello\nno closing line";
        let (header, body) = split_frontmatter(content);
        assert!(header.is_none());
        assert_eq!(body, &content[..]);
    }

    #[test]
    fn test_delimiter_needs_line_break() {
        let content = b"---\ntitle: A\n---";
        assert_eq!(split_frontmatter(content), (None, &content[..]));

        let content = b"--\ntitle: A\n--\nbody\n";
        assert!(split_frontmatter(content).0.is_none());
    }

    #[test]
    fn test_delimiter_swallows_blank_lines() {
        let content = b"---  \n\n\ntitle: A\n---\t\n\nbody\n";
        let (header, body) = split_frontmatter(content);
        assert_eq!(header, Some(&b"title: A\n"[..]));
        assert_eq!(body, b"body\n");
    }

    #[test]
    fn test_body_keeps_later_rules() {
        let content = b"---\ntitle: A\n---\nintro\n---\noutro\n";
        let (_, body) = split_frontmatter(content);
        assert_eq!(body, b"intro\n---\noutro\n");
    }

    #[test]
    fn test_parse_frontmatter_fields() {
        let header = br#"title: "Test Post"
created: 2024-03-02T10:00:00Z
id: 5f0c6a0e-7c1b-4a53-9d0e-8a3b2f6a1c11
tags:
  - blog
  - draft
checksum: sha1:abc
"#;
        let fm = parse_frontmatter(header, Path::new("test.md")).expect("parse");
        assert_eq!(fm.title.as_deref(), Some("Test Post"));
        assert!(fm.created.is_some());
        assert!(fm.id.is_some());
        assert_eq!(fm.tags, vec!["blog", "draft"]);
        assert_eq!(fm.checksum.as_deref(), Some("sha1:abc"));
        assert!(fm.extra.is_empty());
    }

    #[test]
    fn test_empty_header_is_default() {
        let fm = parse_frontmatter(b"\n", Path::new("test.md")).expect("parse");
        assert_eq!(fm, Frontmatter::default());
    }

    #[test]
    fn test_invalid_header_errors() {
        let err = parse_frontmatter(b"tags: [unclosed\n", Path::new("bad.md")).unwrap_err();
        assert!(err.to_string().contains("bad.md"));
    }

    #[test]
    fn test_unknown_fields_survive_encoding() {
        let header = b"title: T\nauthor: Someone\nweight: 3\n";
        let fm = parse_frontmatter(header, Path::new("t.md")).expect("parse");
        assert!(fm.extra.contains_key("author"));

        let encoded = encode_frontmatter(&fm, Path::new("t.md")).expect("encode");
        assert!(encoded.starts_with("---\n"));
        assert!(encoded.ends_with("---\n"));
        assert!(encoded.contains("author: Someone"));
        assert!(encoded.contains("weight: 3"));

        let (inner, _) = split_frontmatter(encoded.as_bytes());
        let reparsed = parse_frontmatter(inner.expect("header"), Path::new("t.md")).expect("parse");
        assert_eq!(reparsed, fm);
    }

    #[test]
    fn test_is_tagged() {
        let fm = Frontmatter {
            tags: vec!["blog".into(), "draft".into()],
            ..Default::default()
        };
        assert!(fm.is_tagged(&["blog"]));
        assert!(fm.is_tagged(&["news", "draft"]));
        assert!(!fm.is_tagged(&["news"]));
        assert!(!fm.is_tagged::<&str>(&[]));
    }
}

//! Source documents and the checksum-gated document store.

use std::{
    collections::BTreeMap,
    fs::OpenOptions,
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    checksum::{self, ChecksumGate},
    error::{CoreError, Result},
    frontmatter::{self, Frontmatter},
    slug::{slugify, title_from_filename},
};

/// Modification times before this are assumed to be reset by a checkout or
/// archive tool and are replaced with the current time.
pub fn unlikely_creation_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1993, 8, 31, 23, 59, 59)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// A loaded source document with its identity fully assigned.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Path of the source file.
    pub source: PathBuf,

    /// Stable identity.
    pub id: Uuid,

    /// Display title.
    pub title: String,

    /// URL-friendly name.
    pub slug: String,

    /// Template requested by the document, if any.
    pub template: Option<String>,

    /// Feed membership labels.
    pub tags: Vec<String>,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,

    /// `algorithm:hex-digest` of `body`.
    pub checksum: String,

    /// Header fields tagpress does not interpret.
    pub extra: BTreeMap<String, serde_yaml::Value>,

    /// Raw body bytes following the header.
    #[serde(skip)]
    pub body: Vec<u8>,
}

impl Document {
    /// Build a document from a header and body without touching the disk.
    ///
    /// Missing timestamps default to now; missing identity fields are derived
    /// the same way a first load derives them.
    pub fn new(source: impl Into<PathBuf>, header: Frontmatter, body: impl Into<Vec<u8>>) -> Self {
        let source = source.into();
        let body = body.into();
        let mut header = header;
        if header.checksum.is_none() {
            header.checksum = Some(checksum::ChecksumAlgorithm::Sha1.checksum(&body));
        }
        Self::assemble(source, header, body, Utc::now())
    }

    fn assemble(source: PathBuf, mut header: Frontmatter, body: Vec<u8>, now: DateTime<Utc>) -> Self {
        process(&mut header, &source);
        let created = header.created.unwrap_or(now);
        let modified = header.modified.unwrap_or(now).max(created);
        Self {
            id: header.id.unwrap_or_else(Uuid::new_v4),
            title: header.title.unwrap_or_default(),
            slug: header.slug.unwrap_or_default(),
            template: header.template,
            tags: header.tags,
            created,
            modified,
            checksum: header.checksum.unwrap_or_default(),
            extra: header.extra,
            body,
            source,
        }
    }

    /// The header as it would be written back to disk.
    pub fn frontmatter(&self) -> Frontmatter {
        Frontmatter {
            title: Some(self.title.clone()),
            slug: Some(self.slug.clone()),
            created: Some(self.created),
            modified: Some(self.modified),
            id: Some(self.id),
            template: self.template.clone(),
            tags: self.tags.clone(),
            checksum: Some(self.checksum.clone()),
            extra: self.extra.clone(),
        }
    }

    /// True when any of `tags` is one of this document's tags.
    pub fn is_tagged<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter()
            .any(|t| self.tags.iter().any(|own| own == t.as_ref()))
    }

    /// True when the body changed noticeably after the document was created.
    pub fn is_modified(&self) -> bool {
        self.modified - self.created > Duration::minutes(5)
    }

    /// Body as text, replacing invalid UTF-8 sequences.
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Human-readable identity used in error messages.
    pub fn identity(&self) -> String {
        format!("{} ({})", self.source.display(), self.id)
    }
}

/// Assign identity fields that are still missing.
///
/// The id is generated once, the title falls back to the file name and the
/// slug is derived from the title.
pub fn process(header: &mut Frontmatter, source: &Path) {
    if header.id.is_none() {
        header.id = Some(Uuid::new_v4());
    }
    if header.title.as_deref().is_none_or(str::is_empty) {
        header.title = Some(title_from_filename(source));
    }
    if header.slug.as_deref().is_none_or(str::is_empty) {
        header.slug = Some(slugify(header.title.as_deref().unwrap_or_default()));
    }
}

/// An empty title or slug counts as missing.
fn needs_identity(header: &Frontmatter) -> bool {
    header.id.is_none()
        || header.title.as_deref().is_none_or(str::is_empty)
        || header.slug.as_deref().is_none_or(str::is_empty)
}

/// Loads documents and keeps their headers in sync with their bodies.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    drift_tolerance: Duration,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self {
            drift_tolerance: Duration::seconds(10),
        }
    }
}

impl DocumentStore {
    /// Create a store with the default ten second drift tolerance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override how far the stored `modified` may drift from the file time.
    pub fn with_drift_tolerance(mut self, tolerance: Duration) -> Self {
        self.drift_tolerance = tolerance;
        self
    }

    /// Load one document, rewriting its header in place when it is stale.
    ///
    /// The file is opened once and released on every exit path. A file whose
    /// header is current is never written.
    pub fn load(&self, path: &Path) -> Result<Document> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| CoreError::io("open", path, e))?;

        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| CoreError::io("read", path, e))?;

        let mtime = file
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| CoreError::io("stat", path, e))?;
        let mut fs_time = DateTime::<Utc>::from(mtime);
        if fs_time < unlikely_creation_date() {
            debug!(path = %path.display(), "untrustworthy modification time, using now");
            fs_time = Utc::now();
        }

        let (header_bytes, body) = frontmatter::split_frontmatter(&content);
        let mut header = match header_bytes {
            Some(bytes) => frontmatter::parse_frontmatter(bytes, path)?,
            None => Frontmatter::default(),
        };
        let body = body.to_vec();

        let created = *header.created.get_or_insert(fs_time);

        let mut stale = Vec::new();
        if let ChecksumGate::Mismatch(fresh) = checksum::verify(header.checksum.as_deref(), &body) {
            header.checksum = Some(fresh);
            stale.push("checksum");
        }
        match header.modified {
            Some(modified) if (modified - fs_time).abs() <= self.drift_tolerance => {
                if created > modified {
                    stale.push("created");
                }
            }
            _ => stale.push("modified"),
        }
        if needs_identity(&header) {
            stale.push("identity");
        }

        if stale.is_empty() {
            debug!(path = %path.display(), "document up to date");
            return Ok(Document::assemble(path.to_path_buf(), header, body, fs_time));
        }

        header.modified = Some(fs_time);
        if created > fs_time {
            header.created = Some(fs_time);
        }
        process(&mut header, path);

        let encoded = frontmatter::encode_frontmatter(&header, path)?;
        file.set_len(0)
            .map_err(|e| CoreError::io("truncate", path, e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| CoreError::io("seek", path, e))?;
        file.write_all(encoded.as_bytes())
            .and_then(|()| file.write_all(&body))
            .map_err(|e| CoreError::io("write", path, e))?;
        file.set_modified(SystemTime::from(fs_time))
            .map_err(|e| CoreError::io("set modification time of", path, e))?;

        info!(path = %path.display(), reasons = ?stale, "rewrote document header");
        Ok(Document::assemble(path.to_path_buf(), header, body, fs_time))
    }
}

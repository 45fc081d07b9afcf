//! Reference-counted output files and the manifest of everything written.
//!
//! Several producers may target one logical path, for example a listing
//! page rendered by two aggregators or `robots.txt` shared by every feed.
//! [`OutputManager::create`] hands each producer its own [`OutputFile`]
//! handle onto a shared slot; the underlying file is only released, and its
//! modification time applied, when the last handle is closed. Once that has
//! happened the path is finished: creating it again yields a failed handle.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::SystemTime,
};

use chrono::{DateTime, Utc};
use tagpress_core::ContentTypes;
use thiserror::Error;
use tracing::{debug, warn};

/// Output errors. Cloneable so the first error can be reported by every
/// later operation on the same path.
#[derive(Debug, Clone, Error)]
pub enum OutputError {
    /// File system failure.
    #[error("cannot {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// A logical path that would leave the output root.
    #[error("invalid output path {0:?}")]
    InvalidPath(String),

    /// The path was written and closed earlier in this build.
    #[error("output {0} was already written and closed")]
    Finalized(String),
}

impl OutputError {
    fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source: Arc::new(source),
        }
    }
}

/// Result type for output operations.
pub type Result<T> = std::result::Result<T, OutputError>;

/// One entry of the output manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Path on disk, under the output root.
    pub path: PathBuf,
    /// Content type assigned to the file, if known.
    pub content_type: Option<String>,
}

#[derive(Debug)]
struct Slot {
    os_path: PathBuf,
    file: Option<File>,
    opens: usize,
    content_type: Option<String>,
    modified: Option<DateTime<Utc>>,
    error: Option<OutputError>,
}

impl Slot {
    fn fail(&mut self, error: OutputError) -> OutputError {
        self.error.get_or_insert(error).clone()
    }

    fn release(&mut self) -> Result<()> {
        self.opens = self.opens.saturating_sub(1);
        if self.opens > 0 {
            return Ok(());
        }
        let file = self.file.take();
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let Some(file) = file else {
            return Ok(());
        };
        if let Some(modified) = self.modified {
            if let Err(e) = file.set_modified(SystemTime::from(modified)) {
                return Err(self.fail(OutputError::io(
                    "set modification time of",
                    &self.os_path,
                    e,
                )));
            }
        }
        drop(file);
        debug!(path = %self.os_path.display(), "finalized output file");
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns every output file created during a build.
#[derive(Debug)]
pub struct OutputManager {
    root: PathBuf,
    content_types: ContentTypes,
    files: Mutex<BTreeMap<String, Arc<Mutex<Slot>>>>,
}

impl OutputManager {
    /// Create a manager writing under `root`.
    pub fn new(root: impl Into<PathBuf>, content_types: ContentTypes) -> Self {
        Self {
            root: root.into(),
            content_types,
            files: Mutex::new(BTreeMap::new()),
        }
    }

    /// Output root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join path segments into a logical output path. Empty segments are
    /// skipped so a feed-root prefix can be passed unchanged.
    pub fn logical_path<I, S>(segments: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parts = Vec::new();
        for segment in segments {
            for part in segment.as_ref().split('/') {
                match part {
                    "" => {}
                    "." | ".." => return Err(OutputError::InvalidPath(segment.as_ref().to_string())),
                    p if p.contains('\\') => return Err(OutputError::InvalidPath(p.to_string())),
                    p => parts.push(p.to_string()),
                }
            }
        }
        if parts.is_empty() {
            return Err(OutputError::InvalidPath(String::new()));
        }
        Ok(parts.join("/"))
    }

    /// Create the directory for `segments` under the root.
    pub fn create_dir<I, S>(&self, segments: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dir = self.root.clone();
        for segment in segments {
            let segment = segment.as_ref();
            if !segment.is_empty() {
                dir.push(segment);
            }
        }
        fs::create_dir_all(&dir).map_err(|e| OutputError::io("create directory", &dir, e))?;
        Ok(dir)
    }

    /// Open a handle on a logical output path.
    ///
    /// If the path already has open handles the new handle shares the same
    /// file. A path whose handles have all been closed cannot be created
    /// again. Failures are stored on the handle and returned by its first
    /// operation.
    pub fn create<I, S>(&self, segments: I) -> OutputFile
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let logical = match Self::logical_path(segments) {
            Ok(p) => p,
            Err(e) => return self.failed(self.root.clone(), e),
        };

        let mut files = lock(&self.files);
        if let Some(shared) = files.get(&logical) {
            let mut slot = lock(shared);
            if slot.opens == 0 {
                warn!(path = %logical, "output file created again after it was finalized");
                let os_path = slot.os_path.clone();
                drop(slot);
                return self.failed(os_path, OutputError::Finalized(logical));
            }
            slot.opens += 1;
            drop(slot);
            return OutputFile::new(Arc::clone(shared));
        }

        let os_path = self.root.join(&logical);
        let content_type = self.content_types.for_path(&os_path).map(str::to_string);
        let opened = match os_path.parent() {
            Some(parent) => fs::create_dir_all(parent)
                .map_err(|e| OutputError::io("create directory", parent, e)),
            None => Ok(()),
        }
        .and_then(|()| File::create(&os_path).map_err(|e| OutputError::io("create", &os_path, e)));

        let (file, error) = match opened {
            Ok(file) => (Some(file), None),
            Err(e) => (None, Some(e)),
        };
        debug!(path = %logical, content_type = ?content_type, "created output file");

        let shared = Arc::new(Mutex::new(Slot {
            os_path,
            file,
            opens: 1,
            content_type,
            modified: None,
            error,
        }));
        files.insert(logical, Arc::clone(&shared));
        OutputFile::new(shared)
    }

    /// A detached handle that reports `error` from every operation and
    /// leaves the shared slot of the path alone.
    fn failed(&self, os_path: PathBuf, error: OutputError) -> OutputFile {
        let slot = Slot {
            os_path,
            file: None,
            opens: 1,
            content_type: None,
            modified: None,
            error: Some(error),
        };
        OutputFile::new(Arc::new(Mutex::new(slot)))
    }

    /// Every distinct path ever created, sorted.
    pub fn manifest(&self) -> Vec<ManifestEntry> {
        lock(&self.files)
            .values()
            .map(|shared| {
                let slot = lock(shared);
                ManifestEntry {
                    path: slot.os_path.clone(),
                    content_type: slot.content_type.clone(),
                }
            })
            .collect()
    }

    /// True while a logical path has at least one unclosed handle.
    pub fn is_open(&self, logical: &str) -> bool {
        lock(&self.files)
            .get(logical)
            .is_some_and(|shared| lock(shared).opens > 0)
    }
}

/// A producer's handle on one logical output path.
#[derive(Debug)]
pub struct OutputFile {
    slot: Arc<Mutex<Slot>>,
    closed: bool,
}

impl OutputFile {
    fn new(slot: Arc<Mutex<Slot>>) -> Self {
        Self {
            slot,
            closed: false,
        }
    }

    /// Set the content type recorded for this path.
    #[must_use]
    pub fn as_content_type(self, content_type: impl Into<String>) -> Self {
        {
            let mut slot = lock(&self.slot);
            if slot.error.is_none() {
                slot.content_type = Some(content_type.into());
            }
        }
        self
    }

    /// Set the modification time applied when the file is finalized. With
    /// several handles the latest time wins.
    #[must_use]
    pub fn at(self, modified: DateTime<Utc>) -> Self {
        {
            let mut slot = lock(&self.slot);
            if slot.error.is_none() {
                slot.modified = Some(slot.modified.map_or(modified, |m| m.max(modified)));
            }
        }
        self
    }

    /// The first error this path encountered, if any.
    pub fn error(&self) -> Option<OutputError> {
        lock(&self.slot).error.clone()
    }

    /// Path on disk.
    pub fn os_path(&self) -> PathBuf {
        lock(&self.slot).os_path.clone()
    }

    /// Release this handle. The file is finalized when no handles remain.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        lock(&self.slot).release()
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut slot = lock(&self.slot);
        if let Some(err) = &slot.error {
            return Err(io::Error::other(err.clone()));
        }
        let os_path = slot.os_path.clone();
        let result = match slot.file.as_mut() {
            Some(file) => file.write(buf),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "file is not open")),
        };
        result.map_err(|e| io::Error::other(slot.fail(OutputError::io("write", &os_path, e))))
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut slot = lock(&self.slot);
        if let Some(err) = &slot.error {
            return Err(io::Error::other(err.clone()));
        }
        let os_path = slot.os_path.clone();
        let result = match slot.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        };
        result.map_err(|e| io::Error::other(slot.fail(OutputError::io("flush", &os_path, e))))
    }
}

impl Drop for OutputFile {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let mut slot = lock(&self.slot);
        if let Err(e) = slot.release() {
            warn!(error = %e, "output handle dropped without close");
        }
    }
}

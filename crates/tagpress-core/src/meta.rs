//! Build metadata rendered into generated output.

use serde::Serialize;

/// Length of an abbreviated commit id.
const SHORT_SHA1: usize = 7;

/// Describes the build of the program generating a site.
///
/// Computed once at startup and handed to everything that renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildMeta {
    /// Package name, e.g. `tagpress`.
    pub package: String,

    /// Package version, empty when unknown.
    pub version: String,

    /// Abbreviated commit id, or the whole revision if it is not a git sha-1.
    pub commit: Option<String>,
}

impl BuildMeta {
    pub fn new(
        package: impl Into<String>,
        version: impl Into<String>,
        revision: Option<&str>,
    ) -> Self {
        let commit = revision
            .map(str::trim)
            .filter(|r| !r.is_empty() && *r != "unknown")
            .map(|r| {
                if is_full_sha1(r) {
                    r[..SHORT_SHA1].to_string()
                } else {
                    r.to_string()
                }
            });
        Self {
            package: package.into(),
            version: version.into(),
            commit,
        }
    }

    /// A one-line description suitable for `<generator>` elements.
    pub fn generator(&self) -> String {
        match (&self.version, &self.commit) {
            (v, Some(c)) if !v.is_empty() => format!("{}/{v} ({c})", self.package),
            (v, None) if !v.is_empty() => format!("{}/{v}", self.package),
            (_, Some(c)) => format!("{}@{c}", self.package),
            (_, None) => format!("{} (no build info)", self.package),
        }
    }
}

fn is_full_sha1(revision: &str) -> bool {
    revision.len() == 40 && revision.bytes().all(|b| b.is_ascii_hexdigit())
}

impl Default for BuildMeta {
    fn default() -> Self {
        Self::new("tagpress", "", None)
    }
}

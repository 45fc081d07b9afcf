//! Content types guessed from file extensions.

use std::{collections::HashMap, path::Path};

/// Built-in extension table, consulted after any configured overrides.
fn builtin(ext: &str) -> Option<&'static str> {
    Some(match ext {
        // web
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "jsonld" => "application/ld+json",
        "xml" => "application/xml",

        // documents
        "txt" => "text/plain",
        "csv" => "text/csv",
        "tab" | "tsv" => "text/tab-separated-values",
        "rtf" => "application/rtf",
        "epub" => "application/epub+zip",
        "pdf" => "application/pdf",

        // ODF
        "odp" | "fodp" => "application/vnd.oasis.opendocument.presentation",
        "ods" | "fods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odt" | "fodt" => "application/vnd.oasis.opendocument.text",
        "odg" | "fodg" => "application/vnd.oasis.opendocument.graphics",

        // Microsoft
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "vsd" => "application/vnd.visio",
        "vsdx" => "application/vnd.visio2013",

        // fonts
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "woff" => "font/woff",
        "woff2" => "font/woff2",

        // images
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/vnd.microsoft.icon",

        // audio
        "aac" => "audio/aac",
        "m4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "oga" | "ogg" => "audio/ogg",
        "opus" => "audio/opus",
        "wav" => "audio/wav",
        "weba" => "audio/webm",

        // video
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "ogv" => "video/ogg",
        "webm" => "video/webm",
        "ogx" => "application/ogg",

        // archives
        "gz" => "application/gzip",
        "zip" => "application/zip",
        "bz2" => "application/x-bzip2",
        "7z" => "application/x-7z-compressed",
        "xz" => "application/x-xz",
        "tar" => "application/x-tar",
        "jar" => "application/java-archive",

        _ => return None,
    })
}

/// Extension to content-type lookup with per-site overrides.
#[derive(Debug, Clone, Default)]
pub struct ContentTypes {
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    /// Build a table from `[content_types]` overrides.
    pub fn new(overrides: &HashMap<String, String>) -> Self {
        Self {
            overrides: overrides
                .iter()
                .map(|(ext, ty)| (normalize(ext), ty.clone()))
                .collect(),
        }
    }

    /// Content type for an extension. Leading dots and case are ignored.
    pub fn for_extension(&self, ext: &str) -> Option<&str> {
        let ext = normalize(ext);
        self.overrides
            .get(&ext)
            .map(String::as_str)
            .or_else(|| builtin(&ext))
    }

    /// Content type for the extension of `path`.
    pub fn for_path(&self, path: &Path) -> Option<&str> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.for_extension(e))
    }
}

fn normalize(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

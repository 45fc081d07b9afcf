//! Slug and title derivation.

use std::path::Path;

/// Lower-case `input` and collapse every run of characters other than ASCII
/// letters and digits into a single dash. Leading and trailing dashes are
/// dropped.
///
/// `"Hello, World!"` becomes `"hello-world"`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Derive a display title from a file name.
///
/// The directory part and the outermost extension are removed, dashes,
/// underscores and dots become spaces, and each word is title-cased:
/// `content/2024/my_first-post.md` becomes `"My First Post"`.
pub fn title_from_filename(path: &Path) -> String {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = match base.rfind('.') {
        Some(idx) if idx >= 1 => &base[..idx],
        _ => base.as_str(),
    };

    stem.split(|c: char| matches!(c, '-' | '_' | '.') || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_runs() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Hello,   World!!"), "hello-world");
        assert_eq!(slugify("Rust 2024: what's new?"), "rust-2024-what-s-new");
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
    }

    #[test]
    fn test_slugify_trims_edges() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  --Intro--  "), "intro");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_title_from_filename() {
        assert_eq!(
            title_from_filename(Path::new("content/2024/my_first-post.md")),
            "My First Post"
        );
        assert_eq!(title_from_filename(Path::new("notes.v2.md")), "Notes V2");
        assert_eq!(title_from_filename(Path::new("README")), "Readme");
    }

    #[test]
    fn test_title_from_dotfile_keeps_name() {
        assert_eq!(title_from_filename(Path::new(".hidden")), "Hidden");
    }
}

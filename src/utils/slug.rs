//! URL slugification for output paths.
//!
//! Converts path components to lowercase ASCII slugs so generated URLs
//! stay portable across filesystems and servers.

use deunicode::deunicode;
use std::path::{Path, PathBuf};

/// Convert a text fragment to a URL-safe slug.
///
/// Transliterates unicode to ASCII, lowercases, and collapses any run of
/// non-alphanumeric characters into a single `-`.
pub fn slugify(text: &str) -> String {
    let ascii = deunicode(text);
    let mut out = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    out
}

/// Slugify each component of a relative path, preserving structure.
pub fn slugify_path(path: &Path) -> PathBuf {
    path.components()
        .map(|c| slugify(&c.as_os_str().to_string_lossy()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
    }

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("My Article (2024) - Part #1"), "my-article-2024-part-1");
    }

    #[test]
    fn test_slugify_transliterates_unicode() {
        assert_eq!(slugify("Déjà Vu"), "deja-vu");
    }

    #[test]
    fn test_slugify_no_leading_or_trailing_dash() {
        assert_eq!(slugify("  hi  "), "hi");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_path_preserves_structure() {
        let path = Path::new("My Posts/Hello World");
        assert_eq!(slugify_path(path), PathBuf::from("my-posts/hello-world"));
    }

    #[test]
    fn test_slugify_idempotent() {
        let once = slugify("Some Title Here!");
        assert_eq!(slugify(&once), once);
    }
}

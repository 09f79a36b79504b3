//! Filename derivation for staged and archived documents.

/// Extension given to every document.
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Replaces every non-ASCII-alphanumeric character with `_`.
///
/// Empty input becomes `document` so a name is always produced.
#[must_use]
pub fn sanitize_slug(slug: &str) -> String {
    let sanitized: String = slug
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        "document".to_string()
    } else {
        sanitized
    }
}

/// Display name of the document produced by `slug` (`<sanitized>.pdf`).
#[must_use]
pub fn display_name_for_slug(slug: &str) -> String {
    format!("{}.{DOCUMENT_EXTENSION}", sanitize_slug(slug))
}

/// Unique staging file name for job `index`.
///
/// The index prefix keeps two tokens that converge on the same slug from
/// writing the same file.
#[must_use]
pub fn staged_file_name(index: usize, display_name: &str) -> String {
    format!("{index:03}_{display_name}")
}

/// Appends `_2`, `_3`, ... before the extension until `is_taken` is false.
#[must_use]
pub fn unique_name(name: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(name) {
        return name.to_string();
    }

    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    (2..)
        .map(|n| match extension {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        })
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| name.to_string())
}

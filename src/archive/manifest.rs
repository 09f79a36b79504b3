//! Manifest rows and CSV rendering.

use std::fmt;

/// Manifest file name inside the archive.
pub const MANIFEST_FILE_NAME: &str = "manifest.csv";

/// First line of every manifest.
pub const MANIFEST_HEADER: &str = "input_token,status,code,filename_or_reason";

/// Code carried by `OK` rows.
pub const DOWNLOADED_CODE: &str = "DOWNLOADED";

/// Code carried by the truncation notice.
pub const TRUNCATED_CODE: &str = "TRUNCATED";

/// Row status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestStatus {
    /// Document included in the archive.
    Ok,
    /// Token produced no document.
    Fail,
    /// Informational row not tied to a token.
    Info,
}

impl ManifestStatus {
    /// Column value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Fail => "FAIL",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for ManifestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One manifest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Input token; empty for informational rows.
    pub token: String,
    /// Row status.
    pub status: ManifestStatus,
    /// Outcome code.
    pub code: String,
    /// Archive entry name for `OK` rows, explanation otherwise.
    pub detail: String,
}

impl ManifestEntry {
    /// Row for a document stored under `entry_name`.
    #[must_use]
    pub fn ok(token: impl Into<String>, entry_name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            status: ManifestStatus::Ok,
            code: DOWNLOADED_CODE.to_string(),
            detail: entry_name.into(),
        }
    }

    /// Row for a failed token.
    #[must_use]
    pub fn fail(token: impl Into<String>, code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            status: ManifestStatus::Fail,
            code: code.into(),
            detail: reason.into(),
        }
    }

    /// Notice that only `processed` of `total` tokens were handled.
    #[must_use]
    pub fn truncated(processed: usize, total: usize) -> Self {
        Self {
            token: String::new(),
            status: ManifestStatus::Info,
            code: TRUNCATED_CODE.to_string(),
            detail: format!("processed {processed} of {total} tokens"),
        }
    }

    /// Renders the row without a line terminator.
    #[must_use]
    pub fn to_csv_line(&self) -> String {
        [
            escape_field(&self.token),
            escape_field(self.status.as_str()),
            escape_field(&self.code),
            escape_field(&self.detail),
        ]
        .join(",")
    }
}

/// Quote-wraps a field containing a comma, quote, or line break.
#[must_use]
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Renders the header and rows, one per line, with a trailing newline.
#[must_use]
pub fn render_manifest(entries: &[ManifestEntry]) -> String {
    let mut out = String::with_capacity(64 * (entries.len() + 1));
    out.push_str(MANIFEST_HEADER);
    out.push('\n');
    for entry in entries {
        out.push_str(&entry.to_csv_line());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_field_plain() {
        assert_eq!(escape_field("US11162431B2.pdf"), "US11162431B2.pdf");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn test_escape_field_quotes_special_characters() {
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn test_rows_render() {
        assert_eq!(
            ManifestEntry::ok("11162431B2", "US11162431B2.pdf").to_csv_line(),
            "11162431B2,OK,DOWNLOADED,US11162431B2.pdf"
        );
        assert_eq!(
            ManifestEntry::fail("99999999", "RESOLVE_FAIL", "no link found").to_csv_line(),
            "99999999,FAIL,RESOLVE_FAIL,no link found"
        );
        assert_eq!(
            ManifestEntry::truncated(50, 72).to_csv_line(),
            ",INFO,TRUNCATED,processed 50 of 72 tokens"
        );
    }

    #[test]
    fn test_render_manifest_header_first() {
        let rendered = render_manifest(&[ManifestEntry::ok("12345", "US12345.pdf")]);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, [MANIFEST_HEADER, "12345,OK,DOWNLOADED,US12345.pdf"]);
    }
}

//! Archive assembly: staged documents plus a manifest, zipped.
//!
//! The assembler runs once, after every job has finished, so entry order and
//! manifest order follow token order. Writing is synchronous; async callers
//! run it on the blocking pool.

mod manifest;

pub use manifest::{
    DOWNLOADED_CODE, MANIFEST_FILE_NAME, MANIFEST_HEADER, ManifestEntry, ManifestStatus,
    TRUNCATED_CODE, escape_field, render_manifest,
};

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument, warn};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::download::filename::unique_name;
use crate::download::{CoordinatorReport, OutcomeStatus};

/// Deflate level used for every entry.
pub const DEFAULT_COMPRESSION_LEVEL: i64 = 9;

/// Errors from building an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Asked to build an archive with nothing to put in it.
    #[error("no staged documents to archive")]
    NoDocuments,

    /// A staged document or the output file could not be read or written.
    #[error("IO error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The zip writer failed.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl ArchiveError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// What ended up in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Document entry names, in token order.
    pub document_entries: Vec<String>,
    /// Manifest rows written, in order.
    pub manifest: Vec<ManifestEntry>,
}

/// Builds the output zip from a coordinator report.
#[derive(Debug, Clone)]
pub struct ArchiveAssembler {
    compression_level: i64,
}

impl Default for ArchiveAssembler {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl ArchiveAssembler {
    /// Creates an assembler with deflate level 9.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the deflate level (0-9).
    #[must_use]
    pub fn with_compression_level(mut self, level: i64) -> Self {
        self.compression_level = level.clamp(0, 9);
        self
    }

    /// Writes the archive to `output_path`, removing it again on failure.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NoDocuments`] if the report has no successes,
    /// otherwise IO or zip errors.
    #[instrument(skip(self, report), fields(output = %output_path.display()))]
    pub fn write_to_path(
        &self,
        report: &CoordinatorReport,
        output_path: &Path,
    ) -> Result<ArchiveSummary, ArchiveError> {
        if report.success_count() == 0 {
            return Err(ArchiveError::NoDocuments);
        }

        let file = File::create(output_path).map_err(|e| ArchiveError::io(output_path, e))?;
        let result = self
            .write_to(report, BufWriter::new(file))
            .and_then(|(writer, summary)| {
                writer
                    .into_inner()
                    .map_err(|e| ArchiveError::io(output_path, e.into_error()))?
                    .sync_all()
                    .map_err(|e| ArchiveError::io(output_path, e))?;
                Ok(summary)
            });

        if result.is_err() {
            if let Err(error) = std::fs::remove_file(output_path) {
                warn!(error = %error, "failed to remove incomplete archive");
            }
        }
        result
    }

    /// Writes the archive into `writer` and hands the writer back.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NoDocuments`] if the report has no successes,
    /// otherwise IO or zip errors.
    pub fn write_to<W: Write + Seek>(
        &self,
        report: &CoordinatorReport,
        writer: W,
    ) -> Result<(W, ArchiveSummary), ArchiveError> {
        if report.success_count() == 0 {
            return Err(ArchiveError::NoDocuments);
        }

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level));

        let mut zip = zip::ZipWriter::new(writer);
        let mut used_names: HashSet<String> = HashSet::new();
        used_names.insert(MANIFEST_FILE_NAME.to_string());
        let mut document_entries = Vec::new();
        let mut manifest = Vec::with_capacity(report.outcomes.len() + 1);

        for outcome in &report.outcomes {
            match &outcome.status {
                OutcomeStatus::Success(document) => {
                    let entry_name =
                        unique_name(&document.display_name, |n| used_names.contains(n));
                    used_names.insert(entry_name.clone());

                    zip.start_file(entry_name.as_str(), options)?;
                    let mut staged = File::open(&document.path)
                        .map_err(|e| ArchiveError::io(&document.path, e))?;
                    std::io::copy(&mut staged, &mut zip)
                        .map_err(|e| ArchiveError::io(&document.path, e))?;
                    debug!(token = %outcome.token, entry = %entry_name, "added document");

                    manifest.push(ManifestEntry::ok(&outcome.token, &entry_name));
                    document_entries.push(entry_name);
                }
                OutcomeStatus::Failure { code, reason } => {
                    manifest.push(ManifestEntry::fail(&outcome.token, code.as_str(), reason));
                }
            }
        }

        if report.truncated() {
            manifest.push(ManifestEntry::truncated(
                report.processed(),
                report.total_tokens,
            ));
        }

        zip.start_file(MANIFEST_FILE_NAME, options)?;
        zip.write_all(render_manifest(&manifest).as_bytes())
            .map_err(|e| ArchiveError::io(MANIFEST_FILE_NAME, e))?;

        let writer = zip.finish()?;
        Ok((
            writer,
            ArchiveSummary {
                document_entries,
                manifest,
            },
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::{Cursor, Read};

    use super::*;
    use crate::download::{DownloadOutcome, FailureCode, StagedDocument};

    fn stage(dir: &Path, index: usize, slug: &str, body: &[u8]) -> StagedDocument {
        let path = dir.join(format!("{index:03}_{slug}.pdf"));
        std::fs::write(&path, body).unwrap();
        StagedDocument {
            path,
            display_name: format!("{slug}.pdf"),
            slug: slug.to_string(),
            source_url: format!("https://host/{slug}.pdf"),
            bytes: body.len() as u64,
        }
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_partial_success_archive() {
        let dir = tempfile::tempdir().unwrap();
        let report = CoordinatorReport {
            outcomes: vec![
                DownloadOutcome::success("11162431B2", stage(dir.path(), 0, "US11162431B2", b"%PDF-a")),
                DownloadOutcome::failure("99999999", FailureCode::ResolveFail, "no link found"),
                DownloadOutcome::success("10859001", stage(dir.path(), 2, "US10859001", b"%PDF-b")),
            ],
            total_tokens: 3,
        };

        let (cursor, summary) = ArchiveAssembler::new()
            .write_to(&report, Cursor::new(Vec::new()))
            .unwrap();
        let bytes = cursor.into_inner();

        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(archive.len(), 3);
        assert_eq!(summary.document_entries, ["US11162431B2.pdf", "US10859001.pdf"]);
        assert_eq!(read_entry(&bytes, "US10859001.pdf"), "%PDF-b");

        let manifest = read_entry(&bytes, MANIFEST_FILE_NAME);
        let lines: Vec<&str> = manifest.lines().collect();
        assert_eq!(
            lines,
            [
                MANIFEST_HEADER,
                "11162431B2,OK,DOWNLOADED,US11162431B2.pdf",
                "99999999,FAIL,RESOLVE_FAIL,no link found",
                "10859001,OK,DOWNLOADED,US10859001.pdf",
            ]
        );
    }

    #[test]
    fn test_duplicate_display_names_are_suffixed() {
        let dir = tempfile::tempdir().unwrap();
        let report = CoordinatorReport {
            outcomes: vec![
                DownloadOutcome::success("11162431", stage(dir.path(), 0, "US11162431B2", b"1")),
                DownloadOutcome::success("11162431B2", stage(dir.path(), 1, "US11162431B2", b"2")),
            ],
            total_tokens: 2,
        };

        let (cursor, summary) = ArchiveAssembler::new()
            .write_to(&report, Cursor::new(Vec::new()))
            .unwrap();

        assert_eq!(summary.document_entries, ["US11162431B2.pdf", "US11162431B2_2.pdf"]);
        assert_eq!(read_entry(&cursor.into_inner(), "US11162431B2_2.pdf"), "2");
    }

    #[test]
    fn test_truncation_row_appended() {
        let dir = tempfile::tempdir().unwrap();
        let report = CoordinatorReport {
            outcomes: vec![DownloadOutcome::success(
                "12345678",
                stage(dir.path(), 0, "US12345678", b"x"),
            )],
            total_tokens: 4,
        };

        let (_, summary) = ArchiveAssembler::new()
            .write_to(&report, Cursor::new(Vec::new()))
            .unwrap();

        let last = summary.manifest.last().unwrap();
        assert_eq!(last.to_csv_line(), ",INFO,TRUNCATED,processed 1 of 4 tokens");
    }

    #[test]
    fn test_no_documents_is_rejected() {
        let report = CoordinatorReport {
            outcomes: vec![DownloadOutcome::failure(
                "12345",
                FailureCode::DownloadFail,
                "download failed (HTTP 404)",
            )],
            total_tokens: 1,
        };
        assert!(matches!(
            ArchiveAssembler::new().write_to(&report, Cursor::new(Vec::new())),
            Err(ArchiveError::NoDocuments)
        ));
    }

    #[test]
    fn test_write_to_path_removes_file_when_staged_document_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut document = stage(dir.path(), 0, "US12345678", b"x");
        document.path = dir.path().join("missing.pdf");
        let report = CoordinatorReport {
            outcomes: vec![DownloadOutcome::success("12345678", document)],
            total_tokens: 1,
        };
        let output = dir.path().join("bundle.zip");

        let result = ArchiveAssembler::new().write_to_path(&report, &output);

        assert!(matches!(result, Err(ArchiveError::Io { .. })));
        assert!(!output.exists());
    }
}

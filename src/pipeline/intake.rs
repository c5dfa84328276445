//! Document intake: filter candidate files, apply the capacity policy, and
//! read the survivors into [`Document`]s.
//!
//! ## Ordering
//!
//! Reads run concurrently, but `buffered` (not `buffer_unordered`) yields
//! them in input order, so the staged collection always matches the order
//! the files were offered in regardless of which read finishes first.

use crate::document::{is_supported_type, Document, DocumentId};
use crate::pipeline::encode::to_data_uri;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use mime_guess::MimeGuess;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file offered for staging, before its content is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub name: String,
    pub mime_type: String,
}

impl CandidateFile {
    /// Describe a file on disk, guessing its MIME type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let mime_type = MimeGuess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            path,
            name,
            mime_type,
        }
    }
}

/// Outcome of one intake call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeReport {
    /// Files offered by the caller.
    pub offered: usize,
    /// Files read and staged.
    pub accepted: usize,
    /// Files dropped because their type is neither `image/*` nor PDF.
    pub unsupported: usize,
    /// Supported files dropped because no slot was left.
    pub over_capacity: usize,
    /// Supported files whose content could not be read.
    pub unreadable: usize,
}

impl IntakeReport {
    pub fn capacity_exceeded(&self) -> bool {
        self.over_capacity > 0
    }
}

impl fmt::Display for IntakeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} offered, {} staged, {} unsupported, {} over capacity, {} unreadable",
            self.offered, self.accepted, self.unsupported, self.over_capacity, self.unreadable
        )
    }
}

/// Keep supported candidates in input order.
///
/// Unsupported files never consume a slot.
pub fn select(candidates: Vec<CandidateFile>) -> (Vec<CandidateFile>, IntakeReport) {
    let mut report = IntakeReport {
        offered: candidates.len(),
        ..Default::default()
    };

    let supported: Vec<CandidateFile> = candidates
        .into_iter()
        .filter(|c| {
            let ok = is_supported_type(&c.mime_type);
            if !ok {
                debug!("Dropping '{}': unsupported type {}", c.name, c.mime_type);
            }
            ok
        })
        .collect();
    report.unsupported = report.offered - supported.len();
    (supported, report)
}

/// Read one file and wrap it as a freshly identified [`Document`].
pub async fn read_document(candidate: &CandidateFile) -> std::io::Result<Document> {
    let bytes = tokio::fs::read(&candidate.path).await?;
    Ok(Document {
        id: DocumentId::new(),
        name: candidate.name.clone(),
        mime_type: candidate.mime_type.clone(),
        size: bytes.len() as u64,
        data: to_data_uri(&candidate.mime_type, &bytes),
        uploaded_at: Utc::now(),
    })
}

/// Filter, cap and read `candidates`.
///
/// Returns the new documents in input order together with the report.
/// Never fails: unreadable files are logged and counted, and the slot they
/// would have taken goes to the next supported candidate.
pub async fn intake(
    candidates: Vec<CandidateFile>,
    remaining: usize,
    concurrency: usize,
) -> (Vec<Document>, IntakeReport) {
    let (supported, mut report) = select(candidates);
    let mut pending = supported.into_iter();
    let mut documents = Vec::with_capacity(remaining.min(pending.len()));

    // Each wave reads only as many files as there are free slots.
    while documents.len() < remaining {
        let wave: Vec<CandidateFile> = pending.by_ref().take(remaining - documents.len()).collect();
        if wave.is_empty() {
            break;
        }

        let results: Vec<(CandidateFile, std::io::Result<Document>)> = stream::iter(wave)
            .map(|candidate| async move {
                let result = read_document(&candidate).await;
                (candidate, result)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        for (candidate, result) in results {
            match result {
                Ok(doc) => {
                    debug!("Staged '{}' ({} bytes, {})", doc.name, doc.size, doc.id);
                    documents.push(doc);
                }
                Err(e) => {
                    warn!("Skipping '{}': {}", candidate.path.display(), e);
                    report.unreadable += 1;
                }
            }
        }
    }

    report.accepted = documents.len();
    report.over_capacity = pending.len();

    (documents, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str) -> CandidateFile {
        CandidateFile::from_path(format!("/nonexistent/{name}"))
    }

    #[test]
    fn mime_guessed_from_extension() {
        assert_eq!(candidate("a.png").mime_type, "image/png");
        assert_eq!(candidate("a.JPG").mime_type, "image/jpeg");
        assert_eq!(candidate("a.pdf").mime_type, "application/pdf");
        assert_eq!(candidate("a.txt").mime_type, "text/plain");
        assert_eq!(candidate("noext").mime_type, "application/octet-stream");
        assert_eq!(candidate("a.png").name, "a.png");
    }

    #[test]
    fn select_drops_unsupported() {
        let files = vec![candidate("a.txt"), candidate("b.png"), candidate("c.zip"), candidate("d.pdf")];
        let (selected, report) = select(files);
        let names: Vec<_> = selected.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["b.png", "d.pdf"]);
        assert_eq!(report.offered, 4);
        assert_eq!(report.unsupported, 2);
    }

    #[tokio::test]
    async fn intake_fills_remaining_slots_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<_> = (0..32)
            .map(|i| {
                let p = dir.path().join(format!("{i:02}.png"));
                std::fs::write(&p, b"x").unwrap();
                CandidateFile::from_path(p)
            })
            .collect();

        let (docs, report) = intake(files, 30, 8).await;
        assert_eq!(docs.len(), 30);
        assert_eq!(docs[0].name, "00.png");
        assert_eq!(docs[29].name, "29.png");
        assert_eq!(report.over_capacity, 2);
        assert!(report.capacity_exceeded());
    }

    #[tokio::test]
    async fn intake_with_no_slots_reads_nothing() {
        let (docs, report) = intake(vec![candidate("a.png")], 0, 4).await;
        assert!(docs.is_empty());
        assert_eq!(report.over_capacity, 1);
        assert_eq!(report.unreadable, 0);
    }

    #[tokio::test]
    async fn unreadable_file_frees_its_slot() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("ok.png");
        std::fs::write(&ok, b"png").unwrap();
        let files = vec![
            CandidateFile::from_path(dir.path().join("missing.png")),
            CandidateFile::from_path(&ok),
        ];

        let (docs, report) = intake(files, 1, 4).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "ok.png");
        assert_eq!(report.accepted, 1);
        assert_eq!(report.unreadable, 1);
        assert_eq!(report.over_capacity, 0);
        assert!(!report.capacity_exceeded());
    }

    #[tokio::test]
    async fn intake_reads_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = Vec::new();
        for i in 0..5 {
            let p = dir.path().join(format!("page{i}.png"));
            std::fs::write(&p, vec![i as u8; 100 * (5 - i)]).unwrap();
            files.push(CandidateFile::from_path(&p));
        }

        let (docs, report) = intake(files, 30, 4).await;
        assert_eq!(report.accepted, 5);
        let names: Vec<_> = docs.iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, ["page0.png", "page1.png", "page2.png", "page3.png", "page4.png"]);
        assert_eq!(docs[0].size, 500);
        assert!(docs[0].data.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn intake_counts_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("ok.pdf");
        std::fs::write(&good, b"%PDF-1.7").unwrap();
        let files = vec![
            CandidateFile::from_path(dir.path().join("missing.png")),
            CandidateFile::from_path(&good),
        ];

        let (docs, report) = intake(files, 30, 2).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(report.unreadable, 1);
        assert_eq!(report.accepted, 1);
        assert_eq!(docs[0].mime_type, "application/pdf");
    }
}

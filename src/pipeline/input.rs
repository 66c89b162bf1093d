//! Input handling: validate a PDF on disk and stage uploaded bytes.
//!
//! ## Why stage to a temp file?
//!
//! pdfium and tesseract both want a file-system path. Writing the upload to
//! a `NamedTempFile` gives them one while guaranteeing removal when the
//! [`StagedUpload`] is dropped, whether processing succeeded, failed, or the
//! handler future was cancelled mid-way. We validate the PDF magic bytes
//! (`%PDF`) up front so callers get a meaningful error rather than a pdfium
//! crash.

use crate::error::PipelineError;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// An uploaded PDF written to disk for the duration of one request.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    original_name: String,
}

impl StagedUpload {
    /// Path pdfium should open.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// File name as supplied by the client.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }
}

/// Check that `path` exists, is readable and starts with `%PDF`.
pub fn validate_pdf(path: &Path) -> Result<(), PipelineError> {
    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(PipelineError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(PipelineError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut magic = [0u8; 4];
    let read = read_up_to(&mut file, &mut magic).map_err(|e| PipelineError::CorruptPdf {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    if &magic[..read] != b"%PDF" {
        return Err(PipelineError::NotAPdf {
            path: path.to_path_buf(),
            magic: magic[..read].to_vec(),
        });
    }

    debug!("Validated PDF: {}", path.display());
    Ok(())
}

fn read_up_to(file: &mut std::fs::File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Write `bytes` to a uniquely named temp file inside `dir`.
///
/// The directory is created if missing. The client-supplied name only
/// contributes a sanitised suffix, so it can never escape `dir`.
pub fn stage_upload(bytes: &[u8], file_name: &str, dir: &Path) -> Result<StagedUpload, PipelineError> {
    let staging_err = |source: std::io::Error| PipelineError::StagingFailed {
        dir: dir.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(staging_err)?;

    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&format!("-{}", sanitize_file_name(file_name)))
        .tempfile_in(dir)
        .map_err(staging_err)?;
    file.write_all(bytes).map_err(staging_err)?;
    file.flush().map_err(staging_err)?;

    debug!(
        "Staged {} bytes from '{}' at {}",
        bytes.len(),
        file_name,
        file.path().display()
    );

    Ok(StagedUpload {
        file,
        original_name: file_name.to_string(),
    })
}

/// Keep only the final path component and a conservative character set.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned.chars().take(100).collect()
    }
}

/// Staged files live here unless configured otherwise.
pub fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.pdf");
        std::fs::write(&path, b"%PDF-1.7\n...").unwrap();
        assert!(validate_pdf(&path).is_ok());
    }

    #[test]
    fn test_validate_rejects_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"hello world").unwrap();
        let err = validate_pdf(&path).unwrap_err();
        assert!(matches!(err, PipelineError::NotAPdf { .. }), "got: {err:?}");
    }

    #[test]
    fn test_validate_rejects_short_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.pdf");
        std::fs::write(&path, b"%P").unwrap();
        assert!(matches!(
            validate_pdf(&path).unwrap_err(),
            PipelineError::NotAPdf { .. }
        ));
    }

    #[test]
    fn test_validate_missing_file() {
        let err = validate_pdf(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound { .. }));
    }

    #[test]
    fn test_staged_upload_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage_upload(b"%PDF-1.4", "exam.pdf", &dir.path().join("uploads")).unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert!(path.starts_with(dir.path().join("uploads")));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
        assert_eq!(staged.original_name(), "exam.pdf");

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("exam.pdf"), "exam.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\Paper 1.pdf"), "Paper_1.pdf");
        assert_eq!(sanitize_file_name(""), "upload.pdf");
        assert_eq!(sanitize_file_name("..."), "upload.pdf");
    }
}

//! Input resolution: read a local PDF into memory and validate it.
//!
//! The pipeline works on bytes, so a file path is read once up front. The
//! `%PDF` magic check happens here so callers get a clear
//! [`Pdf2ZplError::NotAPdf`] instead of an opaque decoder failure.

use crate::error::Pdf2ZplError;
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Read a local PDF file, validating existence, permissions and magic bytes.
pub async fn read_document(path: impl AsRef<Path>) -> Result<Vec<u8>, Pdf2ZplError> {
    let path = path.as_ref().to_path_buf();
    let bytes = tokio::fs::read(&path).await.map_err(|e| io_error(&path, e))?;
    validate_magic(&bytes, &path.display().to_string())?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Reject inputs that do not start with `%PDF`.
///
/// Inputs shorter than four bytes are also rejected; a truncated file that
/// does carry the header is left for the decoder to report.
pub fn validate_magic(bytes: &[u8], source_name: &str) -> Result<(), Pdf2ZplError> {
    if bytes.len() < PDF_MAGIC.len() || &bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
        return Err(Pdf2ZplError::NotAPdf {
            source_name: source_name.to_string(),
            magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        });
    }
    Ok(())
}

fn io_error(path: &Path, e: std::io::Error) -> Pdf2ZplError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2ZplError::PermissionDenied { path },
        _ => Pdf2ZplError::FileNotFound { path },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn magic_accepts_pdf_header() {
        assert!(validate_magic(b"%PDF-1.7\n...", "mem").is_ok());
    }

    #[test]
    fn magic_rejects_other_files() {
        let err = validate_magic(b"\x89PNG\r\n", "label.png").unwrap_err();
        match err {
            Pdf2ZplError::NotAPdf { source_name, magic } => {
                assert_eq!(source_name, "label.png");
                assert_eq!(magic, b"\x89PNG".to_vec());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn magic_rejects_short_input() {
        assert!(validate_magic(b"%P", "mem").is_err());
        assert!(validate_magic(b"", "mem").is_err());
    }

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let err = read_document("/definitely/not/here.pdf").await.unwrap_err();
        assert!(matches!(err, Pdf2ZplError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn reads_valid_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.4\n%%EOF\n").unwrap();
        let bytes = read_document(tmp.path()).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}

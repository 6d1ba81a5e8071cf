//! Error types for the pdf2zpl library.
//!
//! Every failure is fatal to the whole conversion: a print job with page 3
//! missing is worse than no print job, because the operator only notices once
//! the labels are already stuck on parcels. There is therefore a single error
//! type, [`Pdf2ZplError`], returned from every `convert*` entry point.
//!
//! Two variants deserve special attention:
//!
//! * [`Pdf2ZplError::SecurityRestricted`]: the PDF engine refused the
//!   document for a policy reason (password, permissions). Fix the
//!   configuration; retrying will not help.
//! * [`Pdf2ZplError::DecodeFailed`]: the document itself is broken or
//!   truncated.
//!
//! They are never merged into one another so callers can tell the two apart.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2zpl library.
#[derive(Debug, Error)]
pub enum Pdf2ZplError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The bytes were read, but they are not a PDF.
    #[error("Input is not a valid PDF: '{source_name}'\nFirst bytes: {magic:?}")]
    NotAPdf { source_name: String, magic: Vec<u8> },

    // ── Rasterisation errors ──────────────────────────────────────────────
    /// The document could not be parsed or a page could not be rasterised.
    #[error("Failed to decode {}: {detail}", page_label(.page))]
    DecodeFailed { page: Option<usize>, detail: String },

    /// The PDF engine refused the document for a policy reason.
    #[error("Document refused by the PDF engine: {detail}\nProvide the password with --password or remove the document's security restrictions.")]
    SecurityRestricted { detail: String },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Geometry / encoding errors ────────────────────────────────────────
    /// Zero-area image, zero resolution, or non-positive label dimensions.
    #[error("Invalid geometry: {detail}")]
    InvalidGeometry { detail: String },

    /// The bitmap for a page is larger than the `^GF` field accepts.
    #[error("Page {page}: bitmap needs {total_bytes} bytes, graphic field limit is {limit}\nLower the DPI or use a smaller label.")]
    EncodingOverflow {
        page: usize,
        total_bytes: usize,
        limit: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output ZPL file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Install libpdfium system-wide (see https://github.com/bblanchon/pdfium-binaries).\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn page_label(page: &Option<usize>) -> String {
    match page {
        Some(p) => format!("page {p}"),
        None => "document".to_string(),
    }
}

/// The pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Input,
    Rasterize,
    Fit,
    Encode,
    Output,
    Config,
    /// Task scheduling or runtime setup, outside any single pipeline stage.
    Runtime,
}

impl Pdf2ZplError {
    /// Which stage of the pipeline produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Self::FileNotFound { .. } | Self::PermissionDenied { .. } | Self::NotAPdf { .. } => {
                Stage::Input
            }
            Self::DecodeFailed { .. }
            | Self::SecurityRestricted { .. }
            | Self::PageOutOfRange { .. }
            | Self::PdfiumBindingFailed(_) => Stage::Rasterize,
            Self::InvalidGeometry { .. } => Stage::Fit,
            Self::EncodingOverflow { .. } => Stage::Encode,
            Self::OutputWriteFailed { .. } => Stage::Output,
            Self::InvalidConfig(_) => Stage::Config,
            Self::Internal(_) => Stage::Runtime,
        }
    }

    /// `true` for policy refusals that a configuration change can resolve.
    pub fn is_security_restricted(&self) -> bool {
        matches!(self, Self::SecurityRestricted { .. })
    }

    pub(crate) fn invalid_geometry(detail: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failed_display_with_page() {
        let e = Pdf2ZplError::DecodeFailed {
            page: Some(3),
            detail: "bad xref".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 3"), "got: {msg}");
        assert!(msg.contains("bad xref"), "got: {msg}");
    }

    #[test]
    fn decode_failed_display_without_page() {
        let e = Pdf2ZplError::DecodeFailed {
            page: None,
            detail: "truncated".into(),
        };
        assert_eq!(e.to_string(), "Failed to decode document: truncated");
    }

    #[test]
    fn encoding_overflow_display() {
        let e = Pdf2ZplError::EncodingOverflow {
            page: 2,
            total_bytes: 5_000_000,
            limit: 4_194_304,
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 2"));
        assert!(msg.contains("5000000"));
        assert!(msg.contains("4194304"));
    }

    #[test]
    fn security_restricted_is_distinct_from_decode_failed() {
        let sec = Pdf2ZplError::SecurityRestricted {
            detail: "PasswordError".into(),
        };
        let dec = Pdf2ZplError::DecodeFailed {
            page: None,
            detail: "FormatError".into(),
        };
        assert!(sec.is_security_restricted());
        assert!(!dec.is_security_restricted());
        assert_eq!(sec.stage(), Stage::Rasterize);
        assert_eq!(dec.stage(), Stage::Rasterize);
    }

    #[test]
    fn stages_are_tagged() {
        assert_eq!(
            Pdf2ZplError::invalid_geometry("zero width").stage(),
            Stage::Fit
        );
        assert_eq!(
            Pdf2ZplError::InvalidConfig("dpi".into()).stage(),
            Stage::Config
        );
        assert_eq!(
            Pdf2ZplError::FileNotFound {
                path: "/nope.pdf".into()
            }
            .stage(),
            Stage::Input
        );
    }

    #[test]
    fn internal_errors_are_not_blamed_on_output() {
        let e = Pdf2ZplError::Internal("conversion task failed: panicked".into());
        assert_eq!(e.stage(), Stage::Runtime);
    }
}

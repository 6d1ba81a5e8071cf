//! PDF rasterisation behind the [`RasterSource`] trait.
//!
//! The pipeline never talks to pdfium directly: it asks a [`RasterSource`]
//! to open the document bytes at a resolution and then pulls pages one at a
//! time from the returned [`RasterDocument`]. Tests substitute synthetic
//! sources; production uses [`PdfiumRasterSource`].
//!
//! ## Why render by scale factor, not by target width?
//!
//! A label printer has a fixed dot pitch. Rendering at `dpi / 72` pixels per
//! PDF point means one rendered pixel is one printed dot, so text and
//! barcodes keep their physical size whenever the page already fits the
//! label and the fitter does not need to resample at all.
//!
//! ## Render size cap
//!
//! A page larger than the label is downscaled by the fitter anyway, and the
//! fitted content never exceeds the label's longest edge in either
//! orientation. [`PdfiumRasterSource::with_max_edge`] asks pdfium to render
//! no wider or taller than that edge, so an A0 drawing at 600 dpi costs a
//! label-sized bitmap instead of several gigabytes.

use crate::error::Pdf2ZplError;
use crate::geometry::Resolution;
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Decodes a document into page rasters at a requested resolution.
pub trait RasterSource {
    type Document<'a>: RasterDocument
    where
        Self: 'a;

    /// Open `document`. Policy refusals must surface as
    /// [`Pdf2ZplError::SecurityRestricted`], every other failure as
    /// [`Pdf2ZplError::DecodeFailed`].
    fn open<'a>(
        &'a self,
        document: &'a [u8],
        resolution: Resolution,
    ) -> Result<Self::Document<'a>, Pdf2ZplError>;
}

/// An opened document with in-order page access.
pub trait RasterDocument {
    fn page_count(&self) -> usize;

    /// Render page `index` (0-based). The image is owned by the caller.
    fn render_page(&self, index: usize) -> Result<DynamicImage, Pdf2ZplError>;
}

/// Bind to a pdfium shared library.
///
/// Resolution order: `lib_path`, then `PDFIUM_LIB_PATH`, then the system
/// library search path. A directory is expanded to the platform library name
/// inside it.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, Pdf2ZplError> {
    let explicit = lib_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

    let bindings = match explicit {
        Some(path) => {
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib).map_err(|e| {
                Pdf2ZplError::PdfiumBindingFailed(format!("{}: {}", lib.display(), e))
            })?
        }
        None => Pdfium::bind_to_system_library()
            .map_err(|e| Pdf2ZplError::PdfiumBindingFailed(e.to_string()))?,
    };

    Ok(Pdfium::new(bindings))
}

/// [`RasterSource`] backed by pdfium.
pub struct PdfiumRasterSource {
    pdfium: Pdfium,
    password: Option<String>,
    max_edge: Option<u32>,
}

impl PdfiumRasterSource {
    pub fn new(pdfium: Pdfium) -> Self {
        Self {
            pdfium,
            password: None,
            max_edge: None,
        }
    }

    /// Bind pdfium (see [`bind_pdfium`]) and wrap it.
    pub fn bind(lib_path: Option<&Path>) -> Result<Self, Pdf2ZplError> {
        bind_pdfium(lib_path).map(Self::new)
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    /// Cap both rendered dimensions at `max_edge` pixels, keeping the aspect
    /// ratio. Pages already inside the cap render at full resolution.
    pub fn with_max_edge(mut self, max_edge: Option<u32>) -> Self {
        self.max_edge = max_edge;
        self
    }

    /// Document metadata and page sizes, without rendering anything.
    pub fn metadata(&self, document: &[u8]) -> Result<DocumentMetadata, Pdf2ZplError> {
        let doc = self
            .pdfium
            .load_pdf_from_byte_slice(document, self.password.as_deref())
            .map_err(classify_load_error)?;

        let metadata = doc.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        let page_sizes: Vec<(f32, f32)> = doc
            .pages()
            .iter()
            .map(|p| (p.width().value, p.height().value))
            .collect();

        Ok(DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            page_count: page_sizes.len(),
            pdf_version: format!("{:?}", doc.version()),
            page_sizes,
        })
    }
}

impl RasterSource for PdfiumRasterSource {
    type Document<'a> = PdfiumDocument<'a>;

    fn open<'a>(
        &'a self,
        document: &'a [u8],
        resolution: Resolution,
    ) -> Result<PdfiumDocument<'a>, Pdf2ZplError> {
        let doc = self
            .pdfium
            .load_pdf_from_byte_slice(document, self.password.as_deref())
            .map_err(classify_load_error)?;
        info!("PDF loaded: {} pages", doc.pages().len());

        let mut render_config =
            PdfRenderConfig::new().scale_page_by_factor(resolution.points_to_dots());
        if let Some(edge) = self.max_edge {
            let edge = i32::try_from(edge).unwrap_or(i32::MAX);
            render_config = render_config
                .set_maximum_width(edge)
                .set_maximum_height(edge);
        }

        Ok(PdfiumDocument {
            document: doc,
            render_config,
        })
    }
}

/// A document opened by [`PdfiumRasterSource`].
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
    render_config: PdfRenderConfig,
}

impl RasterDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(&self, index: usize) -> Result<DynamicImage, Pdf2ZplError> {
        let decode_failed = |detail: String| Pdf2ZplError::DecodeFailed {
            page: Some(index + 1),
            detail,
        };

        let page_index = u16::try_from(index)
            .map_err(|_| decode_failed(format!("page index {index} exceeds pdfium's limit")))?;
        let page = self
            .document
            .pages()
            .get(page_index)
            .map_err(|e| decode_failed(format!("{:?}", e)))?;

        let bitmap = page
            .render_with_config(&self.render_config)
            .map_err(|e| decode_failed(format!("{:?}", e)))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

/// Keep password/security refusals apart from corrupt-document failures.
fn classify_load_error(e: PdfiumError) -> Pdf2ZplError {
    let detail = format!("{:?}", e);
    match e {
        PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError | PdfiumInternalError::SecurityError,
        ) => Pdf2ZplError::SecurityRestricted { detail },
        _ => Pdf2ZplError::DecodeFailed { page: None, detail },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_error_is_security_restricted() {
        let err = classify_load_error(PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError,
        ));
        assert!(err.is_security_restricted(), "got: {err:?}");
    }

    #[test]
    fn security_error_is_security_restricted() {
        let err = classify_load_error(PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::SecurityError,
        ));
        assert!(err.is_security_restricted(), "got: {err:?}");
    }

    #[test]
    fn format_error_is_decode_failed() {
        let err = classify_load_error(PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::FormatError,
        ));
        assert!(
            matches!(err, Pdf2ZplError::DecodeFailed { page: None, .. }),
            "got: {err:?}"
        );
    }

    #[test]
    fn missing_library_path_fails_to_bind() {
        let err = bind_pdfium(Some(Path::new("/definitely/not/libpdfium.so")))
            .err()
            .expect("binding a missing file must fail");
        assert!(matches!(err, Pdf2ZplError::PdfiumBindingFailed(_)));
    }
}

//! Configuration types for PDF-to-ZPL conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Each pipeline stage receives only the
//! pieces it needs (geometry, threshold, encoder settings), derived from this
//! one struct, so there is no hidden shared state between stages.

use crate::error::Pdf2ZplError;
use crate::geometry::{LabelGeometry, Resolution};
use crate::pipeline::monochrome::DEFAULT_THRESHOLD;
use crate::pipeline::zpl::{ZplEncoder, DEFAULT_MAX_FIELD_BYTES};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lowest DPI accepted by the builder.
pub const MIN_DPI: u32 = 72;
/// Highest DPI accepted by the builder (600 dpi printheads are the densest in use).
pub const MAX_DPI: u32 = 600;

/// Configuration for a PDF-to-ZPL conversion.
///
/// # Example
/// ```rust
/// use pdf2zpl::{ConversionConfig, LabelSize, RotationPolicy};
///
/// let config = ConversionConfig::builder()
///     .dpi(300)
///     .label(LabelSize::millimetres(100.0, 150.0))
///     .rotation(RotationPolicy::Never)
///     .build()
///     .unwrap();
/// assert_eq!(config.geometry().unwrap().width(), 1181);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Printhead density. Range: 72–600. Default: 203.
    ///
    /// Pages are rasterised at exactly this density so one rendered pixel maps
    /// to one printed dot. Common values are 203, 300 and 600.
    pub dpi: u32,

    /// Physical label size. Default: 4 × 6 in.
    pub label: LabelSize,

    /// Luminance below which a pixel is printed as ink. Default: 128.
    pub threshold: u8,

    /// Whether pages may be turned 90° to fit the label. Default: [`RotationPolicy::Auto`].
    pub rotation: RotationPolicy,

    /// `^GF` payload encoding. Default: [`Compression::Zpl`].
    pub compression: Compression,

    /// Upper bound on the uncompressed `^GF` byte count per page.
    pub max_field_bytes: usize,

    /// Print quantity per label (`^PQ`). Default: 1.
    pub copies: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Path to the pdfium shared library, or a directory containing it.
    /// `None` falls back to `PDFIUM_LIB_PATH`, then the system library.
    pub pdfium_lib: Option<PathBuf>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 203,
            label: LabelSize::default(),
            threshold: DEFAULT_THRESHOLD,
            rotation: RotationPolicy::default(),
            compression: Compression::default(),
            max_field_bytes: DEFAULT_MAX_FIELD_BYTES,
            copies: 1,
            password: None,
            pages: PageSelection::default(),
            pdfium_lib: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("label", &self.label)
            .field("threshold", &self.threshold)
            .field("rotation", &self.rotation)
            .field("compression", &self.compression)
            .field("max_field_bytes", &self.max_field_bytes)
            .field("copies", &self.copies)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("pdfium_lib", &self.pdfium_lib)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn resolution(&self) -> Result<Resolution, Pdf2ZplError> {
        Resolution::new(self.dpi)
    }

    /// Label size in dots at the configured resolution.
    pub fn geometry(&self) -> Result<LabelGeometry, Pdf2ZplError> {
        self.label.to_geometry(self.resolution()?)
    }

    pub fn encoder(&self) -> ZplEncoder {
        ZplEncoder::new(self.compression)
            .max_field_bytes(self.max_field_bytes)
            .copies(self.copies)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(MIN_DPI, MAX_DPI);
        self
    }

    pub fn label(mut self, label: LabelSize) -> Self {
        self.config.label = label;
        self
    }

    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.threshold = threshold;
        self
    }

    pub fn rotation(mut self, policy: RotationPolicy) -> Self {
        self.config.rotation = policy;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.config.compression = compression;
        self
    }

    pub fn max_field_bytes(mut self, n: usize) -> Self {
        self.config.max_field_bytes = n;
        self
    }

    pub fn copies(mut self, n: u32) -> Self {
        self.config.copies = n.max(1);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn pdfium_lib(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2ZplError> {
        let c = &self.config;
        if c.dpi < MIN_DPI || c.dpi > MAX_DPI {
            return Err(Pdf2ZplError::InvalidConfig(format!(
                "DPI must be {MIN_DPI}–{MAX_DPI}, got {}",
                c.dpi
            )));
        }
        if c.max_field_bytes == 0 {
            return Err(Pdf2ZplError::InvalidConfig(
                "max_field_bytes must be ≥ 1".into(),
            ));
        }
        // Surface zero-sized labels here rather than on the first page.
        c.geometry()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Physical label dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LabelSize {
    Inches { width: f64, height: f64 },
    Millimetres { width: f64, height: f64 },
    /// Already expressed in printer dots; independent of DPI.
    Dots { width: u32, height: u32 },
}

impl Default for LabelSize {
    fn default() -> Self {
        LabelSize::Inches {
            width: 4.0,
            height: 6.0,
        }
    }
}

impl LabelSize {
    pub fn inches(width: f64, height: f64) -> Self {
        LabelSize::Inches { width, height }
    }

    pub fn millimetres(width: f64, height: f64) -> Self {
        LabelSize::Millimetres { width, height }
    }

    pub fn dots(width: u32, height: u32) -> Self {
        LabelSize::Dots { width, height }
    }

    pub fn to_geometry(&self, resolution: Resolution) -> Result<LabelGeometry, Pdf2ZplError> {
        match *self {
            LabelSize::Inches { width, height } => {
                LabelGeometry::from_inches(width, height, resolution)
            }
            LabelSize::Millimetres { width, height } => {
                LabelGeometry::from_millimetres(width, height, resolution)
            }
            LabelSize::Dots { width, height } => LabelGeometry::new(width, height),
        }
    }
}

/// How the fitter chooses between 0° and 90° page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationPolicy {
    /// Rotate 90° only when that yields a strictly larger scale factor. (default)
    #[default]
    Auto,
    /// Always keep the page upright.
    Never,
    /// Always rotate 90° clockwise.
    Always,
}

/// Encoding of the `^GF` bitmap payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compression {
    /// Plain ASCII hex, two characters per byte.
    Hex,
    /// ZPL run-length compression over the hex digits. (default)
    #[default]
    Zpl,
}

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    ///
    /// Label order always follows document order, so sets are sorted even if
    /// the caller listed them out of order.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_four_by_six_at_203() {
        let c = ConversionConfig::default();
        let g = c.geometry().unwrap();
        assert_eq!((g.width(), g.height()), (812, 1218));
        assert_eq!(c.threshold, 128);
        assert_eq!(c.rotation, RotationPolicy::Auto);
        assert_eq!(c.compression, Compression::Zpl);
    }

    #[test]
    fn dpi_is_clamped() {
        let c = ConversionConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, MIN_DPI);
        let c = ConversionConfig::builder().dpi(5000).build().unwrap();
        assert_eq!(c.dpi, MAX_DPI);
    }

    #[test]
    fn zero_sized_label_fails_build() {
        let err = ConversionConfig::builder()
            .label(LabelSize::dots(0, 100))
            .build()
            .unwrap_err();
        assert!(matches!(err, Pdf2ZplError::InvalidGeometry { .. }));
    }

    #[test]
    fn zero_field_limit_fails_build() {
        let err = ConversionConfig::builder()
            .max_field_bytes(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, Pdf2ZplError::InvalidConfig(_)));
    }

    #[test]
    fn dots_label_ignores_dpi() {
        let c = ConversionConfig::builder()
            .dpi(300)
            .label(LabelSize::dots(600, 1000))
            .build()
            .unwrap();
        assert_eq!(c.geometry().unwrap(), LabelGeometry::new(600, 1000).unwrap());
    }

    #[test]
    fn debug_redacts_password() {
        let c = ConversionConfig::builder()
            .password("hunter2")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn copies_at_least_one() {
        let c = ConversionConfig::builder().copies(0).build().unwrap();
        assert_eq!(c.copies, 1);
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(2).to_indices(3), vec![1]);
        assert_eq!(PageSelection::Single(4).to_indices(3), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 9).to_indices(3), vec![1, 2]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2]
        );
    }
}

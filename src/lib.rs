//! # pdf2zpl
//!
//! Convert PDF documents into ZPL label commands for Zebra-compatible
//! thermal printers, one self-contained `^XA … ^XZ` block per page.
//!
//! ## Why rasterise?
//!
//! Shipping labels, packing slips and carrier documents usually arrive as
//! PDFs. Translating PDF drawing operators into native ZPL text and barcode
//! fields is brittle; printing the page as a bitmap is not. This crate renders
//! each page at the printer's resolution, fits it onto the physical label and
//! sends it as a compressed `^GF` graphic field.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       validate local file / bytes (%PDF magic)
//!  ├─ 2. Render      rasterise each page via pdfium at the label DPI
//!  ├─ 3. Fit         rotate + scale onto the label, pad with white
//!  ├─ 4. Threshold   RGB → 1 bit per pixel
//!  ├─ 5. Encode      ^GF bitmap field (ZPL run-length compression)
//!  └─ 6. Output      ordered ZPL blocks, one per page
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2zpl::{convert, ConversionConfig, LabelSize};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .dpi(203)
//!         .label(LabelSize::inches(4.0, 6.0))
//!         .build()?;
//!     let output = convert("shipping-label.pdf", &config).await?;
//!     print!("{}", output.to_zpl());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2zpl` binary (clap, anyhow, indicatif, serde_json, tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2zpl = { version = "0.1", default-features = false }
//! ```
//!
//! ## Common label sizes
//!
//! | Label | DPI | Dots |
//! |-------|-----|------|
//! | 4 × 6 in | 203 | 812 × 1218 |
//! | 4 × 6 in | 300 | 1200 × 1800 |
//! | 2 × 1 in | 203 | 406 × 203 |
//! | 100 × 150 mm | 203 | 799 × 1199 |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    Compression, ConversionConfig, ConversionConfigBuilder, LabelSize, PageSelection,
    RotationPolicy,
};
pub use convert::{
    convert, convert_bytes, convert_document, convert_sync, convert_to_file, inspect,
    write_output,
};
pub use error::{Pdf2ZplError, Stage};
pub use geometry::{LabelGeometry, Resolution};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata, LabelCommand};
pub use pipeline::monochrome::MonochromeBitmap;
pub use pipeline::render::{PdfiumRasterSource, RasterDocument, RasterSource};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};

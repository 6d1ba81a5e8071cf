//! Pipeline stages for PDF-to-ZPL conversion.
//!
//! Each submodule implements exactly one transformation step and is
//! stateless: everything it needs arrives as arguments. That keeps every
//! stage testable on synthetic images without a PDF engine.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ fit ──▶ monochrome ──▶ zpl
//! (bytes)   (pdfium)   (RGB)   (1 bpp)        (^GF block)
//! ```
//!
//! 1. [`input`]     : read and validate the document bytes
//! 2. [`render`]    : rasterise pages at the label DPI behind the
//!    [`render::RasterSource`] trait
//! 3. [`fit`]       : rotate, scale and pad each page onto the label
//! 4. [`monochrome`]: threshold RGB to a packed 1-bit bitmap
//! 5. [`zpl`]       : serialise the bitmap as a compressed `^GF` command

pub mod fit;
pub mod input;
pub mod monochrome;
pub mod render;
pub mod zpl;

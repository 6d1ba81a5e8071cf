//! Conversion results.

use crate::pipeline::monochrome::{bytes_per_row, MonochromeBitmap};
use crate::pipeline::zpl::{GraphicField, PayloadError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One self-contained printer command block for one page.
///
/// The `zpl` string starts with `^XA` and ends with `^XZ`; it shares no state
/// with any other page's command, so it can be sent to a printer on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCommand {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    /// Bitmap width in dots.
    pub width: u32,
    /// Bitmap height in dots.
    pub height: u32,
    pub bytes_per_row: usize,
    /// Uncompressed bitmap size declared in the `^GF` header.
    pub total_bytes: usize,
    pub zpl: String,
}

impl LabelCommand {
    pub fn as_str(&self) -> &str {
        &self.zpl
    }

    /// Decode the `^GF` payload back into the bitmap it was built from.
    pub fn to_bitmap(&self) -> Result<MonochromeBitmap, PayloadError> {
        let data = GraphicField::parse(&self.zpl)?.decode()?;
        let actual = data.len();
        MonochromeBitmap::from_packed(self.width, self.height, data).ok_or(
            PayloadError::LengthMismatch {
                expected: bytes_per_row(self.width) * self.height as usize,
                actual,
            },
        )
    }
}

impl fmt::Display for LabelCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.zpl)
    }
}

/// Statistics for a finished conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages converted (after page selection).
    pub converted_pages: usize,
    /// Sum of uncompressed `^GF` bytes over all pages.
    pub bitmap_bytes: usize,
    /// Sum of emitted ZPL bytes over all pages.
    pub zpl_bytes: usize,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
    pub encode_duration_ms: u64,
}

impl ConversionStats {
    /// `zpl_bytes / bitmap_bytes`; below 1.0 the ZPL is smaller than raw hex/2.
    pub fn compression_ratio(&self) -> f64 {
        if self.bitmap_bytes == 0 {
            return 0.0;
        }
        self.zpl_bytes as f64 / self.bitmap_bytes as f64
    }
}

/// Ordered label commands plus statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// One command per converted page, in document order.
    pub labels: Vec<LabelCommand>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// All commands concatenated into a single print stream.
    pub fn to_zpl(&self) -> String {
        let mut out = String::with_capacity(self.stats.zpl_bytes);
        for label in &self.labels {
            out.push_str(&label.zpl);
        }
        out
    }
}

/// Document-level information from [`crate::convert::inspect`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    /// Page sizes in PDF points (1/72 in), in document order.
    pub page_sizes: Vec<(f32, f32)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(page_num: usize, zpl: &str) -> LabelCommand {
        LabelCommand {
            page_num,
            width: 8,
            height: 1,
            bytes_per_row: 1,
            total_bytes: 1,
            zpl: zpl.to_string(),
        }
    }

    #[test]
    fn to_zpl_concatenates_in_order() {
        let out = ConversionOutput {
            labels: vec![label(1, "^XA1^XZ\n"), label(2, "^XA2^XZ\n")],
            stats: ConversionStats::default(),
        };
        assert_eq!(out.to_zpl(), "^XA1^XZ\n^XA2^XZ\n");
    }

    #[test]
    fn to_bitmap_recovers_encoded_pixels() {
        let mut bm = MonochromeBitmap::new(13, 4);
        bm.set(0, 0, true);
        bm.set(12, 3, true);
        let cmd = crate::pipeline::zpl::ZplEncoder::default()
            .encode(&bm, 1)
            .unwrap();
        assert_eq!(cmd.to_bitmap().unwrap(), bm);
    }

    #[test]
    fn to_bitmap_rejects_inconsistent_header() {
        let mut cmd = label(1, "^XA^FO0,0^GFA,1,1,1,80^FS^XZ");
        cmd.height = 2;
        assert!(matches!(
            cmd.to_bitmap(),
            Err(PayloadError::LengthMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn display_is_raw_zpl() {
        assert_eq!(label(1, "^XA^XZ").to_string(), "^XA^XZ");
    }

    #[test]
    fn compression_ratio_handles_empty() {
        assert_eq!(ConversionStats::default().compression_ratio(), 0.0);
        let s = ConversionStats {
            bitmap_bytes: 100,
            zpl_bytes: 25,
            ..Default::default()
        };
        assert_eq!(s.compression_ratio(), 0.25);
    }
}

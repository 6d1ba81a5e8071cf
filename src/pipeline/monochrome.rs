//! RGB → 1 bit per pixel thresholding.
//!
//! Thermal printheads have two states per dot, so every pixel becomes either
//! ink or background. A fixed luminance threshold is used rather than
//! dithering: label content is overwhelmingly text and barcodes, where
//! dithering only blurs edges, and a fixed rule keeps output reproducible.

use image::{DynamicImage, RgbImage};

/// Default luminance cut-off; pixels strictly darker print as ink.
pub const DEFAULT_THRESHOLD: u8 = 128;

/// A packed 1-bit bitmap. Bit value 1 = ink, 0 = background.
///
/// Bits are stored MSB-first, row-major, each row padded to a whole byte with
/// zero bits. This is exactly the byte layout the `^GF` command expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonochromeBitmap {
    width: u32,
    height: u32,
    bytes_per_row: usize,
    data: Vec<u8>,
}

impl MonochromeBitmap {
    /// An all-background bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        let bytes_per_row = bytes_per_row(width);
        Self {
            width,
            height,
            bytes_per_row,
            data: vec![0; bytes_per_row * height as usize],
        }
    }

    /// Wrap already-packed rows. Returns `None` if `data` has the wrong length.
    ///
    /// Padding bits in the last byte of each row are cleared.
    pub fn from_packed(width: u32, height: u32, mut data: Vec<u8>) -> Option<Self> {
        let bpr = bytes_per_row(width);
        if data.len() != bpr * height as usize {
            return None;
        }
        let pad = (bpr * 8) as u32 - width;
        if pad > 0 && bpr > 0 {
            let mask = 0xFFu8 << pad;
            for row in data.chunks_mut(bpr) {
                row[bpr - 1] &= mask;
            }
        }
        Some(Self {
            width,
            height,
            bytes_per_row: bpr,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    pub fn total_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.bytes_per_row;
        &self.data[start..start + self.bytes_per_row]
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        let (idx, mask) = self.locate(x, y);
        self.data[idx] & mask != 0
    }

    pub fn set(&mut self, x: u32, y: u32, ink: bool) {
        let (idx, mask) = self.locate(x, y);
        if ink {
            self.data[idx] |= mask;
        } else {
            self.data[idx] &= !mask;
        }
    }

    /// Number of ink dots.
    pub fn ink_count(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Render back to a black/white image, for previews.
    pub fn to_luma_image(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.get(x, y) { 0 } else { 255 }])
        })
    }

    fn locate(&self, x: u32, y: u32) -> (usize, u8) {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let idx = y as usize * self.bytes_per_row + (x / 8) as usize;
        (idx, 0x80 >> (x % 8))
    }
}

/// `ceil(width / 8)`.
pub fn bytes_per_row(width: u32) -> usize {
    (width as usize).div_ceil(8)
}

/// BT.601 integer luma.
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8
}

/// Threshold an RGB raster into a packed bitmap.
pub fn to_monochrome(img: &RgbImage, threshold: u8) -> MonochromeBitmap {
    let (width, height) = img.dimensions();
    pack(width, height, img.as_raw(), 3, threshold)
}

/// Threshold any raster. Alpha, if present, is ignored (treated as opaque).
pub fn dynamic_to_monochrome(img: &DynamicImage, threshold: u8) -> MonochromeBitmap {
    let (width, height) = (img.width(), img.height());
    match img {
        DynamicImage::ImageRgb8(buf) => pack(width, height, buf.as_raw(), 3, threshold),
        DynamicImage::ImageRgba8(buf) => pack(width, height, buf.as_raw(), 4, threshold),
        other => to_monochrome(&other.to_rgb8(), threshold),
    }
}

fn pack(width: u32, height: u32, raw: &[u8], channels: usize, threshold: u8) -> MonochromeBitmap {
    let mut bitmap = MonochromeBitmap::new(width, height);
    let bpr = bitmap.bytes_per_row;
    let stride = width as usize * channels;
    if bpr == 0 {
        return bitmap;
    }

    for (src_row, dst_row) in raw.chunks_exact(stride).zip(bitmap.data.chunks_exact_mut(bpr)) {
        for (x, px) in src_row.chunks_exact(channels).enumerate() {
            if luminance(px[0], px[1], px[2]) < threshold {
                dst_row[x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    bitmap
}

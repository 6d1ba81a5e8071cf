//! Page fitting: rotate, scale and pad a rendered page onto the label.
//!
//! ## Why place at the origin instead of centering?
//!
//! Label printers feed from the top-left corner. Documents already laid out
//! for labels (carrier labels, packing slips) expect that corner to line up
//! with the label's, so the scaled page sits at (0, 0) and any spare space
//! trails to the right and bottom.
//!
//! ## Why pick the orientation by scale factor?
//!
//! A landscape A4 shipping label squeezed onto a portrait 4 × 6 in label
//! without rotation prints at roughly a third of the size. Computing the
//! uniform scale for both 0° and 90° and keeping the larger one makes the
//! printed content as big as possible. [`RotationPolicy`] overrides it.

use crate::config::RotationPolicy;
use crate::error::Pdf2ZplError;
use crate::geometry::LabelGeometry;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use tracing::debug;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Geometry of a fit, computed before any pixel is touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPlan {
    /// Page turned 90° clockwise before scaling.
    pub rotated: bool,
    /// Uniform scale applied to the (possibly rotated) page.
    pub scale: f64,
    /// Size of the scaled page content before padding.
    pub content_width: u32,
    pub content_height: u32,
}

impl FitPlan {
    pub fn needs_resize(&self, page_width: u32, page_height: u32) -> bool {
        let (w, h) = if self.rotated {
            (page_height, page_width)
        } else {
            (page_width, page_height)
        };
        (w, h) != (self.content_width, self.content_height)
    }
}

/// Decide orientation and scaled size for a `page_width × page_height` page.
pub fn plan_fit(
    page_width: u32,
    page_height: u32,
    geometry: LabelGeometry,
    policy: RotationPolicy,
) -> Result<FitPlan, Pdf2ZplError> {
    if page_width == 0 || page_height == 0 {
        return Err(Pdf2ZplError::invalid_geometry(format!(
            "page has zero area ({page_width}×{page_height} px)"
        )));
    }
    if geometry.width() == 0 || geometry.height() == 0 {
        return Err(Pdf2ZplError::invalid_geometry(format!(
            "label has zero area ({geometry})"
        )));
    }

    let upright = uniform_scale(page_width, page_height, geometry);
    let turned = uniform_scale(page_height, page_width, geometry);
    let rotated = match policy {
        RotationPolicy::Auto => turned > upright,
        RotationPolicy::Never => false,
        RotationPolicy::Always => true,
    };

    let (w, h, scale) = if rotated {
        (page_height, page_width, turned)
    } else {
        (page_width, page_height, upright)
    };

    Ok(FitPlan {
        rotated,
        scale,
        content_width: scaled_dim(w, scale, geometry.width()),
        content_height: scaled_dim(h, scale, geometry.height()),
    })
}

/// Fit `page` onto a white canvas of exactly `geometry`.
///
/// The page is consumed; the returned image is always opaque 8-bit RGB.
pub fn fit(
    page: DynamicImage,
    geometry: LabelGeometry,
    policy: RotationPolicy,
) -> Result<RgbImage, Pdf2ZplError> {
    let (page_width, page_height) = page.dimensions();
    let plan = plan_fit(page_width, page_height, geometry, policy)?;
    debug!(
        "Fit {}x{} px → {} (rotated={}, scale={:.4})",
        page_width, page_height, geometry, plan.rotated, plan.scale
    );

    let page = if plan.rotated { page.rotate90() } else { page };
    let flat = flatten_onto_white(page);

    let content = if plan.needs_resize(page_width, page_height) {
        imageops::resize(
            &flat,
            plan.content_width,
            plan.content_height,
            FilterType::Triangle,
        )
    } else {
        flat
    };

    let mut canvas = RgbImage::from_pixel(geometry.width(), geometry.height(), WHITE);
    imageops::replace(&mut canvas, &content, 0, 0);
    Ok(canvas)
}

fn uniform_scale(width: u32, height: u32, geometry: LabelGeometry) -> f64 {
    let sx = geometry.width() as f64 / width as f64;
    let sy = geometry.height() as f64 / height as f64;
    sx.min(sy)
}

fn scaled_dim(src: u32, scale: f64, max: u32) -> u32 {
    ((src as f64 * scale).round() as u32).clamp(1, max)
}

/// Composite any alpha channel over white so later stages can ignore it.
fn flatten_onto_white(page: DynamicImage) -> RgbImage {
    if !page.color().has_alpha() {
        return page.into_rgb8();
    }
    let rgba = page.into_rgba8();
    let (w, h) = rgba.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
    })
}

fn over_white(c: u8, a: u8) -> u8 {
    let a = a as u32;
    ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8
}

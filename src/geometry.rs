//! Resolution and label geometry in printer dots.
//!
//! Physical label sizes are given in inches or millimetres; everything after
//! the config layer works in dots (pixels) at a fixed [`Resolution`]. Both
//! types validate on construction so a zero-sized label can never reach the
//! fitter.

use crate::error::Pdf2ZplError;
use serde::{Deserialize, Serialize};
use std::fmt;

const MM_PER_INCH: f64 = 25.4;

/// Rasterisation density in dots per inch, applied to both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32")]
pub struct Resolution(u32);

impl Resolution {
    pub fn new(dpi: u32) -> Result<Self, Pdf2ZplError> {
        if dpi == 0 {
            return Err(Pdf2ZplError::invalid_geometry("resolution must be > 0 DPI"));
        }
        Ok(Self(dpi))
    }

    pub fn dpi(self) -> u32 {
        self.0
    }

    /// Scale factor from PDF points (1/72 in) to dots.
    pub fn points_to_dots(self) -> f32 {
        self.0 as f32 / 72.0
    }
}

impl TryFrom<u32> for Resolution {
    type Error = Pdf2ZplError;

    fn try_from(dpi: u32) -> Result<Self, Self::Error> {
        Self::new(dpi)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} dpi", self.0)
    }
}

/// Target label size in dots at a given resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLabelGeometry")]
pub struct LabelGeometry {
    width: u32,
    height: u32,
}

/// Unchecked wire form; deserialisation goes through [`LabelGeometry::new`].
#[derive(Deserialize)]
struct RawLabelGeometry {
    width: u32,
    height: u32,
}

impl TryFrom<RawLabelGeometry> for LabelGeometry {
    type Error = Pdf2ZplError;

    fn try_from(raw: RawLabelGeometry) -> Result<Self, Self::Error> {
        Self::new(raw.width, raw.height)
    }
}

impl LabelGeometry {
    pub fn new(width: u32, height: u32) -> Result<Self, Pdf2ZplError> {
        if width == 0 || height == 0 {
            return Err(Pdf2ZplError::invalid_geometry(format!(
                "label must be at least 1×1 dots, got {width}×{height}"
            )));
        }
        Ok(Self { width, height })
    }

    #[cfg(test)]
    pub(crate) fn new_unchecked(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Convert a physical size in inches to dots, rounding to the nearest dot.
    pub fn from_inches(
        width_in: f64,
        height_in: f64,
        resolution: Resolution,
    ) -> Result<Self, Pdf2ZplError> {
        if !(width_in.is_finite() && height_in.is_finite()) || width_in <= 0.0 || height_in <= 0.0
        {
            return Err(Pdf2ZplError::invalid_geometry(format!(
                "label size must be positive, got {width_in}×{height_in} in"
            )));
        }
        let dpi = resolution.dpi() as f64;
        Self::new(
            (width_in * dpi).round() as u32,
            (height_in * dpi).round() as u32,
        )
    }

    pub fn from_millimetres(
        width_mm: f64,
        height_mm: f64,
        resolution: Resolution,
    ) -> Result<Self, Pdf2ZplError> {
        Self::from_inches(width_mm / MM_PER_INCH, height_mm / MM_PER_INCH, resolution)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl fmt::Display for LabelGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{} dots", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_resolution_rejected() {
        assert!(matches!(
            Resolution::new(0),
            Err(Pdf2ZplError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn zero_label_rejected() {
        assert!(LabelGeometry::new(0, 100).is_err());
        assert!(LabelGeometry::new(100, 0).is_err());
        assert!(LabelGeometry::new(1, 1).is_ok());
    }

    #[test]
    fn four_by_six_at_203_dpi() {
        let g = LabelGeometry::from_inches(4.0, 6.0, Resolution::new(203).unwrap()).unwrap();
        assert_eq!((g.width(), g.height()), (812, 1218));
    }

    #[test]
    fn millimetres_round_to_nearest_dot() {
        let g =
            LabelGeometry::from_millimetres(100.0, 150.0, Resolution::new(203).unwrap()).unwrap();
        // 100 mm = 3.937 in → 799.2 dots; 150 mm = 5.906 in → 1198.8 dots
        assert_eq!((g.width(), g.height()), (799, 1199));
    }

    #[test]
    fn negative_or_nan_inches_rejected() {
        let r = Resolution::new(203).unwrap();
        assert!(LabelGeometry::from_inches(-1.0, 6.0, r).is_err());
        assert!(LabelGeometry::from_inches(4.0, f64::NAN, r).is_err());
    }

    #[test]
    fn deserialising_zero_label_is_rejected() {
        let err = serde_json::from_str::<LabelGeometry>(r#"{"width":0,"height":100}"#)
            .unwrap_err();
        assert!(err.to_string().contains("at least 1×1"), "got: {err}");

        let g: LabelGeometry = serde_json::from_str(r#"{"width":812,"height":1218}"#).unwrap();
        assert_eq!(g, LabelGeometry::new(812, 1218).unwrap());
        assert_eq!(
            serde_json::to_string(&g).unwrap(),
            r#"{"width":812,"height":1218}"#
        );
    }

    #[test]
    fn deserialising_zero_resolution_is_rejected() {
        assert!(serde_json::from_str::<Resolution>("0").is_err());
        let r: Resolution = serde_json::from_str("203").unwrap();
        assert_eq!(r.dpi(), 203);
    }

    #[test]
    fn points_to_dots_scale() {
        assert_eq!(Resolution::new(144).unwrap().points_to_dots(), 2.0);
    }
}

//! Bounding Boxes
//!
//! The model is told to describe crop regions in a 1000×1000 frame. Before a
//! crop runs, the box is scaled to the image's real dimensions and clamped so
//! the crop always has positive area inside the image.

use serde::{Deserialize, Serialize};

/// Side length of the normalized frame the model reasons in
pub const NORMALIZED_EXTENT: f64 = 1000.0;

/// How crop coordinates from the model are interpreted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    /// Fractions of 1000 per axis, mapped onto the image
    #[default]
    Normalized,
    /// Already pixel coordinates; only trimmed to the image frame
    Absolute,
}

impl std::str::FromStr for CoordinateSpace {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normalized" | "normalised" | "1000" => Ok(CoordinateSpace::Normalized),
            "absolute" | "pixel" | "pixels" => Ok(CoordinateSpace::Absolute),
            other => Err(format!("unknown coordinate space '{}'", other)),
        }
    }
}

/// Crop region as `(ymin, xmin, ymax, xmax)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub ymin: i64,
    pub xmin: i64,
    pub ymax: i64,
    pub xmax: i64,
}

impl BoundingBox {
    pub fn new(ymin: i64, xmin: i64, ymax: i64, xmax: i64) -> Self {
        Self {
            ymin,
            xmin,
            ymax,
            xmax,
        }
    }

    /// Map a normalized box onto a `width` × `height` image.
    ///
    /// Always returns `0 <= xmin < xmax <= width` and
    /// `0 <= ymin < ymax <= height` for non-zero dimensions.
    pub fn to_pixels(&self, width: u32, height: u32) -> BoundingBox {
        let (xmin, xmax) = map_axis(self.xmin, self.xmax, width);
        let (ymin, ymax) = map_axis(self.ymin, self.ymax, height);
        BoundingBox {
            ymin,
            xmin,
            ymax,
            xmax,
        }
    }

    /// Intersection with a `width` × `height` frame.
    ///
    /// Edges are clamped without repair, so a box lying entirely outside the
    /// frame comes back empty and fails `fits_within`.
    pub fn clip_to(&self, width: u32, height: u32) -> BoundingBox {
        let (w, h) = (i64::from(width), i64::from(height));
        BoundingBox {
            ymin: self.ymin.clamp(0, h),
            xmin: self.xmin.clamp(0, w),
            ymax: self.ymax.clamp(0, h),
            xmax: self.xmax.clamp(0, w),
        }
    }

    /// Resolve model coordinates for an image according to `space`
    pub fn resolve(&self, space: CoordinateSpace, width: u32, height: u32) -> BoundingBox {
        match space {
            CoordinateSpace::Normalized => self.to_pixels(width, height),
            CoordinateSpace::Absolute => self.clip_to(width, height),
        }
    }

    pub fn width(&self) -> i64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> i64 {
        self.ymax - self.ymin
    }

    /// Whether the box is a non-empty region inside `width` × `height`
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.xmin >= 0
            && self.ymin >= 0
            && self.xmin < self.xmax
            && self.ymin < self.ymax
            && self.xmax <= i64::from(width)
            && self.ymax <= i64::from(height)
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.xmin, self.ymin, self.xmax, self.ymax
        )
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn scale(value: i64, dimension: u32) -> i64 {
    // `as` truncates toward zero
    ((value as f64 / NORMALIZED_EXTENT) * f64::from(dimension)) as i64
}

fn map_axis(lo: i64, hi: i64, dimension: u32) -> (i64, i64) {
    let extent = i64::from(dimension.max(1));
    let lo = scale(lo, dimension).clamp(0, extent - 1);
    let mut hi = scale(hi, dimension).clamp(0, extent);
    if hi <= lo {
        hi = lo + 1;
    }
    (lo, hi)
}

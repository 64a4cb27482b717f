//! Axis-aligned envelopes tagged with a CRS.

use geo::{coord, Polygon, Rect};

use crate::proj::crs::Crs;

/// Rectangle `(min_x, min_y, max_x, max_y)` in the units of `crs`.
///
/// An envelope with `min > max` on either axis is empty; it is never
/// produced by the intersection helpers, which return `None` instead.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    crs: Option<Crs>,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, crs: Option<Crs>) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            crs,
        }
    }

    /// Envelope in `crs`.
    pub fn with_crs(min_x: f64, min_y: f64, max_x: f64, max_y: f64, crs: Crs) -> Self {
        Self::new(min_x, min_y, max_x, max_y, Some(crs))
    }

    pub fn from_rect(rect: Rect<f64>, crs: Option<Crs>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y, crs)
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<Crs>) {
        self.crs = crs;
    }

    /// Same rectangle in another CRS, no transformation applied.
    pub fn retagged(&self, crs: Option<Crs>) -> Self {
        Self { crs, ..self.clone() }
    }

    pub fn is_empty(&self) -> bool {
        !(self.min_x <= self.max_x && self.min_y <= self.max_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Centre along `dimension` (0 = X, 1 = Y).
    pub fn median(&self, dimension: usize) -> f64 {
        match dimension {
            0 => (self.min_x + self.max_x) / 2.0,
            _ => (self.min_y + self.max_y) / 2.0,
        }
    }

    pub fn min(&self, dimension: usize) -> f64 {
        if dimension == 0 {
            self.min_x
        } else {
            self.min_y
        }
    }

    pub fn max(&self, dimension: usize) -> f64 {
        if dimension == 0 {
            self.max_x
        } else {
            self.max_y
        }
    }

    pub fn span(&self, dimension: usize) -> f64 {
        self.max(dimension) - self.min(dimension)
    }

    /// Closed-interval intersection test. Touching envelopes intersect.
    pub fn intersects(&self, other: &Envelope) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn contains(&self, other: &Envelope) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Overlap of the two rectangles, keeping this envelope's CRS.
    pub fn intersection(&self, other: &Envelope) -> Option<Envelope> {
        if !self.intersects(other) {
            return None;
        }
        Some(Envelope::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
            self.crs.clone(),
        ))
    }

    pub fn expand_to_include(&mut self, other: &Envelope) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            self.min_x = other.min_x;
            self.min_y = other.min_y;
            self.max_x = other.max_x;
            self.max_y = other.max_y;
            return;
        }
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    pub fn expand_by(&mut self, distance: f64) {
        self.min_x -= distance;
        self.min_y -= distance;
        self.max_x += distance;
        self.max_y += distance;
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.min_x += dx;
        self.max_x += dx;
        self.min_y += dy;
        self.max_y += dy;
    }

    /// Same extent with X and Y exchanged.
    pub fn swapped_axes(&self) -> Envelope {
        Envelope::new(
            self.min_y,
            self.min_x,
            self.max_y,
            self.max_x,
            self.crs.clone(),
        )
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_x, y: self.min_y },
            coord! { x: self.max_x, y: self.max_y },
        )
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        self.to_rect().to_polygon()
    }
}

//! Dateline unwrapping of line-like components.
//!
//! After projection a line crossing the dateline jumps by almost a full world
//! width between two consecutive vertices. The filter detects those jumps and
//! offsets the sequence by one world width so the line reads as one
//! continuous path.

use geo::{Coord, Geometry, LineString};
use tracing::warn;

use crate::geometry::for_each_line_mut;
use crate::proj::pipeline::CoordinateTransform;

/// Jumps above this fraction of the world width are ambiguous: they may be a
/// genuine wrap or just a very wide feature.
const AMBIGUOUS_JUMP: f64 = 1.9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    WestToEast,
    EastToWest,
}

/// Normalises lines that jump across the dateline. `radius` is half the world
/// width in rendering units.
pub struct WrappingCoordinateFilter<'a> {
    radius: f64,
    ordinate: usize,
    transform: Option<&'a dyn CoordinateTransform>,
}

impl<'a> WrappingCoordinateFilter<'a> {
    pub fn new(radius: f64, ordinate: usize) -> Self {
        Self {
            radius,
            ordinate,
            transform: None,
        }
    }

    /// Use `transform` (geometry CRS to rendering CRS) to disambiguate very
    /// large jumps.
    pub fn with_transform(mut self, transform: &'a dyn CoordinateTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Unwrap every line string and ring of `geometry`. Returns whether any
    /// coordinate moved.
    pub fn filter(&self, geometry: &mut Geometry<f64>) -> bool {
        let mut changed = false;
        for_each_line_mut(geometry, &mut |line| changed |= self.filter_line(line));
        changed
    }

    /// Unwrap one line. Untouched, and `false`, when no jump is a wrap.
    pub fn filter_line(&self, line: &mut LineString<f64>) -> bool {
        let coords = &mut line.0;
        let Some((first, direction)) = self.first_wrap(coords) else {
            return false;
        };
        let ring = coords.len() > 2 && coords.first() == coords.last();
        let initial = match direction {
            Direction::EastToWest => 0.0,
            Direction::WestToEast => 2.0 * self.radius,
        };
        self.apply_offset(coords, initial, first, ring);
        true
    }

    fn ord(&self, c: &Coord<f64>) -> f64 {
        if self.ordinate == 0 {
            c.x
        } else {
            c.y
        }
    }

    fn shift(&self, c: &mut Coord<f64>, offset: f64) {
        if self.ordinate == 0 {
            c.x += offset;
        } else {
            c.y += offset;
        }
    }

    fn is_wrap_jump(&self, a: Coord<f64>, b: Coord<f64>) -> bool {
        let distance = (self.ord(&b) - self.ord(&a)).abs();
        distance > self.radius && (distance < self.radius * AMBIGUOUS_JUMP || self.is_wrapping(a, b))
    }

    /// Index of the vertex ending the first wrapping jump, with its direction.
    fn first_wrap(&self, coords: &[Coord<f64>]) -> Option<(usize, Direction)> {
        coords.windows(2).enumerate().find_map(|(i, w)| {
            if !self.is_wrap_jump(w[0], w[1]) {
                return None;
            }
            let direction = if self.ord(&w[1]) > self.ord(&w[0]) {
                Direction::WestToEast
            } else {
                Direction::EastToWest
            };
            Some((i + 1, direction))
        })
    }

    /// Toggle the offset at every wrapping jump from `first` on. Jumps before
    /// `first` are already known not to wrap.
    fn apply_offset(&self, coords: &mut [Coord<f64>], mut offset: f64, first: usize, ring: bool) {
        let mut last = coords[0];
        for i in 0..coords.len() {
            let original = coords[i];
            if i == first || (i > first && self.is_wrap_jump(last, original)) {
                offset = if offset != 0.0 { 0.0 } else { 2.0 * self.radius };
            }
            if offset != 0.0 {
                self.shift(&mut coords[i], offset);
            }
            last = original;
        }
        if ring {
            let start = coords[0];
            if let Some(end) = coords.last_mut() {
                *end = start;
            }
        }
    }

    /// Whether the jump from `a` to `b` is a dateline wrap. Without a
    /// transform the coarse heuristic answers yes; otherwise the midpoint of
    /// the two vertices in the geometry CRS is projected and a wrap is
    /// confirmed when it does not land between them.
    fn is_wrapping(&self, a: Coord<f64>, b: Coord<f64>) -> bool {
        let Some(transform) = self.transform else {
            return true;
        };
        let mut pts = [a, b];
        let midpoint = transform.inverse(&mut pts).and_then(|_| {
            let mut mid = [Coord {
                x: (pts[0].x + pts[1].x) / 2.0,
                y: (pts[0].y + pts[1].y) / 2.0,
            }];
            transform.forward(&mut mid).map(|_| mid[0])
        });
        match midpoint {
            Ok(mid) => {
                let (lo, hi) = if self.ord(&a) < self.ord(&b) {
                    (self.ord(&a), self.ord(&b))
                } else {
                    (self.ord(&b), self.ord(&a))
                };
                let m = self.ord(&mid);
                !(m > lo && m < hi)
            }
            Err(e) => {
                warn!(error = %e, "Failed to check dateline wrap by reprojecting the midpoint, assuming it wraps");
                true
            }
        }
    }
}

use geo::{Coord, Geometry, MapCoordsInPlace};

/// Adds a constant to one ordinate (0 = X, 1 = Y) of every coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OffsetOrdinateFilter {
    ordinate: usize,
    offset: f64,
}

impl OffsetOrdinateFilter {
    pub fn new(ordinate: usize, offset: f64) -> Self {
        Self { ordinate, offset }
    }

    pub fn ordinate(&self) -> usize {
        self.ordinate
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Shift `geometry` in place. Always reports the geometry as changed, so
    /// callers must recompute anything derived from its coordinates.
    pub fn filter(&self, geometry: &mut Geometry<f64>) -> bool {
        let (ordinate, offset) = (self.ordinate, self.offset);
        geometry.map_coords_in_place(|c| match ordinate {
            0 => Coord { x: c.x + offset, y: c.y },
            _ => Coord { x: c.x, y: c.y + offset },
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon};

    #[test]
    fn test_offset_x() {
        let mut g = Geometry::LineString(line_string![(x: 10.0, y: 1.0), (x: 20.0, y: 2.0)]);
        assert!(OffsetOrdinateFilter::new(0, 360.0).filter(&mut g));
        assert_eq!(
            g,
            Geometry::LineString(line_string![(x: 370.0, y: 1.0), (x: 380.0, y: 2.0)])
        );
    }

    #[test]
    fn test_offset_y() {
        let mut g = Geometry::Point(point!(x: 10.0, y: 5.0));
        OffsetOrdinateFilter::new(1, -360.0).filter(&mut g);
        assert_eq!(g, Geometry::Point(point!(x: 10.0, y: -355.0)));
    }

    #[test]
    fn test_offset_keeps_rings_closed() {
        let mut g = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]);
        OffsetOrdinateFilter::new(0, 720.0).filter(&mut g);
        let Geometry::Polygon(p) = g else {
            panic!("polygon expected")
        };
        assert!(p.exterior().is_closed());
        assert_eq!(p.exterior().0[0].x, 720.0);
    }
}

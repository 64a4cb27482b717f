//! Handler for projections that repeat every 360° of longitude.
//!
//! Geometries are normalised when they cross the dateline and replicated into
//! every copy of the world visible in the rendering envelope, so wide views
//! look continuous.

use geo::{Coord, Geometry};
use tracing::trace;

use crate::envelope::Envelope;
use crate::error::{HandlerError, Result};
use crate::filter::{OffsetOrdinateFilter, WrappingCoordinateFilter};
use crate::geometry::{assemble_as, envelope_of, flatten, normalise, LeafKind};
use crate::handler::{Handler, ProjectionHandler};
use crate::proj::crs::{AxisOrder, Crs};
use crate::proj::pipeline::{CoordinateTransform, CrsTransform};

#[derive(Clone, Debug)]
pub struct WrappingProjectionHandler {
    core: ProjectionHandler,
    /// Half the world width in rendering units.
    radius: f64,
    max_wraps: u32,
    dateline_x: Option<f64>,
    dateline_wrapping_check: bool,
    /// 1 when the rendering CRS is north/east, so easting is the second ordinate.
    ordinate: usize,
}

impl WrappingProjectionHandler {
    /// Fails with [`HandlerError::Configuration`] when the wrap radius cannot
    /// be derived from the rendering CRS around `central_meridian`.
    pub fn new(
        source_crs: Option<Crs>,
        valid_area: Option<Envelope>,
        rendering_envelope: Envelope,
        central_meridian: f64,
        max_wraps: u32,
    ) -> Result<Self> {
        let core = ProjectionHandler::new(source_crs, valid_area, rendering_envelope)?;
        let rendering_crs = core.rendering_crs();
        let ordinate = match rendering_crs.axis_order() {
            AxisOrder::EastNorth => 0,
            AxisOrder::NorthEast => 1,
        };
        let to_rendering = CrsTransform::new(&Crs::wgs84(), rendering_crs).map_err(|e| {
            HandlerError::Configuration(format!("cannot project into {rendering_crs}: {e}"))
        })?;

        let mut pts = [
            Coord { x: central_meridian, y: 0.0 },
            Coord { x: central_meridian + 180.0, y: 0.0 },
        ];
        to_rendering.forward(&mut pts).map_err(|e| {
            HandlerError::Configuration(format!("cannot compute the wrap radius: {e}"))
        })?;
        let radius = (ord(&pts[1], ordinate) - ord(&pts[0], ordinate)).abs();
        if !(radius.is_finite() && radius > 0.0) {
            return Err(HandlerError::Configuration(format!(
                "wrap radius must be positive, got {radius} for {rendering_crs}"
            )));
        }

        let mut dateline = [Coord { x: 180.0, y: -80.0 }];
        let dateline_x = to_rendering
            .forward(&mut dateline)
            .ok()
            .map(|_| ord(&dateline[0], ordinate));

        Ok(Self {
            core,
            radius,
            max_wraps,
            dateline_x,
            dateline_wrapping_check: true,
            ordinate,
        })
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn max_wraps(&self) -> u32 {
        self.max_wraps
    }

    pub fn dateline_x(&self) -> Option<f64> {
        self.dateline_x
    }

    /// Enable or disable dateline normalisation of wrapped geometries.
    pub fn set_dateline_wrapping_check(&mut self, enabled: bool) {
        self.dateline_wrapping_check = enabled;
    }

    pub fn dateline_wrapping_check(&self) -> bool {
        self.dateline_wrapping_check
    }

    fn unwrap_dateline(
        &self,
        geometry: &Geometry<f64>,
        width: f64,
        transform: Option<&dyn CoordinateTransform>,
    ) -> Option<(Geometry<f64>, Envelope)> {
        let mut filter = WrappingCoordinateFilter::new(self.radius, self.ordinate);
        if let Some(t) = transform {
            filter = filter.with_transform(t);
        }
        let mut copy = geometry.clone();
        if !filter.filter(&mut copy) {
            return None;
        }
        let envelope = envelope_of(&copy, None)?;
        (envelope.span(self.ordinate) < width).then_some((copy, envelope))
    }
}

fn ord(c: &Coord<f64>, ordinate: usize) -> f64 {
    if ordinate == 0 {
        c.x
    } else {
        c.y
    }
}

impl Handler for WrappingProjectionHandler {
    fn core(&self) -> &ProjectionHandler {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ProjectionHandler {
        &mut self.core
    }

    fn is_wrapping(&self) -> bool {
        true
    }

    fn dateline_split(&self) -> Option<(f64, f64)> {
        self.dateline_x.map(|x| (x, self.radius))
    }

    fn requires_processing(&self, _geom_crs: &Crs, _geometry: &Geometry<f64>) -> bool {
        true
    }

    fn post_process_with(
        &self,
        transform: Option<&dyn CoordinateTransform>,
        geometry: Geometry<f64>,
    ) -> Option<Geometry<f64>> {
        let mut geometry = normalise(geometry);
        let mut envelope = envelope_of(&geometry, None)?;
        let re = self.core.rendering_envelope();
        let dim = self.ordinate;
        let world = 2.0 * self.radius;
        let mut width = envelope.span(dim);

        if width < self.radius && re.contains(&envelope) && re.span(dim) <= world {
            trace!("geometry cannot wrap, returned as is");
            return Some(geometry);
        }

        // wider than a world is a genuinely large feature, not a wrapped one
        if self.dateline_wrapping_check && width > self.radius && width < world {
            if let Some((unwrapped, unwrapped_envelope)) =
                self.unwrap_dateline(&geometry, width, transform)
            {
                geometry = unwrapped;
                envelope = unwrapped_envelope;
                width = envelope.span(dim);
            }
        }

        let base = envelope.min(dim);
        let median = re.median(dim);
        let bound = f64::from(self.max_wraps) * world;
        let low = re.min(dim).max(median - bound);
        let high = re.max(dim).min(median + bound);

        // last placement at or west of `low`, moved up a world if it falls
        // short of the view
        let mut curr = if base > low {
            base - ((base - low) / world).ceil() * world
        } else {
            base + ((low - width - base) / world).ceil().max(0.0) * world
        };
        if curr + width < low {
            curr += world;
        }
        if !curr.is_finite() {
            return None;
        }
        let max_copies = ((high - low + width) / world).ceil() as usize + 1;

        let mut leaves = Vec::new();
        let mut kind: Option<LeafKind> = None;
        let mut mixed = false;
        for _ in 0..max_copies {
            if curr >= high {
                break;
            }
            let offset = curr - base;
            let mut copy = geometry.clone();
            if offset.abs() >= self.radius {
                OffsetOrdinateFilter::new(dim, offset).filter(&mut copy);
            }
            let mut parts = Vec::new();
            flatten(copy, &mut parts);
            for part in parts {
                let visible = envelope_of(&part, None).is_some_and(|e| e.intersects(re));
                if !visible {
                    continue;
                }
                let k = LeafKind::of(&part);
                match kind {
                    None if leaves.is_empty() => kind = k,
                    prev if prev != k => mixed = true,
                    _ => {}
                }
                leaves.push(part);
            }
            curr += world;
        }

        assemble_as(leaves, if mixed { None } else { kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proj::crs::{ProjectionMethod, ProjectionParams};
    use crate::proj::ellipsoid::Ellipsoid;
    use geo::{line_string, point, LineString, MultiPoint};

    fn handler(min_x: f64, max_x: f64, max_wraps: u32) -> WrappingProjectionHandler {
        let re = Envelope::with_crs(min_x, -90.0, max_x, 90.0, Crs::wgs84());
        WrappingProjectionHandler::new(Some(Crs::wgs84()), None, re, 0.0, max_wraps).unwrap()
    }

    fn point_xs(g: &Geometry<f64>) -> Vec<f64> {
        match g {
            Geometry::Point(p) => vec![p.x()],
            Geometry::MultiPoint(MultiPoint(pts)) => pts.iter().map(|p| p.x()).collect(),
            other => panic!("points expected, got {other:?}"),
        }
    }

    #[test]
    fn test_geographic_radius() {
        let h = handler(-180.0, 180.0, 10);
        assert_eq!(h.radius(), 180.0);
        assert_eq!(h.dateline_x(), Some(180.0));
        assert!(h.is_wrapping());
    }

    #[test]
    fn test_lat_lon_radius_on_second_ordinate() {
        let re = Envelope::with_crs(-90.0, -180.0, 90.0, 180.0, Crs::wgs84_lat_lon());
        let h = WrappingProjectionHandler::new(None, None, re, 0.0, 10).unwrap();
        assert_eq!(h.radius(), 180.0);
        assert_eq!(h.ordinate, 1);
    }

    #[test]
    fn test_fast_path_returns_input() {
        let h = handler(-180.0, 180.0, 10);
        let g = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0)]);
        assert_eq!(h.post_process(g.clone()), Some(g));
    }

    #[test]
    fn test_point_replicated_per_world() {
        let h = handler(-360.0, 360.0, 10);
        let out = h.post_process(Geometry::Point(point!(x: 0.0, y: 0.0))).unwrap();
        assert!(matches!(out, Geometry::MultiPoint(_)));
        assert_eq!(point_xs(&out), vec![-360.0, 0.0]);
    }

    #[test]
    fn test_replication_bounded_by_wrap_limit() {
        let h = handler(-36000.0, 36000.0, 2);
        let out = h.post_process(Geometry::Point(point!(x: 10.0, y: 0.0))).unwrap();
        // median ± 2 worlds, the upper bound itself excluded
        assert_eq!(point_xs(&out), vec![-710.0, -350.0, 10.0, 370.0]);
    }

    #[test]
    fn test_far_away_geometry_terminates() {
        let h = handler(-180.0, 180.0, 10);
        let copies = h
            .post_process(Geometry::Point(point!(x: 1e20, y: 0.0)))
            .map_or(0, |g| point_xs(&g).len());
        assert!(copies <= 2);
        assert!(h.post_process(Geometry::Point(point!(x: f64::INFINITY, y: 0.0))).is_none());
        assert!(h.post_process(Geometry::Point(point!(x: f64::NAN, y: 0.0))).is_none());
    }

    #[test]
    fn test_far_world_copy_moved_into_view() {
        let h = handler(-180.0, 180.0, 10);
        let out = h.post_process(Geometry::Point(point!(x: 3610.0, y: 0.0))).unwrap();
        assert_eq!(point_xs(&out), vec![10.0]);
    }

    #[test]
    fn test_dateline_line_normalised() {
        let h = handler(-180.0, 180.0, 10);
        let line = Geometry::LineString(line_string![(x: 170.0, y: 0.0), (x: -170.0, y: 5.0)]);
        let out = h.post_process(line).unwrap();
        let Geometry::MultiLineString(mls) = out else {
            panic!("two copies expected")
        };
        let xs: Vec<Vec<f64>> = mls.0.iter().map(|l| l.0.iter().map(|c| c.x).collect()).collect();
        assert_eq!(xs, vec![vec![-190.0, -170.0], vec![170.0, 190.0]]);
    }

    #[test]
    fn test_unwrap_rejected_when_not_narrower() {
        let h = handler(-180.0, 180.0, 10);
        let line = Geometry::LineString(line_string![
            (x: -90.0, y: 0.0),
            (x: 95.0, y: 0.0),
            (x: 170.0, y: 0.0),
            (x: -10.0, y: 0.0),
        ]);
        assert!(h.unwrap_dateline(&line, 260.0, None).is_none());
        assert_eq!(h.post_process(line.clone()), Some(line));
    }

    fn sphere_mercator() -> Crs {
        Crs::projected(
            "sphere mercator",
            ProjectionParams::new(ProjectionMethod::Mercator).with_ellipsoid(Ellipsoid::sphere(6_378_137.0)),
        )
    }

    fn projected_line(transform: &CrsTransform, from: f64, to: f64) -> Geometry<f64> {
        let mut coords = [Coord { x: from, y: 0.0 }, Coord { x: to, y: 10.0 }];
        transform.forward(&mut coords).unwrap();
        Geometry::LineString(LineString::from(coords.to_vec()))
    }

    #[test]
    fn test_wide_jump_refined_through_transform() {
        let merc = sphere_mercator();
        let to_merc = CrsTransform::new(&Crs::wgs84(), &merc).unwrap();
        let half = 20_037_508.342_789_244;
        let re = Envelope::with_crs(-half, -1e7, half, 1e7, merc);
        let h = WrappingProjectionHandler::new(Some(Crs::wgs84()), None, re, 0.0, 10).unwrap();

        // 179 to -179 in lon/lat runs through the prime meridian: a real feature
        let line = projected_line(&to_merc, 179.0, -179.0);
        assert_eq!(h.post_process_with(Some(&to_merc), line.clone()), Some(line.clone()));

        // without the transform the same jump is taken for a dateline wrap
        let Some(Geometry::MultiLineString(copies)) = h.post_process(line) else {
            panic!("two copies expected")
        };
        assert_eq!(copies.0.len(), 2);
    }

    #[test]
    fn test_dateline_check_disabled() {
        let mut h = handler(-180.0, 180.0, 10);
        h.set_dateline_wrapping_check(false);
        let line = Geometry::LineString(line_string![(x: 170.0, y: 0.0), (x: -170.0, y: 5.0)]);
        let out = h.post_process(line.clone()).unwrap();
        assert_eq!(out, line);
    }

    #[test]
    fn test_wider_than_world_left_alone() {
        let h = handler(-180.0, 180.0, 10);
        let line = Geometry::LineString(line_string![(x: -180.0, y: -80.0), (x: 180.0, y: -80.0)]);
        assert_eq!(h.post_process(line.clone()), Some(line));
    }

    #[test]
    fn test_invisible_geometry_dropped() {
        let h = handler(-180.0, 180.0, 10);
        let g = Geometry::Point(point!(x: 0.0, y: 95.0));
        assert!(h.post_process(g).is_none());
    }

    #[test]
    fn test_empty_geometry_is_none() {
        let h = handler(-180.0, 180.0, 10);
        let empty = Geometry::MultiPoint(MultiPoint(vec![]));
        assert!(h.post_process(empty).is_none());
    }
}

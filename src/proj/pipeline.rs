//! CRS-to-CRS transform chain that dispatches between
//! native pure-Rust projections and proj4rs fallback.

use geo::Coord;
use proj4rs::Proj;
use tracing::trace;

use crate::envelope::Envelope;
use crate::error::ProjError;
use crate::proj::crs::{AxisOrder, Crs, CrsKind, ProjectionMethod};
use crate::proj::equirectangular::Equirectangular;
use crate::proj::mercator::{Mercator, WebMercator};
use crate::proj::van_der_grinten::VanDerGrinten;
use crate::proj::Projection;

/// Point transform between two CRSs, in their native units and axis order.
pub trait CoordinateTransform {
    /// Source CRS to target CRS, in place.
    fn forward(&self, coords: &mut [Coord<f64>]) -> Result<(), ProjError>;

    /// Target CRS to source CRS, in place.
    fn inverse(&self, coords: &mut [Coord<f64>]) -> Result<(), ProjError>;
}

/// Leaves coordinates untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityTransform;

impl CoordinateTransform for IdentityTransform {
    fn forward(&self, _coords: &mut [Coord<f64>]) -> Result<(), ProjError> {
        Ok(())
    }

    fn inverse(&self, _coords: &mut [Coord<f64>]) -> Result<(), ProjError> {
        Ok(())
    }
}

/// Describes a CRS endpoint of a native transform.
enum CrsEndpoint {
    /// Geographic CRS: degrees externally, radians into the projections.
    Geographic,
    /// Projected CRS, coordinates are in meters.
    Projected(Box<dyn Projection>),
}

impl CrsEndpoint {
    /// Native endpoint for `crs`, if its math is implemented here and no
    /// datum shift is involved.
    fn native(crs: &Crs) -> Option<Self> {
        if crs.has_datum_shift() {
            return None;
        }
        match crs.kind() {
            CrsKind::Geographic { .. } => Some(Self::Geographic),
            CrsKind::Projected(p) => match p.method {
                ProjectionMethod::Mercator if p.ellipsoid.is_sphere() => {
                    Some(Self::Projected(Box::new(WebMercator::from_params(p))))
                }
                ProjectionMethod::Mercator => Some(Self::Projected(Box::new(Mercator::from_params(p)))),
                ProjectionMethod::EquidistantCylindrical => {
                    Some(Self::Projected(Box::new(Equirectangular::from_params(p))))
                }
                ProjectionMethod::WorldVanDerGrintenI => {
                    Some(Self::Projected(Box::new(VanDerGrinten::from_params(p))))
                }
                _ => None,
            },
        }
    }
}

enum Engine {
    /// Both endpoints are native projections.
    Native { src: CrsEndpoint, dst: CrsEndpoint },
    /// Fallback to proj4rs for anything else.
    Proj4rs { src: Proj, dst: Proj },
}

/// A CRS-to-CRS transform.
///
/// Uses native projection math when both CRSs allow it and proj4rs otherwise.
/// Native Mercator keeps longitudes unbounded, which wrapped rendering
/// envelopes rely on. Van der Grinten I is native only, proj4rs lacks it.
pub struct CrsTransform {
    src_axis: AxisOrder,
    dst_axis: AxisOrder,
    engine: Engine,
}

impl CrsTransform {
    pub fn new(src: &Crs, dst: &Crs) -> Result<Self, ProjError> {
        let engine = match (CrsEndpoint::native(src), CrsEndpoint::native(dst)) {
            (Some(s), Some(d)) => Engine::Native { src: s, dst: d },
            _ => {
                trace!(src = %src, dst = %dst, "using proj4rs transform");
                Engine::Proj4rs {
                    src: load_proj(src)?,
                    dst: load_proj(dst)?,
                }
            }
        };
        Ok(Self {
            src_axis: src.axis_order(),
            dst_axis: dst.axis_order(),
            engine,
        })
    }

    pub fn is_native(&self) -> bool {
        matches!(self.engine, Engine::Native { .. })
    }

    fn transform_one(&self, c: Coord<f64>, reverse: bool) -> Result<Coord<f64>, ProjError> {
        let (from_axis, to_axis) = if reverse {
            (self.dst_axis, self.src_axis)
        } else {
            (self.src_axis, self.dst_axis)
        };
        let (x, y) = to_east_north(c, from_axis);

        let (x, y) = match &self.engine {
            Engine::Native { src, dst } => {
                let (from, to) = if reverse { (dst, src) } else { (src, dst) };
                match (from, to) {
                    (CrsEndpoint::Geographic, CrsEndpoint::Geographic) => (x, y),
                    _ => {
                        let (lon, lat) = match from {
                            CrsEndpoint::Geographic => (x.to_radians(), y.to_radians()),
                            CrsEndpoint::Projected(proj) => proj.inverse(x, y)?,
                        };
                        match to {
                            CrsEndpoint::Geographic => (lon.to_degrees(), lat.to_degrees()),
                            CrsEndpoint::Projected(proj) => proj.forward(lon, lat)?,
                        }
                    }
                }
            }
            Engine::Proj4rs { src, dst } => {
                let (from, to) = if reverse { (dst, src) } else { (src, dst) };
                let mut point = if from.is_latlong() {
                    (x.to_radians(), y.to_radians())
                } else {
                    (x, y)
                };
                proj4rs::transform::transform(from, to, &mut point)
                    .map_err(|e| ProjError::TransformFailed(e.to_string()))?;
                if to.is_latlong() {
                    (point.0.to_degrees(), point.1.to_degrees())
                } else {
                    point
                }
            }
        };

        if !(x.is_finite() && y.is_finite()) {
            return Err(ProjError::TransformFailed(format!(
                "non-finite result for ({}, {})",
                c.x, c.y
            )));
        }
        Ok(from_east_north(x, y, to_axis))
    }

    fn run(&self, coords: &mut [Coord<f64>], reverse: bool) -> Result<(), ProjError> {
        for c in coords.iter_mut() {
            *c = self.transform_one(*c, reverse)?;
        }
        Ok(())
    }

    /// Bounding envelope of `segments` samples per edge of `envelope`, tagged
    /// with `target`. Samples that fail to transform are skipped; it is an
    /// error when none succeed.
    pub fn transform_envelope(
        &self,
        envelope: &Envelope,
        target: &Crs,
        segments: usize,
    ) -> Result<Envelope, ProjError> {
        let segments = segments.max(1);
        let mut result: Option<Envelope> = None;
        let mut last_error = None;
        for c in boundary_samples(envelope, segments) {
            match self.transform_one(c, false) {
                Ok(p) => {
                    let pt = Envelope::new(p.x, p.y, p.x, p.y, None);
                    match result.as_mut() {
                        Some(r) => r.expand_to_include(&pt),
                        None => result = Some(pt),
                    }
                }
                Err(e) => last_error = Some(e),
            }
        }
        match result {
            Some(r) => Ok(r.retagged(Some(target.clone()))),
            None => Err(last_error
                .unwrap_or_else(|| ProjError::TransformFailed("empty envelope".into()))),
        }
    }
}

impl CoordinateTransform for CrsTransform {
    fn forward(&self, coords: &mut [Coord<f64>]) -> Result<(), ProjError> {
        self.run(coords, false)
    }

    fn inverse(&self, coords: &mut [Coord<f64>]) -> Result<(), ProjError> {
        self.run(coords, true)
    }
}

/// Reproject `envelope` (which must carry a CRS) into `target`.
pub fn transform_envelope(
    envelope: &Envelope,
    target: &Crs,
    segments: usize,
) -> Result<Envelope, ProjError> {
    let src = envelope
        .crs()
        .ok_or_else(|| ProjError::InvalidParameter("envelope has no CRS".into()))?;
    if envelope.is_empty() {
        return Err(ProjError::InvalidParameter("empty envelope".into()));
    }
    if src.equals_ignore_metadata(target) {
        return Ok(envelope.retagged(Some(target.clone())));
    }
    CrsTransform::new(src, target)?.transform_envelope(envelope, target, segments)
}

fn load_proj(crs: &Crs) -> Result<Proj, ProjError> {
    Proj::from_proj_string(&crs.proj4_definition())
        .map_err(|e| ProjError::UnknownCrs(format!("{crs}: {e}")))
}

fn to_east_north(c: Coord<f64>, axis: AxisOrder) -> (f64, f64) {
    match axis {
        AxisOrder::EastNorth => (c.x, c.y),
        AxisOrder::NorthEast => (c.y, c.x),
    }
}

fn from_east_north(x: f64, y: f64, axis: AxisOrder) -> Coord<f64> {
    match axis {
        AxisOrder::EastNorth => Coord { x, y },
        AxisOrder::NorthEast => Coord { x: y, y: x },
    }
}

fn boundary_samples(env: &Envelope, segments: usize) -> Vec<Coord<f64>> {
    let mut pts = Vec::with_capacity(4 * (segments + 1));
    let (w, h) = (env.width(), env.height());
    for i in 0..=segments {
        let t = i as f64 / segments as f64;
        let x = env.min_x + t * w;
        let y = env.min_y + t * h;
        pts.push(Coord { x, y: env.min_y });
        pts.push(Coord { x, y: env.max_y });
        pts.push(Coord { x: env.min_x, y });
        pts.push(Coord { x: env.max_x, y });
    }
    pts
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn web_mercator() -> Crs {
        Crs::from_proj_string(
            "EPSG:3857",
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +no_defs",
        )
        .unwrap()
    }

    #[test]
    fn test_native_web_mercator() {
        let t = CrsTransform::new(&Crs::wgs84(), &web_mercator()).unwrap();
        assert!(t.is_native());
        let mut pts = [Coord { x: 180.0, y: 0.0 }];
        t.forward(&mut pts).unwrap();
        assert_relative_eq!(pts[0].x, 20_037_508.342_789_244, epsilon = 0.01);
        t.inverse(&mut pts).unwrap();
        assert_relative_eq!(pts[0].x, 180.0, epsilon = 1e-9);
    }

    #[test]
    fn test_native_keeps_longitude_unbounded() {
        let t = CrsTransform::new(&web_mercator(), &Crs::wgs84()).unwrap();
        let mut pts = [Coord { x: 3.0 * 20_037_508.342_789_244, y: 0.0 }];
        t.forward(&mut pts).unwrap();
        assert_relative_eq!(pts[0].x, 540.0, epsilon = 1e-6);
    }

    #[test]
    fn test_native_van_der_grinten() {
        let vdg = Crs::from_proj_string("vdg", "+proj=vandg +lon_0=0 +R=6371000 +units=m +no_defs").unwrap();
        let t = CrsTransform::new(&Crs::wgs84(), &vdg).unwrap();
        assert!(t.is_native());
        let mut pts = [Coord { x: 180.0, y: 0.0 }];
        t.forward(&mut pts).unwrap();
        assert_relative_eq!(pts[0].x, std::f64::consts::PI * 6_371_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_axis_swap() {
        let t = CrsTransform::new(&Crs::wgs84_lat_lon(), &Crs::wgs84()).unwrap();
        let mut pts = [Coord { x: 45.0, y: 10.0 }];
        t.forward(&mut pts).unwrap();
        assert_eq!(pts[0], Coord { x: 10.0, y: 45.0 });
    }

    #[test]
    fn test_proj4rs_fallback_utm() {
        let utm = Crs::from_proj_string("utm33", "+proj=utm +zone=33 +datum=WGS84 +units=m +no_defs")
            .unwrap();
        let t = CrsTransform::new(&Crs::wgs84(), &utm).unwrap();
        assert!(!t.is_native());
        let mut pts = [Coord { x: 15.0, y: 52.0 }];
        t.forward(&mut pts).unwrap();
        assert_relative_eq!(pts[0].x, 500_000.0, epsilon = 1.0);
        assert!(pts[0].y > 5_760_000.0 && pts[0].y < 5_762_000.0, "northing = {}", pts[0].y);
        t.inverse(&mut pts).unwrap();
        assert_relative_eq!(pts[0].x, 15.0, epsilon = 1e-8);
        assert_relative_eq!(pts[0].y, 52.0, epsilon = 1e-8);
    }

    #[test]
    fn test_transform_envelope_geographic_identity() {
        let env = Envelope::with_crs(170.0, -10.0, 190.0, 10.0, Crs::wgs84());
        let out = transform_envelope(&env, &Crs::wgs84(), 10).unwrap();
        assert_eq!(out, env);
    }

    #[test]
    fn test_transform_envelope_to_mercator() {
        let env = Envelope::with_crs(-180.0, -60.0, 180.0, 60.0, Crs::wgs84());
        let out = transform_envelope(&env, &web_mercator(), 10).unwrap();
        assert_relative_eq!(out.max_x, 20_037_508.342_789_244, epsilon = 0.01);
        assert_relative_eq!(out.min_x, -out.max_x, epsilon = 1e-6);
        assert!(out.crs().unwrap().equals_ignore_metadata(&web_mercator()));
    }

    #[test]
    fn test_transform_envelope_needs_crs() {
        let env = Envelope::new(0.0, 0.0, 1.0, 1.0, None);
        assert!(transform_envelope(&env, &Crs::wgs84(), 10).is_err());
    }

    #[test]
    fn test_identity_transform() {
        let mut pts = [Coord { x: 1.0, y: 2.0 }];
        IdentityTransform.forward(&mut pts).unwrap();
        IdentityTransform.inverse(&mut pts).unwrap();
        assert_eq!(pts[0], Coord { x: 1.0, y: 2.0 });
    }
}

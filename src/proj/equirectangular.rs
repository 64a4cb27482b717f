//! Equidistant cylindrical (Plate Carrée) projection.
//!
//! x = a·cos(φ₁)·(λ - λ₀), y = a·(φ - φ₀). Longitudes are not reduced, so a
//! wrapped rendering envelope maps onto further copies of the world.

use crate::error::ProjError;
use crate::proj::crs::ProjectionParams;
use crate::proj::ellipsoid::Ellipsoid;
use crate::proj::Projection;

pub struct Equirectangular {
    /// Metres per radian of longitude along the standard parallel.
    kx: f64,
    /// Metres per radian of latitude.
    ky: f64,
    lon0: f64,
    lat0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl Equirectangular {
    /// Angles in radians.
    pub fn new(
        ellipsoid: Ellipsoid,
        lon0: f64,
        lat0: f64,
        lat_ts: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        Self {
            kx: ellipsoid.a * lat_ts.cos(),
            ky: ellipsoid.a,
            lon0,
            lat0,
            false_easting,
            false_northing,
        }
    }

    pub fn from_params(p: &ProjectionParams) -> Self {
        Self::new(
            p.ellipsoid,
            p.central_meridian.to_radians(),
            p.latitude_of_origin.unwrap_or(0.0).to_radians(),
            p.standard_parallel_1.unwrap_or(0.0).to_radians(),
            p.false_easting,
            p.false_northing,
        )
    }
}

impl Projection for Equirectangular {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        Ok((
            self.kx * (lon - self.lon0) + self.false_easting,
            self.ky * (lat - self.lat0) + self.false_northing,
        ))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        if self.kx == 0.0 {
            return Err(ProjError::InvalidParameter(
                "equidistant cylindrical with a zero length parallel".into(),
            ));
        }
        Ok((
            self.lon0 + (x - self.false_easting) / self.kx,
            self.lat0 + (y - self.false_northing) / self.ky,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proj::crs::ProjectionMethod;
    use crate::proj::ellipsoid::WGS84;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn eqc() -> ProjectionParams {
        ProjectionParams::new(ProjectionMethod::EquidistantCylindrical)
    }

    #[test]
    fn test_central_meridian_offsets_easting() {
        let proj = Equirectangular::from_params(&eqc().with_central_meridian(150.0));
        let (x, y) = proj.forward(150.0_f64.to_radians(), 0.0).unwrap();
        assert_relative_eq!(x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(y, 0.0, epsilon = 1e-6);

        let (lon, _) = proj.inverse(PI * WGS84.a, 0.0).unwrap();
        assert_relative_eq!(lon.to_degrees(), 330.0, epsilon = 1e-9);
    }

    #[test]
    fn test_standard_parallel_shrinks_easting() {
        let proj = Equirectangular::from_params(&eqc().with_standard_parallels(60.0, None));
        let (x, _) = proj.forward(PI, 0.0).unwrap();
        assert_relative_eq!(x, PI * WGS84.a * 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_unbounded_longitude() {
        let proj = Equirectangular::from_params(&eqc());
        let (x, _) = proj.forward(3.0 * PI, 0.0).unwrap();
        assert_relative_eq!(x, 3.0 * PI * WGS84.a, epsilon = 1e-6);
        let (lon, lat) = proj.inverse(x, 1e6).unwrap();
        assert_relative_eq!(lon, 3.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(lat, 1e6 / WGS84.a, epsilon = 1e-12);
    }

    #[test]
    fn test_polar_parallel_has_no_inverse() {
        let proj = Equirectangular::new(WGS84, 0.0, 0.0, PI / 2.0, 0.0, 0.0);
        assert!(proj.kx.abs() < 1e-6);
        let zero = Equirectangular::from_params(&eqc().with_ellipsoid(Ellipsoid::sphere(0.0)));
        assert!(zero.inverse(1.0, 1.0).is_err());
    }
}

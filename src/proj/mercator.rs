//! Mercator projection, ellipsoidal and spherical (Web Mercator).
//!
//! Ellipsoidal:
//!   forward: x = a·k₀·(λ - λ₀), y = -a·k₀·ln(tsfn(φ, e))
//!   inverse: λ = λ₀ + x/(a·k₀), φ = phi_from_ts(exp(-y/(a·k₀)), e)
//!
//! Spherical:
//!   forward: x = R·(λ - λ₀), y = R·ln(tan(π/4 + φ/2))
//!   inverse: λ = λ₀ + x/R, φ = 2·atan(exp(y/R)) - π/2

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::error::ProjError;
use crate::proj::common::{msfn, phi_from_ts, tsfn};
use crate::proj::crs::ProjectionParams;
use crate::proj::ellipsoid::{Ellipsoid, WGS84};
use crate::proj::Projection;

/// Ellipsoidal Mercator projection.
pub struct Mercator {
    ellipsoid: Ellipsoid,
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl Mercator {
    /// `lon0` and `lat_ts` in radians. The scale at the equator is
    /// `scale_factor · m(lat_ts)`.
    pub fn new(
        ellipsoid: Ellipsoid,
        lon0: f64,
        lat_ts: f64,
        scale_factor: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let k0 = scale_factor * msfn(lat_ts, ellipsoid.e2);
        Self {
            ellipsoid,
            lon0,
            k0,
            false_easting,
            false_northing,
        }
    }

    pub fn from_params(p: &ProjectionParams) -> Self {
        Self::new(
            p.ellipsoid,
            p.central_meridian.to_radians(),
            p.standard_parallel_1.unwrap_or(0.0).to_radians(),
            p.scale_factor,
            p.false_easting,
            p.false_northing,
        )
    }
}

impl Projection for Mercator {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        if lat.abs() >= FRAC_PI_2 {
            return Err(ProjError::TransformFailed(format!(
                "latitude {} is a Mercator pole",
                lat.to_degrees()
            )));
        }
        let e = self.ellipsoid.eccentricity();
        let x = self.ellipsoid.a * self.k0 * (lon - self.lon0) + self.false_easting;
        let y = self.ellipsoid.a * self.k0 * (-tsfn(lat, e).ln()) + self.false_northing;
        Ok((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let e = self.ellipsoid.eccentricity();
        let lon = self.lon0 + (x - self.false_easting) / (self.ellipsoid.a * self.k0);
        let ts = (-(y - self.false_northing) / (self.ellipsoid.a * self.k0)).exp();
        Ok((lon, phi_from_ts(ts, e)))
    }
}

/// Maximum latitude for Web Mercator (≈85.0511°): atan(sinh(π)) in radians.
const MAX_LAT_3857: f64 = 1.4844222297453324;

/// Spherical Mercator. With the default radius this is EPSG:3857.
pub struct WebMercator {
    ellipsoid: Ellipsoid,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl WebMercator {
    pub fn new() -> Self {
        Self::with_params(WGS84.a, 0.0, 0.0, 0.0)
    }

    /// `lon0` in radians.
    pub fn with_params(radius: f64, lon0: f64, false_easting: f64, false_northing: f64) -> Self {
        Self {
            ellipsoid: Ellipsoid::sphere(radius),
            lon0,
            false_easting,
            false_northing,
        }
    }

    pub fn from_params(p: &ProjectionParams) -> Self {
        let lat_ts = p.standard_parallel_1.unwrap_or(0.0).to_radians();
        let radius = p.ellipsoid.a * p.scale_factor * lat_ts.cos();
        Self::with_params(
            radius,
            p.central_meridian.to_radians(),
            p.false_easting,
            p.false_northing,
        )
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        Self::new()
    }
}

impl Projection for WebMercator {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        let lat = lat.clamp(-MAX_LAT_3857, MAX_LAT_3857);
        let x = self.ellipsoid.a * (lon - self.lon0) + self.false_easting;
        let y = self.ellipsoid.a * (FRAC_PI_4 + lat / 2.0).tan().ln() + self.false_northing;
        Ok((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let lon = self.lon0 + (x - self.false_easting) / self.ellipsoid.a;
        let lat = 2.0 * ((y - self.false_northing) / self.ellipsoid.a).exp().atan() - FRAC_PI_2;
        Ok((lon, lat))
    }
}

//! Van der Grinten I projection (spherical).
//!
//! The whole world fits a disk of radius π·R, so the 180° meridian on the
//! equator lies at x = ±π·R. Longitudes are reduced to [-π, π] around the
//! central meridian; the inverse rejects points outside the disk.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, PI};

use crate::error::ProjError;
use crate::proj::crs::ProjectionParams;
use crate::proj::Projection;

const EPS: f64 = 1e-10;

pub struct VanDerGrinten {
    radius: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl VanDerGrinten {
    /// `lon0` in radians.
    pub fn new(radius: f64, lon0: f64, false_easting: f64, false_northing: f64) -> Self {
        Self {
            radius,
            lon0,
            false_easting,
            false_northing,
        }
    }

    pub fn from_params(p: &ProjectionParams) -> Self {
        Self::new(
            p.ellipsoid.a,
            p.central_meridian.to_radians(),
            p.false_easting,
            p.false_northing,
        )
    }
}

fn reduce_longitude(lon: f64) -> f64 {
    if lon.abs() > PI {
        (lon + PI).rem_euclid(2.0 * PI) - PI
    } else {
        lon
    }
}

impl Projection for VanDerGrinten {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        if lat.abs() > FRAC_PI_2 + EPS {
            return Err(ProjError::TransformFailed(format!(
                "latitude {lat} out of range for van der Grinten"
            )));
        }
        let dlon = reduce_longitude(lon - self.lon0);
        let scale = PI * self.radius;
        let p2 = (lat / FRAC_PI_2).abs().min(1.0);

        let (x, y) = if lat.abs() < EPS {
            (self.radius * dlon, 0.0)
        } else if dlon.abs() < EPS || (p2 - 1.0).abs() < EPS {
            let theta = p2.asin();
            (0.0, (scale * (theta / 2.0).tan()).copysign(lat))
        } else {
            let (s, c) = p2.asin().sin_cos();
            let a = 0.5 * (PI / dlon - dlon / PI).abs();
            let g = c / (s + c - 1.0);
            let p = g * (2.0 / s - 1.0);
            let q = a * a + g;
            let (aa, pp) = (a * a, p * p);
            let gp = g - pp;
            let den = pp + aa;
            let x = (a * gp + (aa * gp * gp - den * (g * g - pp)).max(0.0).sqrt()) / den;
            let y = (p * q - a * ((aa + 1.0) * den - q * q).max(0.0).sqrt()) / den;
            ((scale * x).copysign(dlon), (scale * y).copysign(lat))
        };
        Ok((x + self.false_easting, y + self.false_northing))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let scale = PI * self.radius;
        let xx = (x - self.false_easting) / scale;
        let yy = (y - self.false_northing) / scale;
        let (x2, y2) = (xx * xx, yy * yy);
        let r2 = x2 + y2;
        if r2 > 1.0 + 1e-9 {
            return Err(ProjError::TransformFailed(format!(
                "({x}, {y}) lies outside the van der Grinten disk"
            )));
        }
        if yy.abs() < EPS {
            return Ok((self.lon0 + PI * xx, 0.0));
        }

        let c1 = -yy.abs() * (1.0 + r2);
        let c2 = c1 - 2.0 * y2 + x2;
        let c3 = -2.0 * c1 + 1.0 + 2.0 * y2 + r2 * r2;
        let d = y2 / c3 + (2.0 * c2.powi(3) / c3.powi(3) - 9.0 * c1 * c2 / (c3 * c3)) / 27.0;
        let a1 = (c1 - c2 * c2 / (3.0 * c3)) / c3;
        let m1 = 2.0 * (-a1 / 3.0).sqrt();
        let theta = ((3.0 * d) / (a1 * m1)).clamp(-1.0, 1.0).acos() / 3.0;
        let lat = (PI * (-m1 * (theta + FRAC_PI_3).cos() - c2 / (3.0 * c3))).copysign(yy);

        let dlon = if xx.abs() < EPS {
            0.0
        } else {
            PI * (r2 - 1.0 + (1.0 + 2.0 * (x2 - y2) + r2 * r2).sqrt()) / (2.0 * xx)
        };
        Ok((self.lon0 + dlon, lat))
    }
}

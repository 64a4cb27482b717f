/// Reference ellipsoid parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis (metres)
    pub a: f64,
    /// Flattening (dimensionless)
    pub f: f64,
    /// Semi-minor axis: a * (1 - f)
    pub b: f64,
    /// First eccentricity squared
    pub e2: f64,
}

impl Ellipsoid {
    pub const fn new(a: f64, f: f64) -> Self {
        let b = a * (1.0 - f);
        let e2 = 2.0 * f - f * f;
        Self { a, f, b, e2 }
    }

    /// Ellipsoid from both semi-axes, as found in `+a=... +b=...` definitions.
    pub const fn from_axes(a: f64, b: f64) -> Self {
        Self::new(a, (a - b) / a)
    }

    /// Sphere of radius `r`.
    pub const fn sphere(r: f64) -> Self {
        Self::new(r, 0.0)
    }

    /// Look up a named ellipsoid (`+ellps=` / `+datum=` values).
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "WGS84" => Some(WGS84),
            "GRS80" | "NAD83" | "ETRS89" => Some(GRS80),
            "INTL" | "ED50" => Some(INTERNATIONAL_1924),
            "CLRK66" | "NAD27" => Some(CLARKE_1866),
            _ => None,
        }
    }

    /// Get the first eccentricity.
    pub fn eccentricity(&self) -> f64 {
        self.e2.sqrt()
    }

    pub fn is_sphere(&self) -> bool {
        self.f == 0.0
    }

    /// Parameter comparison with a relative tolerance, used for CRS equality.
    pub fn approx_eq(&self, other: &Ellipsoid) -> bool {
        (self.a - other.a).abs() <= 1e-9 * self.a.abs().max(1.0)
            && (self.f - other.f).abs() <= 1e-12
    }
}

pub const WGS84: Ellipsoid = Ellipsoid::new(6_378_137.0, 1.0 / 298.257_223_563);
pub const GRS80: Ellipsoid = Ellipsoid::new(6_378_137.0, 1.0 / 298.257_222_101);
pub const INTERNATIONAL_1924: Ellipsoid = Ellipsoid::new(6_378_388.0, 1.0 / 297.0);
pub const CLARKE_1866: Ellipsoid = Ellipsoid::from_axes(6_378_206.4, 6_356_583.8);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wgs84_constants() {
        assert_relative_eq!(WGS84.a, 6_378_137.0);
        assert_relative_eq!(WGS84.b, 6_356_752.314_245_179, epsilon = 0.001);
        assert_relative_eq!(WGS84.eccentricity(), 0.081_819_190_842_622, epsilon = 1e-12);
    }

    #[test]
    fn test_grs80_close_to_wgs84() {
        assert!(WGS84.approx_eq(&GRS80) || (WGS84.f - GRS80.f).abs() < 1e-8);
        assert_relative_eq!(WGS84.a, GRS80.a);
    }

    #[test]
    fn test_by_name() {
        assert_eq!(Ellipsoid::by_name("wgs84"), Some(WGS84));
        assert_eq!(Ellipsoid::by_name("intl"), Some(INTERNATIONAL_1924));
        assert_eq!(Ellipsoid::by_name("bessel"), None);
    }

    #[test]
    fn test_sphere() {
        let s = Ellipsoid::sphere(6_378_137.0);
        assert!(s.is_sphere());
        assert_relative_eq!(s.eccentricity(), 0.0);
        assert_relative_eq!(Ellipsoid::from_axes(6_378_137.0, 6_378_137.0).f, 0.0);
    }
}

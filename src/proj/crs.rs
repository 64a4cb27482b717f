//! CRS descriptors.
//!
//! A [`Crs`] carries the parameters the handlers reason about (projection
//! method, central meridian, standard parallels, axis order) together with the
//! proj4 definition used when the transform has to fall back to proj4rs.

use std::collections::HashMap;
use std::fmt;

use crate::error::ProjError;
use crate::proj::ellipsoid::{Ellipsoid, WGS84};

/// Tolerance for parameter comparison in [`Crs::equals_ignore_metadata`].
const PARAM_EPS: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisOrder {
    /// (easting, northing) / (longitude, latitude)
    EastNorth,
    /// (northing, easting) / (latitude, longitude)
    NorthEast,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProjectionMethod {
    Mercator,
    TransverseMercator,
    PolarStereographic,
    ObliqueStereographic,
    LambertAzimuthalEqualArea,
    LambertConformalConic,
    AlbersEqualArea,
    EquidistantConic,
    WorldVanDerGrintenI,
    EquidistantCylindrical,
    /// Any other proj4 `+proj=` name.
    Other(String),
}

impl ProjectionMethod {
    /// Map a proj4 `+proj=` value, folding `stere` onto its polar or oblique form.
    fn from_proj_name(name: &str, lat0: Option<f64>) -> Self {
        match name {
            "merc" | "webmerc" => Self::Mercator,
            "tmerc" | "etmerc" | "utm" => Self::TransverseMercator,
            "stere" if lat0.is_some_and(|l| (l.abs() - 90.0).abs() < PARAM_EPS) => {
                Self::PolarStereographic
            }
            "ups" => Self::PolarStereographic,
            "stere" | "sterea" => Self::ObliqueStereographic,
            "laea" => Self::LambertAzimuthalEqualArea,
            "lcc" => Self::LambertConformalConic,
            "aea" => Self::AlbersEqualArea,
            "eqdc" => Self::EquidistantConic,
            "vandg" => Self::WorldVanDerGrintenI,
            "eqc" => Self::EquidistantCylindrical,
            other => Self::Other(other.to_string()),
        }
    }

    fn proj_name(&self) -> &str {
        match self {
            Self::Mercator => "merc",
            Self::TransverseMercator => "tmerc",
            Self::PolarStereographic => "stere",
            Self::ObliqueStereographic => "sterea",
            Self::LambertAzimuthalEqualArea => "laea",
            Self::LambertConformalConic => "lcc",
            Self::AlbersEqualArea => "aea",
            Self::EquidistantConic => "eqdc",
            Self::WorldVanDerGrintenI => "vandg",
            Self::EquidistantCylindrical => "eqc",
            Self::Other(name) => name,
        }
    }
}

/// Projection parameters. Angles are in degrees, offsets in metres.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionParams {
    pub method: ProjectionMethod,
    pub ellipsoid: Ellipsoid,
    pub central_meridian: f64,
    pub latitude_of_origin: Option<f64>,
    pub standard_parallel_1: Option<f64>,
    pub standard_parallel_2: Option<f64>,
    pub scale_factor: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl ProjectionParams {
    pub fn new(method: ProjectionMethod) -> Self {
        Self {
            method,
            ellipsoid: WGS84,
            central_meridian: 0.0,
            latitude_of_origin: None,
            standard_parallel_1: None,
            standard_parallel_2: None,
            scale_factor: 1.0,
            false_easting: 0.0,
            false_northing: 0.0,
        }
    }

    pub fn with_central_meridian(mut self, lon: f64) -> Self {
        self.central_meridian = lon;
        self
    }

    pub fn with_latitude_of_origin(mut self, lat: f64) -> Self {
        self.latitude_of_origin = Some(lat);
        self
    }

    pub fn with_standard_parallels(mut self, sp1: f64, sp2: Option<f64>) -> Self {
        self.standard_parallel_1 = Some(sp1);
        self.standard_parallel_2 = sp2;
        self
    }

    pub fn with_ellipsoid(mut self, ellipsoid: Ellipsoid) -> Self {
        self.ellipsoid = ellipsoid;
        self
    }

    fn approx_eq(&self, other: &Self) -> bool {
        fn close(a: f64, b: f64) -> bool {
            (a - b).abs() <= PARAM_EPS * a.abs().max(1.0)
        }
        fn close_opt(a: Option<f64>, b: Option<f64>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => close(a, b),
                (None, None) => true,
                _ => false,
            }
        }
        self.method == other.method
            && self.ellipsoid.approx_eq(&other.ellipsoid)
            && close(self.central_meridian, other.central_meridian)
            && close_opt(self.latitude_of_origin, other.latitude_of_origin)
            && close_opt(self.standard_parallel_1, other.standard_parallel_1)
            && close_opt(self.standard_parallel_2, other.standard_parallel_2)
            && close(self.scale_factor, other.scale_factor)
            && close(self.false_easting, other.false_easting)
            && close(self.false_northing, other.false_northing)
    }

    fn to_proj_string(&self) -> String {
        let mut def = format!("+proj={}", self.method.proj_name());
        let lat0 = match self.method {
            ProjectionMethod::PolarStereographic => self
                .latitude_of_origin
                .or_else(|| self.standard_parallel_1.map(|sp| 90f64.copysign(sp))),
            _ => self.latitude_of_origin,
        };
        if let Some(lat0) = lat0 {
            def.push_str(&format!(" +lat_0={lat0}"));
        }
        match self.method {
            ProjectionMethod::Mercator
            | ProjectionMethod::PolarStereographic
            | ProjectionMethod::EquidistantCylindrical => {
                if let Some(sp) = self.standard_parallel_1 {
                    def.push_str(&format!(" +lat_ts={sp}"));
                }
            }
            _ => {
                if let Some(sp) = self.standard_parallel_1 {
                    def.push_str(&format!(" +lat_1={sp}"));
                }
                if let Some(sp) = self.standard_parallel_2 {
                    def.push_str(&format!(" +lat_2={sp}"));
                }
            }
        }
        def.push_str(&format!(
            " +lon_0={} +k_0={} +x_0={} +y_0={} {} +units=m +no_defs",
            self.central_meridian,
            self.scale_factor,
            self.false_easting,
            self.false_northing,
            ellipsoid_to_proj(&self.ellipsoid)
        ));
        def
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CrsKind {
    Geographic { ellipsoid: Ellipsoid },
    Projected(ProjectionParams),
}

/// A coordinate reference system.
#[derive(Clone, Debug, PartialEq)]
pub struct Crs {
    name: String,
    kind: CrsKind,
    axis_order: AxisOrder,
    definition: String,
}

impl Crs {
    /// WGS84 longitude/latitude.
    pub fn wgs84() -> Self {
        Self {
            name: "EPSG:4326".into(),
            kind: CrsKind::Geographic { ellipsoid: WGS84 },
            axis_order: AxisOrder::EastNorth,
            definition: "+proj=longlat +datum=WGS84 +no_defs".into(),
        }
    }

    /// WGS84 with latitude first.
    pub fn wgs84_lat_lon() -> Self {
        Self::wgs84()
            .with_axis_order(AxisOrder::NorthEast)
            .with_name("EPSG:4326 (lat/lon)")
    }

    /// Geographic CRS on an arbitrary ellipsoid.
    pub fn geographic(name: impl Into<String>, ellipsoid: Ellipsoid) -> Self {
        Self {
            name: name.into(),
            kind: CrsKind::Geographic { ellipsoid },
            axis_order: AxisOrder::EastNorth,
            definition: format!("+proj=longlat {} +no_defs", ellipsoid_to_proj(&ellipsoid)),
        }
    }

    /// Projected CRS, its proj4 definition rendered from `params`.
    pub fn projected(name: impl Into<String>, params: ProjectionParams) -> Self {
        let definition = params.to_proj_string();
        Self {
            name: name.into(),
            kind: CrsKind::Projected(params),
            axis_order: AxisOrder::EastNorth,
            definition,
        }
    }

    /// Parse a proj4 definition such as `+proj=merc +lon_0=150 +datum=WGS84`.
    pub fn from_proj_string(name: impl Into<String>, definition: &str) -> Result<Self, ProjError> {
        let params = parse_tokens(definition);
        let proj = params
            .get("proj")
            .and_then(|v| v.as_deref())
            .ok_or_else(|| ProjError::InvalidParameter(format!("missing +proj in '{definition}'")))?;
        let ellipsoid = parse_ellipsoid(&params)?;
        let axis_order = match params.get("axis").and_then(|v| v.as_deref()) {
            Some(axis) if axis.starts_with("ne") => AxisOrder::NorthEast,
            _ => AxisOrder::EastNorth,
        };

        let kind = match proj {
            "longlat" | "latlong" | "lonlat" | "latlon" => CrsKind::Geographic { ellipsoid },
            other => {
                let lat0 = number(&params, "lat_0")?;
                let method = ProjectionMethod::from_proj_name(other, lat0);
                let mut p = ProjectionParams::new(method.clone()).with_ellipsoid(ellipsoid);
                p.central_meridian = number(&params, "lon_0")?.unwrap_or(0.0);
                p.latitude_of_origin = lat0;
                p.scale_factor = number(&params, "k_0")?
                    .or(number(&params, "k")?)
                    .unwrap_or(1.0);
                p.false_easting = number(&params, "x_0")?.unwrap_or(0.0);
                p.false_northing = number(&params, "y_0")?.unwrap_or(0.0);
                match method {
                    ProjectionMethod::Mercator
                    | ProjectionMethod::PolarStereographic
                    | ProjectionMethod::EquidistantCylindrical => {
                        p.standard_parallel_1 = number(&params, "lat_ts")?;
                    }
                    _ => {
                        p.standard_parallel_1 = number(&params, "lat_1")?;
                        p.standard_parallel_2 = number(&params, "lat_2")?;
                    }
                }
                if other == "utm" {
                    let zone = number(&params, "zone")?.ok_or_else(|| {
                        ProjError::InvalidParameter(format!("utm without +zone in '{definition}'"))
                    })?;
                    p.central_meridian = zone * 6.0 - 183.0;
                    p.latitude_of_origin = Some(0.0);
                    p.scale_factor = 0.9996;
                    p.false_easting = 500_000.0;
                    p.false_northing = if params.contains_key("south") {
                        10_000_000.0
                    } else {
                        0.0
                    };
                }
                if other == "ups" {
                    p.latitude_of_origin = Some(if params.contains_key("south") { -90.0 } else { 90.0 });
                    p.scale_factor = 0.994;
                    p.false_easting = 2_000_000.0;
                    p.false_northing = 2_000_000.0;
                }
                CrsKind::Projected(p)
            }
        };

        Ok(Self {
            name: name.into(),
            kind,
            axis_order,
            definition: definition.trim().to_string(),
        })
    }

    /// Look up an EPSG code in the bundled definition database.
    ///
    /// Axis order follows the proj4 definition (east/north unless `+axis=ne..`).
    pub fn from_epsg(code: u16) -> Result<Self, ProjError> {
        let def = crs_definitions::from_code(code)
            .ok_or_else(|| ProjError::UnknownCrs(format!("EPSG:{code}")))?;
        Self::from_proj_string(format!("EPSG:{code}"), def.proj4)
    }

    /// Accepts `EPSG:<code>` or a proj4 definition.
    pub fn from_user_string(s: &str) -> Result<Self, ProjError> {
        let trimmed = s.trim();
        let code = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"));
        match code {
            Some(code) => {
                let code = code
                    .parse::<u16>()
                    .map_err(|_| ProjError::UnknownCrs(trimmed.to_string()))?;
                Self::from_epsg(code)
            }
            None => Self::from_proj_string(trimmed, trimmed),
        }
    }

    pub fn with_axis_order(mut self, axis_order: AxisOrder) -> Self {
        self.axis_order = axis_order;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &CrsKind {
        &self.kind
    }

    pub fn axis_order(&self) -> AxisOrder {
        self.axis_order
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Definition handed to proj4rs: axis handling is done by the transform itself.
    pub(crate) fn proj4_definition(&self) -> String {
        self.definition
            .split_whitespace()
            .filter(|t| !t.starts_with("+axis="))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self.kind, CrsKind::Geographic { .. })
    }

    /// WGS84 longitude/latitude, in that axis order.
    pub fn is_wgs84_lon_lat(&self) -> bool {
        match &self.kind {
            CrsKind::Geographic { ellipsoid } => {
                ellipsoid.approx_eq(&WGS84) && self.axis_order == AxisOrder::EastNorth
            }
            CrsKind::Projected(_) => false,
        }
    }

    pub fn projection(&self) -> Option<&ProjectionParams> {
        match &self.kind {
            CrsKind::Projected(p) => Some(p),
            CrsKind::Geographic { .. } => None,
        }
    }

    pub fn ellipsoid(&self) -> Ellipsoid {
        match &self.kind {
            CrsKind::Geographic { ellipsoid } => *ellipsoid,
            CrsKind::Projected(p) => p.ellipsoid,
        }
    }

    /// Central meridian in degrees (0 for geographic CRSs).
    pub fn central_meridian(&self) -> f64 {
        self.projection().map_or(0.0, |p| p.central_meridian)
    }

    /// Whether coordinates need a datum shift proj4rs knows about.
    pub fn has_datum_shift(&self) -> bool {
        self.definition.split_whitespace().any(|t| {
            t.starts_with("+towgs84=") || (t.starts_with("+nadgrids=") && t != "+nadgrids=@null")
        })
    }

    /// Same kind, parameters and axis order. Names and definition text are metadata.
    pub fn equals_ignore_metadata(&self, other: &Crs) -> bool {
        if self.axis_order != other.axis_order {
            return false;
        }
        match (&self.kind, &other.kind) {
            (CrsKind::Geographic { ellipsoid: a }, CrsKind::Geographic { ellipsoid: b }) => {
                a.approx_eq(b)
            }
            (CrsKind::Projected(a), CrsKind::Projected(b)) => a.approx_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn ellipsoid_to_proj(e: &Ellipsoid) -> String {
    if e.is_sphere() {
        format!("+R={}", e.a)
    } else {
        format!("+a={} +b={}", e.a, e.b)
    }
}

fn parse_tokens(definition: &str) -> HashMap<String, Option<String>> {
    definition
        .split_whitespace()
        .filter_map(|t| t.strip_prefix('+'))
        .map(|t| match t.split_once('=') {
            Some((k, v)) => (k.to_ascii_lowercase(), Some(v.to_string())),
            None => (t.to_ascii_lowercase(), None),
        })
        .collect()
}

fn number(params: &HashMap<String, Option<String>>, key: &str) -> Result<Option<f64>, ProjError> {
    match params.get(key).and_then(|v| v.as_deref()) {
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ProjError::InvalidParameter(format!("+{key}={raw}"))),
        None => Ok(None),
    }
}

fn parse_ellipsoid(params: &HashMap<String, Option<String>>) -> Result<Ellipsoid, ProjError> {
    if let Some(r) = number(params, "r")? {
        return Ok(Ellipsoid::sphere(r));
    }
    if let Some(a) = number(params, "a")? {
        if let Some(b) = number(params, "b")? {
            return Ok(Ellipsoid::from_axes(a, b));
        }
        if let Some(rf) = number(params, "rf")? {
            return Ok(Ellipsoid::new(a, 1.0 / rf));
        }
        return Ok(Ellipsoid::sphere(a));
    }
    for key in ["ellps", "datum"] {
        if let Some(name) = params.get(key).and_then(|v| v.as_deref()) {
            return Ellipsoid::by_name(name)
                .ok_or_else(|| ProjError::InvalidParameter(format!("+{key}={name}")));
        }
    }
    Ok(WGS84)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_geographic() {
        let crs = Crs::from_proj_string("wgs", "+proj=longlat +datum=WGS84 +no_defs").unwrap();
        assert!(crs.is_geographic());
        assert!(crs.is_wgs84_lon_lat());
        assert!(crs.equals_ignore_metadata(&Crs::wgs84()));
    }

    #[test]
    fn test_parse_lat_lon_axis() {
        let crs = Crs::from_proj_string("ll", "+proj=longlat +ellps=WGS84 +axis=neu").unwrap();
        assert_eq!(crs.axis_order(), AxisOrder::NorthEast);
        assert!(!crs.is_wgs84_lon_lat());
        assert!(crs.equals_ignore_metadata(&Crs::wgs84_lat_lon()));
        assert_eq!(crs.proj4_definition(), "+proj=longlat +ellps=WGS84");
    }

    #[test]
    fn test_parse_utm() {
        let crs = Crs::from_proj_string("utm", "+proj=utm +zone=33 +south +ellps=WGS84").unwrap();
        let p = crs.projection().unwrap();
        assert_eq!(p.method, ProjectionMethod::TransverseMercator);
        assert_relative_eq!(p.central_meridian, 15.0);
        assert_relative_eq!(p.false_northing, 10_000_000.0);
    }

    #[test]
    fn test_parse_polar_stereographic() {
        let crs = Crs::from_proj_string(
            "ps",
            "+proj=stere +lat_0=-90 +lat_ts=-71 +lon_0=0 +datum=WGS84 +units=m",
        )
        .unwrap();
        let p = crs.projection().unwrap();
        assert_eq!(p.method, ProjectionMethod::PolarStereographic);
        assert_eq!(p.standard_parallel_1, Some(-71.0));
        assert_eq!(p.latitude_of_origin, Some(-90.0));

        let oblique = Crs::from_proj_string("os", "+proj=stere +lat_0=52 +lon_0=5").unwrap();
        assert_eq!(
            oblique.projection().unwrap().method,
            ProjectionMethod::ObliqueStereographic
        );
    }

    #[test]
    fn test_parse_web_mercator() {
        let crs = Crs::from_proj_string(
            "EPSG:3857",
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs",
        )
        .unwrap();
        let p = crs.projection().unwrap();
        assert_eq!(p.method, ProjectionMethod::Mercator);
        assert!(p.ellipsoid.is_sphere());
        assert!(!crs.has_datum_shift());
    }

    #[test]
    fn test_datum_shift_detection() {
        let crs =
            Crs::from_proj_string("x", "+proj=longlat +ellps=intl +towgs84=-87,-98,-121").unwrap();
        assert!(crs.has_datum_shift());
    }

    #[test]
    fn test_unknown_method_kept() {
        let crs = Crs::from_proj_string("robin", "+proj=robin +lon_0=0").unwrap();
        assert_eq!(
            crs.projection().unwrap().method,
            ProjectionMethod::Other("robin".into())
        );
    }

    #[test]
    fn test_missing_proj_rejected() {
        assert!(Crs::from_proj_string("bad", "+lon_0=10").is_err());
        assert!(Crs::from_proj_string("bad", "+proj=merc +lon_0=east").is_err());
    }

    #[test]
    fn test_projected_roundtrips_through_definition() {
        let params = ProjectionParams::new(ProjectionMethod::LambertConformalConic)
            .with_central_meridian(-96.0)
            .with_latitude_of_origin(23.0)
            .with_standard_parallels(33.0, Some(45.0));
        let crs = Crs::projected("lcc", params);
        let reparsed = Crs::from_proj_string("other name", crs.definition()).unwrap();
        assert!(crs.equals_ignore_metadata(&reparsed));
    }

    #[test]
    fn test_equality_ignores_name_only() {
        let merc = |cm| {
            Crs::projected(
                "m",
                ProjectionParams::new(ProjectionMethod::Mercator).with_central_meridian(cm),
            )
        };
        assert!(merc(0.0).equals_ignore_metadata(&merc(0.0).with_name("renamed")));
        assert!(!merc(0.0).equals_ignore_metadata(&merc(150.0)));
        assert!(!Crs::wgs84().equals_ignore_metadata(&Crs::wgs84_lat_lon()));
    }

    #[test]
    fn test_from_epsg() {
        let crs = Crs::from_epsg(3857).unwrap();
        assert_eq!(crs.name(), "EPSG:3857");
        assert_eq!(
            crs.projection().unwrap().method,
            ProjectionMethod::Mercator
        );
        assert!(Crs::from_user_string("EPSG:4326").unwrap().is_geographic());
    }
}

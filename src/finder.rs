//! Handler selection for a rendering request.
//!
//! Factories are tried in table order and the first that recognises the
//! rendering CRS builds the handler, so specific projections come before the
//! geographic fallback.

use tracing::debug;

use crate::config;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::handler::{Handler, ProjectionHandler, WrappingProjectionHandler};
use crate::proj::crs::{Crs, ProjectionMethod, ProjectionParams};

/// Longitude bound standing in for "unbounded" in valid areas.
pub const MAX_LONGITUDE: f64 = 2_147_483_647.0;

/// Mercator keeps this far from the poles.
pub const MERCATOR_MAX_LATITUDE: f64 = 89.0;

/// How far beyond the standard parallels a conic valid area reaches.
const CONIC_MARGIN: f64 = 44.0;

/// Inputs of a factory.
pub struct FactoryContext<'a> {
    pub rendering_envelope: &'a Envelope,
    pub rendering_crs: &'a Crs,
    pub source_crs: &'a Crs,
    pub wrap: bool,
    pub max_wraps: u32,
}

impl FactoryContext<'_> {
    fn plain(&self, valid_area: Option<Envelope>) -> Result<Option<Box<dyn Handler>>> {
        let handler = ProjectionHandler::new(
            Some(self.source_crs.clone()),
            valid_area,
            self.rendering_envelope.clone(),
        )?;
        Ok(Some(Box::new(handler)))
    }

    fn wrapping(
        &self,
        valid_area: Option<Envelope>,
        central_meridian: f64,
    ) -> Result<Option<Box<dyn Handler>>> {
        if !self.wrap || self.max_wraps == 0 {
            return self.plain(valid_area);
        }
        let handler = WrappingProjectionHandler::new(
            Some(self.source_crs.clone()),
            valid_area,
            self.rendering_envelope.clone(),
            central_meridian,
            self.max_wraps,
        )?;
        Ok(Some(Box::new(handler)))
    }

    fn projection(&self) -> Option<&ProjectionParams> {
        self.rendering_crs.projection()
    }

    fn method_is(&self, methods: &[ProjectionMethod]) -> Option<&ProjectionParams> {
        self.projection().filter(|p| methods.contains(&p.method))
    }
}

/// Builds a handler when it recognises the rendering CRS.
pub type HandlerFactory = fn(&FactoryContext<'_>) -> Result<Option<Box<dyn Handler>>>;

const FACTORIES: &[(&str, HandlerFactory)] = &[
    ("TransverseMercator", transverse_mercator),
    ("PolarStereographic", polar_stereographic),
    ("LambertAzimuthalEqualArea", lambert_azimuthal_equal_area),
    ("Conic", conic),
    ("Mercator", mercator),
    ("WorldVanDerGrintenI", van_der_grinten),
    ("EquidistantCylindrical", equidistant_cylindrical),
    ("Geographic", geographic),
];

fn lon_lat(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Envelope {
    Envelope::with_crs(min_x, min_y, max_x, max_y, Crs::wgs84())
}

fn transverse_mercator(ctx: &FactoryContext<'_>) -> Result<Option<Box<dyn Handler>>> {
    let Some(p) = ctx.method_is(&[ProjectionMethod::TransverseMercator]) else {
        return Ok(None);
    };
    let cm = p.central_meridian;
    ctx.plain(Some(lon_lat(cm - 45.0, -90.0, cm + 45.0, 90.0)))
}

fn polar_stereographic(ctx: &FactoryContext<'_>) -> Result<Option<Box<dyn Handler>>> {
    let Some(p) = ctx.method_is(&[ProjectionMethod::PolarStereographic]) else {
        return Ok(None);
    };
    let Some(latitude) = p.latitude_of_origin.or(p.standard_parallel_1) else {
        return Ok(None);
    };
    let area = if latitude > 0.0 {
        lon_lat(-180.0, 0.0, 180.0, 90.0)
    } else {
        lon_lat(-180.0, -90.0, 180.0, 0.0)
    };
    ctx.plain(Some(area))
}

fn lambert_azimuthal_equal_area(ctx: &FactoryContext<'_>) -> Result<Option<Box<dyn Handler>>> {
    let Some(p) = ctx.method_is(&[ProjectionMethod::LambertAzimuthalEqualArea]) else {
        return Ok(None);
    };
    let lat0 = p.latitude_of_origin.unwrap_or(0.0);
    let lon0 = p.central_meridian;
    let area = if lat0 >= 45.0 {
        lon_lat(-180.0, 0.0, 180.0, 90.0)
    } else if lat0 <= -45.0 {
        lon_lat(-180.0, -90.0, 180.0, 0.0)
    } else {
        lon_lat(
            lon0 - 90.0,
            (lat0 - 90.0).max(-90.0),
            lon0 + 90.0,
            (lat0 + 90.0).min(90.0),
        )
    };
    ctx.plain(Some(area))
}

fn conic(ctx: &FactoryContext<'_>) -> Result<Option<Box<dyn Handler>>> {
    let Some(p) = ctx.method_is(&[
        ProjectionMethod::LambertConformalConic,
        ProjectionMethod::AlbersEqualArea,
        ProjectionMethod::EquidistantConic,
    ]) else {
        return Ok(None);
    };
    let Some(sp1) = p.standard_parallel_1.or(p.latitude_of_origin) else {
        return Ok(None);
    };
    let sp2 = p.standard_parallel_2.unwrap_or(sp1);
    let area = if sp1 + sp2 >= 0.0 {
        lon_lat(-180.0, (sp1.min(sp2) - CONIC_MARGIN).max(-90.0), 180.0, 90.0)
    } else {
        lon_lat(-180.0, -90.0, 180.0, (sp1.max(sp2) + CONIC_MARGIN).min(90.0))
    };
    ctx.plain(Some(area))
}

fn mercator(ctx: &FactoryContext<'_>) -> Result<Option<Box<dyn Handler>>> {
    let Some(p) = ctx.method_is(&[ProjectionMethod::Mercator]) else {
        return Ok(None);
    };
    let area = lon_lat(
        -MAX_LONGITUDE,
        -MERCATOR_MAX_LATITUDE,
        MAX_LONGITUDE,
        MERCATOR_MAX_LATITUDE,
    );
    ctx.wrapping(Some(area), p.central_meridian)
}

fn van_der_grinten(ctx: &FactoryContext<'_>) -> Result<Option<Box<dyn Handler>>> {
    let Some(p) = ctx.method_is(&[ProjectionMethod::WorldVanDerGrintenI]) else {
        return Ok(None);
    };
    let area = lon_lat(-MAX_LONGITUDE, -90.0, MAX_LONGITUDE, 90.0);
    ctx.wrapping(Some(area), p.central_meridian)
}

fn equidistant_cylindrical(ctx: &FactoryContext<'_>) -> Result<Option<Box<dyn Handler>>> {
    let Some(p) = ctx.method_is(&[ProjectionMethod::EquidistantCylindrical]) else {
        return Ok(None);
    };
    ctx.wrapping(None, p.central_meridian)
}

fn geographic(ctx: &FactoryContext<'_>) -> Result<Option<Box<dyn Handler>>> {
    if !ctx.rendering_crs.is_geographic() {
        return Ok(None);
    }
    ctx.wrapping(None, 0.0)
}

/// Entry point for picking the handler of a rendering request.
pub struct ProjectionHandlerFinder;

impl ProjectionHandlerFinder {
    /// Factory names in evaluation order.
    pub fn factory_names() -> impl Iterator<Item = &'static str> {
        FACTORIES.iter().map(|(name, _)| *name)
    }

    /// Handler for `rendering_envelope`, with the process-wide wrap limit.
    ///
    /// `Ok(None)` when the envelope has no CRS or no factory recognises it.
    pub fn find(
        rendering_envelope: &Envelope,
        source_crs: &Crs,
        wrap: bool,
    ) -> Result<Option<Box<dyn Handler>>> {
        Self::find_with_wrap_limit(rendering_envelope, source_crs, wrap, config::wrap_limit())
    }

    /// [`ProjectionHandlerFinder::find`] with an explicit wrap limit; a limit
    /// of 0 disables wrapping.
    pub fn find_with_wrap_limit(
        rendering_envelope: &Envelope,
        source_crs: &Crs,
        wrap: bool,
        wrap_limit: u32,
    ) -> Result<Option<Box<dyn Handler>>> {
        let Some(rendering_crs) = rendering_envelope.crs() else {
            return Ok(None);
        };
        let ctx = FactoryContext {
            rendering_envelope,
            rendering_crs,
            source_crs,
            wrap,
            max_wraps: wrap_limit,
        };
        for (name, factory) in FACTORIES {
            if let Some(handler) = factory(&ctx)? {
                debug!(factory = *name, crs = %rendering_crs, wrapping = handler.is_wrapping(), "projection handler found");
                return Ok(Some(handler));
            }
        }
        Ok(None)
    }

    /// Valid area a non-wrapping handler would impose on `crs`.
    pub fn valid_area_for(crs: &Crs) -> Option<Envelope> {
        let point_view = Envelope::with_crs(0.0, 0.0, 0.0, 0.0, crs.clone());
        match Self::find_with_wrap_limit(&point_view, &Crs::wgs84(), false, 0) {
            Ok(handler) => handler.and_then(|h| h.valid_area().cloned()),
            Err(_) => None,
        }
    }
}

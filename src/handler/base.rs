use geo::Geometry;
use tracing::{debug, trace};

use crate::envelope::Envelope;
use crate::error::{HandlerError, Result};
use crate::finder::ProjectionHandlerFinder;
use crate::geometry::{envelope_of, intersect_envelope};
use crate::handler::Handler;
use crate::proj::crs::{AxisOrder, Crs};
use crate::proj::pipeline::transform_envelope;

/// Samples per envelope edge when reprojecting bounds.
pub const ENVELOPE_SEGMENTS: usize = 10;

/// Expansion of geometry bounds in WGS84, so points still intersect.
const EPS: f64 = 1e-6;

/// Base handler: valid area cutting and query envelope derivation.
#[derive(Clone, Debug)]
pub struct ProjectionHandler {
    source_crs: Option<Crs>,
    rendering_crs: Crs,
    rendering_envelope: Envelope,
    /// In WGS84 lon/lat. `None` means no restriction.
    valid_area: Option<Envelope>,
}

impl ProjectionHandler {
    pub fn new(
        source_crs: Option<Crs>,
        valid_area: Option<Envelope>,
        rendering_envelope: Envelope,
    ) -> Result<Self> {
        let rendering_crs = rendering_envelope.crs().cloned().ok_or_else(|| {
            HandlerError::Configuration("rendering envelope has no CRS".into())
        })?;
        let valid_area = valid_area.map(|area| area.retagged(Some(Crs::wgs84())));
        Ok(Self {
            source_crs,
            rendering_crs,
            rendering_envelope,
            valid_area,
        })
    }

    pub fn source_crs(&self) -> Option<&Crs> {
        self.source_crs.as_ref()
    }

    pub fn rendering_crs(&self) -> &Crs {
        &self.rendering_crs
    }

    pub fn rendering_envelope(&self) -> &Envelope {
        &self.rendering_envelope
    }

    /// Replace the rendering envelope. An envelope without CRS is taken to be in
    /// the rendering CRS.
    pub fn set_rendering_envelope(&mut self, envelope: Envelope) {
        self.rendering_envelope = match envelope.crs() {
            Some(_) => envelope,
            None => envelope.retagged(Some(self.rendering_crs.clone())),
        };
    }

    pub fn valid_area(&self) -> Option<&Envelope> {
        self.valid_area.as_ref()
    }

    /// Whether geometries in `geom_crs` may need cutting.
    pub fn requires_cut(&self, geom_crs: &Crs) -> bool {
        self.valid_area.is_some() && !geom_crs.equals_ignore_metadata(&self.rendering_crs)
    }

    pub fn pre_process(&self, geom_crs: &Crs, geometry: Geometry<f64>) -> Result<Option<Geometry<f64>>> {
        let Some(valid_area) = self.valid_area.as_ref() else {
            return Ok(Some(geometry));
        };
        if geom_crs.equals_ignore_metadata(&self.rendering_crs) {
            return Ok(Some(geometry));
        }
        let Some(bounds) = envelope_of(&geometry, Some(geom_crs)) else {
            return Ok(None);
        };

        let mut bounds_wgs84 = transform_envelope(&bounds, &Crs::wgs84(), ENVELOPE_SEGMENTS)?;
        bounds_wgs84.expand_by(EPS);
        if valid_area.contains(&bounds_wgs84) {
            trace!("geometry inside the valid area");
            return Ok(Some(geometry));
        }

        let Some(cut) = intersect_valid_area(valid_area, &bounds_wgs84) else {
            trace!(
                min_x = bounds_wgs84.min_x,
                max_x = bounds_wgs84.max_x,
                "geometry outside the valid area"
            );
            return Ok(None);
        };
        let mask = transform_envelope(&cut, geom_crs, ENVELOPE_SEGMENTS)?;
        Ok(intersect_envelope(&geometry, &mask))
    }

    /// Reproject `envelope` into `target`, honouring valid areas. `None` when
    /// the envelope lies completely outside them.
    pub fn projected_envelope(&self, envelope: &Envelope, target: &Crs) -> Result<Option<Envelope>> {
        let target_area = ProjectionHandlerFinder::valid_area_for(target);
        let areas: Vec<&Envelope> = [self.valid_area.as_ref(), target_area.as_ref()]
            .into_iter()
            .flatten()
            .collect();

        let mut source = envelope.clone();
        if envelope.crs().is_some_and(Crs::is_wgs84_lon_lat) {
            for area in &areas {
                match source.intersection(area) {
                    Some(cut) => source = cut,
                    None => return Ok(None),
                }
            }
        }

        match transform_envelope(&source, target, ENVELOPE_SEGMENTS) {
            Ok(projected) => Ok(Some(projected)),
            Err(err) => {
                debug!(error = %err, target = %target, "envelope reprojection failed, retrying within the valid areas");
                let Ok(mut cut) = transform_envelope(envelope, &Crs::wgs84(), ENVELOPE_SEGMENTS) else {
                    return Err(err.into());
                };
                for area in &areas {
                    match cut.intersection(area) {
                        Some(c) => cut = c,
                        None => return Ok(None),
                    }
                }
                transform_envelope(&cut, target, ENVELOPE_SEGMENTS)
                    .map(Some)
                    .map_err(|_| err.into())
            }
        }
    }

    pub(crate) fn derive_query_envelopes(
        &self,
        query_crs: &Crs,
        across_dateline: bool,
        dateline_split: Option<(f64, f64)>,
    ) -> Result<Vec<Envelope>> {
        let re = &self.rendering_envelope;
        if !across_dateline {
            return Ok(self.projected_envelope(re, query_crs)?.into_iter().collect());
        }

        if self.rendering_crs.is_geographic() && !self.rendering_crs.is_wgs84_lon_lat() {
            let lon = match self.rendering_crs.axis_order() {
                AxisOrder::EastNorth => 0,
                AxisOrder::NorthEast => 1,
            };
            if re.min(lon) >= -180.0 && re.max(lon) <= 180.0 {
                return Ok(self.projected_envelope(re, query_crs)?.into_iter().collect());
            }
            // data in normalised longitudes is added rather than split out, so
            // sources storing unnormalised values still match the raw envelope
            let mut envelopes = vec![re.clone()];
            if lon == 0 {
                envelopes.extend(adjusted_envelopes(re));
            } else {
                envelopes.extend(adjusted_envelopes(&re.swapped_axes()).iter().map(Envelope::swapped_axes));
            }
            merge_envelopes(&mut envelopes);
            return self.reproject_all(envelopes, query_crs);
        }

        if let Some((dateline_x, half_circle)) = dateline_split {
            if re.min_x < dateline_x && re.max_x > dateline_x && re.width() < half_circle {
                let wgs84 = Crs::wgs84();
                let mut envelopes = Vec::with_capacity(2);
                let west = Envelope::new(re.min_x, re.min_y, dateline_x - EPS, re.max_y, re.crs().cloned());
                match transform_envelope(&west, &wgs84, ENVELOPE_SEGMENTS) {
                    Ok(mut west) => {
                        west.max_x = west.max_x.max(180.0);
                        envelopes.push(west);
                    }
                    Err(err) => debug!(error = %err, "west of the dateline does not reproject, skipped"),
                }

                let east = Envelope::new(dateline_x + EPS, re.min_y, re.max_x, re.max_y, re.crs().cloned());
                match transform_envelope(&east, &wgs84, ENVELOPE_SEGMENTS) {
                    Ok(mut east) => {
                        if east.min_x > 180.0 {
                            east.translate(-360.0, 0.0);
                        }
                        east.min_x = east.min_x.min(-180.0);
                        envelopes.push(east);
                    }
                    Err(err) => debug!(error = %err, "east of the dateline does not reproject, skipped"),
                }
                merge_envelopes(&mut envelopes);
                return self.reproject_all(envelopes, query_crs);
            }
        }

        let envelope = transform_envelope(re, &Crs::wgs84(), ENVELOPE_SEGMENTS)?;
        if envelope.min_x >= -180.0 && envelope.max_x <= 180.0 {
            return Ok(self.projected_envelope(&envelope, query_crs)?.into_iter().collect());
        }
        let mut envelopes = adjusted_envelopes(&envelope);
        envelopes.insert(0, envelope);
        merge_envelopes(&mut envelopes);
        self.reproject_all(envelopes, query_crs)
    }

    fn reproject_all(&self, envelopes: Vec<Envelope>, query_crs: &Crs) -> Result<Vec<Envelope>> {
        let mut result = Vec::with_capacity(envelopes.len());
        for envelope in &envelopes {
            if let Some(projected) = self.projected_envelope(envelope, query_crs)? {
                result.push(projected);
            }
        }
        Ok(result)
    }
}

impl Handler for ProjectionHandler {
    fn core(&self) -> &ProjectionHandler {
        self
    }

    fn core_mut(&mut self) -> &mut ProjectionHandler {
        self
    }
}

/// `valid_area ∩ bounds`, also trying the valid area one world away when it
/// straddles the dateline.
fn intersect_valid_area(valid_area: &Envelope, bounds: &Envelope) -> Option<Envelope> {
    if let Some(cut) = bounds.intersection(valid_area) {
        return Some(cut);
    }
    let mut shifted = valid_area.clone();
    if valid_area.max_x > 180.0 {
        shifted.translate(-360.0, 0.0);
    } else if valid_area.min_x < -180.0 {
        shifted.translate(360.0, 0.0);
    } else {
        return None;
    }
    bounds.intersection(&shifted)
}

/// Companions of a lon/lat envelope that overflows [-180, 180], covering the
/// same area in normalised longitudes.
fn adjusted_envelopes(envelope: &Envelope) -> Vec<Envelope> {
    let span = |min_x: f64, max_x: f64| {
        Envelope::new(min_x, envelope.min_y, max_x, envelope.max_y, envelope.crs().cloned())
    };
    if envelope.width() > 360.0 {
        return vec![span(-180.0, 180.0)];
    }

    // shift by whole worlds, counting half circles past the dateline
    let shift = if envelope.min_x < -180.0 {
        let half_circles = (-envelope.min_x / 180.0) as i64;
        360.0 * (half_circles / 2 + half_circles % 2) as f64
    } else {
        let half_circles = (envelope.max_x / 180.0) as i64;
        -360.0 * (half_circles / 2 + half_circles % 2) as f64
    };
    let mut shifted = envelope.clone();
    shifted.translate(shift, 0.0);

    if ((shifted.min_x / 180.0) as i64) < ((shifted.max_x / 180.0) as i64) {
        if shifted.min_x < -180.0 {
            vec![
                span(-180.0, shifted.max_x.min(180.0)),
                span(shifted.min_x + 360.0, 180.0),
            ]
        } else {
            vec![
                span(-180.0, shifted.max_x - 360.0),
                span(shifted.min_x, 180.0),
            ]
        }
    } else {
        vec![shifted]
    }
}

/// Union intersecting envelopes pairwise until none intersect.
pub(crate) fn merge_envelopes(envelopes: &mut Vec<Envelope>) {
    'outer: loop {
        for i in 0..envelopes.len() {
            for j in (i + 1)..envelopes.len() {
                if envelopes[i].intersects(&envelopes[j]) {
                    let other = envelopes.remove(j);
                    envelopes[i].expand_to_include(&other);
                    continue 'outer;
                }
            }
        }
        break;
    }
}

//! Projection handlers: query envelope derivation and geometry pre/post
//! processing around a rendering envelope.

pub mod base;
pub mod wrapping;

pub use base::ProjectionHandler;
pub use wrapping::WrappingProjectionHandler;

use geo::Geometry;

use crate::envelope::Envelope;
use crate::error::Result;
use crate::proj::crs::Crs;
use crate::proj::pipeline::CoordinateTransform;

/// Common interface of [`ProjectionHandler`] and its specialisations.
///
/// One handler serves one rendering request. It is not meant to be shared
/// between threads while the rendering envelope is being updated.
pub trait Handler {
    fn core(&self) -> &ProjectionHandler;

    fn core_mut(&mut self) -> &mut ProjectionHandler;

    fn is_wrapping(&self) -> bool {
        false
    }

    /// X of the 180° meridian in the rendering CRS and the half world width,
    /// when queries crossing the dateline can be split there.
    fn dateline_split(&self) -> Option<(f64, f64)> {
        None
    }

    /// Envelopes, in `query_crs`, that cover the rendering envelope.
    fn query_envelopes(&self, query_crs: &Crs) -> Result<Vec<Envelope>> {
        let core = self.core();
        let across = self.is_wrapping() || !query_crs.equals_ignore_metadata(core.rendering_crs());
        core.derive_query_envelopes(query_crs, across, self.dateline_split())
    }

    /// [`Handler::query_envelopes`] in the data CRS the handler was found for.
    fn query_envelopes_for_source(&self) -> Result<Vec<Envelope>> {
        match self.core().source_crs() {
            Some(crs) => self.query_envelopes(&crs.clone()),
            None => Ok(Vec::new()),
        }
    }

    fn requires_processing(&self, geom_crs: &Crs, _geometry: &Geometry<f64>) -> bool {
        self.core().requires_cut(geom_crs)
    }

    /// Cut `geometry` (in `geom_crs`) to the valid area. `None` means it lies
    /// completely outside and must be dropped.
    fn pre_process(&self, geom_crs: &Crs, geometry: Geometry<f64>) -> Result<Option<Geometry<f64>>> {
        self.core().pre_process(geom_crs, geometry)
    }

    /// Process a geometry already projected into the rendering CRS.
    fn post_process(&self, geometry: Geometry<f64>) -> Option<Geometry<f64>> {
        self.post_process_with(None, geometry)
    }

    /// [`Handler::post_process`] with the transform that projected the
    /// geometry, used to disambiguate dateline jumps.
    fn post_process_with(
        &self,
        _transform: Option<&dyn CoordinateTransform>,
        geometry: Geometry<f64>,
    ) -> Option<Geometry<f64>> {
        Some(geometry)
    }

    fn rendering_envelope(&self) -> &Envelope {
        self.core().rendering_envelope()
    }

    fn set_rendering_envelope(&mut self, envelope: Envelope) {
        self.core_mut().set_rendering_envelope(envelope);
    }

    fn valid_area(&self) -> Option<&Envelope> {
        self.core().valid_area()
    }
}

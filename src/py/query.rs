//! PyO3 binding for query envelope derivation.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::envelope::Envelope;
use crate::finder::ProjectionHandlerFinder;
use crate::handler::base::ENVELOPE_SEGMENTS;
use crate::handler::Handler;
use crate::proj::crs::Crs;
use crate::proj::pipeline::transform_envelope;

type Bounds = (f64, f64, f64, f64);

/// Envelopes to query in the source CRS to cover a rendering view.
///
/// Args:
///     bounds: Rendering envelope as (min_x, min_y, max_x, max_y).
///     rendering_crs: Rendering CRS ("EPSG:3857" or PROJ string).
///     source_crs: CRS the data is stored in.
///     wrap: Whether the view may show several copies of the world.
///
/// Returns:
///     List of (min_x, min_y, max_x, max_y) tuples in the source CRS. A single
///     entry equal to the reprojected bounds when no handler applies.
#[pyfunction]
#[pyo3(signature = (bounds, rendering_crs, source_crs, wrap=true))]
pub fn query_envelopes(
    py: Python<'_>,
    bounds: Bounds,
    rendering_crs: &str,
    source_crs: &str,
    wrap: bool,
) -> PyResult<Vec<Bounds>> {
    let rendering_crs = rendering_crs.to_string();
    let source_crs = source_crs.to_string();

    py.allow_threads(move || -> PyResult<Vec<Bounds>> {
        let to_py = |e: String| PyValueError::new_err(e);
        let rendering = Crs::from_user_string(&rendering_crs).map_err(|e| to_py(e.to_string()))?;
        let source = Crs::from_user_string(&source_crs).map_err(|e| to_py(e.to_string()))?;
        let (min_x, min_y, max_x, max_y) = bounds;
        let envelope = Envelope::with_crs(min_x, min_y, max_x, max_y, rendering);

        let handler = ProjectionHandlerFinder::find(&envelope, &source, wrap)
            .map_err(|e| to_py(e.to_string()))?;
        let envelopes = match handler {
            Some(h) => h.query_envelopes(&source).map_err(|e| to_py(e.to_string()))?,
            None => vec![transform_envelope(&envelope, &source, ENVELOPE_SEGMENTS)
                .map_err(|e| to_py(e.to_string()))?],
        };
        Ok(envelopes
            .iter()
            .map(|e| (e.min_x, e.min_y, e.max_x, e.max_y))
            .collect())
    })
}

use pyo3::prelude::*;

mod query;
mod unwrap;

/// Register all Python-visible functions and types.
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(query::query_envelopes, m)?)?;
    m.add_function(wrap_pyfunction!(unwrap::unwrap_coordinates, m)?)?;
    Ok(())
}

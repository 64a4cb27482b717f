//! Dateline and valid-area handling for rendering geographic data in
//! projected coordinate systems.
//!
//! [`finder::ProjectionHandlerFinder`] picks a [`handler::Handler`] for a
//! rendering envelope. The handler derives the envelopes to query, cuts
//! geometries to the projection's valid area before projection and, for
//! projections that repeat every 360°, replicates projected geometries into
//! each visible copy of the world.

pub mod config;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod finder;
pub mod geometry;
pub mod handler;
pub mod proj;
#[cfg(feature = "python")]
mod py;

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// A Python module implemented in Rust.
#[cfg(feature = "python")]
#[pymodule]
fn _geowrap(m: &Bound<'_, PyModule>) -> PyResult<()> {
    py::register(m)?;
    Ok(())
}

//! PyO3 binding for dateline unwrapping of a projected line.

use geo::{Coord, LineString};
use numpy::{PyArray1, PyReadonlyArray1};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::filter::WrappingCoordinateFilter;

/// Unwrap a line whose vertices jump across the dateline.
///
/// Args:
///     x: 1D array of x coordinates in rendering units.
///     y: 1D array of y coordinates.
///     radius: Half the world width in rendering units (180 for degrees).
///
/// Returns:
///     Tuple of (x_out, y_out) arrays, offset so the line is continuous.
#[pyfunction]
#[pyo3(signature = (x, y, radius))]
#[allow(clippy::type_complexity)]
pub fn unwrap_coordinates<'py>(
    py: Python<'py>,
    x: PyReadonlyArray1<'py, f64>,
    y: PyReadonlyArray1<'py, f64>,
    radius: f64,
) -> PyResult<(Bound<'py, PyArray1<f64>>, Bound<'py, PyArray1<f64>>)> {
    let x_view = x.as_array();
    let y_view = y.as_array();

    let n = x_view.len();
    let y_len = y_view.len();
    if n != y_len {
        return Err(PyValueError::new_err(format!(
            "x and y must have same length, got {} and {}",
            n, y_len
        )));
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(PyValueError::new_err(format!(
            "radius must be positive, got {radius}"
        )));
    }

    let mut line: LineString<f64> = x_view
        .iter()
        .zip(y_view.iter())
        .map(|(&xi, &yi)| Coord { x: xi, y: yi })
        .collect();

    let line = py.allow_threads(move || {
        WrappingCoordinateFilter::new(radius, 0).filter_line(&mut line);
        line
    });

    let (xs, ys): (Vec<f64>, Vec<f64>) = line.0.into_iter().map(|c| (c.x, c.y)).unzip();

    Ok((
        PyArray1::from_owned_array(py, ndarray::Array1::from(xs)),
        PyArray1::from_owned_array(py, ndarray::Array1::from(ys)),
    ))
}

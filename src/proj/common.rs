//! Common helpers for projection math (isometric latitude terms).

use std::f64::consts::FRAC_PI_2;

/// Scale term m(φ) = cos φ / sqrt(1 - e² sin² φ).
pub fn msfn(phi: f64, e2: f64) -> f64 {
    let sin_phi = phi.sin();
    phi.cos() / (1.0 - e2 * sin_phi * sin_phi).sqrt()
}

/// t(φ) = tan(π/4 - φ/2) / ((1 - e sin φ) / (1 + e sin φ))^(e/2)
pub fn tsfn(phi: f64, e: f64) -> f64 {
    let e_sin = e * phi.sin();
    (0.5 * (FRAC_PI_2 - phi)).tan() / ((1.0 - e_sin) / (1.0 + e_sin)).powf(0.5 * e)
}

/// Inverse of [`tsfn`] by fixed-point iteration.
pub fn phi_from_ts(ts: f64, e: f64) -> f64 {
    let half_e = 0.5 * e;
    let mut phi = FRAC_PI_2 - 2.0 * ts.atan();
    for _ in 0..15 {
        let e_sin = e * phi.sin();
        let next = FRAC_PI_2 - 2.0 * (ts * ((1.0 - e_sin) / (1.0 + e_sin)).powf(half_e)).atan();
        let delta = (next - phi).abs();
        phi = next;
        if delta < 1e-12 {
            break;
        }
    }
    phi
}

//! 2-D spatial interpolation (Caracena method), station list → lat/lon
//! grid (§4.5 `TRANS_CARACENA`). A best-effort thin-plate-spline-style
//! solve: not a byte-exact port of a production Caracena analysis (the
//! external numerical library behind the original method is out of
//! scope per §1); grounded on the smoothing-matrix setup used by
//! `stats::smooth_spline` and the coordinate-validation conventions of
//! the flow-cytometry gating geometry module.

use crate::error::{Result, TransformError};

fn thin_plate_kernel(r: f64) -> f64 {
    if r <= 0.0 { 0.0 } else { r * r * r.ln() }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Solves `a x = b` (`a` is `n x n`) via Gauss-Jordan elimination with
/// partial pivoting. Returns `None` if `a` is singular.
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let mut pivot = col;
        for row in (col + 1)..n {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-10 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let diag = a[col][col];
        for j in col..n {
            a[col][j] /= diag;
        }
        b[col] /= diag;

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }
    Some(b)
}

/// Fits a thin-plate spline with an affine trend through `stations`
/// (`(lat, lon)`, value) and evaluates it at each point of `grid`.
/// `lambda` is a small smoothing term (`0.0` is an exact interpolant).
pub fn caracena_interpolate(stations: &[((f64, f64), f64)], grid: &[(f64, f64)], lambda: f64) -> Result<Vec<f64>> {
    let n = stations.len();
    if n == 0 {
        return Err(TransformError::other("Caracena interpolation requires at least one station"));
    }
    if n == 1 {
        return Ok(vec![stations[0].1; grid.len()]);
    }

    // [[K + lambda*I, P], [P^T, 0]] [w; c] = [y; 0], P = [1, lat, lon].
    let dim = n + 3;
    let mut a = vec![vec![0.0; dim]; dim];
    let mut rhs = vec![0.0; dim];

    for i in 0..n {
        for j in 0..n {
            let r = distance(stations[i].0, stations[j].0);
            a[i][j] = thin_plate_kernel(r) + if i == j { lambda } else { 0.0 };
        }
        a[i][n] = 1.0;
        a[i][n + 1] = stations[i].0.0;
        a[i][n + 2] = stations[i].0.1;
        a[n][i] = 1.0;
        a[n + 1][i] = stations[i].0.0;
        a[n + 2][i] = stations[i].0.1;
        rhs[i] = stations[i].1;
    }

    let solution = solve_linear_system(a, rhs).ok_or_else(|| TransformError::RegridFailed {
        variable: "caracena".to_string(),
        reason: "station geometry is singular (duplicate or collinear stations)".to_string(),
    })?;

    let weights = &solution[..n];
    let (c0, c1, c2) = (solution[n], solution[n + 1], solution[n + 2]);

    Ok(grid
        .iter()
        .map(|&(glat, glon)| {
            let spline_term: f64 = weights
                .iter()
                .zip(stations)
                .map(|(&w, &(pos, _))| w * thin_plate_kernel(distance(pos, (glat, glon))))
                .sum();
            spline_term + c0 + c1 * glat + c2 * glon
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_station_broadcasts_its_value() {
        let stations = vec![((0.0, 0.0), 42.0)];
        let grid = vec![(1.0, 1.0), (2.0, 2.0)];
        let result = caracena_interpolate(&stations, &grid, 0.0).unwrap();
        assert_eq!(result, vec![42.0, 42.0]);
    }

    #[test]
    fn recovers_a_planar_field_at_its_own_stations() {
        let field = |lat: f64, lon: f64| 2.0 * lat + 3.0 * lon + 1.0;
        let stations: Vec<((f64, f64), f64)> = vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0), (0.5, 0.5)]
            .into_iter()
            .map(|p| (p, field(p.0, p.1)))
            .collect();
        let grid = vec![(0.0, 0.0), (1.0, 1.0)];
        let result = caracena_interpolate(&stations, &grid, 0.0).unwrap();
        for (&(lat, lon), &value) in grid.iter().zip(&result) {
            assert!((value - field(lat, lon)).abs() < 1e-6, "expected {} got {value}", field(lat, lon));
        }
    }

    #[test]
    fn rejects_duplicate_stations() {
        let stations = vec![((0.0, 0.0), 1.0), ((0.0, 0.0), 2.0)];
        let grid = vec![(0.0, 0.0)];
        assert!(caracena_interpolate(&stations, &grid, 0.0).is_err());
    }
}

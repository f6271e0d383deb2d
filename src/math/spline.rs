//! Interpolating cubic spline (degree 3, zero smoothing).
//!
//! The spline passes through every knot and uses not-a-knot end conditions: the
//! third derivative is continuous across the second and the penultimate knot, so
//! four knots reproduce the unique cubic through them. Fewer knots degrade to the
//! interpolating polynomial of lower degree (parabola, line, constant).
//!
//! The system is solved for the knot second derivatives `M_i`:
//!
//! ```text
//! h_{i-1} M_{i-1} + 2 (h_{i-1} + h_i) M_i + h_i M_{i+1}
//!     = 6 [(y_{i+1} - y_i) / h_i - (y_i - y_{i-1}) / h_{i-1}]
//! ```
//!
//! Knot counts here are modest (a few hundred at most), so a dense LU solve is fine.

use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    second: Vec<f64>,
}

impl CubicSpline {
    /// Fit a spline through `(xs[i], ys[i])`.
    ///
    /// Returns `None` for empty or mismatched inputs, non-finite values, abscissas
    /// that are not strictly increasing, or a singular system.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Option<Self> {
        let n = xs.len();
        if n == 0 || ys.len() != n {
            return None;
        }
        if !xs.iter().chain(ys).all(|v| v.is_finite()) {
            return None;
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let second = if n < 3 {
            vec![0.0; n]
        } else {
            solve_second_derivatives(xs, ys)?
        };

        Some(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            second,
        })
    }

    /// Evaluate at `x`; outside the knot range the end pieces are extended.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 {
            return self.ys[0];
        }

        let i = self
            .xs
            .partition_point(|&xi| xi <= x)
            .saturating_sub(1)
            .min(n - 2);

        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let (m0, m1) = (self.second[i], self.second[i + 1]);
        let h = x1 - x0;
        let a = x1 - x;
        let b = x - x0;

        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }
}

fn solve_second_derivatives(xs: &[f64], ys: &[f64]) -> Option<Vec<f64>> {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

    let mut a = DMatrix::<f64>::zeros(n, n);
    let mut rhs = DVector::<f64>::zeros(n);

    for i in 1..n - 1 {
        a[(i, i - 1)] = h[i - 1];
        a[(i, i)] = 2.0 * (h[i - 1] + h[i]);
        a[(i, i + 1)] = h[i];
        rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
    }

    if n == 3 {
        // Both not-a-knot rows coincide; a constant second derivative gives the parabola.
        a[(0, 0)] = 1.0;
        a[(0, 1)] = -1.0;
        a[(2, 1)] = -1.0;
        a[(2, 2)] = 1.0;
    } else {
        a[(0, 0)] = h[1];
        a[(0, 1)] = -(h[0] + h[1]);
        a[(0, 2)] = h[0];

        let last = n - 1;
        a[(last, last - 2)] = h[n - 2];
        a[(last, last - 1)] = -(h[n - 3] + h[n - 2]);
        a[(last, last)] = h[n - 3];
    }

    let m = a.lu().solve(&rhs)?;
    if m.iter().all(|v| v.is_finite()) {
        Some(m.iter().copied().collect())
    } else {
        None
    }
}

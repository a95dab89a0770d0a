/// Natural cubic spline through `(knot, value)` pairs.
///
/// Outside the knot range the end segment's cubic is extrapolated.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    knots: Vec<f64>,
    values: Vec<f64>,
    /// Second derivative at each knot.
    moments: Vec<f64>,
}

impl CubicSpline {
    /// Builds the spline; `knots` must be strictly increasing and the same
    /// length as `values` (at least two entries).
    pub fn new(knots: Vec<f64>, values: Vec<f64>) -> Self {
        debug_assert_eq!(knots.len(), values.len());
        debug_assert!(knots.len() >= 2, "spline needs at least two knots");
        let moments = natural_moments(&knots, &values);
        Self {
            knots,
            values,
            moments,
        }
    }

    /// Spline over uniform knots `i / (n - 1)` in `[0, 1]`.
    pub fn uniform(values: Vec<f64>) -> Self {
        let last = (values.len().max(2) - 1) as f64;
        let knots = (0..values.len()).map(|i| i as f64 / last).collect();
        Self::new(knots, values)
    }

    pub fn at(&self, t: f64) -> f64 {
        let (i, s, h) = self.locate(t);
        let (m0, m1) = (self.moments[i], self.moments[i + 1]);
        self.values[i] + self.slope(i) * s + 0.5 * m0 * s * s + (m1 - m0) / (6.0 * h) * s * s * s
    }

    pub fn derivative(&self, t: f64) -> f64 {
        let (i, s, h) = self.locate(t);
        let (m0, m1) = (self.moments[i], self.moments[i + 1]);
        self.slope(i) + m0 * s + (m1 - m0) / (2.0 * h) * s * s
    }

    pub fn second_derivative(&self, t: f64) -> f64 {
        let (i, s, h) = self.locate(t);
        let (m0, m1) = (self.moments[i], self.moments[i + 1]);
        m0 + (m1 - m0) / h * s
    }

    /// First-derivative coefficient of segment `i`.
    fn slope(&self, i: usize) -> f64 {
        let h = self.knots[i + 1] - self.knots[i];
        (self.values[i + 1] - self.values[i]) / h
            - h * (2.0 * self.moments[i] + self.moments[i + 1]) / 6.0
    }

    /// Segment index, offset into the segment and segment width for `t`.
    fn locate(&self, t: f64) -> (usize, f64, f64) {
        let last = self.knots.len() - 1;

        let i = if t <= self.knots[0] {
            0
        } else if t >= self.knots[last] {
            last - 1
        } else {
            // Binary search for the segment [lo, lo+1] containing t
            let mut lo = 0usize;
            let mut hi = last;
            while lo < hi - 1 {
                let mid = (lo + hi) / 2;
                if self.knots[mid] <= t {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            lo
        };

        (i, t - self.knots[i], self.knots[i + 1] - self.knots[i])
    }
}

/// Second derivatives of the natural cubic spline (zero at both ends),
/// solved with the Thomas algorithm.
fn natural_moments(knots: &[f64], values: &[f64]) -> Vec<f64> {
    let n = knots.len();
    let mut moments = vec![0.0; n];
    if n < 3 {
        return moments;
    }

    let inner = n - 2;
    let mut diag = vec![0.0; inner];
    let mut upper = vec![0.0; inner];
    let mut rhs = vec![0.0; inner];

    for k in 0..inner {
        let i = k + 1;
        let h0 = knots[i] - knots[i - 1];
        let h1 = knots[i + 1] - knots[i];
        diag[k] = 2.0 * (h0 + h1);
        upper[k] = h1;
        rhs[k] = 6.0 * ((values[i + 1] - values[i]) / h1 - (values[i] - values[i - 1]) / h0);
    }

    // Forward sweep; the sub-diagonal entry of row k is h0 of knot k+1.
    for k in 1..inner {
        let lower = knots[k + 1] - knots[k];
        let w = lower / diag[k - 1];
        diag[k] -= w * upper[k - 1];
        rhs[k] -= w * rhs[k - 1];
    }

    let mut solution = vec![0.0; inner];
    solution[inner - 1] = rhs[inner - 1] / diag[inner - 1];
    for k in (0..inner - 1).rev() {
        solution[k] = (rhs[k] - upper[k] * solution[k + 1]) / diag[k];
    }

    moments[1..n - 1].copy_from_slice(&solution);
    moments
}

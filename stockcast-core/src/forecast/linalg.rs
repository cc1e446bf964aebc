//! Dense normal-equation accumulator with a Cholesky solve.

use super::engine::EngineError;

/// Accumulates `XᵀX` and `Xᵀy` row by row for a `p`-column design.
#[derive(Debug, Clone)]
pub struct NormalEquations {
    p: usize,
    xtx: Vec<f64>,
    xty: Vec<f64>,
    rows: usize,
}

impl NormalEquations {
    pub fn new(p: usize) -> Self {
        Self {
            p,
            xtx: vec![0.0; p * p],
            xty: vec![0.0; p],
            rows: 0,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn add_row(&mut self, x: &[f64], y: f64) {
        debug_assert_eq!(x.len(), self.p);
        for i in 0..self.p {
            if x[i] == 0.0 {
                continue;
            }
            self.xty[i] += x[i] * y;
            // upper triangle only; mirrored in solve
            for j in i..self.p {
                self.xtx[i * self.p + j] += x[i] * x[j];
            }
        }
        self.rows += 1;
    }

    /// Solve `(XᵀX + diag(penalty)) β = Xᵀy`.
    pub fn solve(&self, penalty: &[f64]) -> Result<Vec<f64>, EngineError> {
        let p = self.p;
        if penalty.len() != p {
            return Err(EngineError::InvalidParameter(format!(
                "penalty has {} entries for {p} columns",
                penalty.len()
            )));
        }
        let mut a = vec![0.0; p * p];
        for i in 0..p {
            for j in i..p {
                let v = self.xtx[i * p + j];
                a[i * p + j] = v;
                a[j * p + i] = v;
            }
            a[i * p + i] += penalty[i];
        }
        cholesky_solve(a, &self.xty, p)
    }
}

/// Solve `A x = b` for symmetric positive-definite `A` (row-major, `p × p`).
pub fn cholesky_solve(mut a: Vec<f64>, b: &[f64], p: usize) -> Result<Vec<f64>, EngineError> {
    // In-place lower factor L with A = L Lᵀ.
    for j in 0..p {
        let mut diag = a[j * p + j];
        for k in 0..j {
            diag -= a[j * p + k] * a[j * p + k];
        }
        if !(diag > 1e-12) || !diag.is_finite() {
            return Err(EngineError::Singular { pivot: j });
        }
        let ljj = diag.sqrt();
        a[j * p + j] = ljj;
        for i in (j + 1)..p {
            let mut s = a[i * p + j];
            for k in 0..j {
                s -= a[i * p + k] * a[j * p + k];
            }
            a[i * p + j] = s / ljj;
        }
    }

    // L z = b
    let mut z = vec![0.0; p];
    for i in 0..p {
        let mut s = b[i];
        for k in 0..i {
            s -= a[i * p + k] * z[k];
        }
        z[i] = s / a[i * p + i];
    }
    // Lᵀ x = z
    let mut x = vec![0.0; p];
    for i in (0..p).rev() {
        let mut s = z[i];
        for k in (i + 1)..p {
            s -= a[k * p + i] * x[k];
        }
        x[i] = s / a[i * p + i];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_small_spd_system() {
        // [[4, 2], [2, 3]] x = [2, 1] -> x = [0.5, 0]
        let x = cholesky_solve(vec![4.0, 2.0, 2.0, 3.0], &[2.0, 1.0], 2).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let err = cholesky_solve(vec![1.0, 1.0, 1.0, 1.0], &[1.0, 1.0], 2).unwrap_err();
        assert_eq!(err, EngineError::Singular { pivot: 1 });
    }

    #[test]
    fn least_squares_line_recovered() {
        // y = 2 + 3x
        let mut ne = NormalEquations::new(2);
        for i in 0..10 {
            let x = i as f64;
            ne.add_row(&[1.0, x], 2.0 + 3.0 * x);
        }
        assert_eq!(ne.rows(), 10);
        let beta = ne.solve(&[0.0, 0.0]).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-9);
        assert!((beta[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn penalty_makes_collinear_design_solvable() {
        let mut ne = NormalEquations::new(2);
        for i in 0..5 {
            let x = i as f64;
            ne.add_row(&[x, x], x);
        }
        assert!(ne.solve(&[0.0, 0.0]).is_err());
        let beta = ne.solve(&[1e-3, 1e-3]).unwrap();
        assert!((beta[0] - beta[1]).abs() < 1e-9);
        assert!((beta[0] + beta[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn wrong_penalty_length_is_invalid() {
        let ne = NormalEquations::new(3);
        assert!(matches!(
            ne.solve(&[0.0]),
            Err(EngineError::InvalidParameter(_))
        ));
    }
}

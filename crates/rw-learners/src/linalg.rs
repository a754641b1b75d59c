//! Dense symmetric positive-definite solves.

use ndarray::{Array1, Array2, ArrayView1};

/// Lower-triangular Cholesky factor `L` with `A = L * L^T`.
#[derive(Debug, Clone)]
pub(crate) struct Cholesky {
    l: Array2<f64>,
}

impl Cholesky {
    /// Factor `a`. If `a` is not numerically positive definite a small ridge
    /// proportional to the mean diagonal is added once before giving up.
    pub(crate) fn decompose(a: &Array2<f64>) -> Option<Self> {
        let n = a.nrows();
        if n != a.ncols() {
            return None;
        }
        Self::decompose_inner(a).or_else(|| {
            let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
            let mut a_reg = a.clone();
            a_reg.diag_mut().mapv_inplace(|v| v + ridge.max(1e-12));
            Self::decompose_inner(&a_reg)
        })
    }

    fn decompose_inner(a: &Array2<f64>) -> Option<Self> {
        let n = a.nrows();
        let mut l = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..=i {
                let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
                if i == j {
                    let diag = a[[i, i]] - sum;
                    if diag <= 0.0 || !diag.is_finite() {
                        return None;
                    }
                    l[[i, j]] = diag.sqrt();
                } else {
                    l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
                }
            }
        }
        Some(Self { l })
    }

    /// Solve `A x = b`.
    pub(crate) fn solve(&self, b: &Array1<f64>) -> Array1<f64> {
        let n = self.l.nrows();
        let l = &self.l;

        // forward: L y = b
        let mut y = Array1::<f64>::zeros(n);
        for i in 0..n {
            let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
            y[i] = (b[i] - sum) / l[[i, i]];
        }

        // backward: L^T x = y
        let mut x = Array1::<f64>::zeros(n);
        for i in (0..n).rev() {
            let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
            x[i] = (y[i] - sum) / l[[i, i]];
        }
        x
    }
}

pub(crate) fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub(crate) fn manhattan_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn solves_spd_system() {
        let a = array![[4.0, 12.0, -16.0], [12.0, 37.0, -43.0], [-16.0, -43.0, 98.0]];
        let b = array![1.0, 2.0, 3.0];
        let x = Cholesky::decompose(&a).unwrap().solve(&b);
        for (got, expected) in a.dot(&x).iter().zip(b.iter()) {
            assert!((got - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_non_square_and_indefinite() {
        assert!(Cholesky::decompose(&array![[1.0, 2.0]]).is_none());
        assert!(Cholesky::decompose(&array![[-1.0, 0.0], [0.0, -1.0]]).is_none());
    }

    #[test]
    fn distances() {
        let (a, b) = (array![0.0, 0.0], array![3.0, -4.0]);
        assert_eq!(squared_distance(a.view(), b.view()), 25.0);
        assert_eq!(manhattan_distance(a.view(), b.view()), 7.0);
    }
}

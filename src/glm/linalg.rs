//! Small dense symmetric solves for p x p normal equations

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Cholesky factor L (lower) of a symmetric positive definite matrix.
/// Returns None when a pivot is not positive.
fn cholesky(a: ArrayView2<'_, f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solve A x = b for symmetric positive definite A
pub fn solve_spd(a: ArrayView2<'_, f64>, b: ArrayView1<'_, f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let l = cholesky(a)?;

    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[[i, j]] * y[j];
        }
        y[i] = sum / l[[i, i]];
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[[j, i]] * x[j];
        }
        x[i] = sum / l[[i, i]];
    }
    Some(x)
}

/// Inverse of a symmetric positive definite matrix
pub fn invert_spd(a: ArrayView2<'_, f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut inv = Array2::<f64>::zeros((n, n));
    let mut e = Array1::<f64>::zeros(n);
    for col in 0..n {
        e.fill(0.0);
        e[col] = 1.0;
        let x = solve_spd(a, e.view())?;
        inv.column_mut(col).assign(&x);
    }
    Some(inv)
}

/// log|A| for symmetric positive definite A
pub fn log_det_spd(a: ArrayView2<'_, f64>) -> Option<f64> {
    let l = cholesky(a)?;
    Some(2.0 * l.diag().iter().map(|d| d.ln()).sum::<f64>())
}

/// X' diag(w) X
pub fn weighted_gram(design: ArrayView2<'_, f64>, weights: &[f64]) -> Array2<f64> {
    let p = design.ncols();
    let mut gram = Array2::<f64>::zeros((p, p));
    for (row, &w) in design.rows().into_iter().zip(weights) {
        for j in 0..p {
            for k in 0..=j {
                gram[[j, k]] += w * row[j] * row[k];
            }
        }
    }
    for j in 0..p {
        for k in 0..j {
            gram[[k, j]] = gram[[j, k]];
        }
    }
    gram
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_solve_and_invert() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let x = solve_spd(a.view(), b.view()).unwrap();
        assert!((4.0 * x[0] + 2.0 * x[1] - 2.0).abs() < 1e-12);
        assert!((2.0 * x[0] + 3.0 * x[1] - 1.0).abs() < 1e-12);

        let inv = invert_spd(a.view()).unwrap();
        let id = a.dot(&inv);
        assert!((id[[0, 0]] - 1.0).abs() < 1e-12);
        assert!(id[[0, 1]].abs() < 1e-12);
    }

    #[test]
    fn test_log_det() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        assert!((log_det_spd(a.view()).unwrap() - 8.0_f64.ln()).abs() < 1e-12);
        assert!(log_det_spd(array![[0.0, 0.0], [0.0, 1.0]].view()).is_none());
    }

    #[test]
    fn test_weighted_gram() {
        let x = array![[1.0, 0.0], [1.0, 1.0]];
        let g = weighted_gram(x.view(), &[2.0, 3.0]);
        assert_eq!(g, array![[5.0, 3.0], [3.0, 3.0]]);
    }
}

//! Normalized counts and per-gene moments

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{ReportError, Result};

/// Divide each column by its size factor
pub fn normalized_counts(
    counts: ArrayView2<'_, f64>,
    size_factors: ArrayView1<'_, f64>,
) -> Result<Array2<f64>> {
    if size_factors.len() != counts.ncols() {
        return Err(ReportError::DimensionMismatch {
            expected: format!("{} size factors", counts.ncols()),
            got: format!("{} size factors", size_factors.len()),
        });
    }
    let mut result = counts.to_owned();
    for (mut col, &sf) in result.axis_iter_mut(Axis(1)).zip(size_factors.iter()) {
        col.mapv_inplace(|x| x / sf);
    }
    Ok(result)
}

/// Row means and unbiased row variances of a normalized matrix
pub fn base_mean_and_var(normalized: ArrayView2<'_, f64>) -> (Array1<f64>, Array1<f64>) {
    let means = normalized
        .mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::zeros(normalized.nrows()));
    let vars = if normalized.ncols() > 1 {
        normalized.var_axis(Axis(1), 1.0)
    } else {
        Array1::zeros(normalized.nrows())
    };
    (means, vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_normalized_counts() {
        let counts = array![[10.0, 40.0], [2.0, 8.0]];
        let sf = array![1.0, 4.0];
        let norm = normalized_counts(counts.view(), sf.view()).unwrap();
        assert_eq!(norm, array![[10.0, 10.0], [2.0, 2.0]]);

        let (means, vars) = base_mean_and_var(norm.view());
        assert_eq!(means[0], 10.0);
        assert_eq!(vars[1], 0.0);
    }

    #[test]
    fn test_size_factor_length_checked() {
        let counts = array![[1.0, 2.0]];
        assert!(normalized_counts(counts.view(), array![1.0].view()).is_err());
    }
}

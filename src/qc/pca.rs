//! Principal component embedding of samples

use ndarray::{Array2, ArrayView2, Axis};
use serde::Serialize;

use crate::error::{ReportError, Result};
use crate::stats::cmp_f64;

/// Genes with the highest variance used for the embedding
pub const DEFAULT_N_TOP: usize = 500;

/// One sample in PC1/PC2 space
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PcaPoint {
    pub sample_id: String,
    pub pc1: f64,
    pub pc2: f64,
    pub cell_line: String,
    pub condition: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PcaResult {
    pub points: Vec<PcaPoint>,
    /// Percent of variance explained by PC1 and PC2
    pub percent_var: [f64; 2],
    pub n_genes_used: usize,
}

/// Eigendecomposition of a symmetric matrix by cyclic Jacobi rotations.
/// Returns eigenvalues and eigenvectors (as columns), sorted descending.
fn jacobi_eigen(matrix: &Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);

    for _sweep in 0..100 * n.max(1) {
        let off_diag: f64 = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| a[[i, j]] * a[[i, j]])
            .sum();
        if off_diag < 1e-24 {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.abs() < 1e-15 {
                    continue;
                }
                let app = a[[p, p]];
                let aqq = a[[q, q]];
                let tau = (aqq - app) / (2.0 * apq);
                let t = if tau.abs() > 1e15 {
                    1.0 / (2.0 * tau)
                } else {
                    tau.signum() / (tau.abs() + (1.0 + tau * tau).sqrt())
                };
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = t * c;

                a[[p, p]] = app - t * apq;
                a[[q, q]] = aqq + t * apq;
                a[[p, q]] = 0.0;
                a[[q, p]] = 0.0;
                for r in 0..n {
                    if r != p && r != q {
                        let arp = a[[r, p]];
                        let arq = a[[r, q]];
                        a[[r, p]] = c * arp - s * arq;
                        a[[p, r]] = a[[r, p]];
                        a[[r, q]] = s * arp + c * arq;
                        a[[q, r]] = a[[r, q]];
                    }
                }
                for r in 0..n {
                    let vrp = v[[r, p]];
                    let vrq = v[[r, q]];
                    v[[r, p]] = c * vrp - s * vrq;
                    v[[r, q]] = s * vrp + c * vrq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| cmp_f64(&a[[j, j]], &a[[i, i]]));
    let values = order.iter().map(|&i| a[[i, i]]).collect();
    let vectors = v.select(Axis(1), &order);
    (values, vectors)
}

/// PCA of the samples (columns of `data`) on the `n_top` most variable rows.
///
/// Rows are centered, not scaled. Component signs are fixed so that the
/// largest-magnitude loading is positive.
pub fn pca(
    data: ArrayView2<'_, f64>,
    sample_ids: &[String],
    cell_lines: &[String],
    conditions: &[String],
    n_top: usize,
) -> Result<PcaResult> {
    let n_samples = data.ncols();
    if n_samples < 2 {
        return Err(ReportError::InvalidInput {
            reason: "PCA needs at least two samples".to_string(),
        });
    }
    if sample_ids.len() != n_samples || cell_lines.len() != n_samples || conditions.len() != n_samples {
        return Err(ReportError::DimensionMismatch {
            expected: format!("{} sample labels", n_samples),
            got: format!("{}/{}/{}", sample_ids.len(), cell_lines.len(), conditions.len()),
        });
    }

    let variances: Vec<f64> = data.rows().into_iter().map(|r| r.var(1.0)).collect();
    let mut ranked: Vec<usize> = (0..data.nrows()).filter(|&i| variances[i].is_finite()).collect();
    ranked.sort_by(|&i, &j| cmp_f64(&variances[j], &variances[i]));
    ranked.truncate(n_top);
    if ranked.is_empty() {
        return Err(ReportError::EmptyData {
            reason: "no genes with finite variance for PCA".to_string(),
        });
    }

    let mut x = data.select(Axis(0), &ranked);
    for mut row in x.rows_mut() {
        let mean = row.mean().unwrap_or(0.0);
        row.mapv_inplace(|v| v - mean);
    }

    let gram = x.t().dot(&x);
    let (values, vectors) = jacobi_eigen(&gram);
    let total: f64 = values.iter().filter(|&&v| v > 0.0).sum();

    let mut coords = [vec![0.0; n_samples], vec![0.0; n_samples]];
    let mut percent_var = [0.0; 2];
    for k in 0..2.min(values.len()) {
        let lambda = values[k].max(0.0);
        let column = vectors.column(k);
        let sign = column
            .iter()
            .copied()
            .max_by(|a, b| cmp_f64(&a.abs(), &b.abs()))
            .map(|v| if v < 0.0 { -1.0 } else { 1.0 })
            .unwrap_or(1.0);
        for (i, &v) in column.iter().enumerate() {
            coords[k][i] = sign * v * lambda.sqrt();
        }
        percent_var[k] = if total > 0.0 { 100.0 * lambda / total } else { 0.0 };
    }

    let points = (0..n_samples)
        .map(|i| PcaPoint {
            sample_id: sample_ids[i].clone(),
            pc1: coords[0][i],
            pc2: coords[1][i],
            cell_line: cell_lines[i].clone(),
            condition: conditions[i].clone(),
        })
        .collect();

    log::debug!(
        "PCA on {} genes: PC1 {:.1}%, PC2 {:.1}%",
        ranked.len(),
        percent_var[0],
        percent_var[1]
    );
    Ok(PcaResult {
        points,
        percent_var,
        n_genes_used: ranked.len(),
    })
}

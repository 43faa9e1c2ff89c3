//! Design matrix creation for GLM

use ndarray::Array2;

use super::linalg::{log_det_spd, weighted_gram};
use crate::data::SampleMetadata;
use crate::error::{ReportError, Result};

/// Information about the design matrix
#[derive(Debug, Clone)]
pub struct DesignInfo {
    /// Names of the coefficients
    pub coef_names: Vec<String>,
    /// Reference level of the design variable
    pub reference_level: String,
    /// Level coded by the second column, if any
    pub treated_level: Option<String>,
}

/// Two-group design `[1, indicator(value == treated)]` with `reference` as
/// the baseline. Every sample must carry one of the two levels and both
/// levels must be present.
pub fn create_design_matrix(
    metadata: &SampleMetadata,
    design_variable: &str,
    reference: &str,
    treated: &str,
) -> Result<(Array2<f64>, DesignInfo)> {
    let values = metadata.condition(design_variable).ok_or_else(|| {
        ReportError::InvalidDesign {
            reason: format!("Variable '{}' not found in metadata", design_variable),
        }
    })?;

    if let Some(other) = values.iter().find(|v| *v != reference && *v != treated) {
        return Err(ReportError::InvalidDesign {
            reason: format!(
                "{} has level '{}'; expected only '{}' and '{}'",
                design_variable, other, reference, treated
            ),
        });
    }

    for level in [reference, treated] {
        if !values.iter().any(|v| v == level) {
            return Err(ReportError::InvalidDesign {
                reason: format!("no samples with {} = '{}'", design_variable, level),
            });
        }
    }

    let n = values.len();
    let mut design = Array2::zeros((n, 2));
    for (i, value) in values.iter().enumerate() {
        design[[i, 0]] = 1.0;
        if value == treated {
            design[[i, 1]] = 1.0;
        }
    }

    check_full_rank(&design)?;
    let info = DesignInfo {
        coef_names: vec![
            "Intercept".to_string(),
            format!("{}_{}_vs_{}", design_variable, treated, reference),
        ],
        reference_level: reference.to_string(),
        treated_level: Some(treated.to_string()),
    };
    Ok((design, info))
}

/// Intercept-only design (~1), used for blind estimation
pub fn intercept_design(n_samples: usize) -> Array2<f64> {
    Array2::ones((n_samples, 1))
}

/// Residual degrees of freedom n - p
pub fn residual_df(design: &Array2<f64>) -> isize {
    design.nrows() as isize - design.ncols() as isize
}

/// Reject designs whose X'X is singular
pub fn check_full_rank(matrix: &Array2<f64>) -> Result<()> {
    if matrix.nrows() == 0 || matrix.ncols() == 0 {
        return Err(ReportError::InvalidDesign {
            reason: "Design matrix has zero rows or columns".to_string(),
        });
    }

    if let Some(j) = (0..matrix.ncols()).find(|&j| matrix.column(j).iter().all(|&v| v == 0.0)) {
        return Err(ReportError::InvalidDesign {
            reason: format!("design column {} is all zeros; a level has no samples", j),
        });
    }

    let gram = weighted_gram(matrix.view(), &vec![1.0; matrix.nrows()]);
    match log_det_spd(gram.view()) {
        Some(log_det) if log_det > -30.0 => Ok(()),
        _ => Err(ReportError::InvalidDesign {
            reason: "the model matrix is not full rank; some columns are linear combinations \
                     of the others"
                .to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(conditions: &[&str]) -> SampleMetadata {
        let ids = (1..=conditions.len()).map(|i| format!("s{}", i)).collect();
        let mut meta = SampleMetadata::new(ids).unwrap();
        meta.add_condition(
            "condition",
            conditions.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        meta
    }

    #[test]
    fn test_two_group_design() {
        let meta = metadata(&["control", "treated", "control", "treated"]);
        let (design, info) = create_design_matrix(&meta, "condition", "control", "treated").unwrap();
        assert_eq!(design.column(0).sum(), 4.0);
        assert_eq!(design.column(1).to_vec(), vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(info.coef_names[1], "condition_treated_vs_control");
        assert_eq!(residual_df(&design), 2);
    }

    #[test]
    fn test_missing_level_rejected() {
        let meta = metadata(&["control", "control"]);
        let err = create_design_matrix(&meta, "condition", "control", "treated").unwrap_err();
        assert!(matches!(err, ReportError::InvalidDesign { .. }));
    }

    #[test]
    fn test_unexpected_level_rejected() {
        let meta = metadata(&["control", "treated", "vehicle"]);
        assert!(create_design_matrix(&meta, "condition", "control", "treated").is_err());
    }

    #[test]
    fn test_rank_check() {
        let collinear = ndarray::array![[1.0, 2.0], [1.0, 2.0], [1.0, 2.0]];
        assert!(check_full_rank(&collinear).is_err());
        assert!(check_full_rank(&intercept_design(3)).is_ok());
    }
}

//! Generalized Linear Model fitting for negative binomial data

mod design;
mod fitting;
pub(crate) mod linalg;
mod negative_binomial;

pub use design::{check_full_rank, create_design_matrix, intercept_design, residual_df, DesignInfo};
pub use fitting::{fit_glm, fit_single_gene, GlmFitParams, GlmFitResult};
pub use negative_binomial::{nb_deviance, nb_log_likelihood, nb_mean, nb_weight, MAX_BETA, MIN_MU};

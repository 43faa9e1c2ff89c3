//! Transformations of count data for visualization and QC

mod vst;

pub use vst::{vst, vst_value, VstResult};

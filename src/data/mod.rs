//! Data structures: count matrix, sample metadata and the experiment dataset

mod assemble;
mod count_matrix;
mod dataset;
mod metadata;

pub use assemble::{aggregate_to_genes, assemble_counts, AssemblyReport, SampleAssembly, SampleQuant};
pub use count_matrix::CountMatrix;
pub use dataset::ExperimentDataset;
pub use metadata::SampleMetadata;

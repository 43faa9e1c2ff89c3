//! rust_dge_report: differential expression and pathway enrichment report
//!
//! Builds a static HTML report comparing treated and control samples within
//! each cell line: gene counts assembled from transcript quantifications,
//! variance-stabilized QC, negative binomial Wald tests, annotation, GO
//! over-representation and the figures that go with them.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use rust_dge_report::prelude::*;
//!
//! let inputs = ReportInputs {
//!     tx2gene: "tx2gene.tsv".into(),
//!     metadata: "samples.tsv".into(),
//!     quant_dir: "quant".into(),
//!     annotation: "genes.tsv".into(),
//!     ontology: "go-basic.obo".into(),
//!     gene2go: "gene2go".into(),
//! };
//! let rendered = run_report(&inputs, Path::new("report"), &ReportParams::default())?;
//! println!("{}", rendered.html.display());
//! ```

pub mod annotation;
pub mod cli;
pub mod data;
pub mod dispersion;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod filter;
pub mod glm;
pub mod io;
pub mod normalization;
pub mod pipeline;
pub mod qc;
pub mod report;
pub mod stats;
pub mod testing;
pub mod transform;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::annotation::{annotate, AnnotatedResults, AnnotatedRow, AnnotationRecord, AnnotationSource, TsvAnnotationSource};
    pub use crate::data::{assemble_counts, AssemblyReport, CountMatrix, ExperimentDataset, SampleMetadata};
    pub use crate::dispersion::{estimate_dispersions, DispersionParams, DispersionTrend};
    pub use crate::engine::{
        is_significant, Contrast, DeResultRow, DeResults, DifferentialExpressionEngine, NegativeBinomialEngine,
        LFC_THRESHOLD, PADJ_THRESHOLD,
    };
    pub use crate::enrichment::{
        EnrichmentEngine, EnrichmentParams, EnrichmentQuery, EnrichmentResult, HypergeometricEnrichment, Ontology,
    };
    pub use crate::error::{ReportError, Result};
    pub use crate::glm::GlmFitParams;
    pub use crate::io::{read_metadata, read_tx2gene};
    pub use crate::normalization::estimate_size_factors;
    pub use crate::pipeline::{analyze, run_report, Engines, ReportInputs, ReportParams};
    pub use crate::qc::{run_qc, QcSummary};
    pub use crate::report::{render_report, RenderParams, RenderedReport, ReportContent};
    pub use crate::testing::benjamini_hochberg;
    pub use crate::transform::{vst, VstResult};
}

//! Command-line interface for rust_dge_report

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rust_dge_report")]
#[command(version)]
#[command(about = "Differential expression and GO enrichment report for two cell lines")]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the full report
    #[command(
        about = "Build the full report",
        long_about = "Build the full report\n\n\
            Assembles gene counts from per-sample transcript quantifications, runs\n\
            variance-stabilized QC (box plot, PCA), tests treated against control\n\
            within each cell line, annotates the results, tests GO biological-process\n\
            enrichment among significant genes and writes report.html with its\n\
            figures and tables.\n\n\
            A gene is significant when padj < 0.05 and |log2FoldChange| > 2.",
        after_long_help = "\
Examples:
  rust_dge_report run --tx2gene tx2gene.tsv --metadata samples.tsv \\
    --quant-dir quant/ --annotation genes.tsv --ontology go-basic.obo \\
    --gene2go gene2go -o report/

  # Different metadata columns and levels
  rust_dge_report run --tx2gene tx2gene.tsv --metadata samples.tsv \\
    --quant-dir quant/ --annotation genes.tsv --ontology go-basic.obo \\
    --gene2go gene2go -o report/ --condition-column treatment \\
    --control DMSO --treated drug"
    )]
    Run {
        /// Transcript-to-gene mapping table
        #[arg(long, value_name = "FILE",
            long_help = "Transcript-to-gene mapping table (tab or comma separated).\n\
                Two columns: transcript ID, gene ID. A header row is optional.\n\
                Version suffixes (ENST000001.3) are ignored on both sides.")]
        tx2gene: PathBuf,

        /// Sample metadata table
        #[arg(short, long, value_name = "FILE",
            long_help = "Sample metadata table.\n\
                Format: first column = sample IDs (one quantification directory each),\n\
                remaining columns include the cell line and condition.")]
        metadata: PathBuf,

        /// Directory with one quantification subdirectory per sample
        #[arg(short, long, value_name = "DIR",
            long_help = "Directory with one subdirectory per sample, named by sample ID.\n\
                Each holds quant.sf (Salmon), abundance.tsv (kallisto) or quant.tsv\n\
                (transcript_id, count).")]
        quant_dir: PathBuf,

        /// Gene annotation table
        #[arg(short, long, value_name = "FILE",
            long_help = "Gene annotation table with header gene_id, symbol, gene_name, entrez_id.\n\
                The first record for a gene wins; later duplicates are dropped.")]
        annotation: PathBuf,

        /// Gene Ontology in OBO format
        #[arg(long, value_name = "FILE")]
        ontology: PathBuf,

        /// NCBI gene2go annotation file
        #[arg(long, value_name = "FILE",
            long_help = "NCBI gene2go file. Only the Process category is used and\n\
                NOT-qualified annotations are skipped.")]
        gene2go: PathBuf,

        /// Output directory [default: dge_report]
        #[arg(short, long, value_name = "DIR", default_value = "dge_report")]
        output: PathBuf,

        /// Metadata column holding the cell line [default: cell_line]
        #[arg(long, default_value = "cell_line")]
        cell_line_column: String,

        /// Metadata column holding the condition [default: condition]
        #[arg(long, default_value = "condition")]
        condition_column: String,

        /// Reference condition level [default: control]
        #[arg(long, default_value = "control")]
        control: String,

        /// Tested condition level [default: treated]
        #[arg(long, default_value = "treated")]
        treated: String,

        /// Genes labelled on volcano plots and shown in heatmaps [default: 10]
        #[arg(long, default_value = "10")]
        top_n: usize,

        /// Rows of the ranked tables in the report [default: 6]
        #[arg(long, default_value = "6")]
        table_rows: usize,

        /// Categories seeding each DAG plot [default: 5]
        #[arg(long, default_value = "5")]
        dag_top: usize,

        /// Allowed deviation of a sample median, log2 scale [default: 1.0]
        #[arg(long, default_value = "1.0",
            long_help = "Samples whose VST median is further than this from the median of\n\
                all sample medians are flagged in the log and the report.")]
        median_tolerance: f64,

        /// Smallest category tested for enrichment [default: 10]
        #[arg(long, default_value = "10")]
        min_gs_size: usize,

        /// Largest category tested for enrichment [default: 500]
        #[arg(long, default_value = "500")]
        max_gs_size: usize,

        /// NCBI taxon kept from gene2go, or "all" [default: 9606]
        #[arg(long, default_value = "9606",
            long_help = "NCBI taxon ID whose gene2go rows are used (9606 = human).\n\
                Pass \"all\" to keep every organism in the file.")]
        tax_id: String,

        /// Number of threads (0 = auto) [default: 0]
        #[arg(short = 't', long, default_value = "0")]
        threads: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 14] = [
        "rust_dge_report",
        "run",
        "--tx2gene",
        "t.tsv",
        "--metadata",
        "m.tsv",
        "--quant-dir",
        "quant",
        "--annotation",
        "a.tsv",
        "--ontology",
        "go.obo",
        "--gene2go",
        "gene2go",
    ];

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(REQUIRED).unwrap();
        let Some(Commands::Run { tax_id, top_n, output, .. }) = cli.command else {
            panic!("expected the run command");
        };
        assert_eq!(tax_id, "9606");
        assert_eq!(top_n, 10);
        assert_eq!(output, PathBuf::from("dge_report"));
    }

    #[test]
    fn test_tax_id_override() {
        let args: Vec<&str> = REQUIRED.iter().copied().chain(["--tax-id", "all"]).collect();
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Some(Commands::Run { ref tax_id, .. }) if tax_id == "all"));
    }
}

//! rust_dge_report command-line interface

use clap::Parser;
use log::{info, LevelFilter};

use rust_dge_report::cli::{Cli, Commands};
use rust_dge_report::prelude::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Find the first non-flag argument (potential subcommand)
    let first_positional = args.iter().skip(1).find(|a| !a.starts_with('-'));
    let subcommands = ["run", "help"];
    let has_subcommand = first_positional.map_or(false, |a| subcommands.contains(&a.as_str()));

    if !has_subcommand {
        if args.iter().any(|a| a == "--help") {
            print_long_help();
        } else if args.iter().any(|a| a == "-h") {
            print_short_help();
        } else if args.iter().any(|a| a == "-V" || a == "--version") {
            println!("rust_dge_report {}", VERSION);
        } else {
            print_no_args();
        }
        return;
    }

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            tx2gene,
            metadata,
            quant_dir,
            annotation,
            ontology,
            gene2go,
            output,
            cell_line_column,
            condition_column,
            control,
            treated,
            top_n,
            table_rows,
            dag_top,
            median_tolerance,
            min_gs_size,
            max_gs_size,
            tax_id,
            threads,
        }) => {
            let inputs = ReportInputs {
                tx2gene,
                metadata,
                quant_dir,
                annotation,
                ontology,
                gene2go,
            };
            let params = ReportParams {
                cell_line_column,
                condition_column,
                control,
                treated,
                top_n,
                table_rows,
                dag_top,
                median_tolerance,
                enrichment: EnrichmentParams {
                    min_gs_size,
                    max_gs_size,
                    tax_id: (tax_id != "all").then_some(tax_id),
                    ..Default::default()
                },
                ..Default::default()
            };
            run(&inputs, &output, &params, threads)
        }
        None => {
            print_no_args();
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_no_args() {
    println!("rust_dge_report v{}", VERSION);
    println!("Run `rust_dge_report -h` for usage or `rust_dge_report --help` for detailed information.");
}

fn print_short_help() {
    println!("rust_dge_report v{}", VERSION);
    println!();
    println!("Usage: rust_dge_report <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  run   Build the differential expression and enrichment report");
    println!();
    println!("Run `rust_dge_report <COMMAND> -h` for command-specific options.");
}

fn print_long_help() {
    println!("rust_dge_report v{}", VERSION);
    println!("Differential expression and GO enrichment report for two cell lines");
    println!();
    println!("Usage: rust_dge_report <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  run   Build the report");
    println!("          - gene counts from Salmon, kallisto or generic quantifications");
    println!("          - VST box plot and PCA");
    println!("          - negative binomial Wald tests per cell line");
    println!("          - volcano plots, heatmaps, overlap diagram");
    println!("          - GO biological-process enrichment dot plots and DAGs");
    println!();
    println!("Global Options:");
    println!("  -v, --verbose    Enable verbose output");
    println!("  -h               Print short help");
    println!("      --help       Print detailed help");
    println!("  -V, --version    Print version");
    println!();
    println!("Example:");
    println!("  rust_dge_report run --tx2gene tx2gene.tsv -m samples.tsv -q quant/ \\");
    println!("    -a genes.tsv --ontology go-basic.obo --gene2go gene2go -o report/");
}

fn run(inputs: &ReportInputs, output: &std::path::Path, params: &ReportParams, threads: usize) -> Result<()> {
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .ok();
    }

    info!(
        "Contrast {} within each {}",
        params.contrast(),
        params.cell_line_column
    );
    let rendered = run_report(inputs, output, params)?;

    let unavailable: Vec<&str> = rendered
        .figures
        .iter()
        .filter(|f| !f.is_rendered())
        .map(|f| f.file.as_str())
        .collect();
    if !unavailable.is_empty() {
        info!("Placeholders: {}", unavailable.join(", "));
    }
    info!("Report: {}", rendered.html.display());
    info!("Summary: {}", rendered.summary.display());
    Ok(())
}

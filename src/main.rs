//! chartprep CLI - aggregate and reshape CSV datasets into chart-ready JSON
//!
//! # Main Commands
//!
//! ```bash
//! chartprep inspect data.csv               # Headers and a preview, no schema needed
//! chartprep run data.csv -c config.json    # Full pipeline, report as JSON
//! ```
//!
//! # Helper Commands
//!
//! ```bash
//! chartprep example-config                 # Show a worked dataset config
//! chartprep operations                     # Show available derives and reductions
//! ```

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use chartprep::{
    decode_content, detect_delimiter, detect_encoding, example_config, preview, run_dataset,
    DatasetConfig, RunOptions,
};

#[derive(Parser)]
#[command(name = "chartprep")]
#[command(about = "Aggregate and reshape CSV datasets into chart-ready data", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show headers and the first rows of a CSV file
    Inspect {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Number of preview rows
        #[arg(short, long, default_value = "5")]
        rows: usize,
    },

    /// Run the full pipeline: load, clean, aggregate, reshape
    Run {
        /// Input CSV file
        input: PathBuf,

        /// Dataset config file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file for the report (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// CSV delimiter override
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Show a worked example dataset config
    ExampleConfig,

    /// Show available derive operations and reductions
    Operations,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Inspect {
            input,
            delimiter,
            rows,
        } => cmd_inspect(&input, delimiter, rows),

        Commands::Run {
            input,
            config,
            output,
            delimiter,
        } => cmd_run(&input, &config, output.as_deref(), delimiter),

        Commands::ExampleConfig => cmd_example_config(),

        Commands::Operations => cmd_operations(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_inspect(
    input: &Path,
    delimiter: Option<char>,
    rows: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Inspecting: {}", input.display());

    let bytes = fs::read(input)?;
    let encoding = detect_encoding(&bytes);
    let content = decode_content(&bytes, &encoding)?;
    let used_delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));

    eprintln!("   Encoding: {}", encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(used_delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );

    let (headers, preview_rows) = preview(&bytes, Some(used_delimiter), rows)?;
    eprintln!("   Columns: {}", headers.len());
    for (i, col) in headers.iter().enumerate() {
        println!("  [{:2}] {}", i + 1, col);
    }

    println!();
    for row in &preview_rows {
        println!("  {}", row.join(" | "));
    }
    Ok(())
}

fn cmd_run(
    input: &Path,
    config_path: &Path,
    output: Option<&Path>,
    delimiter: Option<char>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Processing: {}", input.display());

    let config = DatasetConfig::from_json(&fs::read_to_string(config_path)?)?;
    let options = RunOptions { delimiter };
    let report = run_dataset(input, &config, &options)?;

    eprintln!("   Encoding: {}", report.source.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(report.source.delimiter));
    eprintln!("   Rows: {}", report.source.row_count);
    if !report.source.nulled.is_empty() {
        eprintln!("   Nulled cells: {}", report.source.nulled.len());
    }
    if !report.source.substituted.is_empty() {
        eprintln!("   Date stand-ins applied: {}", report.source.substituted.len());
    }
    if let Some(ref duplicates) = report.duplicates {
        if duplicates.is_empty() {
            eprintln!("   No duplicates over {:?}", duplicates.subset);
        } else {
            eprintln!(
                "   Duplicates: {} groups, {} rows (reported, not dropped)",
                duplicates.groups.len(),
                duplicates.row_count()
            );
        }
    }
    eprintln!("   Analyses: {}", report.outputs.len());

    let json = serde_json::to_string_pretty(&report)?;
    write_output(&json, output)?;

    eprintln!("Done.");
    Ok(())
}

fn cmd_example_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", example_config().to_json()?);
    Ok(())
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", chartprep::transform::derive::operations_description());
    println!();
    println!("{}", chartprep::transform::aggregate::reductions_description());
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

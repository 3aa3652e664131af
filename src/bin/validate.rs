//! Validator binary: flags parts whose holes are too deep to be reached by the
//! drilling/inspection tool.
//!
//! ## Input
//!
//! A parquet file with (at least) a `uuid` column and a `holes` column. Each
//! `holes` value is a JSON list of `{"length": .., "radius": ..}` objects, a
//! single such object, or null.
//!
//! ## Output
//!
//! A parquet file with the `uuid` and `holes` columns plus two boolean columns:
//! - `has_unreachable_hole_warning` — some hole is longer than 20x its radius
//! - `has_unreacheable_hole_error`  — some hole is longer than 80x its radius
//!
//! Row groups are processed one at a time and appended to the output as they
//! complete. The output is first written to a hidden `.partial` sibling and only
//! renamed into place once every row group succeeded.
//!
//! ## Usage
//!
//! ```sh
//! cargo run --release --bin validate -- parts.parquet parts.validated.parquet
//! ```

use std::path::PathBuf;

use clap::Parser;
use holes_validator::validator::HolesValidator;
use indicatif::{HumanCount, HumanDuration, ProgressBar, ProgressStyle};
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Process a Parquet file containing manufacturing data")]
struct Args {
    /// Path to input Parquet local file.
    input_file: PathBuf,

    /// Path to output Parquet file where results will be saved.
    output_file: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let start = std::time::Instant::now();

    info!("Processing file: {}", args.input_file.display());
    let validator = HolesValidator::new(&args.input_file);
    let (reader, schema) = validator.open()?;
    info!(
        "  {} rows in {} row groups",
        HumanCount(reader.num_rows() as u64),
        reader.num_row_groups()
    );

    let progress = ProgressBar::new(reader.num_row_groups() as u64);
    progress.set_style(
        ProgressStyle::with_template("  Validating {bar:40.cyan/blue} {pos}/{len} row groups [{elapsed_precise}]")?
            .progress_chars("##-"),
    );

    let result = validator.write_reader_to(reader, &schema, &args.output_file, |p| {
        progress.set_position(p.row_groups as u64)
    });
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            progress.abandon();
            return Err(e.into());
        }
    };
    progress.finish_and_clear();

    info!(
        "Processing completed. Number of rows processed: {}",
        summary.rows
    );
    info!(
        "  {} warnings, {} errors, {} malformed holes payloads",
        HumanCount(summary.warnings as u64),
        HumanCount(summary.errors as u64),
        HumanCount(summary.malformed_payloads as u64)
    );
    info!("Processed file saved to: {}", args.output_file.display());
    info!("Done in {}", HumanDuration(start.elapsed()));

    Ok(())
}

use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::{ArgGroup, Parser};
use matchpub::{dataset_table, format_count, init_tracing_with_default, Publisher, RunMode, VerifyReport, DEFAULT_REPO_ID};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "matchpub")]
#[command(about = "Convert DataCite-ROR matching output to Parquet and upload it to the Hugging Face Hub")]
#[command(version)]
#[command(group(ArgGroup::new("mode").args(["stats_only", "convert_only", "upload_only"])))]
struct Cli {
    /// Input directory containing the matching output files
    #[arg(long, default_value = "./datacite-ror-output")]
    input_dir: PathBuf,

    /// Output directory for Parquet files, the dataset card and stats.json
    #[arg(long, default_value = "./datacite-ror-output/hf_upload")]
    output_dir: PathBuf,

    /// Hugging Face dataset repository (owner/name)
    #[arg(long, default_value = DEFAULT_REPO_ID)]
    repo_id: String,

    /// Only collect and print statistics, don't convert or upload
    #[arg(long)]
    stats_only: bool,

    /// Convert to Parquet but don't upload
    #[arg(long)]
    convert_only: bool,

    /// Upload existing Parquet files (skip conversion)
    #[arg(long)]
    upload_only: bool,

    /// Make the repository private
    #[arg(long)]
    private: bool,

    /// Hugging Face API token
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Only process specific datasets (by config name)
    #[arg(long, num_args = 1.., value_parser = PossibleValuesParser::new(dataset_table::config_names()))]
    files: Option<Vec<String>>,

    /// Hub endpoint
    #[arg(long, env = "HF_ENDPOINT", default_value = matchpub::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Records buffered per Parquet write
    #[arg(long, default_value_t = matchpub::BATCH_SIZE)]
    batch_size: usize,

    /// Target shard size in MiB for large datasets
    #[arg(long, default_value_t = 1024)]
    shard_size_mb: u64,

    /// Continue to the upload without asking when row counts mismatch
    #[arg(short, long)]
    yes: bool,

    /// Disable progress bars
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn ask_continue(report: &VerifyReport) -> bool {
    for e in report.entries.iter().filter(|e| !e.ok()) {
        eprintln!(
            "  mismatch in {}: {} rows written, {} expected",
            e.config_name,
            format_count(e.actual),
            format_count(e.expected)
        );
    }
    eprint!("Continue with upload? (y/N): ");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    line.trim().eq_ignore_ascii_case("y")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing_with_default(if cli.verbose { "debug" } else { "info" });

    let mode = if cli.stats_only {
        RunMode::StatsOnly
    } else if cli.convert_only {
        RunMode::ConvertOnly
    } else if cli.upload_only {
        RunMode::UploadOnly
    } else {
        RunMode::Full
    };

    let mut publisher = Publisher::new()
        .input_dir(&cli.input_dir)
        .output_dir(&cli.output_dir)
        .repo_id(cli.repo_id.as_str())
        .endpoint(cli.endpoint.as_str())
        .token(cli.token.clone())
        .private(cli.private)
        .batch_size(cli.batch_size)
        .target_shard_bytes(cli.shard_size_mb.saturating_mul(1024 * 1024))
        .progress(!cli.no_progress);
    if let Some(names) = &cli.files {
        publisher = publisher.datasets(dataset_table::select(names)?);
    }

    let yes = cli.yes;
    let summary = match publisher.run(mode, |report| yes || ask_continue(report)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = &summary.stats_path {
        println!("Stats saved to: {}", path.display());
    }
    if !summary.parquet_files.is_empty() {
        println!("Wrote {} Parquet file(s) under {}", summary.parquet_files.len(), cli.output_dir.join("data").display());
    }
    if let Some(url) = &summary.repo_url {
        println!("Upload complete: {}", url);
    }
    Ok(())
}

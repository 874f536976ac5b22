//! sieve-dedup CLI - duplicate removal for web text corpora.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use sieve_dedup::{DedupMode, InputFormat, LineNormalization, Pipeline, PipelineConfig, RunReport};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// JSON output for a run.
#[derive(Serialize)]
struct JsonOutput<'a> {
    inputs: Vec<String>,
    output: Option<String>,
    #[serde(flatten)]
    report: &'a RunReport,
    throughput_docs_s: f64,
}

/// Deduplication mode.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum Mode {
    /// Remove lines repeated anywhere in the corpus
    Exact,
    /// Remove near-duplicate documents (MinHash + LSH)
    Fuzzy,
    /// Exact line pass, then fuzzy document pass
    Both,
}

impl From<Mode> for DedupMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Exact => Self::Exact,
            Mode::Fuzzy => Self::Fuzzy,
            Mode::Both => Self::Both,
        }
    }
}

/// Input format.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum Format {
    /// One document per file
    Text,
    /// JSON Lines, one document per line
    Jsonl,
}

impl From<Format> for InputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => Self::Text,
            Format::Jsonl => Self::Jsonl,
        }
    }
}

/// Line comparison policy for exact mode.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum Normalization {
    /// Byte-exact line content
    Exact,
    /// Ignore leading/trailing whitespace
    Trim,
    /// Ignore surrounding whitespace and case
    TrimLowercase,
}

impl From<Normalization> for LineNormalization {
    fn from(n: Normalization) -> Self {
        match n {
            Normalization::Exact => Self::Exact,
            Normalization::Trim => Self::Trim,
            Normalization::TrimLowercase => Self::TrimLowercase,
        }
    }
}

/// Duplicate removal for web text corpora.
///
/// Removes repeated boilerplate lines (exact mode) and near-duplicate
/// documents (fuzzy mode, MinHash + LSH with exact Jaccard verification).
/// Writes one file per retained document.
#[derive(Parser, Debug)]
#[command(name = "sieve-dedup")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input files or directories.
    #[arg(value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Output directory for retained documents.
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Deduplication mode [default: fuzzy].
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Number of MinHash functions [default: 128].
    #[arg(long)]
    num_hashes: Option<usize>,

    /// Number of LSH bands; must divide --num-hashes [default: 16].
    #[arg(long)]
    num_bands: Option<usize>,

    /// Words per shingle [default: 5].
    #[arg(short = 'n', long)]
    ngrams: Option<usize>,

    /// Jaccard similarity threshold (0.0-1.0) [default: 0.8].
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Seed for the MinHash function family [default: 42].
    #[arg(long)]
    seed: Option<u64>,

    /// Input format [default: text].
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// JSONL field containing the text [default: text].
    #[arg(short = 'f', long)]
    field: Option<String>,

    /// Line comparison policy for exact mode [default: trim].
    #[arg(long, value_enum)]
    line_normalization: Option<Normalization>,

    /// Fail if the exact pass sees more distinct lines than this.
    #[arg(long)]
    max_distinct_lines: Option<usize>,

    /// Mask emails, phone numbers and IP addresses before deduplication.
    #[arg(long)]
    mask_pii: bool,

    /// Write a JSONL manifest of removed documents and line counts.
    #[arg(long, value_name = "PATH")]
    manifest: Option<PathBuf>,

    /// Worker threads (defaults to one per core).
    #[arg(long)]
    threads: Option<usize>,

    /// TOML config file; flags override its values.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print statistics only, don't write output.
    #[arg(long)]
    stats_only: bool,

    /// Output results as JSON.
    #[arg(long)]
    json: bool,

    /// Show a progress spinner.
    #[arg(long)]
    progress: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Create a spinner for indeterminate progress.
fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

/// Config file (if any) with explicit flags layered on top.
fn build_config(args: &Cli) -> Result<PipelineConfig, sieve_core::SieveError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    if let Some(n) = args.num_hashes {
        config.fuzzy.num_hashes = n;
    }
    if let Some(b) = args.num_bands {
        config.fuzzy.num_bands = b;
    }
    if let Some(n) = args.ngrams {
        config.fuzzy.ngrams = n;
    }
    if let Some(t) = args.threshold {
        config.fuzzy.jaccard_threshold = t;
    }
    if let Some(seed) = args.seed {
        config.fuzzy.seed = seed;
    }
    if let Some(format) = args.format {
        config.input_format = format.into();
    }
    if let Some(field) = &args.field {
        config.text_field = field.clone();
    }
    if let Some(n) = args.line_normalization {
        config.lines.normalization = n.into();
    }
    if let Some(limit) = args.max_distinct_lines {
        config.lines.max_distinct_lines = Some(limit);
    }
    if args.mask_pii {
        config.mask_pii = true;
    }
    if let Some(path) = &args.manifest {
        config.manifest = Some(path.clone());
    }
    if let Some(threads) = args.threads {
        config.threads = Some(threads);
    }

    Ok(config)
}

fn print_report(report: &RunReport, args: &Cli) {
    eprintln!();
    eprintln!("Deduplication Results ({}):", report.mode);
    eprintln!("  Documents in:       {}", report.documents_in);
    eprintln!("  Documents out:      {}", report.documents_out);
    eprintln!("  Skipped inputs:     {}", report.skipped.len());
    if report.mode.runs_exact() {
        eprintln!("  Lines in:           {}", report.lines_in);
        eprintln!("  Lines out:          {}", report.lines_out);
    }
    if report.mode.runs_fuzzy() {
        eprintln!("  Duplicate clusters: {}", report.duplicate_clusters);
        eprintln!("  Duplicates removed: {}", report.duplicates_removed);
    }
    if let Some(pii) = &report.pii {
        eprintln!(
            "  PII masked:         {} emails, {} phone numbers, {} IPs",
            pii.emails, pii.phone_numbers, pii.ip_addresses
        );
    }

    if args.verbose {
        for skip in &report.skipped {
            eprintln!("  skipped {}: {}", skip.path, skip.reason);
        }
    }

    eprintln!();
    eprintln!("Performance:");
    if report.mode.runs_fuzzy() {
        eprintln!("  Candidate pairs:    {}", report.candidate_pairs);
        eprintln!("  Verified pairs:     {}", report.verified_pairs);
    }
    eprintln!("  Processing time:    {:.3}s", report.elapsed_secs);

    if args.stats_only {
        eprintln!();
        eprintln!("(Output not written: --stats-only mode)");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    // Handle completions subcommand
    if let Some(Commands::Completions { shell }) = args.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "sieve-dedup", &mut io::stdout());
        return Ok(());
    }

    init_tracing(args.verbose);

    if args.inputs.is_empty() {
        fail("at least one input is required");
    }
    if !args.stats_only && args.output.is_none() {
        fail("output directory required (use -o/--output or --stats-only)");
    }

    let config = build_config(&args).unwrap_or_else(|e| fail(e));
    let pipeline = Pipeline::new(config).unwrap_or_else(|e| fail(e));

    if args.verbose && !args.json {
        let config = pipeline.config();
        eprintln!("Configuration:");
        eprintln!("  Mode: {}", config.mode);
        eprintln!("  Inputs: {}", args.inputs.len());
        if let Some(ref output) = args.output {
            eprintln!("  Output: {}", output.display());
        }
        eprintln!("  Format: {:?}", config.input_format);
        eprintln!("  Hashes / bands: {} / {}", config.fuzzy.num_hashes, config.fuzzy.num_bands);
        eprintln!("  N-gram size: {}", config.fuzzy.ngrams);
        eprintln!("  Threshold: {}", config.fuzzy.jaccard_threshold);
        eprintln!("  Line normalization: {:?}", config.lines.normalization);
        eprintln!("  Mask PII: {}", config.mask_pii);
        eprintln!();
    }

    let pb = if args.progress && !args.json {
        Some(create_spinner("Running deduplication..."))
    } else {
        None
    };

    let output_dir = if args.stats_only {
        None
    } else {
        args.output.as_deref()
    };
    let result = pipeline.run(&args.inputs, output_dir);

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let report = result.unwrap_or_else(|e| fail(e));

    if args.json {
        let throughput = if report.elapsed_secs > 0.0 {
            report.documents_in as f64 / report.elapsed_secs
        } else {
            0.0
        };
        let output = JsonOutput {
            inputs: args.inputs.iter().map(|p| p.display().to_string()).collect(),
            output: output_dir.map(|p| p.display().to_string()),
            report: &report,
            throughput_docs_s: throughput,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&report, &args);
    }

    Ok(())
}

//! Bundle generator CLI
//!
//! Turns a file or directory into a Rust source file declaring a static
//! table of bundle entries and a function returning their index.

use anyhow::{Context, Result};
use bundle::{GeneratorOptions, Generator, Outcome, SkipPattern, SourceOptions};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mkbundle")]
#[command(about = "Embed files into Rust source as a bundle", long_about = None)]
struct Cli {
    /// File or directory to embed
    #[arg(value_name = "FILE_OR_DIR")]
    input: PathBuf,
    /// Output file (default: standard output)
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Wrap the generated items in `pub mod <MODULE>`
    #[arg(long)]
    module: Option<String>,
    /// Name of the static entry table
    #[arg(long, default_value = "BUNDLE")]
    bundle: String,
    /// Name of the function returning the index
    #[arg(long, default_value = "bundle_index")]
    index: String,
    /// Path to the bundle crate as seen from the generated file
    #[arg(long, default_value = "::bundle")]
    crate_path: String,
    /// Gzip entries before encoding
    #[arg(short, long)]
    gzip: bool,
    /// Skip files and directories whose name matches this glob (repeatable)
    #[arg(long = "skip", value_name = "GLOB")]
    skip: Vec<SkipPattern>,
    /// Regenerate even when the output is newer than the input
    #[arg(short, long)]
    always: bool,
    /// Log every embedded file
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // Logs go to stderr so stdout can carry the generated source
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = GeneratorOptions {
        output: cli.out,
        source: SourceOptions {
            module: cli.module,
            bundle_name: cli.bundle,
            index_name: cli.index,
            crate_path: cli.crate_path,
            timestamp: true,
        },
        compress: cli.gzip,
        skip: cli.skip,
        always: cli.always,
    };

    let generator = Generator::new(options).context("Invalid generator options")?;
    let outcome = generator
        .run(&cli.input)
        .with_context(|| format!("Failed to bundle {:?}", cli.input))?;

    match outcome {
        Outcome::Generated { entries, bytes } => {
            tracing::info!(entries, bytes, "done");
        }
        Outcome::UpToDate => {
            tracing::info!("bundle is up to date");
        }
    }

    Ok(())
}

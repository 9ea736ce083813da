//! Table Compiler CLI
//!
//! Validates a directory of sheets and writes binary tables, proto schemas and
//! a build manifest.

use std::path::PathBuf;
use clap::Parser;
use table_compiler::{Compiler, CompilerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "table-compiler")]
#[command(about = "Validate sheets and compile them into binary tables")]
struct Cli {
    /// Directory holding sheet files
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory for .dat files and the manifest
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Output directory for .proto schemas and row JSON
    #[arg(long)]
    proto_out: Option<PathBuf>,

    /// Config file (defaults to tables.toml lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the binary output
    #[arg(long)]
    no_binary: bool,

    /// Also emit proto schemas and row JSON
    #[arg(long)]
    proto: bool,

    /// Compile tables one at a time
    #[arg(long)]
    sequential: bool,

    /// Fail the run when any table fails
    #[arg(long)]
    strict: bool,

    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every table compiled
fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = CompilerConfig::load_from(cli.config.as_deref())?;

    if let Some(input) = cli.input {
        config.input.dir = input;
    }
    if let Some(out) = cli.out {
        config.output.dat_dir = out;
    }
    if let Some(proto_out) = cli.proto_out {
        config.output.proto_dir = proto_out;
    }
    if cli.no_binary {
        config.emit.binary = false;
    }
    if cli.proto {
        config.emit.proto = true;
    }
    if cli.sequential {
        config.run.parallel = false;
    }
    if cli.strict {
        config.run.continue_on_error = false;
    }

    let problems = config.problems();
    if !problems.is_empty() {
        anyhow::bail!("invalid configuration: {}", problems.join("; "));
    }

    println!("📂 Compiling sheets from: {}", config.input.dir.display());
    let report = Compiler::new(config).run()?;

    println!();
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(entry) => {
                println!("   ✅ {} ({} columns, {} rows)", entry.name, entry.columns, entry.rows);
                for artifact in &entry.artifacts {
                    println!("      {} ({} bytes)", artifact.file.display(), artifact.bytes);
                }
            }
            Err(e) => println!("   ❌ {} [{}]: {}", outcome.name, e.code(), e),
        }
    }

    let failed = report.failed().count();
    println!();
    println!("📄 Manifest: {}", report.manifest_path.display());
    if failed == 0 {
        println!("✅ {} table(s) compiled", report.outcomes.len());
    } else {
        println!("⚠️  {} of {} table(s) failed", failed, report.outcomes.len());
    }

    Ok(report.is_success())
}

//! Table Compiler configuration CLI

use std::path::PathBuf;
use clap::{Parser, Subcommand};
use table_compiler::CompilerConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "table-config")]
#[command(about = "Show, create and check table compiler configuration")]
struct Cli {
    /// Config file (defaults to tables.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration
    Show {
        /// Print as TOML
        #[arg(long, conflicts_with = "json")]
        toml: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default config file
    Init {
        /// Destination
        #[arg(default_value = "tables.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Load the configuration and report problems
    Validate,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Show { toml, json } => {
            let config = CompilerConfig::load_from(cli.config.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else if toml {
                print!("{}", config.to_toml()?);
            } else {
                println!("📂 Input:    {} (*.{})", config.input.dir.display(), config.input.extension);
                println!("📦 Binary:   {} ({})", config.output.dat_dir.display(), on_off(config.emit.binary));
                println!("📜 Proto:    {} ({})", config.output.proto_dir.display(), on_off(config.emit.proto));
                println!("📄 Manifest: {}", config.manifest_path().display());
                println!("⚙️  Parallel: {}", on_off(config.run.parallel));
                println!("   Continue on error: {}", on_off(config.run.continue_on_error));
                println!("   Clean output: {}", on_off(config.output.clean));
            }
        }

        Commands::Init { path, force } => {
            if path.exists() && !force {
                return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
            }
            CompilerConfig::default().save(&path)?;
            println!("✅ Wrote default configuration to {}", path.display());
        }

        Commands::Validate => {
            let config = CompilerConfig::load_from(cli.config.as_deref())?;
            let problems = config.problems();
            if !config.input.dir.is_dir() {
                println!("⚠️  Input directory {} does not exist", config.input.dir.display());
            }
            if problems.is_empty() {
                println!("✅ Configuration is valid");
            } else {
                for problem in &problems {
                    eprintln!("   ❌ {}", problem);
                }
                return Err(format!("{} configuration problem(s)", problems.len()).into());
            }
        }
    }

    Ok(())
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

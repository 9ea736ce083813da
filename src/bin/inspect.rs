//! Table Inspector CLI
//!
//! Decodes a binary table and prints it, or verifies a build manifest.

use std::fs;
use std::path::PathBuf;
use clap::Parser;
use table_compiler::codec::{self, DecodedTable};
use table_compiler::Manifest;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "table-inspect")]
#[command(about = "Decode binary tables and verify build manifests")]
struct Cli {
    /// .dat file to decode
    #[arg(required_unless_present = "verify")]
    file: Option<PathBuf>,

    /// Print rows as JSON instead of a text table
    #[arg(long)]
    json: bool,

    /// Verify the checksums listed in a manifest
    #[arg(long, value_name = "MANIFEST")]
    verify: Option<PathBuf>,
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
    if let Some(path) = &cli.verify {
        let manifest = Manifest::load(path)?;
        let base = path.parent().map(PathBuf::from).unwrap_or_default();
        let mismatches = manifest.verify(&base);
        if mismatches.is_empty() {
            let files: usize = manifest.tables.iter().map(|t| t.artifacts.len()).sum();
            println!("✅ {} artifact(s) match {}", files, path.display());
        } else {
            for file in &mismatches {
                eprintln!("   ❌ {}", file.display());
            }
            return Err(format!("{} artifact(s) missing or modified", mismatches.len()).into());
        }
    }

    if let Some(path) = &cli.file {
        let bytes = fs::read(path)?;
        let table = codec::decode(&bytes)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&to_json(&table))?);
        } else {
            print_table(&table);
        }
    }

    Ok(())
}

fn to_json(table: &DecodedTable) -> serde_json::Value {
    let columns: Vec<_> = table
        .columns
        .iter()
        .map(|c| serde_json::json!({ "name": c.name, "type": c.field_type.tag() }))
        .collect();
    let rows: Vec<_> = table
        .rows
        .iter()
        .map(|row| {
            let object: serde_json::Map<_, _> = table
                .columns
                .iter()
                .zip(row.values())
                .map(|(column, value)| {
                    let json = value.as_ref().map_or(serde_json::Value::Null, |v| v.to_json());
                    (column.name.clone(), json)
                })
                .collect();
            serde_json::Value::Object(object)
        })
        .collect();
    serde_json::json!({ "columns": columns, "rows": rows })
}

fn print_table(table: &DecodedTable) {
    let header: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("{}:{}", c.name, c.field_type))
        .collect();
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            row.values()
                .iter()
                .map(|v| v.as_ref().map_or_else(|| "null".to_string(), |v| v.to_string()))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: &[String]| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" │ ")
    };

    println!("{}", line(&header));
    println!(
        "{}",
        widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>().join("─┼─")
    );
    for row in &cells {
        println!("{}", line(row));
    }
    println!("\n{} row(s)", cells.len());
}

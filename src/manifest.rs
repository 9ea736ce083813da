//! Build manifest
//!
//! Written next to the binary artifacts after every run. Lists each compiled
//! table with the checksum of every file emitted for it, and each failed table
//! with its error code, so a loader or CI step can detect stale or tampered
//! output.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::error::Result;

/// One emitted file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// Path relative to the manifest's directory when possible
    pub file: PathBuf,
    pub checksum: Checksum,
    pub bytes: usize,
}

/// A table that compiled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub name: String,
    pub columns: usize,
    pub rows: usize,
    pub artifacts: Vec<ArtifactEntry>,
}

/// A table that did not compile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub table: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub created_at: DateTime<Utc>,
    pub tables: Vec<TableEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureEntry>,
    /// Checksum over all artifact checksums, in table order
    pub manifest_checksum: Checksum,
}

impl Manifest {
    pub fn new(mut tables: Vec<TableEntry>, mut failures: Vec<FailureEntry>) -> Self {
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        failures.sort_by(|a, b| a.table.cmp(&b.table));
        let manifest_checksum = Checksum::combine(
            tables
                .iter()
                .flat_map(|t| t.artifacts.iter().map(|a| &a.checksum)),
        );
        Self {
            created_at: Utc::now(),
            tables,
            failures,
            manifest_checksum,
        }
    }

    pub fn get(&self, table: &str) -> Option<&TableEntry> {
        self.tables.iter().find(|t| t.name == table)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Recompute every listed checksum. Relative paths resolve against
    /// `base_dir`. Returns the files that are missing or do not match.
    pub fn verify(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.tables
            .iter()
            .flat_map(|t| &t.artifacts)
            .filter_map(|artifact| {
                let path = base_dir.join(&artifact.file);
                match fs::read(&path) {
                    Ok(bytes) if artifact.checksum.verify(&bytes) => None,
                    _ => Some(path),
                }
            })
            .collect()
    }
}

/// Express `path` relative to `base` when it lives underneath it
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

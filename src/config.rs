//! Configuration management for the table compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (tables.toml)
//! - Environment variables (TABLES__*)
//!
//! ## Example config file (tables.toml):
//! ```toml
//! [input]
//! dir = "./sheets"
//! extension = "json"
//!
//! [output]
//! dat_dir = "./out/dat"
//! proto_dir = "./out/proto"
//! manifest = "manifest.json"
//! clean = false
//!
//! [emit]
//! binary = true
//! proto = false
//!
//! [run]
//! parallel = true
//! continue_on_error = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for a compile run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Where sheets are read from
    #[serde(default)]
    pub input: InputConfig,

    /// Where artifacts are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Which outputs are produced
    #[serde(default)]
    pub emit: EmitConfig,

    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory holding sheet files (not searched recursively)
    #[serde(default = "default_input_dir")]
    pub dir: PathBuf,

    /// Sheet file extension
    #[serde(default = "default_extension")]
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Binary artifacts and the manifest
    #[serde(default = "default_dat_dir")]
    pub dat_dir: PathBuf,

    /// Proto schemas and row JSON
    #[serde(default = "default_proto_dir")]
    pub proto_dir: PathBuf,

    /// Manifest file name, relative to `dat_dir`
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Remove output directories before writing
    #[serde(default)]
    pub clean: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitConfig {
    #[serde(default = "default_true")]
    pub binary: bool,

    #[serde(default)]
    pub proto: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Validate and emit tables on the rayon pool
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Report failed tables and keep going instead of failing the run
    #[serde(default = "default_true")]
    pub continue_on_error: bool,
}

// Default value functions
fn default_input_dir() -> PathBuf {
    PathBuf::from("sheets")
}

fn default_extension() -> String {
    "json".to_string()
}

fn default_dat_dir() -> PathBuf {
    PathBuf::from("out/dat")
}

fn default_proto_dir() -> PathBuf {
    PathBuf::from("out/proto")
}

fn default_manifest() -> PathBuf {
    PathBuf::from("manifest.json")
}

fn default_true() -> bool {
    true
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: default_input_dir(),
            extension: default_extension(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dat_dir: default_dat_dir(),
            proto_dir: default_proto_dir(),
            manifest: default_manifest(),
            clean: false,
        }
    }
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            binary: true,
            proto: false,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            continue_on_error: true,
        }
    }
}

impl CompilerConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering `config_path` (required when given) over
    /// the default locations and under environment variables
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["tables.toml", ".tables.toml", "config/tables.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "tables") {
            let xdg_config = config_dir.config_dir().join("tables.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // TABLES__OUTPUT__DAT_DIR=... overrides [output] dat_dir
        builder = builder.add_source(
            Environment::with_prefix("TABLES")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = self
            .to_toml()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Full path of the manifest file
    pub fn manifest_path(&self) -> PathBuf {
        if self.output.manifest.is_absolute() {
            self.output.manifest.clone()
        } else {
            self.output.dat_dir.join(&self.output.manifest)
        }
    }

    /// Problems that would make a run pointless, as readable messages
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !self.emit.binary && !self.emit.proto {
            problems.push("no output enabled: set [emit] binary or proto".to_string());
        }
        if self.input.extension.trim_start_matches('.').is_empty() {
            problems.push("[input] extension is empty".to_string());
        }
        if self.emit.proto && self.output.proto_dir == self.output.dat_dir && self.output.clean {
            problems.push("[output] clean with a shared dat_dir and proto_dir removes binary output".to_string());
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert!(config.emit.binary);
        assert!(!config.emit.proto);
        assert!(config.run.parallel);
        assert_eq!(config.manifest_path(), PathBuf::from("out/dat/manifest.json"));
        assert!(config.problems().is_empty());
    }

    #[test]
    fn test_serialize_config() {
        let toml_str = CompilerConfig::default().to_toml().unwrap();
        assert!(toml_str.contains("[input]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[run]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[emit]\nproto = true\n\n[run]\nparallel = false\n").unwrap();

        let config = CompilerConfig::load_from(Some(&path)).unwrap();
        assert!(config.emit.proto);
        assert!(config.emit.binary);
        assert!(!config.run.parallel);
        assert_eq!(config.input.extension, "json");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CompilerConfig::load_from(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.toml");
        let mut config = CompilerConfig::default();
        config.output.clean = true;
        config.save(&path).unwrap();

        let loaded = CompilerConfig::load_from(Some(&path)).unwrap();
        assert!(loaded.output.clean);
    }

    #[test]
    fn test_problems() {
        let mut config = CompilerConfig::default();
        config.emit.binary = false;
        assert_eq!(config.problems().len(), 1);
    }
}

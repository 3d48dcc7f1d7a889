//! Configuration loading and database path resolution

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// What to do with an identifier-less staging record that matches no
/// canonical row by title plus shared contributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// Discard the record; lacking an identifier and any canonical match
    /// it has no stable key to be created under. This is what the
    /// reference data flow does.
    Drop,
    /// Insert the record as a new canonical row with no identifier.
    InsertNew,
}

impl Default for UnmatchedPolicy {
    fn default() -> Self {
        UnmatchedPolicy::Drop
    }
}

/// Import pipeline tuning, loaded from the `[import]` table of the
/// config file. Every key has a compiled default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// Upper bound on records held in memory per chunk
    pub max_chunk_size: u64,
    /// Lower bound on chunk count, for progress granularity on small inputs
    pub min_chunk_count: u64,
    /// Separator between contributors inside the multi-valued CSV field
    pub contributors_separator: char,
    /// Reject out-of-pattern ISWC values during normalization
    pub validate_identifiers: bool,
    /// Policy for identifier-less records with no fuzzy match
    pub unmatched_policy: UnmatchedPolicy,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 50_000,
            min_chunk_count: 10,
            contributors_separator: '|',
            validate_identifiers: false,
            unmatched_policy: UnmatchedPolicy::default(),
        }
    }
}

impl ImportConfig {
    /// Load configuration by priority order:
    /// 1. Explicit path (CLI argument / env), error if unreadable
    /// 2. Platform config dir (`works-single-view/config.toml`), if present
    /// 3. Compiled defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            return Self::from_toml_str(&content);
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                return Self::from_toml_str(&content);
            }
        }

        Ok(Self::default())
    }

    /// Parse the `[import]` table out of a TOML document. Missing keys
    /// fall back to defaults; unknown keys are rejected.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?;
        let config = file.import;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(Error::Config(
                "max_chunk_size must be at least 1".to_string(),
            ));
        }
        if self.min_chunk_count == 0 {
            return Err(Error::Config(
                "min_chunk_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    import: ImportConfig,
}

/// Default config file location (`<config dir>/works-single-view/config.toml`)
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("works-single-view").join("config.toml"))
}

/// Resolve the database path by priority order:
/// 1. Command-line argument (highest priority)
/// 2. `WSV_DATABASE` environment variable
/// 3. OS-dependent data dir (`works-single-view/wsv.db`)
/// 4. `./wsv.db` fallback
pub fn resolve_database_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var("WSV_DATABASE") {
        return PathBuf::from(path);
    }

    dirs::data_local_dir()
        .map(|d| d.join("works-single-view").join("wsv.db"))
        .unwrap_or_else(|| PathBuf::from("wsv.db"))
}

//! Sidecar configuration: an optional TOML file, then command-line overrides.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::table::ColumnRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Sqlite,
}

impl StoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::Sqlite => "sqlite",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,
    /// Directory holding the SQLite file, the working directory when unset.
    /// Ignored by the memory store.
    #[serde(default)]
    pub workspace: Option<PathBuf>,
    #[serde(default = "default_slot_key")]
    pub slot_key: String,
}

fn default_slot_key() -> String {
    "simulated_firestore_data".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            workspace: None,
            slot_key: default_slot_key(),
        }
    }
}

/// Editor bounds for grade cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeBounds {
    #[serde(default)]
    pub min: f64,
    #[serde(default = "default_grade_max")]
    pub max: f64,
}

fn default_grade_max() -> f64 {
    20.0
}

impl Default for GradeBounds {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: default_grade_max(),
        }
    }
}

impl GradeBounds {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_seed_path")]
    pub seed_path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub columns: ColumnRules,
    #[serde(default)]
    pub grades: GradeBounds,
}

fn default_seed_path() -> PathBuf {
    PathBuf::from("data.csv")
}
fn default_delimiter() -> char {
    ','
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed_path: default_seed_path(),
            delimiter: default_delimiter(),
            store: StoreConfig::default(),
            columns: ColumnRules::default(),
            grades: GradeBounds::default(),
        }
    }
}

impl Config {
    /// Loads `path` if given, otherwise returns defaults. Call `validate`
    /// once command-line overrides are applied.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let cfg = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read config {}", p.display()))?;
                Self::from_toml(&text)
                    .with_context(|| format!("failed to parse config {}", p.display()))?
            }
            None => Self::default(),
        };
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character");
        }
        if self.grades.min > self.grades.max {
            bail!(
                "grade bounds are inverted: min {} > max {}",
                self.grades.min,
                self.grades.max
            );
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            b','
        }
    }
}

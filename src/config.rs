use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::tree::TreeLayout;

pub const DEFAULT_EXAMPLE_URL: &str =
    "https://github.com/crelder/zet_example/archive/refs/heads/main.zip";

/// Settings read from `.zet.toml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: Layout,
    pub tree: TreeLayout,
    pub import: ImportConfig,
    pub filter: FilterConfig,
    pub init: InitConfig,
}

/// Names of the files and folders inside a collection root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub zettel_dir: String,
    pub index_file: String,
    pub references_file: String,
    pub index_dir: String,
    pub views_dir: String,
    pub export_dir: String,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            zettel_dir: "zettel".to_string(),
            index_file: "index.txt".to_string(),
            references_file: "references.bib".to_string(),
            index_dir: "INDEX".to_string(),
            views_dir: "VIEWS".to_string(),
            export_dir: "EXPORT".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub extensions: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            extensions: vec!["txt".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Glob patterns of files in the zettel folder that are not notes.
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InitConfig {
    pub example_url: String,
}

impl Default for InitConfig {
    fn default() -> Self {
        InitConfig {
            example_url: DEFAULT_EXAMPLE_URL.to_string(),
        }
    }
}

impl Config {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn ignore_set(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.filter.ignore {
            let glob = Glob::new(pattern).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ConfigError::Pattern {
            pattern: self.filter.ignore.join(", "),
            source,
        })
    }
}

// Configuration management for cppscope

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::index::store::IndexLimits;

/// Name of the per-project configuration file
pub const CONFIG_FILE: &str = ".cppscope.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub project: ProjectConfig,
    pub indexing: IndexingConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
    pub mcp: McpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    pub extensions: Vec<String>,
    pub watch: bool,
    pub max_files: usize,
    pub max_symbols_per_file: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub max_results: usize,
    /// JSONL definitions produced by an external indexer, relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    pub transport: String,
}

impl Default for Config {
    fn default() -> Self {
        let limits = IndexLimits::default();
        Self {
            project: ProjectConfig {
                name: "unnamed-project".to_string(),
                root: ".".to_string(),
            },
            indexing: IndexingConfig {
                exclude: vec![
                    "build/".to_string(),
                    "cmake-build-*/".to_string(),
                    "third_party/".to_string(),
                    ".git/".to_string(),
                    "*.pb.h".to_string(),
                    "*.pb.cc".to_string(),
                ],
                include: vec![],
                extensions: ["c", "cc", "cpp", "cxx", "h", "hh", "hpp", "hxx"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                watch: false,
                max_files: limits.max_files,
                max_symbols_per_file: limits.max_symbols_per_file,
            },
            query: QueryConfig {
                max_results: 5,
                definitions_file: None,
            },
            logging: LoggingConfig::default(),
            mcp: McpConfig {
                transport: "stdio".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from project directory
    /// Looks for .cppscope.toml in the project root
    pub fn from_project_dir<P: AsRef<Path>>(project_dir: P) -> Self {
        let config_path = project_dir.as_ref().join(CONFIG_FILE);

        match Self::from_file(&config_path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {}", config_path.display());
                config
            }
            Err(e) => {
                tracing::debug!("Could not load config from {}: {}", config_path.display(), e);
                tracing::info!("Using default configuration");
                Self::default()
            }
        }
    }

    /// Check if a file path should be indexed based on include/exclude patterns
    /// and the configured extensions
    pub fn should_index_file(&self, file_path: &str) -> bool {
        if !self.has_indexed_extension(file_path) {
            return false;
        }

        // Check exclude patterns first
        if self
            .indexing
            .exclude
            .iter()
            .any(|pattern| matches_pattern(file_path, pattern))
        {
            return false;
        }

        // If include patterns are specified, file must match at least one
        if !self.indexing.include.is_empty() {
            return self
                .indexing
                .include
                .iter()
                .any(|pattern| matches_pattern(file_path, pattern));
        }

        true
    }

    fn has_indexed_extension(&self, file_path: &str) -> bool {
        Path::new(file_path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.indexing
                    .extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    pub fn limits(&self) -> IndexLimits {
        IndexLimits {
            max_files: self.indexing.max_files,
            max_symbols_per_file: self.indexing.max_symbols_per_file,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.project.name.is_empty() {
            return Err(anyhow::anyhow!("Project name cannot be empty"));
        }

        if self.indexing.extensions.is_empty() {
            return Err(anyhow::anyhow!("At least one file extension must be indexed"));
        }
        if self.indexing.max_files == 0 {
            return Err(anyhow::anyhow!("max_files must be greater than 0"));
        }
        if self.indexing.max_symbols_per_file == 0 {
            return Err(anyhow::anyhow!("max_symbols_per_file must be greater than 0"));
        }

        if self.query.max_results == 0 {
            return Err(anyhow::anyhow!("Query max_results must be greater than 0"));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!("Invalid log level: {}", self.logging.level));
        }
        let valid_formats = ["compact", "pretty", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!("Invalid log format: {}", self.logging.format));
        }

        if self.mcp.transport != "stdio" {
            return Err(anyhow::anyhow!("Invalid MCP transport: {}", self.mcp.transport));
        }

        Ok(())
    }
}

/// Glob-style matching: `dir/` prefixes, `*.suffix`, `prefix*/` and substrings
fn matches_pattern(file_path: &str, pattern: &str) -> bool {
    let path = file_path.replace('\\', "/");

    if let Some(dir) = pattern.strip_suffix('/') {
        if let Some(prefix) = dir.strip_suffix('*') {
            // Wildcard directory such as cmake-build-*/
            return path
                .split('/')
                .rev()
                .skip(1)
                .any(|segment| segment.starts_with(prefix));
        }
        path.starts_with(pattern) || path.contains(&format!("/{}/", dir))
    } else if let Some(suffix) = pattern.strip_prefix('*') {
        path.ends_with(suffix)
    } else {
        path.contains(pattern)
    }
}

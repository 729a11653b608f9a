// CLI command implementations

pub mod index;
pub mod resolve;
pub mod scopes;
pub mod search;
pub mod serve;
pub mod stats;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use tracing::{info, warn};

use crate::config::Config;
use crate::index::store::SymbolIndex;
use crate::indexer::{Indexer, ScanReport};
use crate::query::definitions::DefinitionIndex;
use crate::query::engine::QueryEngine;

/// Output format for structured results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// A freshly scanned project: configuration, indexer and query engine over one index
pub struct Workspace {
    pub config: Config,
    pub indexer: Arc<Indexer>,
    pub engine: QueryEngine,
    pub report: ScanReport,
}

impl Workspace {
    /// Load the project's configuration and index every matching file
    pub fn open(project: &str, show_progress: bool) -> Result<Self> {
        let config = Config::from_project_dir(project);
        let root = Path::new(project).join(&config.project.root);

        let index = Arc::new(SymbolIndex::new(config.limits()));
        let indexer = Arc::new(Indexer::new(Arc::clone(&index), root));
        let report = indexer.scan_workspace(&config, show_progress)?;

        let mut engine = QueryEngine::new(index, config.query.max_results);
        if let Some(definitions_file) = &config.query.definitions_file {
            let path = indexer.resolve_path(definitions_file);
            match DefinitionIndex::load(&path) {
                Ok(definitions) => {
                    if definitions.is_empty() {
                        warn!("No usable definitions in {}", path.display());
                    }
                    // The external indexer records compile-database paths
                    let definitions = definitions.map_files(|file| indexer.file_key(Path::new(file)));
                    engine = engine.with_definitions(definitions);
                }
                Err(e) => warn!("Ignoring definitions file: {:#}", e),
            }
        }

        info!(
            "Project {} ready: {} files indexed",
            config.project.name, report.files_indexed
        );

        Ok(Self {
            config,
            indexer,
            engine,
            report,
        })
    }

    /// Index key for a file given on the command line.
    ///
    /// Existing paths are taken relative to the current directory; anything
    /// else is assumed to already be relative to the project root.
    pub fn file_key(&self, file: &str) -> String {
        match Path::new(file).canonicalize() {
            Ok(path) if path.starts_with(self.indexer.root()) => self.indexer.file_key(&path),
            _ => file.trim_start_matches("./").replace('\\', "/"),
        }
    }
}

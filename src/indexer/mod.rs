// Source indexing and file watching

pub mod parser;
pub mod watcher;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::index::store::{FileUpdate, SymbolIndex};
use crate::index::Parser;

/// Result of indexing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Content hash matched the last indexed version
    Unchanged,
    Updated(FileUpdate),
}

/// Totals of a workspace scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub files_seen: usize,
    pub files_indexed: usize,
    pub files_unchanged: usize,
    pub files_failed: usize,
    pub symbols: usize,
    pub skipped_records: usize,
}

/// Coordinates parsing and the live symbol index
pub struct Indexer {
    parsers: HashMap<String, Box<dyn Parser + Send + Sync>>,
    index: Arc<SymbolIndex>,
    /// Project root; index keys are paths relative to it
    root: PathBuf,
    /// blake3 hash of the last indexed content per file
    hashes: DashMap<String, String>,
}

impl Indexer {
    pub fn new(index: Arc<SymbolIndex>, root: impl Into<PathBuf>) -> Self {
        let mut parsers = HashMap::new();

        // Register parsers
        parsers.insert(
            "cpp".to_string(),
            Box::new(parser::CppParser::new()) as Box<dyn Parser + Send + Sync>,
        );

        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);

        Self {
            parsers,
            index,
            root,
            hashes: DashMap::new(),
        }
    }

    pub fn index(&self) -> &Arc<SymbolIndex> {
        &self.index
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Index key of `path`: relative to the root, `/`-separated.
    /// Absolute paths outside the canonical root are canonicalized first.
    pub fn file_key(&self, path: &Path) -> String {
        if let Ok(relative) = path.strip_prefix(&self.root) {
            return relative.to_string_lossy().replace('\\', "/");
        }
        if path.is_absolute() {
            if let Ok(canonical) = path.canonicalize() {
                if let Ok(relative) = canonical.strip_prefix(&self.root) {
                    return relative.to_string_lossy().replace('\\', "/");
                }
            }
        }
        path.to_string_lossy().replace('\\', "/")
    }

    /// On-disk location of an index key
    pub fn resolve_path(&self, file_key: &str) -> PathBuf {
        self.root.join(file_key)
    }

    pub fn can_index_file(&self, file_path: &str) -> bool {
        self.parsers.values().any(|p| p.can_parse(file_path))
    }

    pub fn get_parser_for_file(&self, file_path: &str) -> Option<&(dyn Parser + Send + Sync)> {
        self.parsers
            .values()
            .find(|p| p.can_parse(file_path))
            .map(|p| p.as_ref())
    }

    /// Parse `content` and replace the index entry for `file_path`.
    /// Unchanged content is skipped.
    ///
    /// The hash entry stays locked until the index is updated, so concurrent
    /// calls for one file (watcher and MCP) apply one after the other.
    pub fn index_file(&self, file_path: &str, content: &str) -> anyhow::Result<IndexOutcome> {
        let content_hash = blake3::hash(content.as_bytes()).to_string();
        let entry = self.hashes.entry(file_path.to_string());
        if let Entry::Occupied(previous) = &entry {
            if *previous.get() == content_hash && self.index.read().contains_file(file_path) {
                debug!("Unchanged: {}", file_path);
                return Ok(IndexOutcome::Unchanged);
            }
        }

        let parser = self
            .get_parser_for_file(file_path)
            .ok_or_else(|| anyhow::anyhow!("No parser available for file: {}", file_path))?;

        let symbols = parser
            .parse(content, file_path)
            .with_context(|| format!("Failed to parse {}", file_path))?;
        let update = self.index.update_file(file_path, symbols)?;

        entry.insert(content_hash);
        Ok(IndexOutcome::Updated(update))
    }

    /// Read `path` from disk and index it under its key
    pub fn index_path(&self, path: &Path) -> anyhow::Result<IndexOutcome> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let content = std::fs::read_to_string(&absolute)
            .with_context(|| format!("Failed to read {}", absolute.display()))?;
        self.index_file(&self.file_key(&absolute), &content)
    }

    pub fn remove_file(&self, file_path: &str) -> bool {
        match self.hashes.entry(file_path.to_string()) {
            Entry::Occupied(hash) => {
                let removed = self.index.remove_file(file_path);
                hash.remove();
                removed
            }
            Entry::Vacant(_) => self.index.remove_file(file_path),
        }
    }

    /// Index every matching source file under the root
    pub fn scan_workspace(&self, config: &Config, show_progress: bool) -> anyhow::Result<ScanReport> {
        let root = self.root.as_path();
        if !root.is_dir() {
            return Err(anyhow::anyhow!("Not a directory: {}", root.display()));
        }

        info!("Scanning {}", root.display());

        let files: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| {
                let key = self.file_key(path);
                config.should_index_file(&key) && self.can_index_file(&key)
            })
            .collect();

        let progress = if show_progress {
            let bar = ProgressBar::new(files.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {wide_msg}")?
                    .progress_chars("=> "),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut report = ScanReport {
            files_seen: files.len(),
            ..ScanReport::default()
        };

        for path in &files {
            progress.set_message(path.display().to_string());
            match self.index_path(path) {
                Ok(IndexOutcome::Updated(update)) => {
                    report.files_indexed += 1;
                    report.symbols += update.symbols;
                    report.skipped_records += update.skipped;
                }
                Ok(IndexOutcome::Unchanged) => report.files_unchanged += 1,
                Err(e) => {
                    warn!("Failed to index {}: {:#}", path.display(), e);
                    report.files_failed += 1;
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(
            "Indexed {} files ({} symbols), {} unchanged, {} failed",
            report.files_indexed, report.symbols, report.files_unchanged, report.files_failed
        );

        Ok(report)
    }
}

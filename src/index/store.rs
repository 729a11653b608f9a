// In-memory index coordinating the name index, scope trees and scope registry

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::names::{NameIndex, SymbolStatistics};
use super::registry::{ScopeRef, ScopeRegistry};
use super::scope::ScopeTree;
use super::{IndexError, SymbolKind, SymbolRecord};

/// Capacity limits for the mutation entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexLimits {
    pub max_files: usize,
    pub max_symbols_per_file: usize,
}

impl Default for IndexLimits {
    fn default() -> Self {
        Self {
            max_files: 50_000,
            max_symbols_per_file: 100_000,
        }
    }
}

/// Outcome of one `update_file`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileUpdate {
    pub file: String,
    pub symbols: usize,
    pub scopes: usize,
    /// Records dropped for missing a name
    pub skipped: usize,
}

/// Aggregate scope counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeStatistics {
    pub total: usize,
    pub registered_names: usize,
    pub max_depth: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub by_file: BTreeMap<String, usize>,
}

/// Index contents at one point in time. Obtained through `SymbolIndex::read`.
#[derive(Debug, Default)]
pub struct IndexState {
    names: NameIndex,
    trees: HashMap<String, Arc<ScopeTree>>,
    registry: ScopeRegistry,
}

impl IndexState {
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.names.files().map(|f| f.to_string()).collect();
        files.sort();
        files
    }

    pub fn contains_file(&self, file: &str) -> bool {
        self.names.contains_file(file)
    }

    pub fn file_symbols(&self, file: &str) -> Vec<SymbolRecord> {
        self.names.file_symbols(file).map(|s| s.to_vec()).unwrap_or_default()
    }

    /// Top-level scopes of the file
    pub fn file_scopes(&self, file: &str) -> Vec<ScopeRef> {
        self.trees
            .get(file)
            .map(|tree| {
                tree.roots()
                    .iter()
                    .filter_map(|&id| ScopeRef::new(Arc::clone(tree), id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn find_scope_at_position(&self, file: &str, line: usize) -> Option<ScopeRef> {
        let tree = self.trees.get(file)?;
        let id = tree.find_at_line(line)?;
        ScopeRef::new(Arc::clone(tree), id)
    }

    pub fn scope_named(&self, name: &str) -> Option<ScopeRef> {
        self.registry.get(name)
    }

    pub fn child_scopes(&self, name: &str) -> Vec<ScopeRef> {
        self.registry.child_scopes(name)
    }

    pub fn find_symbols_in_scope(&self, name: &str) -> Vec<SymbolRecord> {
        self.registry.symbols_of(name)
    }

    pub fn find_symbols_by_name(&self, name: &str) -> Vec<SymbolRecord> {
        self.names.find_by_name(name)
    }

    pub fn find_definitions(&self, name: &str) -> Vec<SymbolRecord> {
        self.names.find_definitions(name)
    }

    pub fn find_declarations(&self, name: &str) -> Vec<SymbolRecord> {
        self.names.find_declarations(name)
    }

    pub fn find_symbols_by_kind(&self, kind: SymbolKind) -> Vec<SymbolRecord> {
        self.names.find_by_kind(kind)
    }

    pub fn search_symbols(&self, query: &str, limit: usize) -> Vec<SymbolRecord> {
        self.names.search(query, limit)
    }

    pub fn symbol_statistics(&self) -> SymbolStatistics {
        self.names.statistics()
    }

    pub fn scope_statistics(&self) -> ScopeStatistics {
        let mut stats = ScopeStatistics {
            registered_names: self.registry.len(),
            ..ScopeStatistics::default()
        };

        for (file, tree) in &self.trees {
            stats.total += tree.len();
            stats.by_file.insert(file.clone(), tree.len());
            for id in tree.preorder() {
                *stats.by_kind.entry(tree[id].kind.as_str().to_string()).or_default() += 1;
                stats.max_depth = stats.max_depth.max(tree.depth(id));
            }
        }

        stats
    }

    fn unindex_file(&mut self, file: &str) -> bool {
        if let Some(tree) = self.trees.remove(file) {
            self.registry.unindex(&tree);
        }
        self.names.remove(file)
    }
}

/// Thread-safe symbol/scope index.
///
/// Writers replace a file's symbols and scope tree under one exclusive lock
/// (remove-then-insert), so readers never observe a half-updated file.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    state: RwLock<IndexState>,
    limits: IndexLimits,
}

impl SymbolIndex {
    pub fn new(limits: IndexLimits) -> Self {
        Self {
            state: RwLock::new(IndexState::default()),
            limits,
        }
    }

    /// Shared read access; all queries through one guard see the same state
    pub fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read()
    }

    /// Replace everything known about `file` with `symbols`
    pub fn update_file(&self, file: &str, symbols: Vec<SymbolRecord>) -> Result<FileUpdate, IndexError> {
        if file.is_empty() {
            return Err(IndexError::EmptyPath);
        }

        let total = symbols.len();
        let symbols: Vec<SymbolRecord> = symbols
            .into_iter()
            .filter(|s| !s.name.is_empty())
            .map(|mut s| {
                if s.file != file {
                    s.file = file.to_string();
                }
                s
            })
            .collect();
        let skipped = total - symbols.len();
        if skipped > 0 {
            debug!("Skipped {} unnamed records in {}", skipped, file);
        }

        if symbols.len() > self.limits.max_symbols_per_file {
            return Err(IndexError::TooManySymbols {
                file: file.to_string(),
                count: symbols.len(),
                limit: self.limits.max_symbols_per_file,
            });
        }

        let tree = Arc::new(ScopeTree::build(file, &symbols));

        let mut state = self.state.write();
        if !state.names.contains_file(file) && state.names.file_count() >= self.limits.max_files {
            return Err(IndexError::TooManyFiles {
                limit: self.limits.max_files,
            });
        }

        state.unindex_file(file);

        let update = FileUpdate {
            file: file.to_string(),
            symbols: symbols.len(),
            scopes: tree.len(),
            skipped,
        };

        state.names.update(file, symbols);
        state.registry.index(&tree);
        state.trees.insert(file.to_string(), tree);

        debug!(
            "Indexed {}: {} symbols, {} scopes",
            file, update.symbols, update.scopes
        );

        Ok(update)
    }

    /// Drop the file and everything derived from it. Returns false when unknown.
    pub fn remove_file(&self, file: &str) -> bool {
        let removed = self.state.write().unindex_file(file);
        if removed {
            info!("Removed {} from index", file);
        }
        removed
    }

    pub fn file_scopes(&self, file: &str) -> Vec<ScopeRef> {
        self.read().file_scopes(file)
    }

    pub fn find_scope_at_position(&self, file: &str, line: usize) -> Option<ScopeRef> {
        self.read().find_scope_at_position(file, line)
    }

    pub fn scope_hierarchy(&self, scope: &ScopeRef) -> Vec<ScopeRef> {
        scope.hierarchy()
    }

    pub fn scope_path(&self, scope: &ScopeRef) -> String {
        scope.path()
    }

    pub fn find_symbols_by_name(&self, name: &str) -> Vec<SymbolRecord> {
        self.read().find_symbols_by_name(name)
    }

    pub fn find_symbols_by_kind(&self, kind: SymbolKind) -> Vec<SymbolRecord> {
        self.read().find_symbols_by_kind(kind)
    }

    pub fn find_symbols_in_scope(&self, scope_name: &str) -> Vec<SymbolRecord> {
        self.read().find_symbols_in_scope(scope_name)
    }

    pub fn search_symbols(&self, query: &str, limit: usize) -> Vec<SymbolRecord> {
        self.read().search_symbols(query, limit)
    }

    pub fn symbol_statistics(&self) -> SymbolStatistics {
        self.read().symbol_statistics()
    }

    pub fn scope_statistics(&self) -> ScopeStatistics {
        self.read().scope_statistics()
    }
}

// Global by-name scope registry

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::scope::{Scope, ScopeId, ScopeKind, ScopeTree};
use super::SymbolRecord;

/// Handle to one scope inside an immutable per-file tree snapshot.
///
/// Holding a `ScopeRef` keeps its tree alive, so it stays consistent even
/// after the file is re-analysed or removed.
#[derive(Debug, Clone)]
pub struct ScopeRef {
    tree: Arc<ScopeTree>,
    id: ScopeId,
}

impl ScopeRef {
    pub fn new(tree: Arc<ScopeTree>, id: ScopeId) -> Option<Self> {
        tree.get(id)?;
        Some(Self { tree, id })
    }

    pub fn file(&self) -> &str {
        self.tree.file()
    }

    pub fn scope(&self) -> &Scope {
        &self.tree[self.id]
    }

    pub fn name(&self) -> &str {
        &self.scope().name
    }

    pub fn kind(&self) -> ScopeKind {
        self.scope().kind
    }

    pub fn start_line(&self) -> usize {
        self.scope().start_line
    }

    pub fn end_line(&self) -> usize {
        self.scope().end_line
    }

    pub fn symbols(&self) -> &[SymbolRecord] {
        &self.scope().symbols
    }

    pub fn parent(&self) -> Option<ScopeRef> {
        self.scope().parent.map(|id| self.sibling(id))
    }

    pub fn children(&self) -> Vec<ScopeRef> {
        self.scope().children.iter().map(|&id| self.sibling(id)).collect()
    }

    /// Parent chain root first, ending with this scope
    pub fn hierarchy(&self) -> Vec<ScopeRef> {
        self.tree.hierarchy(self.id).into_iter().map(|id| self.sibling(id)).collect()
    }

    /// Canonical qualified path, e.g. `math::Calculator`
    pub fn path(&self) -> String {
        self.tree.path(self.id)
    }

    pub fn summary(&self) -> ScopeSummary {
        let scope = self.scope();
        ScopeSummary {
            name: scope.name.clone(),
            kind: scope.kind,
            path: self.path(),
            file: self.file().to_string(),
            start_line: scope.start_line,
            end_line: scope.end_line,
            symbol_count: scope.symbols.len(),
            children: self.children().iter().map(|c| c.name().to_string()).collect(),
        }
    }

    fn sibling(&self, id: ScopeId) -> ScopeRef {
        ScopeRef {
            tree: Arc::clone(&self.tree),
            id,
        }
    }
}

impl PartialEq for ScopeRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.id == other.id
    }
}

impl Eq for ScopeRef {}

/// Serializable view of a scope for CLI and MCP output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeSummary {
    pub name: String,
    pub kind: ScopeKind,
    pub path: String,
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub symbol_count: usize,
    pub children: Vec<String>,
}

/// Scope name -> most recently indexed scope carrying that name.
///
/// Same-named scopes from different files or namespaces overwrite each other
/// (last write wins), and unindexing a file drops its names even when another
/// file registered them later. Lookups by name are therefore approximate.
#[derive(Debug, Default, Clone)]
pub struct ScopeRegistry {
    by_name: HashMap<String, ScopeRef>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every scope of the tree, root to leaf
    pub fn index(&mut self, tree: &Arc<ScopeTree>) {
        for id in tree.preorder() {
            let scope = ScopeRef {
                tree: Arc::clone(tree),
                id,
            };
            self.by_name.insert(scope.name().to_string(), scope);
        }
    }

    /// Drop every name the tree contains
    pub fn unindex(&mut self, tree: &ScopeTree) {
        for id in tree.preorder() {
            self.by_name.remove(tree[id].name.as_str());
        }
    }

    pub fn get(&self, name: &str) -> Option<ScopeRef> {
        self.by_name.get(name).cloned()
    }

    pub fn child_scopes(&self, name: &str) -> Vec<ScopeRef> {
        self.by_name.get(name).map(|s| s.children()).unwrap_or_default()
    }

    pub fn symbols_of(&self, name: &str) -> Vec<SymbolRecord> {
        self.by_name
            .get(name)
            .map(|s| s.symbols().to_vec())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::test_support::{decl, sym};
    use crate::index::SymbolKind;

    fn tree(file: &str, symbols: &[SymbolRecord]) -> Arc<ScopeTree> {
        Arc::new(ScopeTree::build(file, symbols))
    }

    fn calculator(file: &str) -> Arc<ScopeTree> {
        tree(
            file,
            &[
                sym("math", SymbolKind::Namespace, "", file, 0),
                sym("Calculator", SymbolKind::Class, "math", file, 1),
                decl("add", SymbolKind::Function, "math::Calculator", file, 2),
            ],
        )
    }

    #[test]
    fn test_index_and_lookup() {
        let mut registry = ScopeRegistry::new();
        registry.index(&calculator("calc.hpp"));

        assert_eq!(registry.len(), 2);
        let calc = registry.get("Calculator").unwrap();
        assert_eq!(calc.path(), "math::Calculator");
        assert_eq!(calc.file(), "calc.hpp");

        let hierarchy: Vec<String> = calc.hierarchy().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(hierarchy, vec!["math", "Calculator"]);

        let children = registry.child_scopes("math");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0], calc);

        let owned: Vec<String> = registry.symbols_of("Calculator").into_iter().map(|s| s.name).collect();
        assert_eq!(owned, vec!["Calculator", "add"]);
        assert!(registry.symbols_of("missing").is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let mut registry = ScopeRegistry::new();
        registry.index(&calculator("a.hpp"));
        registry.index(&calculator("b.hpp"));

        assert_eq!(registry.get("Calculator").unwrap().file(), "b.hpp");
    }

    #[test]
    fn test_unindex_drops_names_registered_by_others() {
        let first = calculator("a.hpp");
        let mut registry = ScopeRegistry::new();
        registry.index(&first);
        registry.index(&calculator("b.hpp"));

        registry.unindex(&first);
        assert!(registry.get("Calculator").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_scope_ref_survives_registry_changes() {
        let calc_tree = calculator("calc.hpp");
        let mut registry = ScopeRegistry::new();
        registry.index(&calc_tree);
        let calc = registry.get("Calculator").unwrap();

        registry.unindex(&calc_tree);
        drop(calc_tree);

        assert_eq!(calc.parent().unwrap().name(), "math");
        assert_eq!(calc.summary().symbol_count, 2);
    }
}

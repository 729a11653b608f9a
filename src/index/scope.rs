// Scope tree reconstruction from a flat per-file symbol list
//
// Scopes live in a per-file arena. Parents own their children through
// `ScopeId` indexes and children point back with a non-owning `parent` id.

use serde::{Deserialize, Serialize};

use super::{SymbolKind, SymbolRecord, SCOPE_SEPARATOR};

/// Index of a scope inside its file's `ScopeTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(usize);

/// Lexical scope kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Namespace,
    Class,
    Struct,
    Function,
    Block,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Namespace => "namespace",
            ScopeKind::Class => "class",
            ScopeKind::Struct => "struct",
            ScopeKind::Function => "function",
            ScopeKind::Block => "block",
        }
    }

    pub fn from_symbol_kind(kind: SymbolKind) -> Option<Self> {
        match kind {
            SymbolKind::Namespace => Some(ScopeKind::Namespace),
            SymbolKind::Class => Some(ScopeKind::Class),
            SymbolKind::Struct => Some(ScopeKind::Struct),
            SymbolKind::Function => Some(ScopeKind::Function),
            _ => None,
        }
    }

    fn matches_symbol_kind(&self, kind: SymbolKind) -> bool {
        ScopeKind::from_symbol_kind(kind) == Some(*self)
    }
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lexical region owning a subset of the file's symbols
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub name: String,
    pub kind: ScopeKind,
    pub start_line: usize,
    /// Inclusive, best-effort
    pub end_line: usize,
    /// Symbols owned directly, not through descendants. The opener comes first.
    pub symbols: Vec<SymbolRecord>,
    pub children: Vec<ScopeId>,
    pub parent: Option<ScopeId>,
}

/// The scope forest of one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeTree {
    file: String,
    scopes: Vec<Scope>,
    roots: Vec<ScopeId>,
}

impl ScopeTree {
    /// Rebuild the scope forest for `file` from its (unordered) symbols.
    ///
    /// Symbols are stably sorted by line and replayed against a stack of open
    /// scopes. A scope closes only when a new scope opens past its provisional
    /// span and the new symbol's scope path does not name it. Every scope then
    /// gets its `end_line` backfilled from the last owned symbol of a different
    /// kind; a scope with no such symbol keeps `end_line == start_line` and
    /// under-covers its real extent. Record extents (`SymbolRecord::end_line`)
    /// are descriptive only and never size a scope.
    pub fn build(file: &str, symbols: &[SymbolRecord]) -> Self {
        let mut tree = ScopeTree {
            file: file.to_string(),
            scopes: Vec::new(),
            roots: Vec::new(),
        };

        let mut ordered: Vec<&SymbolRecord> = symbols.iter().collect();
        ordered.sort_by_key(|s| s.line);

        let mut stack: Vec<ScopeId> = Vec::new();

        for symbol in ordered {
            let opens = opens_scope(symbol);

            while let Some(&top) = stack.last() {
                let ended = tree.scopes[top.0].end_line < symbol.line;
                if !(opens && ended && !tree.stack_encloses(&stack, symbol)) {
                    break;
                }
                stack.pop();
            }

            if opens {
                if let Some(kind) = ScopeKind::from_symbol_kind(symbol.kind) {
                    let id = ScopeId(tree.scopes.len());
                    let parent = stack.last().copied();
                    tree.scopes.push(Scope {
                        name: symbol.name.clone(),
                        kind,
                        start_line: symbol.line,
                        end_line: symbol.line,
                        symbols: Vec::new(),
                        children: Vec::new(),
                        parent,
                    });
                    match parent {
                        Some(parent) => tree.scopes[parent.0].children.push(id),
                        None => tree.roots.push(id),
                    }
                    stack.push(id);
                }
            }

            if let Some(&top) = stack.last() {
                tree.scopes[top.0].symbols.push(symbol.clone());
            }
        }

        tree.backfill_end_lines();
        tree
    }

    /// Whether the symbol's scope path places it inside the innermost open scope
    fn stack_encloses(&self, stack: &[ScopeId], symbol: &SymbolRecord) -> bool {
        if symbol.scope.is_empty() {
            return false;
        }
        let path = stack
            .iter()
            .map(|id| self.scopes[id.0].name.as_str())
            .collect::<Vec<_>>()
            .join(SCOPE_SEPARATOR);

        symbol.scope == path
            || (symbol.scope.starts_with(&path)
                && symbol.scope[path.len()..].starts_with(SCOPE_SEPARATOR))
    }

    fn backfill_end_lines(&mut self) {
        for scope in &mut self.scopes {
            let last = scope
                .symbols
                .iter()
                .skip(1)
                .filter(|s| s.line >= scope.start_line && !scope.kind.matches_symbol_kind(s.kind))
                .last()
                .map(|s| s.line);

            if let Some(line) = last {
                scope.end_line = line;
            }
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn roots(&self) -> &[ScopeId] {
        &self.roots
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Every scope id, parents before children
    pub fn preorder(&self) -> Vec<ScopeId> {
        let mut order = Vec::with_capacity(self.scopes.len());
        let mut pending: Vec<ScopeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = pending.pop() {
            order.push(id);
            pending.extend(self.scopes[id.0].children.iter().rev().copied());
        }
        order
    }

    /// Parent chain of `id`, root first, ending with `id` itself
    pub fn hierarchy(&self, id: ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).map(|_| id);
        while let Some(scope_id) = current {
            chain.push(scope_id);
            current = self.scopes[scope_id.0].parent;
        }
        chain.reverse();
        chain
    }

    /// Names along the hierarchy joined with `::`
    pub fn path(&self, id: ScopeId) -> String {
        self.hierarchy(id)
            .into_iter()
            .map(|scope_id| self.scopes[scope_id.0].name.as_str())
            .collect::<Vec<_>>()
            .join(SCOPE_SEPARATOR)
    }

    pub fn depth(&self, id: ScopeId) -> usize {
        self.hierarchy(id).len()
    }

    /// Most deeply nested scope whose `[start_line, end_line]` covers `line`.
    ///
    /// Every scope is considered, since a child may cover lines that its
    /// heuristic-sized parent does not. Depth ties keep the first in pre-order.
    pub fn find_at_line(&self, line: usize) -> Option<ScopeId> {
        let mut best: Option<(ScopeId, usize)> = None;
        let mut pending: Vec<(ScopeId, usize)> = self.roots.iter().rev().map(|&id| (id, 1)).collect();

        while let Some((id, depth)) = pending.pop() {
            let scope = &self.scopes[id.0];
            if scope.start_line <= line && line <= scope.end_line {
                if best.map_or(true, |(_, best_depth)| depth > best_depth) {
                    best = Some((id, depth));
                }
            }
            pending.extend(scope.children.iter().rev().map(|&child| (child, depth + 1)));
        }

        best.map(|(id, _)| id)
    }
}

impl std::ops::Index<ScopeId> for ScopeTree {
    type Output = Scope;

    fn index(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }
}

/// Scope-bearing kinds open a scope unless the record is a bodiless declaration
fn opens_scope(symbol: &SymbolRecord) -> bool {
    symbol.kind.is_scope_bearing() && !symbol.is_pure_declaration()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::test_support::{decl, sym};

    /// namespace math { class Calculator { double add(...); }; }
    fn calculator() -> Vec<SymbolRecord> {
        vec![
            decl("add", SymbolKind::Function, "math::Calculator", "calc.hpp", 2),
            sym("Calculator", SymbolKind::Class, "math", "calc.hpp", 1),
            sym("math", SymbolKind::Namespace, "", "calc.hpp", 0),
        ]
    }

    #[test]
    fn test_nested_scopes_from_scope_paths() {
        let tree = ScopeTree::build("calc.hpp", &calculator());

        assert_eq!(tree.roots().len(), 1);
        let math = tree.roots()[0];
        assert_eq!(tree[math].name, "math");
        assert_eq!(tree[math].children.len(), 1);

        let calc = tree[math].children[0];
        assert_eq!(tree[calc].name, "Calculator");
        assert_eq!(tree[calc].kind, ScopeKind::Class);
        assert_eq!(tree[calc].parent, Some(math));
        assert_eq!(tree[calc].end_line, 2);
        assert_eq!(tree.path(calc), "math::Calculator");

        let owned: Vec<&str> = tree[calc].symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(owned, vec!["Calculator", "add"]);
    }

    #[test]
    fn test_find_at_line_prefers_deepest() {
        let tree = ScopeTree::build("calc.hpp", &calculator());

        let found = tree.find_at_line(2).unwrap();
        assert_eq!(tree[found].name, "Calculator");
        assert_eq!(tree.path(found), "math::Calculator");

        let at_namespace = tree.find_at_line(0).unwrap();
        assert_eq!(tree[at_namespace].name, "math");

        assert_eq!(tree.find_at_line(40), None);
    }

    #[test]
    fn test_scope_without_trailing_symbol_keeps_zero_height() {
        let symbols = vec![
            sym("lonely", SymbolKind::Function, "", "a.cpp", 7),
            sym("helper", SymbolKind::Function, "", "a.cpp", 12),
        ];
        let tree = ScopeTree::build("a.cpp", &symbols);

        assert_eq!(tree.roots().len(), 2);
        for &root in tree.roots() {
            assert_eq!(tree[root].start_line, tree[root].end_line);
        }
    }

    #[test]
    fn test_same_kind_symbols_do_not_extend_scope() {
        let symbols = vec![
            sym("outer", SymbolKind::Namespace, "", "a.cpp", 0),
            sym("inner", SymbolKind::Namespace, "outer", "a.cpp", 1),
            sym("value", SymbolKind::Variable, "outer::inner", "a.cpp", 2),
        ];
        let tree = ScopeTree::build("a.cpp", &symbols);

        let outer = tree.roots()[0];
        let inner = tree[outer].children[0];
        // `inner` opened its own scope, so `outer` owns nothing of another kind
        assert_eq!(tree[outer].end_line, 0);
        assert_eq!(tree[inner].end_line, 2);
        assert_eq!(tree.find_at_line(2), Some(inner));
    }

    #[test]
    fn test_unscoped_records_follow_line_spans() {
        // No scope paths: each scope closes once a later scope opens
        let symbols = vec![
            sym("first", SymbolKind::Function, "", "a.cpp", 0),
            sym("local", SymbolKind::Variable, "", "a.cpp", 1),
            sym("second", SymbolKind::Function, "", "a.cpp", 3),
        ];
        let tree = ScopeTree::build("a.cpp", &symbols);

        assert_eq!(tree.roots().len(), 2);
        let first = tree.roots()[0];
        assert_eq!(tree[first].end_line, 1);
        assert_eq!(tree[first].symbols.len(), 2);
    }

    #[test]
    fn test_record_extents_do_not_size_scopes() {
        let symbols = vec![
            SymbolRecord { end_line: Some(10), ..sym("ns", SymbolKind::Namespace, "", "a.cpp", 0) },
            SymbolRecord { end_line: Some(4), ..sym("run", SymbolKind::Function, "ns", "a.cpp", 2) },
            sym("local", SymbolKind::Variable, "ns::run", "a.cpp", 3),
            sym("after", SymbolKind::Variable, "ns", "a.cpp", 6),
            sym("global", SymbolKind::Variable, "", "a.cpp", 12),
        ];
        let tree = ScopeTree::build("a.cpp", &symbols);

        assert_eq!(tree.roots().len(), 1);
        let ns = tree.roots()[0];
        let run = tree[ns].children[0];
        // `run` stays on top of the stack, so later variables land in it
        let run_owned: Vec<&str> = tree[run].symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(run_owned, vec!["run", "local", "after", "global"]);
        assert_eq!(tree[run].end_line, 12);
        assert_eq!(tree[ns].end_line, 0);

        assert_eq!(tree.find_at_line(3), Some(run));
        assert_eq!(tree.find_at_line(0), Some(ns));
        assert_eq!(tree.find_at_line(1), None);
    }

    #[test]
    fn test_declarations_do_not_open_scopes() {
        let symbols = vec![
            decl("Forward", SymbolKind::Class, "", "a.cpp", 0),
            decl("prototype", SymbolKind::Function, "", "a.cpp", 1),
        ];
        let tree = ScopeTree::build("a.cpp", &symbols);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_symbols_never_precede_their_scope() {
        let tree = ScopeTree::build("calc.hpp", &calculator());
        for id in tree.preorder() {
            let scope = &tree[id];
            assert!(scope.symbols.iter().all(|s| s.line >= scope.start_line));
        }
    }

    #[test]
    fn test_hierarchy_is_root_first() {
        let tree = ScopeTree::build("calc.hpp", &calculator());
        let calc = tree.find_at_line(1).unwrap();
        let names: Vec<&str> = tree
            .hierarchy(calc)
            .into_iter()
            .map(|id| tree[id].name.as_str())
            .collect();
        assert_eq!(names, vec!["math", "Calculator"]);
        assert_eq!(tree.depth(calc), 2);
    }
}

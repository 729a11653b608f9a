// Query execution engine

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::index::names::SymbolStatistics;
use crate::index::registry::ScopeSummary;
use crate::index::store::{ScopeStatistics, SymbolIndex};
use crate::index::{SymbolKind, SymbolRecord, SCOPE_SEPARATOR};
use crate::query::definitions::{DefinitionIndex, DefinitionRow};
use crate::query::resolver::{Resolver, ScoredSymbol};

static QUALIFIED_IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z_][A-Za-z0-9_]*(?:::[A-Za-z_][A-Za-z0-9_]*)*").expect("valid identifier pattern")
});

/// Where a definition hit came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HitSource {
    Index,
    External,
}

/// Definition lookup result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionHit {
    pub name: String,
    pub qualified_name: String,
    pub kind: Option<SymbolKind>,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub score: Option<i32>,
    pub source: HitSource,
}

impl From<ScoredSymbol> for DefinitionHit {
    fn from(scored: ScoredSymbol) -> Self {
        let symbol = scored.symbol;
        Self {
            qualified_name: symbol.qualified_name(),
            name: symbol.name,
            kind: Some(symbol.kind),
            file: symbol.file,
            line: symbol.line,
            column: symbol.column,
            score: Some(scored.score),
            source: HitSource::Index,
        }
    }
}

impl From<DefinitionRow> for DefinitionHit {
    fn from(row: DefinitionRow) -> Self {
        let name = match row.name.rfind(SCOPE_SEPARATOR) {
            Some(pos) => row.name[pos + SCOPE_SEPARATOR.len()..].to_string(),
            None => row.name.clone(),
        };
        Self {
            name,
            qualified_name: row.name,
            kind: None,
            file: row.file,
            line: row.line,
            column: row.column,
            score: None,
            source: HitSource::External,
        }
    }
}

/// Combined symbol and scope counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStatistics {
    pub files: usize,
    pub symbols: SymbolStatistics,
    pub scopes: ScopeStatistics,
}

/// Query engine over the live index, with an optional external fallback
pub struct QueryEngine {
    index: Arc<SymbolIndex>,
    resolver: Resolver,
    definitions: Option<DefinitionIndex>,
}

impl QueryEngine {
    pub fn new(index: Arc<SymbolIndex>, max_results: usize) -> Self {
        Self {
            index,
            resolver: Resolver::new(max_results),
            definitions: None,
        }
    }

    pub fn with_definitions(mut self, definitions: DefinitionIndex) -> Self {
        self.definitions = Some(definitions);
        self
    }

    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    /// Ranked definitions of `identifier` as seen from `file:line`.
    ///
    /// Falls back to the external definition rows only when the live index
    /// has no candidate at all.
    pub fn goto_definition(&self, identifier: &str, file: &str, line: usize) -> Vec<DefinitionHit> {
        let scored = {
            let state = self.index.read();
            self.resolver.resolve_scored(&state, identifier, file, line)
        };

        if !scored.is_empty() {
            return scored.into_iter().map(DefinitionHit::from).collect();
        }

        match &self.definitions {
            Some(definitions) => {
                debug!("No live candidates for {}, consulting external definitions", identifier);
                definitions
                    .resolve(identifier, file, self.resolver.max_results())
                    .into_iter()
                    .map(DefinitionHit::from)
                    .collect()
            }
            None => Vec::new(),
        }
    }

    /// Resolve the identifier under a zero-based cursor in `content`
    pub fn definition_at_cursor(
        &self,
        file: &str,
        content: &str,
        line: usize,
        column: usize,
    ) -> Option<(String, Vec<DefinitionHit>)> {
        let text = content.lines().nth(line)?;
        let identifier = identifier_at(text, column)?;
        let hits = self.goto_definition(&identifier, file, line);
        Some((identifier, hits))
    }

    /// Bodiless declarations of the identifier's last segment
    pub fn declarations(&self, identifier: &str) -> Vec<SymbolRecord> {
        let name = identifier.rsplit(SCOPE_SEPARATOR).next().unwrap_or(identifier);
        self.index.read().find_declarations(name)
    }

    pub fn scope_at(&self, file: &str, line: usize) -> Option<ScopeSummary> {
        self.index.find_scope_at_position(file, line).map(|s| s.summary())
    }

    pub fn file_scopes(&self, file: &str) -> Vec<ScopeSummary> {
        let mut summaries = Vec::new();
        let mut pending = self.index.file_scopes(file);
        pending.reverse();
        while let Some(scope) = pending.pop() {
            summaries.push(scope.summary());
            let mut children = scope.children();
            children.reverse();
            pending.extend(children);
        }
        summaries
    }

    pub fn search(&self, query: &str, kind: Option<SymbolKind>, limit: usize) -> Vec<SymbolRecord> {
        let state = self.index.read();
        match kind {
            Some(kind) => state
                .search_symbols(query, usize::MAX)
                .into_iter()
                .filter(|s| s.kind == kind)
                .take(limit)
                .collect(),
            None => state.search_symbols(query, limit),
        }
    }

    pub fn statistics(&self) -> IndexStatistics {
        let state = self.index.read();
        IndexStatistics {
            files: state.files().len(),
            symbols: state.symbol_statistics(),
            scopes: state.scope_statistics(),
        }
    }
}

/// The (possibly `::`-qualified) identifier under a zero-based byte column.
///
/// On a qualified name the result stops at the segment holding the cursor,
/// so the cursor on `Calculator` in `math::Calculator::add` yields
/// `math::Calculator`.
pub fn identifier_at(line_text: &str, column: usize) -> Option<String> {
    let found = QUALIFIED_IDENT
        .find_iter(line_text)
        .find(|m| m.start() <= column && column <= m.end())?;

    let relative = column - found.start();
    let text = found.as_str();
    let end = text[relative..]
        .find(SCOPE_SEPARATOR)
        .map_or(text.len(), |offset| relative + offset);

    Some(text[..end].to_string())
}

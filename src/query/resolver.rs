// Scope-aware "go to definition" ranking over the live index

use serde::Serialize;

use crate::index::store::IndexState;
use crate::index::{SymbolRecord, SCOPE_SEPARATOR};

/// A candidate definition with its ranking score
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredSymbol {
    pub score: i32,
    pub symbol: SymbolRecord,
}

const SAME_FILE: i32 = 5;
const EXACT_SCOPE: i32 = 20;
const SCOPE_SUFFIX: i32 = 12;
const QUALIFIED_NAME_PREFIX: i32 = 15;
const QUALIFIED_SCOPE_SUFFIX: i32 = 10;
const EXACT_NAME: i32 = 2;
const NAME_SUFFIX: i32 = 1;
const FULL_DEFINITION: i32 = 3;

/// Heuristic resolver: favours same-file and lexically nearby candidates
/// without any type or overload information.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    max_results: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RESULTS)
    }
}

impl Resolver {
    pub const DEFAULT_MAX_RESULTS: usize = 5;

    pub fn new(max_results: usize) -> Self {
        Self { max_results }
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Best candidates first; empty when nothing carries the name
    pub fn resolve(
        &self,
        state: &IndexState,
        identifier: &str,
        current_file: &str,
        current_line: usize,
    ) -> Vec<SymbolRecord> {
        self.resolve_scored(state, identifier, current_file, current_line)
            .into_iter()
            .map(|scored| scored.symbol)
            .collect()
    }

    pub fn resolve_scored(
        &self,
        state: &IndexState,
        identifier: &str,
        current_file: &str,
        current_line: usize,
    ) -> Vec<ScoredSymbol> {
        let (qualifier, target_name) = split_qualified(identifier);

        let scope_paths = match state.find_scope_at_position(current_file, current_line) {
            Some(scope) => {
                let names: Vec<String> = scope.hierarchy().iter().map(|s| s.name().to_string()).collect();
                candidate_scope_paths(&names)
            }
            None => vec![String::new()],
        };

        let mut candidates = state.find_definitions(target_name);
        if qualifier.is_some() {
            for symbol in state.find_definitions(identifier) {
                if !candidates.iter().any(|c| c.same_identity(&symbol)) {
                    candidates.push(symbol);
                }
            }
        }

        let mut scored: Vec<ScoredSymbol> = candidates
            .into_iter()
            .map(|symbol| ScoredSymbol {
                score: score(&symbol, current_file, &scope_paths, qualifier, target_name),
                symbol,
            })
            .collect();

        // Stable: ties keep candidate order
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(self.max_results);
        scored
    }
}

/// `(qualifier, tail)` around the last `::`
fn split_qualified(identifier: &str) -> (Option<&str>, &str) {
    match identifier.rfind(SCOPE_SEPARATOR) {
        Some(pos) => (
            Some(&identifier[..pos]),
            &identifier[pos + SCOPE_SEPARATOR.len()..],
        ),
        None => (None, identifier),
    }
}

/// Paths from the full hierarchy down to the global path, most specific first
fn candidate_scope_paths(names: &[String]) -> Vec<String> {
    (0..=names.len())
        .rev()
        .map(|len| names[..len].join(SCOPE_SEPARATOR))
        .collect()
}

fn score(
    candidate: &SymbolRecord,
    current_file: &str,
    scope_paths: &[String],
    qualifier: Option<&str>,
    target_name: &str,
) -> i32 {
    let mut score = 0;

    if candidate.file == current_file {
        score += SAME_FILE;
    }

    if scope_paths.iter().any(|path| candidate.scope == *path) {
        score += EXACT_SCOPE;
    }

    if scope_paths
        .iter()
        .any(|path| !path.is_empty() && candidate.scope.ends_with(path.as_str()))
    {
        score += SCOPE_SUFFIX;
    }

    if let Some(qualifier) = qualifier {
        if candidate.name.starts_with(&format!("{}{}", qualifier, SCOPE_SEPARATOR)) {
            score += QUALIFIED_NAME_PREFIX;
        }
        if candidate.scope.ends_with(qualifier) {
            score += QUALIFIED_SCOPE_SUFFIX;
        }
    }

    if candidate.name == target_name {
        score += EXACT_NAME;
    }

    if candidate.name.ends_with(&format!("{}{}", SCOPE_SEPARATOR, target_name)) {
        score += NAME_SUFFIX;
    }

    if candidate.is_definition && !candidate.is_declaration {
        score += FULL_DEFINITION;
    }

    score
}

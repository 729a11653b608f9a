// Name index: bare symbol name -> every record carrying it

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{SymbolKind, SymbolRecord};

/// Aggregate symbol counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolStatistics {
    pub total: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub by_file: BTreeMap<String, usize>,
}

/// Per-file symbol lists plus the derived name buckets.
///
/// The file table is authoritative; `by_name` always equals the projection of
/// the file table grouped by name.
#[derive(Debug, Default, Clone)]
pub struct NameIndex {
    files: HashMap<String, Vec<SymbolRecord>>,
    by_name: HashMap<String, Vec<SymbolRecord>>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the file's symbol list and its name-bucket entries
    pub fn update(&mut self, file: &str, symbols: Vec<SymbolRecord>) {
        self.unlink(file);

        for symbol in &symbols {
            self.by_name
                .entry(symbol.name.clone())
                .or_default()
                .push(symbol.clone());
        }

        self.files.insert(file.to_string(), symbols);
    }

    /// Forget the file entirely. Returns false when it was not indexed.
    pub fn remove(&mut self, file: &str) -> bool {
        let existed = self.unlink(file);
        self.files.remove(file);
        existed
    }

    /// Drop the name-bucket entries contributed by `file`, matched by `(file, line)`
    fn unlink(&mut self, file: &str) -> bool {
        let Some(previous) = self.files.get(file) else {
            return false;
        };

        let lines: HashSet<usize> = previous.iter().map(|s| s.line).collect();
        let names: HashSet<&str> = previous.iter().map(|s| s.name.as_str()).collect();

        for name in names {
            let emptied = match self.by_name.get_mut(name) {
                Some(bucket) => {
                    bucket.retain(|s| !(s.file == file && lines.contains(&s.line)));
                    bucket.is_empty()
                }
                None => false,
            };
            if emptied {
                self.by_name.remove(name);
            }
        }

        true
    }

    pub fn find_by_name(&self, name: &str) -> Vec<SymbolRecord> {
        self.by_name.get(name).cloned().unwrap_or_default()
    }

    pub fn find_definitions(&self, name: &str) -> Vec<SymbolRecord> {
        self.by_name
            .get(name)
            .map(|bucket| bucket.iter().filter(|s| s.is_definition).cloned().collect())
            .unwrap_or_default()
    }

    pub fn find_declarations(&self, name: &str) -> Vec<SymbolRecord> {
        self.by_name
            .get(name)
            .map(|bucket| bucket.iter().filter(|s| s.is_declaration).cloned().collect())
            .unwrap_or_default()
    }

    pub fn find_by_kind(&self, kind: SymbolKind) -> Vec<SymbolRecord> {
        let mut results: Vec<SymbolRecord> = self
            .symbols()
            .filter(|s| s.kind == kind)
            .cloned()
            .collect();
        sort_by_location(&mut results);
        results
    }

    /// Case-insensitive substring match on bare names
    pub fn search(&self, query: &str, limit: usize) -> Vec<SymbolRecord> {
        let needle = query.to_lowercase();
        let mut results: Vec<SymbolRecord> = self
            .by_name
            .iter()
            .filter(|(name, _)| name.to_lowercase().contains(&needle))
            .flat_map(|(_, bucket)| bucket.iter().cloned())
            .collect();

        results.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.file.cmp(&b.file))
                .then_with(|| a.line.cmp(&b.line))
        });
        results.truncate(limit);
        results
    }

    pub fn file_symbols(&self, file: &str) -> Option<&[SymbolRecord]> {
        self.files.get(file).map(|s| s.as_slice())
    }

    pub fn contains_file(&self, file: &str) -> bool {
        self.files.contains_key(file)
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|f| f.as_str())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn name_count(&self) -> usize {
        self.by_name.len()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &SymbolRecord> {
        self.files.values().flatten()
    }

    pub fn statistics(&self) -> SymbolStatistics {
        let mut stats = SymbolStatistics::default();

        for (file, symbols) in &self.files {
            stats.total += symbols.len();
            stats.by_file.insert(file.clone(), symbols.len());
            for symbol in symbols {
                *stats.by_kind.entry(symbol.kind.as_str().to_string()).or_default() += 1;
            }
        }

        stats
    }
}

fn sort_by_location(symbols: &mut [SymbolRecord]) {
    symbols.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then_with(|| a.line.cmp(&b.line))
            .then_with(|| a.column.cmp(&b.column))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::test_support::{decl, sym};

    fn sample_a() -> Vec<SymbolRecord> {
        vec![
            sym("foo", SymbolKind::Function, "", "a.cpp", 1),
            decl("bar", SymbolKind::Function, "", "a.cpp", 3),
            sym("count", SymbolKind::Variable, "", "a.cpp", 5),
        ]
    }

    #[test]
    fn test_update_and_find() {
        let mut index = NameIndex::new();
        index.update("a.cpp", sample_a());
        index.update("b.cpp", vec![sym("foo", SymbolKind::Function, "", "b.cpp", 0)]);

        let foos = index.find_by_name("foo");
        assert_eq!(foos.len(), 2);
        assert_eq!(foos[0].file, "a.cpp");
        assert_eq!(foos[1].file, "b.cpp");

        assert!(index.find_by_name("missing").is_empty());
        assert_eq!(index.find_definitions("bar").len(), 0);
        assert_eq!(index.find_declarations("bar").len(), 1);
    }

    #[test]
    fn test_update_replaces_previous_entries() {
        let mut index = NameIndex::new();
        index.update("a.cpp", sample_a());
        index.update("a.cpp", vec![sym("foo", SymbolKind::Function, "", "a.cpp", 10)]);

        let foos = index.find_by_name("foo");
        assert_eq!(foos.len(), 1);
        assert_eq!(foos[0].line, 10);
        assert!(index.find_by_name("bar").is_empty());
        assert_eq!(index.name_count(), 1);
    }

    #[test]
    fn test_remove_deletes_empty_buckets() {
        let mut index = NameIndex::new();
        index.update("a.cpp", sample_a());
        index.update("b.cpp", vec![sym("foo", SymbolKind::Function, "", "b.cpp", 0)]);

        assert!(index.remove("a.cpp"));
        assert!(!index.remove("a.cpp"));

        assert_eq!(index.find_by_name("foo").len(), 1);
        assert_eq!(index.find_by_name("foo")[0].file, "b.cpp");
        assert_eq!(index.name_count(), 1);
        assert!(!index.contains_file("a.cpp"));
    }

    #[test]
    fn test_find_by_kind_and_search() {
        let mut index = NameIndex::new();
        index.update("a.cpp", sample_a());

        let functions = index.find_by_kind(SymbolKind::Function);
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name, "foo");

        let hits = index.search("OU", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "count");

        assert_eq!(index.search("", 2).len(), 2);
    }

    #[test]
    fn test_statistics() {
        let mut index = NameIndex::new();
        index.update("a.cpp", sample_a());
        index.update("b.cpp", vec![sym("foo", SymbolKind::Function, "", "b.cpp", 0)]);

        let stats = index.statistics();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_kind.get("function"), Some(&3));
        assert_eq!(stats.by_kind.get("variable"), Some(&1));
        assert_eq!(stats.by_file.get("a.cpp"), Some(&3));
    }
}

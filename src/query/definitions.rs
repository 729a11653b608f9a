// Read-only definition rows produced by the external static indexer (JSONL)

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::index::SCOPE_SEPARATOR;

/// One top-level definition as recorded by the external indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionRow {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Definition rows loaded from a line-delimited JSON file
#[derive(Debug, Clone, Default)]
pub struct DefinitionIndex {
    rows: Vec<DefinitionRow>,
}

impl DefinitionIndex {
    /// Load a JSONL file. Malformed lines are skipped.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open definition index: {}", path.display()))?;
        let index = Self::from_reader(BufReader::new(file))?;
        info!("Loaded {} definitions from {}", index.len(), path.display());
        Ok(index)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut rows = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<DefinitionRow>(trimmed) {
                Ok(row) if !row.name.is_empty() => rows.push(row),
                Ok(_) => warn!("Skipping unnamed definition on line {}", line_no + 1),
                Err(e) => warn!("Skipping malformed definition on line {}: {}", line_no + 1, e),
            }
        }

        Ok(Self { rows })
    }

    pub fn from_rows(rows: Vec<DefinitionRow>) -> Self {
        Self { rows }
    }

    /// Rewrite the file of every row, e.g. into index keys
    pub fn map_files(mut self, key: impl Fn(&str) -> String) -> Self {
        for row in &mut self.rows {
            row.file = key(&row.file);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reduced ranking: exact or qualified-suffix name match, same-file rows
    /// first, then the shortest recorded scope.
    pub fn resolve(&self, identifier: &str, current_file: &str, limit: usize) -> Vec<DefinitionRow> {
        let suffix = format!("{}{}", SCOPE_SEPARATOR, identifier);

        let mut matches: Vec<&DefinitionRow> = self
            .rows
            .iter()
            .filter(|row| row.name == identifier || row.name.ends_with(&suffix))
            .collect();

        matches.sort_by_key(|row| {
            (
                row.file != current_file,
                row.scope.as_deref().map_or(0, str::len),
            )
        });

        matches.into_iter().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ROWS: &str = r#"{"name":"math::Calculator::add","file":"calc.cpp","line":21,"column":15}
{"name":"geo::Vector::add","file":"geo.cpp","line":8,"column":9,"scope":"geo::Vector"}
{"name":"add","file":"util.cpp","line":2,"column":4,"scope":""}
not json at all
{"name":"","file":"x.cpp","line":0,"column":0}
{"name":"main","file":"main.cpp","line":0,"column":4}
"#;

    #[test]
    fn test_load_skips_malformed_lines() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ROWS.as_bytes()).unwrap();

        let index = DefinitionIndex::load(file.path()).unwrap();
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(DefinitionIndex::load("/nonexistent/index.jsonl").is_err());
    }

    #[test]
    fn test_resolve_prefers_same_file_then_short_scope() {
        let index = DefinitionIndex::from_reader(ROWS.as_bytes()).unwrap();

        let hits = index.resolve("add", "main.cpp", 10);
        let files: Vec<&str> = hits.iter().map(|r| r.file.as_str()).collect();
        // calc.cpp has no recorded scope, util.cpp an empty one: both tie at 0
        assert_eq!(files, vec!["calc.cpp", "util.cpp", "geo.cpp"]);

        let hits = index.resolve("add", "geo.cpp", 10);
        assert_eq!(hits[0].file, "geo.cpp");

        assert_eq!(index.resolve("add", "main.cpp", 1).len(), 1);
    }

    #[test]
    fn test_map_files_changes_same_file_preference() {
        let index = DefinitionIndex::from_rows(vec![
            DefinitionRow {
                name: "util::init".to_string(),
                file: "/work/proj/lib/other.cpp".to_string(),
                line: 1,
                column: 5,
                scope: None,
            },
            DefinitionRow {
                name: "app::init".to_string(),
                file: "/work/proj/src/main.cpp".to_string(),
                line: 3,
                column: 5,
                scope: None,
            },
        ]);
        assert_eq!(index.resolve("init", "src/main.cpp", 5)[0].file, "/work/proj/lib/other.cpp");

        let index = index.map_files(|file| file.trim_start_matches("/work/proj/").to_string());
        let files: Vec<String> = index.resolve("init", "src/main.cpp", 5).into_iter().map(|r| r.file).collect();
        assert_eq!(files, vec!["src/main.cpp", "lib/other.cpp"]);
    }

    #[test]
    fn test_resolve_qualified_suffix() {
        let index = DefinitionIndex::from_reader(ROWS.as_bytes()).unwrap();

        let hits = index.resolve("Calculator::add", "main.cpp", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "math::Calculator::add");

        assert!(index.resolve("dd", "main.cpp", 10).is_empty());
    }
}

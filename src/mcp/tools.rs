// MCP tool handlers

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::index::SymbolKind;
use crate::indexer::{IndexOutcome, Indexer};
use crate::query::engine::{DefinitionHit, QueryEngine};

fn text_content(text: String) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": text
        }]
    })
}

fn required_str<'a>(args: &'a HashMap<String, Value>, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing {}", key))
}

fn required_usize(args: &HashMap<String, Value>, key: &str) -> Result<usize> {
    args.get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| anyhow::anyhow!("Missing {}", key))
}

fn wants_json(args: &HashMap<String, Value>) -> bool {
    args.get("format").and_then(|v| v.as_str()) == Some("json")
}

/// Re-index one file, from `content` or from disk
pub async fn update_file(indexer: &Indexer, args: &HashMap<String, Value>) -> Result<Value> {
    let file = required_str(args, "file")?;

    let content = match args.get("content").and_then(|v| v.as_str()) {
        Some(content) => content.to_string(),
        None => {
            let path = indexer.resolve_path(file);
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?
        }
    };

    let text = match indexer.index_file(file, &content)? {
        IndexOutcome::Updated(update) => format!(
            "Indexed {}: {} symbols, {} scopes ({} skipped)",
            update.file, update.symbols, update.scopes, update.skipped
        ),
        IndexOutcome::Unchanged => format!("{} is unchanged", file),
    };

    Ok(text_content(text))
}

pub async fn remove_file(indexer: &Indexer, args: &HashMap<String, Value>) -> Result<Value> {
    let file = required_str(args, "file")?;

    let text = if indexer.remove_file(file) {
        format!("Removed {} from the index", file)
    } else {
        format!("{} was not indexed", file)
    };

    Ok(text_content(text))
}

/// Go to definition, by identifier or by cursor position
pub async fn definition(indexer: &Indexer, engine: &QueryEngine, args: &HashMap<String, Value>) -> Result<Value> {
    let file = required_str(args, "file")?;
    let line = required_usize(args, "line")?;

    let (identifier, hits) = match args.get("identifier").and_then(|v| v.as_str()) {
        Some(identifier) => (identifier.to_string(), engine.goto_definition(identifier, file, line)),
        None => {
            let column = required_usize(args, "column")?;
            let path = indexer.resolve_path(file);
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            engine
                .definition_at_cursor(file, &content, line, column)
                .ok_or_else(|| anyhow::anyhow!("No symbol at cursor {}:{}:{}", file, line, column))?
        }
    };

    if wants_json(args) {
        return Ok(text_content(serde_json::to_string_pretty(&json!({
            "identifier": identifier,
            "definitions": hits
        }))?));
    }

    let mut lines = Vec::new();
    if hits.is_empty() {
        lines.push(format!("No definition found for '{}'", identifier));
        for declaration in engine.declarations(&identifier) {
            lines.push(format!(
                "  declared at {}:{}:{} - {} ({})",
                declaration.file,
                declaration.line,
                declaration.column,
                declaration.qualified_name(),
                declaration.kind
            ));
        }
    } else {
        lines.push(format!("Found {} definitions of '{}':", hits.len(), identifier));
        for hit in &hits {
            lines.push(format!("  {}", format_hit(hit)));
        }
    }

    Ok(text_content(lines.join("\n")))
}

fn format_hit(hit: &DefinitionHit) -> String {
    let kind = hit.kind.map(|k| k.to_string()).unwrap_or_else(|| "external".to_string());
    match hit.score {
        Some(score) => format!("{}:{}:{} - {} ({}, score {})", hit.file, hit.line, hit.column, hit.qualified_name, kind, score),
        None => format!("{}:{}:{} - {} ({})", hit.file, hit.line, hit.column, hit.qualified_name, kind),
    }
}

/// Innermost scope at a position
pub async fn scope(engine: &QueryEngine, args: &HashMap<String, Value>) -> Result<Value> {
    let file = required_str(args, "file")?;
    let line = required_usize(args, "line")?;

    let text = match engine.scope_at(file, line) {
        Some(summary) if wants_json(args) => serde_json::to_string_pretty(&summary)?,
        Some(summary) => format!(
            "{} {} ({}:{}-{}), {} symbols",
            summary.kind.as_str(),
            summary.path,
            summary.file,
            summary.start_line,
            summary.end_line,
            summary.symbol_count
        ),
        None => format!("{}:{} is at file scope", file, line),
    };

    Ok(text_content(text))
}

/// Search tool handler
pub async fn search(engine: &QueryEngine, args: &HashMap<String, Value>) -> Result<Value> {
    let query = required_str(args, "query")?;

    let kind = match args.get("kind").and_then(|v| v.as_str()) {
        Some(name) => Some(SymbolKind::from_str(name).ok_or_else(|| anyhow::anyhow!("Unknown symbol kind: {}", name))?),
        None => None,
    };
    let limit = args.get("limit").and_then(|v| v.as_u64()).unwrap_or(10) as usize;

    let results = engine.search(query, kind, limit);

    let mut text_results = Vec::new();
    if results.is_empty() {
        text_results.push(format!("No symbols found matching '{}'", query));
    } else {
        text_results.push(format!("Found {} symbols matching '{}':", results.len(), query));
        for result in results {
            text_results.push(format!(
                "  {}:{} - {} ({})",
                result.file,
                result.line,
                result.qualified_name(),
                result.kind
            ));
        }
    }

    Ok(text_content(text_results.join("\n")))
}

/// Stats tool handler
pub async fn stats(engine: &QueryEngine, _args: &HashMap<String, Value>) -> Result<Value> {
    let stats = engine.statistics();

    Ok(text_content(format!(
        "Index Statistics:\n- Files: {}\n- Symbols: {}\n- Scopes: {}\n- Named scopes: {}\n- Max scope depth: {}",
        stats.files,
        stats.symbols.total,
        stats.scopes.total,
        stats.scopes.registered_names,
        stats.scopes.max_depth
    )))
}

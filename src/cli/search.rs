use anyhow::Result;

use crate::cli::{OutputFormat, Workspace};
use crate::index::SymbolKind;

pub async fn search_symbols(
    project: String,
    query: String,
    kind: Option<String>,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let kind = match kind {
        Some(name) => Some(SymbolKind::from_str(&name).ok_or_else(|| anyhow::anyhow!("Unknown symbol kind: {}", name))?),
        None => None,
    };

    let workspace = Workspace::open(&project, false)?;
    let results = workspace.engine.search(&query, kind, limit);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => {
            if results.is_empty() {
                println!("No symbols found matching '{}'", query);
                return Ok(());
            }

            println!("Found {} symbols matching '{}':", results.len(), query);
            for symbol in results {
                let role = if symbol.is_definition {
                    "definition"
                } else if symbol.is_declaration {
                    "declaration"
                } else {
                    "reference"
                };
                println!(
                    "  {}:{}:{} - {} ({}, {})",
                    symbol.file,
                    symbol.line,
                    symbol.column,
                    symbol.qualified_name(),
                    symbol.kind,
                    role
                );
            }
        }
    }

    Ok(())
}

use anyhow::{Context, Result};

use crate::cli::{OutputFormat, Workspace};

/// Rank definitions of `identifier` (or of the identifier under the cursor) as
/// seen from `file:line`. Lines and columns are zero-based.
pub async fn resolve(
    project: String,
    identifier: Option<String>,
    file: String,
    line: usize,
    column: Option<usize>,
    scores: bool,
    format: OutputFormat,
) -> Result<()> {
    let workspace = Workspace::open(&project, false)?;
    let file_key = workspace.file_key(&file);

    let (identifier, hits) = match identifier {
        Some(identifier) => {
            let hits = workspace.engine.goto_definition(&identifier, &file_key, line);
            (identifier, hits)
        }
        None => {
            let column = column.ok_or_else(|| anyhow::anyhow!("Either an identifier or --column is required"))?;
            let path = workspace.indexer.resolve_path(&file_key);
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            workspace
                .engine
                .definition_at_cursor(&file_key, &content, line, column)
                .ok_or_else(|| anyhow::anyhow!("No symbol at cursor {}:{}:{}", file_key, line, column))?
        }
    };

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "identifier": identifier,
                "file": file_key,
                "line": line,
                "definitions": hits,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            if hits.is_empty() {
                println!("No definition found for '{}'", identifier);
                for declaration in workspace.engine.declarations(&identifier) {
                    println!(
                        "  declared at {}:{}:{} - {} ({})",
                        declaration.file,
                        declaration.line,
                        declaration.column,
                        declaration.qualified_name(),
                        declaration.kind
                    );
                }
                return Ok(());
            }

            println!("Definitions of '{}':", identifier);
            for hit in hits {
                let kind = hit.kind.map(|k| k.to_string()).unwrap_or_else(|| "external".to_string());
                match hit.score {
                    Some(score) if scores => println!(
                        "  [{:>3}] {}:{}:{} - {} ({})",
                        score, hit.file, hit.line, hit.column, hit.qualified_name, kind
                    ),
                    _ => println!("  {}:{}:{} - {} ({})", hit.file, hit.line, hit.column, hit.qualified_name, kind),
                }
            }
        }
    }

    Ok(())
}

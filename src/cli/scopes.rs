use anyhow::Result;

use crate::cli::{OutputFormat, Workspace};
use crate::index::registry::ScopeRef;

/// Print the scope tree of a file, or the scope chain at one line
pub async fn show_scopes(project: String, file: String, line: Option<usize>, format: OutputFormat) -> Result<()> {
    let workspace = Workspace::open(&project, false)?;
    let file_key = workspace.file_key(&file);
    let index = workspace.engine.index();

    if let Some(line) = line {
        let chain: Vec<ScopeRef> = index
            .find_scope_at_position(&file_key, line)
            .map(|scope| index.scope_hierarchy(&scope))
            .unwrap_or_default();

        match format {
            OutputFormat::Json => {
                let summaries: Vec<_> = chain.iter().map(|s| s.summary()).collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            }
            OutputFormat::Text => match chain.last() {
                Some(innermost) => {
                    println!("{}:{} is in {}", file_key, line, index.scope_path(innermost));
                    for (depth, scope) in chain.iter().enumerate() {
                        println!(
                            "{}{} {} [{}-{}]",
                            "  ".repeat(depth + 1),
                            scope.kind(),
                            scope.name(),
                            scope.start_line(),
                            scope.end_line()
                        );
                    }
                }
                None => println!("{}:{} is at file scope", file_key, line),
            },
        }
        return Ok(());
    }

    let summaries = workspace.engine.file_scopes(&file_key);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Text => {
            if summaries.is_empty() {
                println!("No scopes in {}", file_key);
            }
            for summary in summaries {
                let depth = summary.path.matches("::").count();
                println!(
                    "{}{} {} [{}-{}] {} symbols",
                    "  ".repeat(depth),
                    summary.kind,
                    summary.name,
                    summary.start_line,
                    summary.end_line,
                    summary.symbol_count
                );
            }
        }
    }

    Ok(())
}

use anyhow::Result;

use crate::cli::{OutputFormat, Workspace};

pub async fn show_stats(project: String, verbose: bool, format: OutputFormat) -> Result<()> {
    let workspace = Workspace::open(&project, false)?;
    let stats = workspace.engine.statistics();

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("cppscope statistics");
    println!("Project: {} ({})", workspace.config.project.name, workspace.indexer.root().display());
    println!("Generated: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));

    println!("\nIndex:");
    println!("  Files: {}", stats.files);
    println!("  Symbols: {}", stats.symbols.total);
    println!("  Scopes: {}", stats.scopes.total);
    println!("  Named scopes: {}", stats.scopes.registered_names);
    println!("  Max scope depth: {}", stats.scopes.max_depth);

    if verbose {
        println!("\nSymbols by kind:");
        for (kind, count) in &stats.symbols.by_kind {
            println!("  {}: {}", kind, count);
        }

        println!("\nScopes by kind:");
        for (kind, count) in &stats.scopes.by_kind {
            println!("  {}: {}", kind, count);
        }

        println!("\nSymbols by file:");
        for (file, count) in &stats.symbols.by_file {
            let scopes = stats.scopes.by_file.get(file).copied().unwrap_or(0);
            println!("  {}: {} symbols, {} scopes", file, count, scopes);
        }
    }

    Ok(())
}

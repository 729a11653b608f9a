use anyhow::Result;
use tracing::info;

use crate::cli::{OutputFormat, Workspace};
use crate::indexer::watcher::start_watcher;

pub async fn index_project(project: String, watch: bool, format: OutputFormat) -> Result<()> {
    info!("Indexing project: {}", project);

    let workspace = Workspace::open(&project, format == OutputFormat::Text)?;
    let report = &workspace.report;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            println!("Project: {} ({})", workspace.config.project.name, workspace.indexer.root().display());
            println!("Files found: {}", report.files_seen);
            println!("Files indexed: {}", report.files_indexed);
            if report.files_failed > 0 {
                println!("Files failed: {}", report.files_failed);
            }
            println!("Symbols: {}", report.symbols);
            if report.skipped_records > 0 {
                println!("Unnamed records skipped: {}", report.skipped_records);
            }

            let scopes = workspace.engine.statistics().scopes;
            println!("Scopes: {} (max depth {})", scopes.total, scopes.max_depth);
        }
    }

    if watch || workspace.config.indexing.watch {
        eprintln!("Watching for changes. Press Ctrl+C to stop.");
        watch_workspace(workspace).await?;
    }

    Ok(())
}

/// Index the project, then follow file changes until interrupted
pub async fn watch_project(project: String) -> Result<()> {
    let workspace = Workspace::open(&project, true)?;
    eprintln!(
        "Indexed {} files. Watching for changes. Press Ctrl+C to stop.",
        workspace.report.files_indexed
    );
    watch_workspace(workspace).await
}

async fn watch_workspace(workspace: Workspace) -> Result<()> {
    tokio::select! {
        result = start_watcher(workspace.indexer, workspace.config) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping watcher");
            Ok(())
        }
    }
}

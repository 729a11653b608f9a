use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::cli::Workspace;
use crate::indexer::watcher::start_watcher;
use crate::mcp::server::McpServer;

/// Index the project and serve MCP over stdio. Nothing but protocol
/// messages may reach stdout.
pub async fn serve_stdio(project: String, watch: bool) -> Result<()> {
    let workspace = Workspace::open(&project, false)?;

    info!("MCP server (stdio) for project: {}", workspace.config.project.name);
    if workspace.report.files_indexed == 0 {
        warn!("No C/C++ files indexed under {}", workspace.indexer.root().display());
    }

    if watch || workspace.config.indexing.watch {
        let indexer = Arc::clone(&workspace.indexer);
        let config = workspace.config.clone();
        tokio::spawn(async move {
            if let Err(e) = start_watcher(indexer, config).await {
                error!("File watcher stopped: {:#}", e);
            }
        });
    }

    let server = McpServer::new(workspace.indexer, workspace.engine);
    server.run().await
}

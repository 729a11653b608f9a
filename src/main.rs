use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod index;
mod indexer;
mod mcp;
mod query;

use cli::OutputFormat;
use config::{Config, LoggingConfig, CONFIG_FILE};

#[derive(Parser)]
#[command(name = "cppscope")]
#[command(author = "Intent Project Team")]
#[command(version)]
#[command(about = "Incremental C/C++ symbol and scope index with heuristic go-to-definition", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a project and print a summary
    Index {
        /// Project directory to index
        #[arg(short, long, default_value = ".")]
        project: String,

        /// Keep watching for changes after the initial scan
        #[arg(short, long)]
        watch: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Rank likely definitions of an identifier
    Resolve {
        /// Plain or `::`-qualified identifier; taken from --column when omitted
        identifier: Option<String>,

        /// File the lookup happens from
        #[arg(long)]
        file: String,

        /// Zero-based line of the lookup
        #[arg(long, default_value_t = 0)]
        line: usize,

        /// Zero-based column of the cursor
        #[arg(long)]
        column: Option<usize>,

        /// Show ranking scores
        #[arg(long)]
        scores: bool,

        #[arg(short, long, default_value = ".")]
        project: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the scope tree of a file, or the scopes enclosing one line
    Scopes {
        file: String,

        /// Zero-based line
        #[arg(long)]
        line: Option<usize>,

        #[arg(short, long, default_value = ".")]
        project: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Search symbols by case-insensitive name substring
    Search {
        query: String,

        /// Filter by kind (function, variable, class, struct, namespace, enum, enum_value, typedef)
        #[arg(short, long)]
        kind: Option<String>,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        #[arg(short, long, default_value = ".")]
        project: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show index statistics
    Stats {
        #[arg(short, long, default_value = ".")]
        project: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Index a project and keep it current until interrupted
    Watch {
        #[arg(short, long, default_value = ".")]
        project: String,
    },

    /// Start the MCP server on stdio
    Serve {
        #[arg(short, long, default_value = ".")]
        project: String,

        /// Re-index files as they change
        #[arg(short, long)]
        watch: bool,
    },
}

impl Commands {
    fn project(&self) -> &str {
        match self {
            Commands::Index { project, .. }
            | Commands::Resolve { project, .. }
            | Commands::Scopes { project, .. }
            | Commands::Search { project, .. }
            | Commands::Stats { project, .. }
            | Commands::Watch { project }
            | Commands::Serve { project, .. } => project,
        }
    }
}

/// Logs go to stderr; stdout carries command output and MCP messages.
/// `RUST_LOG` wins over the flags, the flags over the project configuration.
fn init_logging(debug: bool, verbose: bool, logging: &LoggingConfig) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.compact().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging is configured before the project config is loaded for real
    let logging = Config::from_file(Path::new(cli.command.project()).join(CONFIG_FILE))
        .map(|config| config.logging)
        .unwrap_or_default();
    init_logging(cli.debug, cli.verbose, &logging);

    info!("cppscope v{} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Index { project, watch, format } => {
            cli::index::index_project(project, watch, format).await?;
        }

        Commands::Resolve {
            identifier,
            file,
            line,
            column,
            scores,
            project,
            format,
        } => {
            cli::resolve::resolve(project, identifier, file, line, column, scores, format).await?;
        }

        Commands::Scopes {
            file,
            line,
            project,
            format,
        } => {
            cli::scopes::show_scopes(project, file, line, format).await?;
        }

        Commands::Search {
            query,
            kind,
            limit,
            project,
            format,
        } => {
            cli::search::search_symbols(project, query, kind, limit, format).await?;
        }

        Commands::Stats { project, format } => {
            cli::stats::show_stats(project, cli.verbose, format).await?;
        }

        Commands::Watch { project } => {
            cli::index::watch_project(project).await?;
        }

        Commands::Serve { project, watch } => {
            info!("Starting MCP server for project: {}", project);
            cli::serve::serve_stdio(project, watch).await?;
        }
    }

    Ok(())
}

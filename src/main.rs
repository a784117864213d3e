//! Codenav CLI - Code navigation queries over precomputed index bundles

use clap::{Args, Parser, Subcommand};
use codenav::config::{load_config, CodenavConfig};
use codenav::git::GitCliDiffSource;
use codenav::server::{start_server, AppState};
use codenav::storage::SqliteIndexStore;
use codenav::{Position, QueryContext, QueryResolver, SchemePriority};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Parser)]
#[command(name = "codenav")]
#[command(version = "0.1.0")]
#[command(about = "Code navigation queries over precomputed index bundles")]
#[command(long_about = r#"
Codenav answers hover, go-to-definition and find-references queries from
precomputed per-commit index bundles, including:
  • Queries at commits no bundle was indexed at (via git diffs)
  • Cross-bundle and cross-repository symbol resolution
  • Stable reference pagination with opaque cursors

Example usage:
  codenav serve --database index.db
  codenav hover --repository-id 42 --commit deadbeef --path lib/a.go --line 4 --character 2
  codenav definitions --repository-id 42 --commit deadbeef --path lib/a.go --line 4 --character 2
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a codenav.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// The (repository, commit, path, position) a one-shot query runs at
#[derive(Args)]
struct Target {
    /// Path to the index database file
    #[arg(short, long, default_value = "codenav.db")]
    database: PathBuf,

    /// Repository identifier
    #[arg(long)]
    repository_id: i64,

    /// Commit the query is asked at
    #[arg(long)]
    commit: String,

    /// Repository-relative file path
    #[arg(short, long)]
    path: String,

    /// Zero-based line
    #[arg(long)]
    line: u32,

    /// Zero-based character
    #[arg(long)]
    character: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the query API over HTTP
    Serve {
        /// Port to listen on
        #[arg(short = 'P', long, default_value = "3986")]
        port: u16,

        /// Path to the index database file
        #[arg(short, long, default_value = "codenav.db")]
        database: PathBuf,
    },

    /// Hover text at a position
    Hover {
        #[command(flatten)]
        target: Target,
    },

    /// Definition locations for the symbol at a position
    Definitions {
        #[command(flatten)]
        target: Target,
    },

    /// One page of reference locations for the symbol at a position
    References {
        #[command(flatten)]
        target: Target,

        /// Maximum number of locations per page
        #[arg(short, long, default_value = "100")]
        limit: usize,

        /// Cursor returned by a previous page
        #[arg(long)]
        cursor: Option<String>,
    },
}

fn scheme_priority(config: &CodenavConfig) -> SchemePriority {
    match &config.scheme_priority {
        Some(schemes) => SchemePriority::new(schemes.iter().cloned()),
        None => SchemePriority::default(),
    }
}

fn diff_source(config: &CodenavConfig) -> GitCliDiffSource {
    let mut diffs = GitCliDiffSource::new();
    for repo in &config.repositories {
        diffs = diffs.with_checkout(repo.id, &repo.path);
    }
    diffs
}

fn resolver_for(
    config: &CodenavConfig,
    database: &PathBuf,
    target: &Target,
) -> anyhow::Result<QueryResolver> {
    let store = Arc::new(SqliteIndexStore::open(database)?);
    Ok(QueryResolver::new(
        store.clone(),
        store,
        Arc::new(diff_source(config)),
        scheme_priority(config),
        target.repository_id,
        &target.commit,
        &target.path,
    ))
}

fn query_context(config: &CodenavConfig) -> QueryContext {
    let timeout = config
        .request_timeout_ms
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
    QueryContext::with_timeout(Duration::from_millis(timeout))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Serve { port, database } => {
            let database = config
                .database
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or(database);
            let port = config.port.unwrap_or(port);
            let timeout = config
                .request_timeout_ms
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);

            println!("🗄️  Database: {:?}", database);
            let store = Arc::new(SqliteIndexStore::open(&database)?);
            let state = AppState {
                bundles: store.clone(),
                uploads: store,
                diffs: Arc::new(diff_source(&config)),
                scheme_priority: scheme_priority(&config),
                request_timeout: Duration::from_millis(timeout),
            };
            start_server(port, state).await?;
        }

        Commands::Hover { target } => {
            let resolver = resolver_for(&config, &target.database, &target)?;
            let position = Position::new(target.line, target.character);

            println!(
                "🔍 Hover at {}:{} in {} @ {}...",
                target.line, target.character, target.path, target.commit
            );
            match resolver.hover(&query_context(&config), position).await? {
                Some(hover) => {
                    println!("📖 {} .. {}", hover.range.start, hover.range.end);
                    println!("{}", hover.text);
                }
                None => println!("∅ No hover data found."),
            }
        }

        Commands::Definitions { target } => {
            let resolver = resolver_for(&config, &target.database, &target)?;
            let position = Position::new(target.line, target.character);

            println!(
                "🎯 Definitions at {}:{} in {} @ {}...",
                target.line, target.character, target.path, target.commit
            );
            let locations = resolver
                .definitions(&query_context(&config), position)
                .await?;
            if locations.is_empty() {
                println!("∅ No definitions found.");
            } else {
                for location in locations {
                    println!(
                        "- {} {} .. {} (upload {})",
                        location.path, location.range.start, location.range.end, location.upload_id
                    );
                }
            }
        }

        Commands::References {
            target,
            limit,
            cursor,
        } => {
            let resolver = resolver_for(&config, &target.database, &target)?;
            let position = Position::new(target.line, target.character);

            println!(
                "📞 References at {}:{} in {} @ {}...",
                target.line, target.character, target.path, target.commit
            );
            let page = resolver
                .references(&query_context(&config), position, limit, cursor.as_deref())
                .await?;
            if page.locations.is_empty() {
                println!("∅ No references found.");
            } else {
                for location in &page.locations {
                    println!(
                        "- {} {} .. {} (upload {})",
                        location.path, location.range.start, location.range.end, location.upload_id
                    );
                }
                println!("📊 {} of {} total", page.locations.len(), page.total);
            }
            if let Some(cursor) = page.cursor {
                println!("➡️  Next page: --cursor {}", cursor);
            }
        }
    }

    Ok(())
}

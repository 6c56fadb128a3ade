mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simple_caldav_core::{CalDavClient, ClientConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "simple-caldav")]
#[command(about = "List, write and sync events in a CalDAV calendar collection")]
struct Cli {
    /// Calendar collection URL (overrides the config file)
    #[arg(long, global = true, env = "SIMPLE_CALDAV_URL")]
    url: Option<String>,

    /// Increase log output on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List events with their content
    List {
        /// Only events from this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Only events until this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
    /// List hrefs and etags without downloading events
    Etags,
    /// Fetch one event by UID
    Get { uid: String },
    /// Show the collection's current sync token
    Token,
    /// Show changes since a sync token (everything when omitted)
    Sync {
        #[arg(long)]
        token: Option<String>,
    },
    Create {
        #[arg(long)]
        summary: String,

        /// Start date/time (e.g., "2025-03-20T15:00", UTC)
        #[arg(short, long)]
        start: String,

        /// End date/time (e.g., "2025-03-20T16:00", UTC)
        #[arg(short, long)]
        end: String,

        #[arg(long)]
        location: Option<String>,

        /// TENTATIVE, CONFIRMED or CANCELLED
        #[arg(long)]
        status: Option<String>,
    },
    Delete {
        href: String,

        /// Only delete if the event still has this etag
        #[arg(long)]
        etag: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let client = connect(cli.url)?;

    match cli.command {
        Commands::List { from, to } => commands::list::run(&client, from.as_deref(), to.as_deref()).await,
        Commands::Etags => commands::etags::run(&client).await,
        Commands::Get { uid } => commands::get::run(&client, &uid).await,
        Commands::Token => commands::token::run(&client).await,
        Commands::Sync { token } => commands::sync::run(&client, token.as_deref()).await,
        Commands::Create {
            summary,
            start,
            end,
            location,
            status,
        } => commands::create::run(&client, summary, &start, &end, location, status.as_deref()).await,
        Commands::Delete { href, etag } => commands::delete::run(&client, &href, etag.as_deref()).await,
    }
}

/// Logs go to stderr so stdout stays valid JSON.
fn init_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::builder().parse(directives)?,
        _ => EnvFilter::new(default_level),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn connect(url: Option<String>) -> Result<CalDavClient> {
    let mut config = ClientConfig::load().context("Failed to load config")?;
    if url.is_some() {
        config.url = url;
    }

    if config.url.is_none() {
        let path = ClientConfig::config_path()?;
        if !path.exists() {
            ClientConfig::create_default_config(&path)?;
        }
        anyhow::bail!(
            "No calendar URL configured.\n\n\
            Set one with:\n  \
            simple-caldav --url <collection-url> <command>\n\n\
            or edit {}",
            path.display()
        );
    }

    Ok(CalDavClient::from_config(&config)?)
}

//! CLI administration tool for shortlink.
//!
//! Manages short links and inspects the database directly, without going
//! through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Create a short link
//! cargo run --bin admin -- link create https://example.com --slug promo --expires-in 3600
//!
//! # Show a link
//! cargo run --bin admin -- link show 42
//!
//! # Delete a link
//! cargo run --bin admin -- link delete 42
//!
//! # View statistics
//! cargo run --bin admin -- stats
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` or `DB_HOST`/`DB_USER`/`DB_PASSWORD`/`DB_NAME` (required)
//! - `BASE_URL`, `SHORT_CODE_LENGTH`, `CODE_GENERATION_ATTEMPTS` (optional, as for the server)

use shortlink::application::services::LinkService;
use shortlink::application::services::link_service::CreateLink;
use shortlink::config::{Config, StorageBackend};
use shortlink::domain::entities::{Link, TrackingParams};
use shortlink::infrastructure::cache::ResolutionCache;
use shortlink::infrastructure::persistence::PgLinkRepository;
use shortlink::server::connect_database;
use shortlink::utils::clock::{Clock, SystemClock};

use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing shortlink.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage short links
    Link {
        #[command(subcommand)]
        action: LinkAction,
    },

    /// Show statistics
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Link management subcommands.
#[derive(Subcommand)]
enum LinkAction {
    /// Create a short link
    Create {
        /// Destination URL (http or https)
        url: String,

        /// Custom slug used as the short code
        #[arg(short, long)]
        slug: Option<String>,

        /// Expire the link after this many seconds
        #[arg(short, long, value_name = "SECONDS")]
        expires_in: Option<i64>,

        /// Tracking parameter appended on redirect, e.g. `utm_source=mail` (repeatable)
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Show a link by id
    Show { id: i64 },

    /// Delete a link by id
    Delete {
        id: i64,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // The admin tool always talks to Postgres, whatever the server is set to.
    let mut config = Config::from_env()?;
    config.storage_backend = StorageBackend::Postgres;
    if config.database_url.is_none() {
        config.database_url =
            Some(Config::load_database_url().context("Database is not configured")?);
    }
    config.validate()?;

    let pool = connect_database(&config).await?;

    match cli.command {
        Commands::Link { action } => handle_link_action(action, &pool, &config).await?,
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Dispatches link management commands through the same service the server uses.
async fn handle_link_action(action: LinkAction, pool: &PgPool, config: &Config) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let repository = Arc::new(PgLinkRepository::new(Arc::new(pool.clone())));
    // Never started; only receives the invalidation on delete.
    let cache = Arc::new(ResolutionCache::new(config.cache_ttl(), clock.clone()));
    let service = LinkService::new(repository, cache, clock, &config.service_settings());

    match action {
        LinkAction::Create {
            url,
            slug,
            expires_in,
            params,
        } => create_link(&service, url, slug, expires_in, params).await,
        LinkAction::Show { id } => show_link(&service, id).await,
        LinkAction::Delete { id, yes } => delete_link(&service, id, yes).await,
    }
}

async fn create_link(
    service: &LinkService<PgLinkRepository>,
    url: String,
    slug: Option<String>,
    expires_in: Option<i64>,
    params: Vec<(String, String)>,
) -> Result<()> {
    println!("{}", "🔗 Create Short Link".bright_blue().bold());
    println!();

    let expires_at = match expires_in {
        Some(secs) => Some(
            TimeDelta::try_seconds(secs)
                .and_then(|delta| Utc::now().checked_add_signed(delta))
                .context("--expires-in is out of range")?,
        ),
        None => None,
    };

    let request = CreateLink {
        long_url: url,
        custom_slug: slug,
        expires_at,
        utm_params: collect_params(params)?,
    };

    let link = service
        .create_short_link(request)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create link: {}", e))?;

    println!("{}", "✅ Link created successfully!".green().bold());
    println!();
    print_link(service, &link);

    Ok(())
}

async fn show_link(service: &LinkService<PgLinkRepository>, id: i64) -> Result<()> {
    let link = service
        .get_link(id)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    print_link(service, &link);
    Ok(())
}

/// Deletes a link after confirmation (default: No).
async fn delete_link(
    service: &LinkService<PgLinkRepository>,
    id: i64,
    skip_confirm: bool,
) -> Result<()> {
    println!("{}", "🗑  Delete Short Link".bright_blue().bold());
    println!();

    let link = service
        .get_link(id)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    print_link(service, &link);

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete this link?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    service
        .delete_link(id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to delete link: {}", e))?;

    println!();
    println!("{}", "✅ Link deleted".green().bold());
    println!(
        "{}",
        "  Running servers may keep serving it from cache until the entry idles out.".bright_black()
    );
    println!();

    Ok(())
}

fn print_link(service: &LinkService<PgLinkRepository>, link: &Link) {
    let status = if service.is_expired(link) {
        "EXPIRED".red()
    } else {
        "ACTIVE".green()
    };

    println!("  ID:          {}", link.id.to_string().bright_black());
    println!("  Short URL:   {}", service.short_url(&link.code).bright_yellow().bold());
    println!("  Destination: {}", link.long_url.cyan());
    if let Some(expires_at) = link.expires_at {
        println!("  Expires:     {}", expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(params) = &link.utm_params {
        for (name, value) in params.iter() {
            println!("  Param:       {}={}", name.bright_white(), value);
        }
    }
    println!("  Clicks:      {}", link.click_count.to_string().bright_green());
    println!("  Status:      {}", status);
    println!();
}

/// Displays total links and clicks.
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let (links_count, clicks_count): (i64, i64) =
        sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(click_count), 0)::BIGINT FROM links")
            .fetch_one(pool)
            .await?;

    let expired_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM links WHERE expires_at <= NOW()")
            .fetch_one(pool)
            .await?;

    println!(
        "  Links:   {}",
        links_count.to_string().bright_green().bold()
    );
    println!(
        "  Expired: {}",
        expired_count.to_string().bright_green().bold()
    );
    println!(
        "  Clicks:  {}",
        clicks_count.to_string().bright_green().bold()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!();
        }
    }

    Ok(())
}

/// Builds the tracking parameters from repeated `--param` flags, rejecting
/// a key given twice as the HTTP API does.
fn collect_params(pairs: Vec<(String, String)>) -> Result<Option<TrackingParams>> {
    let mut params = TrackingParams::new();
    for (key, value) in pairs {
        if params.contains(&key) {
            anyhow::bail!("Duplicate tracking parameter '{key}'");
        }
        params.insert(key, value);
    }
    Ok((!params.is_empty()).then_some(params))
}

/// Parses a `KEY=VALUE` tracking parameter.
fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

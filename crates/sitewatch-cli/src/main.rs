use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use sitewatch_client::{ReqwestFetcher, SmtpMailer};
use sitewatch_core::config::{AppConfig, DEFAULT_CONFIG_PATH};
use sitewatch_core::{ExploreOutcome, SiteRegistry, TracingRunReporter, WatchService};
use sitewatch_db::{Database, DatabaseConfig, WatchRepository};

#[derive(Parser)]
#[command(
    name = "sitewatch",
    version,
    about = "Watch sites for new links and mail a notification for each one"
)]
#[command(group(ArgGroup::new("action").required(true).multiple(true)))]
struct Cli {
    /// Create the database schema if it does not exist
    #[arg(long, group = "action")]
    migrate: bool,

    /// Crawl every watched site, record new posts, and deliver pending mail
    #[arg(long, group = "action")]
    crawl: bool,

    /// Start watching a site
    #[arg(long, value_name = "URL", group = "action")]
    explore: Option<String>,

    /// Print every watched site
    #[arg(long, group = "action")]
    list: bool,

    /// With --list, also print the recorded posts of each site
    #[arg(long, requires = "list")]
    posts: bool,

    /// Stop watching a site and forget its posts
    #[arg(long, value_name = "URL", group = "action")]
    remove: Option<String>,

    /// Path to the YAML configuration (needed by --crawl)
    #[arg(long, env = "SITEWATCH_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so --list output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sitewatch=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = connect_db().await?;

    if cli.migrate {
        db.migrate().await.context("Failed to create the schema")?;
        tracing::info!("Schema ready");
    }

    if cli.crawl {
        cmd_crawl(&cli.config, db.watch_repo()).await?;
    }

    let registry = SiteRegistry::new(db.watch_repo());

    if let Some(url) = &cli.explore {
        cmd_explore(&registry, url).await?;
    }

    if cli.list {
        cmd_list(&registry, cli.posts).await?;
    }

    if let Some(url) = &cli.remove {
        registry
            .remove(url)
            .await
            .with_context(|| format!("Failed to remove {url}"))?;
    }

    Ok(())
}

/// Open the SQLite database named by DATABASE_URL.
async fn connect_db() -> Result<Database> {
    let config = DatabaseConfig::from_env().context("Invalid database configuration")?;
    Database::connect(&config)
        .await
        .with_context(|| format!("Failed to open database {}", config.url))
}

async fn cmd_crawl(config_path: &Path, repo: WatchRepository) -> Result<()> {
    let config = AppConfig::load(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    config.log_summary();

    let fetcher = ReqwestFetcher::with_timeout(config.crawl.fetch_timeout())
        .context("Failed to create HTTP client")?;
    let mailer = SmtpMailer::from_config(
        &config.server,
        &config.client,
        config.crawl.delivery_timeout(),
    )
    .context("Failed to configure SMTP transport")?;

    let service = WatchService::with_crawl_config(
        repo,
        fetcher,
        mailer,
        config.envelope(),
        config.crawl.crawl_config(),
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling run");
            shutdown.cancel();
        }
    });

    let summary = service
        .run(&cancel, &TracingRunReporter)
        .await
        .context("Crawl run failed")?;

    if summary.sites_failed > 0 || summary.mails_failed > 0 {
        tracing::warn!(
            sites_failed = summary.sites_failed,
            mails_failed = summary.mails_failed,
            "Run finished with failures; they will be retried next run"
        );
    }

    Ok(())
}

async fn cmd_explore(registry: &SiteRegistry<WatchRepository>, url: &str) -> Result<()> {
    let fetcher = ReqwestFetcher::new().context("Failed to create HTTP client")?;

    match registry
        .explore(&fetcher, url)
        .await
        .with_context(|| format!("Failed to explore {url}"))?
    {
        ExploreOutcome::Added { last_link } => {
            println!("Watching {url} (last link: {})", last_link.as_deref().unwrap_or("-"));
        }
        ExploreOutcome::AlreadyWatched => {
            println!("Already watching {url}");
        }
    }

    Ok(())
}

async fn cmd_list(registry: &SiteRegistry<WatchRepository>, with_posts: bool) -> Result<()> {
    let sites = registry.list().await.context("Failed to list sites")?;

    if !with_posts {
        for site in &sites {
            println!("{}", site.url);
        }
        return Ok(());
    }

    let posts = registry.posts().await.context("Failed to list posts")?;
    for site in &sites {
        println!("{}", site.url);
        for link in posts.get(&site.url).into_iter().flatten() {
            println!("  {link}");
        }
    }

    Ok(())
}

//! Seine main entry point
//!
//! This is the command-line interface for the Seine crawl engine.

use anyhow::Context;
use clap::Parser;
use seine::config::load_config_with_hash;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Seine: a policy-driven topic crawl engine
///
/// Seine runs bounded crawl campaigns over a shared worker pool. Fetches
/// are planned per domain (method, proxy, delay, retry budget), executed
/// over HTTP or a headless browser, and recorded against each campaign's
/// page budget.
#[derive(Parser, Debug)]
#[command(name = "seine")]
#[command(version = "0.6.0")]
#[command(about = "A policy-driven topic crawl engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Submit a campaign TOML file and run it to completion
    #[arg(long, value_name = "FILE", conflicts_with_all = ["job", "stats", "pause", "resume", "dry_run"])]
    submit: Option<PathBuf>,

    /// Run a one-off scrape job against this URL
    #[arg(long, value_name = "URL", requires = "project", conflicts_with_all = ["stats", "pause", "resume", "dry_run"])]
    job: Option<String>,

    /// Project name the job belongs to
    #[arg(long, value_name = "NAME", requires = "job")]
    project: Option<String>,

    /// JSON file of CSS extraction rules applied to the job's page
    #[arg(long, value_name = "FILE", requires = "job")]
    schema: Option<PathBuf>,

    /// Show statistics for a campaign and exit
    #[arg(long, value_name = "ID", conflicts_with_all = ["pause", "resume", "dry_run"])]
    stats: Option<i64>,

    /// Pause an active campaign and exit
    #[arg(long, value_name = "ID", conflicts_with_all = ["resume", "dry_run"])]
    pause: Option<i64>,

    /// Resume a paused campaign and run it to completion
    #[arg(long, value_name = "ID", conflicts_with = "dry_run")]
    resume: Option<i64>,

    /// Validate config and show what would run without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded (hash: {})", &config_hash[..12]);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if let Some(campaign_id) = cli.stats {
        handle_stats(&config, campaign_id)?;
    } else if let Some(campaign_id) = cli.pause {
        handle_pause(config, campaign_id)?;
    } else if let Some(campaign_id) = cli.resume {
        handle_resume(config, campaign_id).await?;
    } else if let Some(file) = &cli.submit {
        handle_submit(config, file).await?;
    } else if let Some(url) = &cli.job {
        let project = cli.project.as_deref().unwrap_or("default");
        handle_job(config, url, project, cli.schema.as_deref()).await?;
    } else {
        handle_run(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("seine=info,warn"),
            1 => EnvFilter::new("seine=debug,info"),
            2 => EnvFilter::new("seine=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &seine::config::Config) {
    println!("=== Seine Dry Run ===\n");

    println!("Workers:");
    println!("  Count: {}", config.worker.count);
    println!("  Queue redeliveries: {}", config.worker.queue_redeliveries);
    match config.worker.max_consecutive_failures {
        Some(threshold) => println!("  Failure threshold: {}", threshold),
        None => println!("  Failure threshold: off (campaigns never auto-fail)"),
    }

    println!("\nHTTP Transport:");
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  User agent: {}", config.http.user_agent);

    println!("\nBrowser Transport:");
    if config.browser.enabled {
        println!("  Enabled (headless: {})", config.browser.headless);
        println!(
            "  Navigation timeout: {}s",
            config.browser.navigation_timeout_secs
        );
        if !config.browser.chrome_args.is_empty() {
            println!("  Extra args: {}", config.browser.chrome_args.join(" "));
        }
    } else {
        println!("  Disabled (auto policies stay on HTTP)");
    }

    println!("\nProxy Endpoint:");
    if config.proxy.is_complete() {
        println!(
            "  {}:{} (credentialed)",
            config.proxy.host.as_deref().unwrap_or(""),
            config.proxy.port.unwrap_or(0)
        );
    } else {
        println!("  None configured");
    }

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Blobs: {}", config.storage.blob_path);

    if !config.block_markers.is_empty() {
        println!("\nExtra block markers ({}):", config.block_markers.len());
        for marker in &config.block_markers {
            println!("  - {}", marker);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows campaign statistics
fn handle_stats(config: &seine::config::Config, campaign_id: i64) -> anyhow::Result<()> {
    use seine::output::{load_campaign_stats, print_campaign_stats};
    use seine::storage::SqliteStorage;

    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
    let stats = load_campaign_stats(&storage, campaign_id)?;
    print_campaign_stats(&stats);

    Ok(())
}

/// Handles the --pause mode
fn handle_pause(config: seine::config::Config, campaign_id: i64) -> anyhow::Result<()> {
    use seine::crawler::CrawlRuntime;

    let runtime = CrawlRuntime::new(config)?;
    runtime.pause_campaign(campaign_id)?;
    println!("✓ Campaign {} paused", campaign_id);

    Ok(())
}

/// Handles the --resume mode: reactivates a campaign and drains it
async fn handle_resume(config: seine::config::Config, campaign_id: i64) -> anyhow::Result<()> {
    use seine::crawler::CrawlRuntime;
    use seine::output::{load_campaign_stats, print_campaign_stats};

    let runtime = CrawlRuntime::new(config)?;
    runtime.resume_campaign(campaign_id).await?;
    runtime.run_until_idle().await?;

    let storage = runtime.storage();
    let stats = {
        let store = storage.lock().unwrap();
        load_campaign_stats(&*store, campaign_id)?
    };
    print_campaign_stats(&stats);

    Ok(())
}

/// Handles the --submit mode: runs one campaign to quiescence
async fn handle_submit(config: seine::config::Config, file: &Path) -> anyhow::Result<()> {
    use seine::config::load_campaign_file;
    use seine::crawler::CrawlRuntime;
    use seine::output::{load_campaign_stats, print_campaign_stats};

    let campaign = load_campaign_file(file)
        .with_context(|| format!("failed to load campaign file {}", file.display()))?;
    tracing::info!(
        "Submitting campaign '{}' with {} seeds (budget {})",
        campaign.name,
        campaign.seeds.len(),
        campaign.max_pages
    );

    let runtime = CrawlRuntime::new(config)?;
    let campaign_id = runtime.submit_campaign(&campaign).await?;
    runtime.run_until_idle().await?;

    let storage = runtime.storage();
    let stats = {
        let store = storage.lock().unwrap();
        load_campaign_stats(&*store, campaign_id)?
    };
    print_campaign_stats(&stats);

    Ok(())
}

/// Handles the --job mode: runs a single-URL scrape job
async fn handle_job(
    config: seine::config::Config,
    url: &str,
    project: &str,
    schema_path: Option<&Path>,
) -> anyhow::Result<()> {
    use seine::crawler::CrawlRuntime;
    use seine::storage::Storage;

    let schema = match schema_path {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read schema file {}", path.display()))?,
        ),
        None => None,
    };

    let runtime = CrawlRuntime::new(config)?;
    let job_id = runtime.submit_job(project, url, schema.as_deref()).await?;
    runtime.run_until_idle().await?;

    let storage = runtime.storage();
    let job = {
        let store = storage.lock().unwrap();
        store.get_job(job_id)?
    };

    println!("=== Job {} ({}) ===\n", job.id, job.project);
    println!("URL: {}", job.url);
    println!("Status: {}", job.status);
    if let Some(status) = job.http_status {
        println!("HTTP status: {}", status);
    }
    if let Some(title) = &job.title {
        println!("Title: {}", title);
    }
    if let Some(path) = &job.blob_path {
        println!("Raw body: {}", path);
    }
    if let Some(extracted) = &job.extracted {
        println!("Extracted: {}", extracted);
    }
    if let Some(message) = &job.error_message {
        println!("Error: {}", message);
    }

    Ok(())
}

/// Handles the default mode: recover active campaigns and drain the queue
async fn handle_run(config: seine::config::Config) -> anyhow::Result<()> {
    use seine::crawler::CrawlRuntime;

    let runtime = CrawlRuntime::new(config)?;
    let resumed = runtime.resume_interrupted().await?;
    if resumed.is_empty() {
        tracing::info!("No interrupted campaigns to resume");
        return Ok(());
    }

    runtime.run_until_idle().await?;
    tracing::info!("Run complete");

    Ok(())
}

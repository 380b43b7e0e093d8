//! Fanout-Crawler main entry point
//!
//! This is the command-line interface for running, inspecting and aborting crawl jobs.

use anyhow::{bail, Context, Result};
use clap::Parser;
use fanout_crawler::config::{load_config_with_hash, Config};
use fanout_crawler::crawler::{
    build_http_client, ContentExtractor, CrawlEngine, CrawlTask, FsAttachmentStore,
    GenericExtractor, HttpRenderer, HttpSchemaExtractor, JobId, LocalExecutor,
};
use fanout_crawler::output::{print_report, write_markdown_report, write_results_jsonl};
use fanout_crawler::storage::{JobStateStore, SqliteKv};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Fanout-Crawler: a stateless fan-out web crawler
///
/// Every page is processed by an independent task that records its progress in a shared
/// SQLite store and schedules one new task per unvisited link.
#[derive(Parser, Debug)]
#[command(name = "fanout-crawler")]
#[command(version)]
#[command(about = "A stateless fan-out web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed URL (overrides `seed-url` in the config)
    #[arg(long)]
    url: Option<String>,

    /// Job id (defaults to $FANOUT_JOB_RUN_ID, else a generated `local-` id)
    #[arg(long)]
    job_id: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the job that would run without crawling
    #[arg(long, conflicts_with_all = ["stats", "abort"])]
    dry_run: bool,

    /// Show the persisted state of a job and exit
    #[arg(long, requires = "job_id", conflicts_with_all = ["dry_run", "abort"])]
    stats: bool,

    /// Mark a job as aborted; its remaining tasks skip without processing
    #[arg(long, requires = "job_id", conflicts_with_all = ["dry_run", "stats"])]
    abort: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let job_id = match &cli.job_id {
        Some(id) => JobId::new(id.clone()),
        None => JobId::from_env(),
    };

    if cli.dry_run {
        handle_dry_run(&config, cli.url.as_deref(), &job_id)?;
    } else if cli.stats {
        handle_stats(&config, &job_id).await?;
    } else if cli.abort {
        handle_abort(&config, &job_id).await?;
    } else {
        handle_crawl(config, config_hash, cli.url.as_deref(), job_id).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("fanout_crawler=info,warn"),
            1 => EnvFilter::new("fanout_crawler=debug,info"),
            2 => EnvFilter::new("fanout_crawler=trace,debug"),
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

/// Picks the seed URL: `--url` wins over the config
fn seed_url<'a>(config: &'a Config, cli_url: Option<&'a str>) -> Result<&'a str> {
    match cli_url.or(config.crawler.seed_url.as_deref()) {
        Some(url) => Ok(url),
        None => bail!("no seed URL: pass --url or set seed-url in [crawler]"),
    }
}

/// Handles the --dry-run mode: validates config and shows the resolved job
fn handle_dry_run(config: &Config, cli_url: Option<&str>, job_id: &JobId) -> Result<()> {
    let seed = seed_url(config, cli_url)?;
    let job_config = config.job_config().resolved_for_seed(seed);

    println!("=== Fanout-Crawler Dry Run ===\n");

    println!("Job:");
    println!("  Job ID: {}", job_id);
    println!("  Seed: {}", seed);
    println!("  Base domain: {}", job_config.base_domain);

    println!("\nResolved job configuration:");
    println!("{}", serde_json::to_string_pretty(&job_config)?);

    println!("\nExecutor:");
    println!("  Concurrency: {}", config.executor.concurrency);
    println!("  Task timeout: {}s", config.executor.task_timeout_secs);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nStore: {}", config.store.database_path);
    println!("Results: {}", config.output.results_path);
    println!("Summary: {}", config.output.summary_path);
    match &config.output.attachments_dir {
        Some(dir) => println!("Attachments: {}", dir),
        None => println!("Attachments: disabled"),
    }

    println!("\nStrategies ({}):", config.strategies.len());
    for entry in &config.strategies {
        println!("  - {:?} for {}", entry.kind, entry.pattern);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows the persisted state of one job
async fn handle_stats(config: &Config, job_id: &JobId) -> Result<()> {
    let kv = Arc::new(SqliteKv::new(Path::new(&config.store.database_path))?);
    let store = JobStateStore::new(kv.clone(), job_id.clone());

    println!("Database: {}\n", config.store.database_path);
    println!("=== Job {} ===\n", job_id);

    match store.get_config().await? {
        Some(job_config) => {
            println!("Configuration:");
            println!("{}", serde_json::to_string_pretty(&job_config)?);
        }
        None => println!("Configuration: (not stored; the job has not started)"),
    }

    let visited_prefix = store.visited_prefix();
    println!();
    println!("Pages counted: {}", store.page_count().await?);
    println!("URLs visited: {}", kv.count_prefix(&visited_prefix)?);
    println!("Aborted: {}", store.is_aborted().await?);

    Ok(())
}

/// Handles the --abort mode: sets the job's aborted flag
async fn handle_abort(config: &Config, job_id: &JobId) -> Result<()> {
    let kv = Arc::new(SqliteKv::new(Path::new(&config.store.database_path))?);
    let store = JobStateStore::new(kv, job_id.clone());

    store.abort().await?;

    println!("✓ Job {} marked as aborted", job_id);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: String,
    cli_url: Option<&str>,
    job_id: JobId,
) -> Result<()> {
    let seed = seed_url(&config, cli_url)?;
    let task = CrawlTask::seed(seed, job_id.clone(), config.job_config())
        .with_context(|| format!("invalid seed URL {}", seed))?;

    let backend = Arc::new(SqliteKv::new(Path::new(&config.store.database_path))?);
    let renderer = Arc::new(HttpRenderer::new(&config.user_agent)?);

    let mut generic = GenericExtractor::new();
    if let Some(endpoint) = &config.extraction.schema_endpoint {
        let client = build_http_client(&config.user_agent)?;
        generic = generic.with_schema_extractor(Arc::new(HttpSchemaExtractor::new(
            client,
            endpoint.clone(),
        )));
    }
    let fallback: Arc<dyn ContentExtractor> = Arc::new(generic);
    // Configured routes first, then the built-in job-posting route
    let strategies = config.strategy_table(fallback)?.with_job_postings()?;

    let mut engine = CrawlEngine::new(backend, renderer).with_strategies(strategies);
    if let Some(dir) = &config.output.attachments_dir {
        engine = engine.with_attachment_store(Arc::new(FsAttachmentStore::new(dir)));
    }

    tracing::info!(
        "Starting job {} from {} (max depth {}, max pages {}, concurrency {})",
        job_id,
        seed,
        config.crawler.max_depth,
        config.crawler.max_pages,
        config.executor.concurrency
    );

    let executor = LocalExecutor::new(engine, config.executor_options());
    let report = executor.run(task).await.with_config_hash(config_hash);

    let written = write_results_jsonl(&report, Path::new(&config.output.results_path))
        .with_context(|| format!("failed to write {}", config.output.results_path))?;
    tracing::info!("Wrote {} results to {}", written, config.output.results_path);

    write_markdown_report(&report, Path::new(&config.output.summary_path))
        .with_context(|| format!("failed to write {}", config.output.summary_path))?;
    tracing::info!("Wrote summary to {}", config.output.summary_path);

    if !report.is_clean() {
        tracing::warn!("{} tasks failed", report.failures.len());
    }
    print_report(&report);

    Ok(())
}

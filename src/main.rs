//! fileshare-observer - KPI gauges and an activity log for network file shares.
//!
//! Usage:
//!   fsobs [run] [ROOT]      Scan on a fixed interval and serve /metrics
//!   fsobs scan [ROOT]       Scan once and print the KPIs
//!   fsobs watch [ROOT]      Log file share activity only
//!   fsobs --help            Show help

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fileshare_observer_activity::{
    ActivityLog, ActivityLogger, ActivityWatcher, DEFAULT_LOG_FILE,
};
use fileshare_observer_core::ObserverConfig;
use fileshare_observer_metrics::{MetricsPublisher, render_text};
use fileshare_observer_scan::{AggregateScanner, FileStamp, ScanConfig, ScanResult};
use fileshare_observer_scheduler::ScanScheduler;

#[derive(Parser)]
#[command(
    name = "fileshare-observer",
    version,
    about = "Observability for network file shares",
    long_about = "fileshare-observer periodically scans a file share and publishes its \
                  directory count, file count, total size and oldest/newest files as \
                  Prometheus gauges. It can also log every change on the share.\n\n\
                  Without a subcommand it behaves like `run`."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Scan on a fixed interval and serve gauges at /metrics
    Run(RunArgs),

    /// Scan once and print the KPIs
    Scan {
        /// Share or directory to scan
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Number of oldest and newest files to show
        #[arg(short = 'k', long, default_value = "1")]
        top_k: usize,

        /// Only consider files whose name ends with this suffix for oldest/newest
        #[arg(short, long, default_value = "")]
        extension: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Log create/modify/delete/move activity only
    Watch {
        /// Share or directory to watch
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Append-only activity log
        #[arg(short, long, default_value = DEFAULT_LOG_FILE)]
        log: PathBuf,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Share or directory to observe (overrides scan.root from the config file)
    root: Option<PathBuf>,

    /// Config file (defaults to <config dir>/fileshare-observer/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds from the start of one scan to the start of the next
    #[arg(short, long)]
    interval: Option<u64>,

    /// Number of oldest and newest files to retain
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// File name suffix for the oldest/newest selections
    #[arg(short, long)]
    extension: Option<String>,

    /// Address of the /metrics endpoint
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Also log file share activity to this file
    #[arg(long)]
    activity_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Some(Command::Run(args)) => run_observer(load_config(&args)?).await?,
        Some(Command::Scan {
            root,
            top_k,
            extension,
            format,
        }) => run_scan(&root, top_k, &extension, format).await?,
        Some(Command::Watch { root, log }) => run_watch(&root, &log).await?,
        None => run_observer(load_config(&cli.run)?).await?,
    }

    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Token cancelled on Ctrl-C.
fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                token.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for Ctrl-C"),
        }
    });
    cancel
}

/// Merge the config file with command line overrides.
fn load_config(args: &RunArgs) -> Result<ObserverConfig> {
    let from_file = match &args.config {
        Some(path) => Some(
            ObserverConfig::load(path)
                .wrap_err_with(|| format!("Failed to load config {}", path.display()))?,
        ),
        None => match ObserverConfig::default_path() {
            Some(path) if path.exists() => Some(
                ObserverConfig::load(&path)
                    .wrap_err_with(|| format!("Failed to load config {}", path.display()))?,
            ),
            _ => None,
        },
    };

    let mut config = match (from_file, &args.root) {
        (Some(mut config), Some(root)) => {
            config.scan.root = root.clone();
            config
        }
        (Some(config), None) => config,
        (None, Some(root)) => ObserverConfig::new(root),
        (None, None) => bail!("Nothing to observe: pass ROOT or set scan.root in a config file"),
    };

    if let Some(interval) = args.interval {
        config.interval_secs = interval;
    }
    if let Some(top_k) = args.top_k {
        config.scan.top_k = top_k;
    }
    if let Some(extension) = &args.extension {
        config.scan.extension_filter = extension.clone();
    }
    if let Some(listen) = args.listen {
        config.metrics.listen = listen;
    }
    if let Some(log_path) = &args.activity_log {
        config.activity.enabled = true;
        config.activity.log_path = log_path.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Scheduler, metrics endpoint and (optionally) the activity logger, until Ctrl-C.
async fn run_observer(config: ObserverConfig) -> Result<()> {
    let cancel = shutdown_token();
    let publisher = Arc::new(MetricsPublisher::with_standard_gauges());

    let listener = TcpListener::bind(config.metrics.listen)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", config.metrics.listen))?;
    info!(listen = %config.metrics.listen, "serving /metrics");
    let server = tokio::spawn(serve_metrics(
        listener,
        Arc::clone(&publisher),
        cancel.clone(),
    ));

    let activity = if config.activity.enabled {
        let events = ActivityWatcher::start(&config.scan.root)?.into_stream();
        let logger = ActivityLogger::new(ActivityLog::open(&config.activity.log_path)?);
        Some(logger.spawn(events, cancel.clone()))
    } else {
        None
    };

    let scheduler = ScanScheduler::new(
        AggregateScanner::new(config.scan.clone()),
        Arc::clone(&publisher),
        config.interval(),
    );
    let state = scheduler.run(cancel.clone()).await;

    server.await?.wrap_err("Metrics endpoint failed")?;
    // A logger failure was already reported when it happened; scanning
    // carries on without it.
    if let Some(activity) = activity {
        if let Ok(written) = activity.await? {
            info!(records = written, "activity log closed");
        }
    }

    info!(
        cycles = state.cycles,
        failures = state.failures,
        "observer stopped"
    );
    Ok(())
}

async fn serve_metrics(
    listener: TcpListener,
    publisher: Arc<MetricsPublisher>,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(publisher);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}

async fn metrics_handler(State(publisher): State<Arc<MetricsPublisher>>) -> Response {
    match render_text(&publisher) {
        Ok(text) => (
            [(header::CONTENT_TYPE, fileshare_observer_metrics::CONTENT_TYPE)],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "cannot encode gauges");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Run one scan and print the KPIs.
async fn run_scan(root: &Path, top_k: usize, extension: &str, format: OutputFormat) -> Result<()> {
    let config = ScanConfig::builder()
        .root(root)
        .top_k(top_k)
        .extension_filter(extension)
        .build()
        .wrap_err("Invalid scan configuration")?;

    eprintln!("Scanning {}...", root.display());

    let cancel = shutdown_token();
    let scanner = AggregateScanner::new(config);
    let result = tokio::task::spawn_blocking(move || scanner.scan(&cancel))
        .await?
        .wrap_err("Scan failed")?;

    match format {
        OutputFormat::Text => print_summary(&result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    Ok(())
}

/// Log activity under `root` until Ctrl-C.
async fn run_watch(root: &Path, log: &Path) -> Result<()> {
    let events = ActivityWatcher::start(root)
        .wrap_err_with(|| format!("Cannot watch {}", root.display()))?
        .into_stream();
    let mut logger = ActivityLogger::new(ActivityLog::open(log)?);

    eprintln!(
        "Logging activity under {} to {} (Ctrl-C to stop)",
        root.display(),
        log.display()
    );

    let written = logger.run(events, shutdown_token()).await?;
    eprintln!("{written} record(s) written");
    Ok(())
}

fn print_summary(result: &ScanResult) {
    println!();
    println!("{}", "─".repeat(60));
    println!(
        " {} - {}",
        result.root.display(),
        format_size(result.total_size_bytes)
    );
    println!(
        " {} files, {} directories ({} entries)",
        result.file_count, result.directory_count, result.total_entries
    );
    println!(" Scanned in {:.2}s", result.duration().as_secs_f64());
    println!("{}", "─".repeat(60));

    print_files("Oldest", &result.oldest_files);
    print_files("Newest", &result.newest_files);

    if result.has_errors() {
        println!();
        println!("{} entr(ies) skipped:", result.error_count);
        for warning in result.warnings.iter().take(10) {
            println!("  {:?}  {}", warning.kind, warning.message);
        }
        if result.error_count > 10 {
            println!("  ...");
        }
    }
}

fn print_files(label: &str, files: &[FileStamp]) {
    if files.is_empty() {
        return;
    }
    println!();
    println!(" {label}:");
    for file in files {
        let modified: DateTime<Local> = file.modified.into();
        println!(
            "  {}  {:>10}  {}",
            modified.format("%Y-%m-%d %H:%M:%S"),
            format_size(file.size),
            file.path.display()
        );
    }
}

fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

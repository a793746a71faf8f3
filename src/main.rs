//! Rico - Storage Infrastructure Autoscaler
//!
//! Driver binary for the reconciliation engine. Runs the manager against
//! the in-memory fake providers, either interactively (simulator shell), as
//! a one-shot batch command, as a single reconcile pass, or on a ticker
//! with optional health/metrics endpoints.

use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rico::{
    Class, Config, Error, FakeCloudProvider, FakeStorageProvider, Manager, Result, Shell,
    Topology,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Rico - watermark-driven autoscaler for cloud-backed storage fleets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file holding the initial class list
    #[arg(long, env = "RICO_CLASSES")]
    classes: Option<PathBuf>,

    /// Reconcile continuously at this interval in seconds; 0 disables
    #[arg(long, env = "RICO_INTERVAL", default_value = "0")]
    interval_secs: u64,

    /// Run a single reconcile pass and exit
    #[arg(long)]
    once: bool,

    /// Serve /healthz and /metrics on this address in ticker mode
    #[arg(long, env = "RICO_METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RICO_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "RICO_LOG_JSON")]
    log_json: bool,

    /// Batch command to run instead of the interactive shell
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args);

    if let Err(e) = run(args).await {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(args.classes.as_deref())?;

    let cloud = Arc::new(FakeCloudProvider::new());
    let storage = Arc::new(FakeStorageProvider::new(Topology::default()));
    let manager = Arc::new(Manager::new(config, cloud, storage.clone())?);
    let shell = Shell::new(manager.clone(), storage);

    if !args.command.is_empty() {
        let argv: Vec<&str> = args.command.iter().map(String::as_str).collect();
        let output = shell.execute(&argv).await?;
        if !output.is_empty() {
            println!("{output}");
        }
        return Ok(());
    }

    if args.once {
        return manager.reconcile().await;
    }

    if args.interval_secs > 0 {
        return run_ticker(manager, &args).await;
    }

    shell.run_interactive().await
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let data = std::fs::read_to_string(path)?;
            let classes: Vec<Class> = serde_json::from_str(&data)?;
            Config::new(classes)
        }
        None => Ok(Config::empty()),
    }
}

// =============================================================================
// Ticker Mode
// =============================================================================

async fn run_ticker(manager: Arc<Manager>, args: &Args) -> Result<()> {
    info!(
        "starting rico {} - reconciling every {}s",
        rico::VERSION,
        args.interval_secs
    );

    if let Some(addr) = args.metrics_addr.clone() {
        let manager = manager.clone();
        tokio::spawn(async move {
            if let Err(e) = run_observability_server(&addr, manager).await {
                error!("observability server error: {e}");
            }
        });
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs));
    loop {
        ticker.tick().await;
        if let Err(e) = manager.reconcile().await {
            // A fresh snapshot gets another chance on the next tick
            error!(retryable = e.is_retryable(), "reconcile failed: {e}");
        }
    }
}

// =============================================================================
// Observability Server
// =============================================================================

async fn run_observability_server(addr: &str, manager: Arc<Manager>) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};
    use prometheus::{Encoder, TextEncoder};

    let registry = manager.metrics().registry().clone();

    let make_svc = make_service_fn(move |_conn| {
        let registry = registry.clone();
        async move {
            Ok::<_, std::convert::Infallible>(service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                async move {
                    let response = match req.uri().path() {
                        "/healthz" | "/livez" => Response::builder()
                            .status(StatusCode::OK)
                            .body(Body::from("ok"))
                            .unwrap(),
                        "/metrics" => {
                            let encoder = TextEncoder::new();
                            let mut buffer = Vec::new();
                            encoder.encode(&registry.gather(), &mut buffer).unwrap();

                            Response::builder()
                                .status(StatusCode::OK)
                                .header("Content-Type", encoder.format_type())
                                .body(Body::from(buffer))
                                .unwrap()
                        }
                        _ => Response::builder()
                            .status(StatusCode::NOT_FOUND)
                            .body(Body::from("not found"))
                            .unwrap(),
                    };
                    Ok::<_, std::convert::Infallible>(response)
                }
            }))
        }
    });

    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Internal(format!("invalid metrics address: {e}")))?;

    info!("observability server listening on {addr}");
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("observability server error: {e}")))?;

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use scout_domain::SearchParams;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod config;
mod shutdown;

use app::Application;
use config::AppConfig;
use shutdown::ShutdownManager;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("scout")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Product discovery and scoring pipeline for resale research")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .default_value("info"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("Log output format")
                .value_parser(["json", "pretty"])
                .default_value("pretty"),
        )
        .subcommand(
            Command::new("serve").about("Run the pipeline workers until interrupted"),
        )
        .subcommand(
            search_args(Command::new("campaign"))
                .about("Run a full discovery campaign to completion"),
        )
        .subcommand(
            search_args(Command::new("search"))
                .about("Run a single search round and exit"),
        )
        .subcommand_required(true)
        .get_matches();

    let log_level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    let log_format = matches
        .get_one::<String>("log-format")
        .map(String::as_str)
        .unwrap_or("pretty");
    init_logging(log_level, log_format)?;

    let config_path = matches.get_one::<String>("config").map(String::as_str);
    let config = AppConfig::load(config_path).context("failed to load configuration")?;

    let app = Arc::new(Application::new(config).await?);
    let shutdown_manager = ShutdownManager::new();

    let mut run_handle = {
        let app = Arc::clone(&app);
        let shutdown_rx = shutdown_manager.subscribe().await;

        match matches.subcommand() {
            Some(("serve", _)) => tokio::spawn(async move {
                if let Err(e) = app.serve(shutdown_rx).await {
                    error!("Pipeline failed: {e}");
                }
            }),
            Some(("campaign", sub)) => {
                let params = parse_search_params(sub);
                tokio::spawn(async move {
                    match app.run_campaign(params, shutdown_rx).await {
                        Ok(outcome) => info!(
                            "Campaign {} ended {:?}: {} qualifying product(s) in {} iteration(s)",
                            outcome.campaign_id,
                            outcome.status,
                            outcome.collected,
                            outcome.iterations
                        ),
                        Err(e) => error!("Campaign failed: {e}"),
                    }
                })
            }
            Some(("search", sub)) => {
                let params = parse_search_params(sub);
                tokio::spawn(async move {
                    if let Err(e) = app.run_search(params, shutdown_rx).await {
                        error!("Search failed: {e}");
                    }
                })
            }
            _ => unreachable!("subcommand is required"),
        }
    };

    tokio::select! {
        _ = wait_for_shutdown_signal() => {
            info!("Shutdown signal received");
            shutdown_manager.shutdown().await;
            if let Err(e) = tokio::time::timeout(Duration::from_secs(30), run_handle).await {
                warn!("Shutdown timed out: {e}");
            }
        }
        result = &mut run_handle => {
            if let Err(e) = result {
                error!("Pipeline task panicked: {e}");
            }
        }
    }

    info!("scout exited");
    Ok(())
}

fn search_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("keywords")
                .short('k')
                .long("keywords")
                .value_name("WORDS")
                .help("Search keywords")
                .required(true),
        )
        .arg(
            Arg::new("category")
                .long("category")
                .value_name("NAME")
                .help("Restrict results to a category"),
        )
        .arg(
            Arg::new("min-price")
                .long("min-price")
                .value_name("PRICE")
                .value_parser(clap::value_parser!(f64))
                .help("Minimum listing price"),
        )
        .arg(
            Arg::new("max-price")
                .long("max-price")
                .value_name("PRICE")
                .value_parser(clap::value_parser!(f64))
                .help("Maximum listing price"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_name("N")
                .value_parser(clap::value_parser!(u32))
                .help("Listing URLs to collect per source"),
        )
}

fn parse_search_params(matches: &ArgMatches) -> SearchParams {
    let mut params = SearchParams::new(
        matches
            .get_one::<String>("keywords")
            .map(String::as_str)
            .unwrap_or_default(),
    );
    params.category = matches.get_one::<String>("category").cloned();
    params.min_price = matches.get_one::<f64>("min-price").copied();
    params.max_price = matches.get_one::<f64>("max-price").copied();
    if let Some(limit) = matches.get_one::<u32>("limit") {
        params.limit = *limit;
    }
    params
}

fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("failed to initialise JSON logging")?,
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
            .context("failed to initialise logging")?,
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

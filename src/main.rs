//! Main entry point for the Anteroom matchmaking service
//!
//! This is the production entry point that initializes and runs the
//! matchmaking engine together with its health and metrics endpoints,
//! with proper error handling, logging, and graceful shutdown.

use anteroom::config::{validate_config, AppConfig};
use anteroom::service::{AppState, HealthCheck, HealthStatus};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Anteroom Matchmaking Service - queue sweeping and private rooms
#[derive(Parser)]
#[command(
    name = "anteroom",
    version,
    about = "An in-process matchmaking engine with a waiting queue and private rooms",
    long_about = "Anteroom groups waiting participants into matches by shared criteria on a \
                 periodic sweep, bot-fills or times out groups that wait too long, and manages \
                 host-controlled private rooms joined by six-digit codes."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Perform health check and exit
    #[arg(long, help = "Perform a health check and exit with status code")]
    health_check: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Health port override
    #[arg(long, value_name = "PORT", help = "Override health and metrics port")]
    health_port: Option<u16>,

    /// Minimum wait override
    #[arg(long, value_name = "SECONDS", help = "Override the settling period before matching")]
    min_wait: Option<u64>,

    /// Maximum wait override
    #[arg(long, value_name = "SECONDS", help = "Override the wait before bot fill or timeout")]
    max_wait: Option<u64>,

    /// Sweep interval override
    #[arg(long, value_name = "MS", help = "Override the sweep interval in milliseconds")]
    sweep_interval_ms: Option<u64>,

    /// Disable bot fill
    #[arg(long, help = "Time out under-full groups instead of bot-filling them")]
    no_bot_fill: bool,

    /// Disable shuffling
    #[arg(long, help = "Pair participants in arrival order")]
    no_shuffle: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Start the service briefly, run a full health check and exit with its status
async fn perform_health_check(config: AppConfig) -> Result<()> {
    info!("Performing health check...");

    let app_state = Arc::new(AppState::new(config)?);
    app_state.matchmaker().start()?;
    tokio::time::sleep(app_state.config().sweep_interval() * 2).await;
    app_state.matchmaker().run_sweep()?;

    let health = HealthCheck::check(app_state.clone()).await;
    app_state.matchmaker().stop().await;

    match health {
        Ok(health) => {
            println!("Health Check: {}", health.status);
            for check in &health.checks {
                println!(
                    "  {}: {}{}",
                    check.name,
                    check.status,
                    check
                        .message
                        .as_ref()
                        .map(|m| format!(" ({})", m))
                        .unwrap_or_default()
                );
            }
            println!("  Sweeps run: {}", health.stats.sweeps_run);

            // The probe never marks the service itself running
            let engine_ok = health
                .checks
                .iter()
                .filter(|c| c.name != "service_running")
                .all(|c| c.status == HealthStatus::Healthy);
            std::process::exit(if engine_ok { 0 } else { 1 });
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 Anteroom Matchmaking Service v{}", anteroom::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Health port: {}", config.service.health_port);
    info!(
        "   Wait window: {}s - {}s",
        config.matchmaking.minimum_wait_time_seconds, config.matchmaking.maximum_wait_time_seconds
    );
    info!("   Sweep interval: {}ms", config.matchmaking.sweep_interval_ms);
    info!("   Shuffle players: {}", config.matchmaking.shuffle_players);
    info!("   Bot fill: {}", config.matchmaking.enable_bot_fill);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from file or environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(health_port) = args.health_port {
        config.service.health_port = health_port;
    }

    if let Some(min_wait) = args.min_wait {
        config.matchmaking.minimum_wait_time_seconds = min_wait;
    }

    if let Some(max_wait) = args.max_wait {
        config.matchmaking.maximum_wait_time_seconds = max_wait;
    }

    if let Some(sweep_interval_ms) = args.sweep_interval_ms {
        config.matchmaking.sweep_interval_ms = sweep_interval_ms;
    }

    if args.no_bot_fill {
        config.matchmaking.enable_bot_fill = false;
    }

    if args.no_shuffle {
        config.matchmaking.shuffle_players = false;
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    // Handle special modes
    if args.health_check {
        return perform_health_check(config).await;
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let app_state = match AppState::new(config.clone()) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    info!("✅ Anteroom Matchmaking Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");

    let shutdown_timeout = config.shutdown_timeout();
    match tokio::time::timeout(shutdown_timeout, app_state.shutdown()).await {
        Ok(Ok(())) => info!("✅ Graceful shutdown completed successfully"),
        Ok(Err(e)) => error!("Shutdown completed with errors: {}", e),
        Err(_) => warn!("⚠️  Shutdown timeout exceeded, forcing exit"),
    }

    info!("🛑 Anteroom Matchmaking Service stopped");
    Ok(())
}

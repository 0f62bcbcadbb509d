//! webhelm - resilient browser sessions for tool-calling agents.
//!
//! Loads the configuration, installs logging, builds the shared browser
//! context, registers the browser tools and serves them on a line-oriented
//! console over stdin/stdout.

mod cli;
mod console;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use webhelm_browser::driver::cdp::CdpLauncher;
use webhelm_browser::driver::fixture::FixtureLauncher;
use webhelm_browser::{BrowserContext, BrowserLauncher, register_tools, spawn_idle_reaper};
use webhelm_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use webhelm_core::{Dispatcher, ToolRegistry};

use crate::cli::{Cli, Driver};

/// How often the idle reaper checks the session.
const REAPER_INTERVAL: Duration = Duration::from_secs(5);

/// Get the ~/.webhelm directory path.
fn webhelm_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".webhelm"))
        .unwrap_or_else(|| PathBuf::from(".webhelm"))
}

/// Load the configuration: an explicit path must exist, the default path is
/// optional.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => ConfigLoader::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let default_path = webhelm_dir().join("config.toml");
            if default_path.exists() {
                ConfigLoader::load(&default_path).with_context(|| {
                    format!("Failed to load config from {}", default_path.display())
                })?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

/// Initialize tracing with console (stderr) and daily-rolling file output.
fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = if config.file_enabled {
        std::fs::create_dir_all(&config.dir)
            .with_context(|| format!("Failed to create log directory {}", config.dir))?;
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("webhelm")
            .filename_suffix("log")
            .max_log_files(14)
            .build(&config.dir)
            .context("Failed to create log file appender")?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Keeps the writer flushing until exit.
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        // stdout belongs to the console protocol.
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

fn build_launcher(cli: &Cli, config: &Config) -> Result<Arc<dyn BrowserLauncher>> {
    let launcher: Arc<dyn BrowserLauncher> = match cli.driver {
        Driver::Cdp => Arc::new(CdpLauncher::new(Duration::from_millis(
            config.session.operation_timeout_ms,
        ))),
        Driver::Fixture => match &cli.fixture_dir {
            Some(dir) => Arc::new(FixtureLauncher::from_dir(dir).with_context(|| {
                format!("Failed to load fixture pages from {}", dir.display())
            })?),
            None => Arc::new(FixtureLauncher::new()),
        },
    };
    Ok(launcher)
}

/// Wire the context, registry and dispatcher together.
fn build_dispatcher(context: Arc<BrowserContext>) -> Result<Dispatcher> {
    let registry = Arc::new(ToolRegistry::new());
    register_tools(&registry, context.clone()).context("Failed to register browser tools")?;
    info!("Registered {} tools", registry.len());
    Ok(Dispatcher::new(registry, context))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(headless) = cli.headless {
        config.browser.headless = headless;
    }

    init_tracing(&config.logging)?;
    info!("Starting webhelm v{}", env!("CARGO_PKG_VERSION"));

    let warnings = ConfigValidator::validate(&config)
        .into_result()
        .context("Invalid configuration")?;
    for warning in warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }

    let launcher = build_launcher(&cli, &config)?;
    let context = Arc::new(BrowserContext::new(config, launcher));
    let dispatcher = build_dispatcher(context.clone())?;
    let reaper = spawn_idle_reaper(context.clone(), REAPER_INTERVAL);

    info!("Console ready ({:?} driver); one `<tool> <json>` per line", cli.driver);
    tokio::select! {
        result = console::run(&dispatcher, tokio::io::stdin(), tokio::io::stdout()) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    reaper.abort();
    if context.close().await {
        info!("Browser session closed on exit");
    }
    Ok(())
}

use clap::{Parser, ValueEnum};
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;
use trendtui::api::HttpBackend;
use trendtui::app::App;
use trendtui::config::Config;
use trendtui::tui::Tui;

/// Terminal editor for time-series tables, with plotting and correlation
/// analysis against a remote data service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable file logging at the given level (overrides RUST_LOG)
    #[arg(long = "logging", value_enum)]
    logging: Option<LogLevel>,
    /// Path to a config file (overrides default config discovery)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
    /// Base URL of the data service (supports sub-path deployments,
    /// e.g. https://host/epsilon)
    #[arg(long = "base-url", default_value = "http://127.0.0.1:5000")]
    base_url: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cwd = std::env::current_dir()?;
    let log_path = cwd.join("trendtui.log");
    let level = match args.logging {
        Some(LogLevel::Error) => Some(tracing::Level::ERROR),
        Some(LogLevel::Warn) => Some(tracing::Level::WARN),
        Some(LogLevel::Info) => Some(tracing::Level::INFO),
        Some(LogLevel::Debug) => Some(tracing::Level::DEBUG),
        Some(LogLevel::Trace) => Some(tracing::Level::TRACE),
        None => Some(tracing::Level::WARN),
    };
    trendtui::logging::init_with(Some(log_path), level)?;

    let config = Config::from_path(args.config.as_ref())?;
    let backend = HttpBackend::new(&args.base_url)?;
    info!("starting against {}", args.base_url);

    let mut tui = Tui::new()?;
    let mut app = App::new(config, args.config.clone(), backend);
    let result = app.run(&mut tui).await;
    tui.exit()?;
    result
}

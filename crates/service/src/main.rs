use std::path::PathBuf;

use advisor_service::{start_server, AppState, LogFormat, PredictionService, ServiceConfig, UnknownCategoryMode};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "advisor-service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "HTTP prediction service for the product advisor", long_about = None)]
struct Cli {
    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen host
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory holding model.json, encoders.json and manifest.json
    #[arg(long)]
    artifact_dir: Option<PathBuf>,

    /// How answers never seen during training are handled (reject | sentinel)
    #[arg(long, value_parser = parse_mode)]
    unknown_category: Option<UnknownCategoryMode>,

    /// Code substituted for unknown answers in sentinel mode
    #[arg(long, allow_hyphen_values = true)]
    sentinel_value: Option<i64>,

    /// Load artifacts on the first request instead of at startup
    #[arg(long)]
    no_preload: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format (pretty | compact)
    #[arg(long, value_parser = parse_format)]
    log_format: Option<LogFormat>,
}

fn parse_mode(value: &str) -> Result<UnknownCategoryMode, String> {
    match value {
        "reject" => Ok(UnknownCategoryMode::Reject),
        "sentinel" => Ok(UnknownCategoryMode::Sentinel),
        other => Err(format!("expected `reject` or `sentinel`, got `{other}`")),
    }
}

fn parse_format(value: &str) -> Result<LogFormat, String> {
    match value {
        "pretty" => Ok(LogFormat::Pretty),
        "compact" => Ok(LogFormat::Compact),
        other => Err(format!("expected `pretty` or `compact`, got `{other}`")),
    }
}

impl Cli {
    fn apply(self, mut config: ServiceConfig) -> ServiceConfig {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dir) = self.artifact_dir {
            config.artifact_dir = dir;
        }
        if let Some(mode) = self.unknown_category {
            config.unknown_category = mode;
        }
        if let Some(value) = self.sentinel_value {
            config.sentinel_value = value;
        }
        if self.no_preload {
            config.preload = false;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServiceConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let config = cli.apply(config);
    config.validate()?;

    init_logging(&config);

    info!("Product Advisor Service v{}", env!("CARGO_PKG_VERSION"));
    info!("Artifact directory: {}", config.artifact_dir.display());
    info!("Unknown categories: {:?}", config.policy());

    let service = PredictionService::new(&config.artifact_dir, config.policy());
    if config.preload {
        match service.model_info() {
            Ok(model) => info!(
                "Model loaded: {} features, {} classes, hash {}",
                model.features, model.classes, model.model_hash
            ),
            Err(err) => warn!("Artifacts not loaded at startup, will retry on first request: {}", err),
        }
    }

    let state = AppState::new(service, config.allowed_origins.clone());
    start_server(state, &config.bind_address()).await
}

fn init_logging(config: &ServiceConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
    }
}

mod config_commands;

use std::path::PathBuf;

use {
    anyhow::{Context, bail},
    clap::{ArgAction, Parser, Subcommand, builder::BoolishValueParser},
    marketbot_config::{BotConfig, ValidationResult},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "marketbot", about = "Messenger assistant for small marketplace sellers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config and `PORT`).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Config file to load instead of discovering one.
    #[arg(long, global = true, env = "MARKETBOT_CONFIG")]
    config: Option<PathBuf>,
    /// Refuse to start when the configuration has errors.
    #[arg(
        long,
        global = true,
        env = "EXIT_ON_MISSING_CONFIG",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server (default when no subcommand is provided).
    Serve,
    /// Validate the configuration and report errors/warnings.
    CheckConfig,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<BotConfig> {
    let mut config = marketbot_config::load(cli.config.as_deref()).with_context(|| {
        match &cli.config {
            Some(path) => format!("failed to load {}", path.display()),
            None => "failed to load config".to_string(),
        }
    })?;

    // CLI args override config values
    if let Some(bind) = &cli.bind {
        config.server.bind.clone_from(bind);
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

fn log_diagnostics(result: &ValidationResult) {
    for d in &result.diagnostics {
        warn!(path = %d.path, severity = %d.severity, "{}", d.message);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = load_config(&cli)?;
    let report = marketbot_config::validate(&config);

    match cli.command {
        Some(Commands::CheckConfig) => {
            config_commands::print_report(&report);
            if report.has_errors() {
                bail!("configuration has errors");
            }
            Ok(())
        },
        // Default: start the server when no subcommand is provided
        None | Some(Commands::Serve) => {
            info!(version = env!("CARGO_PKG_VERSION"), "marketbot starting");
            log_diagnostics(&report);
            if report.has_errors() {
                if cli.strict {
                    bail!("refusing to start with configuration errors");
                }
                warn!("starting with incomplete configuration");
            }
            marketbot_gateway::start_server(config).await?;
            Ok(())
        },
    }
}

//! quick-mouse - phone motion mouse server
//!
//! Entry point for the server binary.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

use quick_mouse::config::{Config, LoggingConfig};
use quick_mouse::server::QuickMouseServer;

/// Command-line arguments for quick-mouse
#[derive(Parser, Debug)]
#[command(name = "quick-mouse")]
#[command(version, about = "Phone motion mouse server", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Listen address
    #[arg(short, long, env = "QUICK_MOUSE_LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Listen port (overrides the port in listen_addr)
    #[arg(short, long, env = "QUICK_MOUSE_PORT")]
    pub port: Option<u16>,

    /// Pointer backend (auto|uinput|automation)
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    /// Write logs to file (in addition to stdout)
    #[arg(long)]
    pub log_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logging settings live in the config, so load it first
    let loaded = Config::load(&args.config);
    let logging = match &loaded {
        Ok(config) => config.logging.clone(),
        Err(_) => LoggingConfig::default(),
    };
    let _log_guards = init_logging(&args, &logging)?;

    info!("════════════════════════════════════════════════════════");
    info!("  quick-mouse v{}", env!("CARGO_PKG_VERSION"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");

    quick_mouse::utils::log_startup_diagnostics();

    let config = loaded.or_else(|e| {
        tracing::warn!("Failed to load config: {:#}, using defaults", e);
        Config::default_config()
    })?;

    // Override config with CLI args
    let config = config
        .with_overrides(args.listen.clone(), args.port)
        .with_backend(args.backend.clone());

    if let Err(e) = config.validate() {
        eprintln!("{}", quick_mouse::utils::format_user_error(&e));
        return Err(e);
    }

    info!("Configuration loaded successfully");
    tracing::debug!("Config: {:?}", config);

    let server = match QuickMouseServer::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", quick_mouse::utils::format_user_error(&e));
            return Err(e);
        }
    };

    info!("Starting quick-mouse server");
    if let Err(e) = server.run().await {
        eprintln!("{}", quick_mouse::utils::format_user_error(&e));
        return Err(e);
    }

    info!("quick-mouse shut down");
    Ok(())
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer<W>(format: &str, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);

    match format {
        "json" => layer.json().boxed(),
        "compact" => layer.compact().boxed(),
        _ if ansi => layer.pretty().boxed(),
        _ => layer.boxed(),
    }
}

/// Install the global subscriber
///
/// The returned guards flush the file writers and must live until exit.
fn init_logging(args: &Args, logging: &LoggingConfig) -> Result<Vec<WorkerGuard>> {
    use std::fs::File;

    let log_level = match args.verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Request traces from tower-http at info, per-packet detail stays in quick_mouse
        tracing_subscriber::EnvFilter::new(format!(
            "quick_mouse={level},tower_http=info,warn",
            level = log_level
        ))
    });

    let mut layers = vec![fmt_layer(&args.log_format, std::io::stdout, true)];
    let mut guards = Vec::new();

    if let Some(log_file_path) = &args.log_file {
        let file = File::create(log_file_path)
            .with_context(|| format!("Failed to create log file {}", log_file_path))?;
        let (writer, guard) = tracing_appender::non_blocking(file);
        layers.push(fmt_layer(&args.log_format, writer, false));
        guards.push(guard);
    }

    if let Some(log_dir) = &logging.log_dir {
        let appender = tracing_appender::rolling::daily(log_dir, "quick-mouse.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(fmt_layer(&args.log_format, writer, false));
        guards.push(guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    if let Some(log_file_path) = &args.log_file {
        info!("Logging to file: {}", log_file_path);
    }
    if let Some(log_dir) = &logging.log_dir {
        info!("Logging to directory: {:?}", log_dir);
    }

    Ok(guards)
}

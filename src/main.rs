use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::future::try_join_all;
use prism_client::{Config, PrismClient, WaitConfig};
use reqwest::Method;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line client for Prism APIs
#[derive(Parser, Debug)]
#[command(name = "prism", version, about, long_about = None)]
struct Args {
    /// Prism endpoint host (overrides NUTANIX_ENDPOINT)
    #[arg(long)]
    host: Option<String>,

    /// Prism endpoint port (overrides NUTANIX_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Username (overrides NUTANIX_USERNAME)
    #[arg(short, long)]
    username: Option<String>,

    /// Password (overrides NUTANIX_PASSWORD)
    #[arg(short, long)]
    password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// GET a path relative to the API root and print the JSON response
    Get {
        /// e.g. `clusters/0005-...` or an absolute URL
        path: String,
    },
    /// Wait for one or more tasks to finish
    Wait {
        /// Task UUIDs
        #[arg(required = true)]
        tasks: Vec<String>,

        /// Overall timeout in seconds
        #[arg(long, default_value_t = 600)]
        timeout: u64,

        /// Seconds between polls
        #[arg(long, default_value_t = 3)]
        interval: u64,

        /// Also accept DELETE_PENDING as an intermediate status
        #[arg(long)]
        delete: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("prism started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("prism-client").join("prism.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".prism-client").join("prism.log");
    }
    PathBuf::from("prism.log")
}

/// Config file, then environment, then flags
fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env()?;

    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(username) = &args.username {
        config.username = username.clone();
    }
    if let Some(password) = &args.password {
        config.password = password.clone();
    }
    if args.insecure {
        config.insecure = true;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let config = resolve_config(&args)?;
    tracing::info!("Using endpoint {}:{}", config.host, config.port);

    let client = PrismClient::json(&config).context("Failed to create Prism client")?;

    match &args.command {
        Command::Get { path } => {
            let request = client.new_request::<()>("get", Method::GET, path, None)?;
            let value: serde_json::Value = client.send(&request).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Wait {
            tasks,
            timeout,
            interval,
            delete,
        } => {
            let timeout = Duration::from_secs(*timeout);
            let wait = if *delete {
                WaitConfig::for_delete(timeout)
            } else {
                WaitConfig::for_create(timeout)
            };
            let wait = wait.with_min_interval(Duration::from_secs(*interval));

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_ctrl_c.cancel();
                }
            });

            let finished = try_join_all(
                tasks
                    .iter()
                    .map(|uuid| client.wait_for_task(uuid, &wait, &cancel)),
            )
            .await?;

            for task in finished {
                println!("{} {}", task.uuid, task.status);
            }
        }
    }

    Ok(())
}

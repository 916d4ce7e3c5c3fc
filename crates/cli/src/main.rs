use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use docshift_core::metrics::encode_metrics;
use docshift_core::{load_config, validate_config, ConversionJob, ConverterRegistry, Discovery};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "usage: docshift [<source> <target>]";

/// What the invocation asked for.
enum Command {
    /// Print the loaded converters.
    List,
    /// Convert one document.
    Convert { source: PathBuf, target: PathBuf },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = parse_args(std::env::args().skip(1).collect())?;

    // Determine config path
    let config_path = std::env::var("DOCSHIFT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("docshift {} loading configuration from {:?}", VERSION, config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Base directory: {:?}", config.base_dir);
    info!("Process timeout: {:?}", config.process_timeout());

    std::fs::create_dir_all(&config.base_dir)
        .with_context(|| format!("Failed to create base directory {:?}", config.base_dir))?;

    // Discover converters; any failure here aborts startup
    let registry = Discovery::builtin()
        .load(&config.converters, &config.base_dir, config.process_timeout())
        .context("Failed to load external converters")?;

    let outcome = match command {
        Command::List => {
            for name in registry.names() {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Convert { source, target } => convert(&registry, &source, &target).await,
    };

    info!("Shutting down converters...");
    registry.shutdown_all().await;

    if config.metrics.report_on_exit {
        print!("{}", encode_metrics());
    }

    outcome
}

fn parse_args(args: Vec<String>) -> Result<Command> {
    match args.as_slice() {
        [] => Ok(Command::List),
        [source, target] => Ok(Command::Convert {
            source: std::path::absolute(source)
                .with_context(|| format!("Invalid source path {:?}", source))?,
            target: std::path::absolute(target)
                .with_context(|| format!("Invalid target path {:?}", target))?,
        }),
        _ => bail!(USAGE),
    }
}

async fn convert(registry: &ConverterRegistry, source: &Path, target: &Path) -> Result<()> {
    let job = ConversionJob::from_paths(Uuid::new_v4().to_string(), source, target)
        .with_context(|| {
            format!(
                "Cannot detect document types of {} -> {}",
                source.display(),
                target.display()
            )
        })?;

    // Ctrl+C or SIGTERM stops waiting on the native tool
    let interrupt = CancellationToken::new();
    let job = job.with_interrupt(interrupt.clone());
    let watcher = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Interrupt received, abandoning conversion");
        interrupt.cancel();
    });

    let result = registry.convert(job).await;
    watcher.abort();

    let result = result.context("Conversion failed")?;
    println!(
        "{}",
        serde_json::to_string(&result).context("Failed to encode conversion result")?
    );
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_args_lists() {
        assert!(matches!(parse_args(vec![]).unwrap(), Command::List));
    }

    #[test]
    fn test_parse_two_args_converts() {
        let command = parse_args(vec!["a.md".to_string(), "b.html".to_string()]).unwrap();
        match command {
            Command::Convert { source, target } => {
                assert!(source.is_absolute());
                assert!(target.ends_with("b.html"));
            }
            Command::List => panic!("expected convert"),
        }
    }

    #[test]
    fn test_parse_one_arg_fails() {
        let err = parse_args(vec!["a.md".to_string()]).err().unwrap();
        assert_eq!(err.to_string(), USAGE);
    }
}

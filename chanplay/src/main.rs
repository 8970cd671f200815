//! chanplay - Main entry point
//!
//! Line-driven front end for the sound channel manager: reads commands from
//! stdin, prints their results on stdout and every outbound sound event as a
//! JSON line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chanplay::cli::LineCommand;
use chanplay::config::{Config, ConfigOverrides};
use chanplay::playback::TokenTable;
use chanplay::{Error, SoundService};
use chanplay_common::config::TomlConfig;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for chanplay
#[derive(Parser, Debug)]
#[command(name = "chanplay")]
#[command(about = "Multi-channel sound manager driven by line commands")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "CHANPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Folder bundled assets resolve against
    #[arg(short, long, env = "CHANPLAY_ASSETS_ROOT")]
    assets_root: Option<PathBuf>,

    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(short, long, env = "CHANPLAY_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing; RUST_LOG wins, otherwise the filter follows the
    // configured log level once the config file has been read
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) = reload::Layer::new(
        env_filter.unwrap_or_else(|| level_filter(args.log_level.as_deref().unwrap_or("info"))),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting chanplay v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_toml(
        TomlConfig::load_or_default(args.config.as_deref()),
        ConfigOverrides {
            assets_root: args.assets_root.clone(),
            log_level: args.log_level.clone(),
        },
    );
    if !from_env {
        filter_handle
            .reload(level_filter(&config.log_level))
            .context("Failed to apply configured log level")?;
    }
    if let Some(root) = &config.assets_root {
        info!("Assets root: {}", root.display());
    }

    let factory = config.build_decoder_factory(tokio::runtime::Handle::current());
    let (handle, mut events) = SoundService::spawn(factory, config.registry);
    let tokens = Arc::new(Mutex::new(TokenTable::<String>::new()));

    // Event printer: frees returned tokens and echoes each event as JSON
    let printer_tokens = Arc::clone(&tokens);
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            printer_tokens.lock().await.apply(&event);
            match serde_json::to_string(&event) {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Failed to serialize {} event: {}", event.event_type(), e),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = &mut shutdown => break,
        };
        let Some(line) = line else {
            info!("End of input");
            break;
        };
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let command = match line.parse::<LineCommand>() {
            Ok(command) => command,
            Err(e) => {
                warn!("{}", e);
                println!("false");
                continue;
            }
        };
        if command == LineCommand::Quit {
            break;
        }

        match command.execute(&handle, &tokens).await {
            Ok(output) => println!("{}", output),
            Err(Error::ServiceStopped) => {
                error!("Sound service stopped unexpectedly");
                break;
            }
            Err(e) => {
                warn!("{}", e);
                println!("false");
            }
        }
    }

    handle.shutdown().await.context("Failed to stop sound service")?;
    drop(handle);
    printer.await.context("Event printer failed")?;

    let leaked = tokens.lock().await.len();
    if leaked > 0 {
        warn!("{} callback tokens never returned", leaked);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Filter for our own crates at `level`
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("chanplay={0},chanplay_common={0}", level))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

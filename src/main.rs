mod app;
mod commands;
mod event;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use labq::config::Config;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "labq")]
#[command(about = "A terminal client for laboratory work queues")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/labq/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Screen to open at startup (requests, samples, results, ...)
  #[arg(short, long)]
  screen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let config = match args.screen {
    Some(screen) => Config {
      default_screen: Some(screen),
      ..config
    },
    None => config,
  };

  // The terminal belongs to the UI, so logs go to a file
  let _guard = init_logging()?;

  let mut app = app::App::new(config)?;
  app.run().await
}

/// Log to $XDG_DATA_HOME/labq/labq.log, filtered by LABQ_LOG (default "info").
fn init_logging() -> Result<WorkerGuard> {
  let dir = Config::data_dir()?;
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::never(&dir, "labq.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_env("LABQ_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();
  Ok(guard)
}

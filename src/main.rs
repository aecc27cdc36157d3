mod api;
mod app;
mod cache;
mod commands;
mod config;
mod event;
mod format;
mod logging;
mod query;
mod session;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "qrdash")]
#[command(about = "A terminal dashboard for QR code contacts, audit logs and scan analytics")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/qrdash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Log filter, e.g. "debug" or "qrdash=trace" (overridden by QRDASH_LOG)
  #[arg(short, long)]
  log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;

  // Command line wins over the config file
  let level = args.log_level.or_else(|| config.log_level.clone());
  let _log_guard = logging::init_logging(level.as_deref())?;

  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}

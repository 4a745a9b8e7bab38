mod cache;
mod commands;
mod config;
mod dns;
mod logging;
mod registry;
mod resources;
mod scheduler;

use clap::Parser;
use color_eyre::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::dns::{Dispatcher, DnsServer};
use crate::registry::Registry;
use crate::resources::HttpClient;
use crate::scheduler::Scheduler;

#[derive(Parser, Debug)]
#[command(name = "sol-dns")]
#[command(about = "Solana network statistics over DNS TXT records")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./sol-dns.yaml, then $XDG_CONFIG_HOME/sol-dns/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Address to listen on, overriding server.bind
  #[arg(short, long)]
  bind: Option<SocketAddr>,

  /// Log level or filter directives; RUST_LOG takes precedence
  #[arg(long, default_value = "info")]
  log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;
  if let Some(bind) = args.bind {
    config.server.bind = bind;
  }

  let _log_guard = logging::init_logging(&args.log_level, config.log.file.as_deref())?;
  config.log_source();
  info!(bind = %config.server.bind, "Configuration loaded");

  let api_key = Config::get_api_key();
  if api_key.is_none() {
    warn!("SOL_DNS_API_KEY is not set; authenticated resources will fail to refresh");
  }
  let client = HttpClient::new(&config.http, api_key)?;

  let registry = Arc::new(Registry::from_config(&config, client)?);
  info!(resources = registry.resources().count(), "Resources registered");

  let scheduler = Scheduler::start(&registry);
  info!(timers = scheduler.task_count(), "Scheduler started");
  let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry), &config.server));
  let server = DnsServer::bind(config.server.bind, dispatcher).await?;

  tokio::select! {
    result = server.run() => result?,
    signal = tokio::signal::ctrl_c() => {
      signal?;
      info!("Shutting down");
    }
  }

  scheduler.shutdown().await;
  Ok(())
}

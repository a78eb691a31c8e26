mod cache;
mod chat;
mod config;
mod error;
mod gomanage;
mod server;
#[cfg(test)]
mod test_support;

use clap::Parser;
use color_eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gomanage-gateway")]
#[command(about = "HTTP gateway for the GoManage ERP API")]
#[command(version)]
struct Args {
  /// Port to listen on
  #[arg(short, long, default_value_t = 8080)]
  port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
  tracing_subscriber::fmt().with_env_filter(filter).init();

  let args = Args::parse();
  let config = config::Config::from_env()?;
  info!(
    "GoManage gateway starting: upstream={}, port={}, session_ttl={}s",
    config.base_url, args.port, config.session_ttl_secs
  );

  server::run(config, args.port).await
}

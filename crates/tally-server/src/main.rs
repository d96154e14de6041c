//! tally-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), layers `TALLY_*`
//! environment variables on top, opens the SQLite ledger and serves the
//! JSON API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use tally_core::store::InvoiceStore;
use tally_server::ServerConfig;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tally invoice ledger server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Write the sample invoice under INV0 before serving.
  #[arg(long)]
  init_ledger: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TALLY"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let ledger = tally_server::open_ledger(&server_cfg)
    .await
    .with_context(|| format!("failed to open ledger at {:?}", server_cfg.store_path))?;
  let store = Arc::new(InvoiceStore::with_config(ledger, server_cfg.store_config()));

  if cli.init_ledger {
    let tx_id = store
      .init_ledger()
      .await
      .context("failed to seed the ledger")?;
    tracing::info!(%tx_id, "seeded sample invoice");
  }

  let app = tally_server::app(store);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

//! Server wiring for Tally: configuration, ledger opening and the HTTP app.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use serde::Deserialize;
use tally_core::{
  ledger::Ledger,
  store::{InvoiceStore, MissingKeyPolicy, StoreConfig},
};
use tally_store_sqlite::SqliteLedger;
use tower_http::trace::TraceLayer;

/// Store path that selects an in-memory database.
pub const IN_MEMORY: &str = ":memory:";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `TALLY_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub page_size:          usize,
  pub missing_key_policy: MissingKeyPolicy,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_string(),
      port:               7054,
      store_path:         PathBuf::from("~/.local/share/tally/ledger.db"),
      page_size:          SqliteLedger::DEFAULT_PAGE_SIZE,
      missing_key_policy: MissingKeyPolicy::default(),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn store_config(&self) -> StoreConfig {
    StoreConfig { missing_key: self.missing_key_policy }
  }
}

// ─── Startup ──────────────────────────────────────────────────────────────────

/// Open the SQLite ledger named by `config.store_path`.
pub async fn open_ledger(config: &ServerConfig) -> tally_store_sqlite::Result<SqliteLedger> {
  let ledger = if config.store_path.as_os_str() == IN_MEMORY {
    SqliteLedger::open_in_memory().await?
  } else {
    let path = expand_tilde(&config.store_path);
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
      && let Err(e) = std::fs::create_dir_all(parent)
    {
      tracing::warn!(path = %parent.display(), error = %e, "could not create store directory");
    }
    SqliteLedger::open(&path).await?
  };
  Ok(ledger.with_page_size(config.page_size))
}

/// The API router with request tracing.
pub fn app<L>(store: Arc<InvoiceStore<L>>) -> Router
where
  L: Ledger + 'static,
{
  tally_api::api_router(store).layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

//! `tally`: command-line client for a running Tally server.
//!
//! # Usage
//!
//! ```text
//! tally invoke newInvoice INV1 1 Acme 2024-01-01 1000 Widgets N N 0 N 0
//! tally invoke isGoodsReceived INV1 Y
//! tally get INV1
//! tally list --start INV0 --end INV999
//! tally --url http://ledger:7054 history INV1
//! ```

mod client;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::ApiClient;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:7054";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tally", about = "Command-line client for the Tally invoice ledger")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the tally server (default: http://localhost:7054).
  #[arg(long, env = "TALLY_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
  /// Invoke a named command with positional string arguments.
  Invoke {
    function: String,
    #[arg(allow_hyphen_values = true)]
    args:     Vec<String>,
  },
  /// Print the record stored under a key.
  Get { key: String },
  /// Store a raw JSON record under a key.
  Put {
    key:    String,
    /// JSON document; read from this file when prefixed with `@`.
    record: String,
  },
  /// List records, optionally restricted to `[start, end)`.
  List {
    #[arg(long, requires = "end")]
    start: Option<String>,
    #[arg(long, requires = "start")]
    end:   Option<String>,
  },
  /// Print every committed write to a key, oldest first.
  History { key: String },
  /// Find records whose `field` equals `value`.
  Query { field: String, value: String },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flag / env override the config file, which overrides the default.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| DEFAULT_URL.to_string());
  let client = ApiClient::new(&base_url)?;

  let output = match args.command {
    Cmd::Invoke { function, args } => client.invoke(&function, &args).await?,
    Cmd::Get { key } => client.get(&key).await?,
    Cmd::Put { key, record } => client.put(&key, read_record(record)?).await?,
    Cmd::List { start, end } => match (start.as_deref(), end.as_deref()) {
      (Some(start), Some(end)) => client.list(Some((start, end))).await?,
      _ => client.list(None).await?,
    },
    Cmd::History { key } => client.history(&key).await?,
    Cmd::Query { field, value } => client.query(&field, &value).await?,
  };

  if let Some(value) = output {
    println!("{}", serde_json::to_string_pretty(&value)?);
  }
  Ok(())
}

/// `@path` reads the record from a file; anything else is the record itself.
fn read_record(arg: String) -> Result<String> {
  match arg.strip_prefix('@') {
    Some(path) => {
      std::fs::read_to_string(path).with_context(|| format!("reading record file {path}"))
    }
    None => Ok(arg),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn invoke_accepts_hyphenated_arguments() {
    let args =
      Args::try_parse_from(["tally", "invoke", "isPaidToSupplier", "INV0", "-5", "Y"]).unwrap();
    let Cmd::Invoke { function, args } = args.command else { panic!("expected invoke") };
    assert_eq!(function, "isPaidToSupplier");
    assert_eq!(args, ["INV0", "-5", "Y"]);
  }

  #[test]
  fn list_range_needs_both_bounds() {
    assert!(Args::try_parse_from(["tally", "list", "--start", "INV0"]).is_err());
    assert!(Args::try_parse_from(["tally", "list", "--start", "A", "--end", "B"]).is_ok());
  }

  #[test]
  fn inline_record_is_passed_through() {
    assert_eq!(read_record(r#"{"gr":"Y"}"#.into()).unwrap(), r#"{"gr":"Y"}"#);
  }
}

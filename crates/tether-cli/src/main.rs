//! `tether` — browse nearby venues from the terminal.
//!
//! Pages through the explore feed around a location, caching everything in a
//! local SQLite file so the last results stay available offline.
//!
//! # Usage
//!
//! ```
//! tether --lat 35.7 --lng 51.4
//! tether --config ~/.config/tether/config.toml --store /tmp/venues.db
//! ```
//!
//! Settings are read from the config file, then `TETHER_*` environment
//! variables (nested keys joined with `__`, e.g. `TETHER_REMOTE__CLIENT_ID`),
//! then flags.

mod app;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use serde::Deserialize;
use tether_core::pagination::PaginationConfig;
use tether_remote::RemoteConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tether", version, about = "Browse nearby venues with an offline cache")]
struct Cli {
  /// Path to a TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "tether.toml")]
  config: PathBuf,

  /// SQLite cache file.
  #[arg(long, value_name = "PATH")]
  store: Option<String>,

  /// Latitude to explore around.
  #[arg(long, allow_negative_numbers = true)]
  lat: Option<f64>,

  /// Longitude to explore around.
  #[arg(long, allow_negative_numbers = true)]
  lng: Option<f64>,
}

// ─── Settings ─────────────────────────────────────────────────────────────────

/// Everything the binary needs, after layering file, environment and flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub store_path: PathBuf,
  pub lat:        f64,
  pub lng:        f64,
  pub pagination: PaginationConfig,
  pub remote:     RemoteConfig,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("~/.cache/tether/venues.db"),
      lat:        35.7006,
      lng:        51.4014,
      pagination: PaginationConfig::default(),
      remote:     RemoteConfig::default(),
    }
  }
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.as_path()).required(false))
    .add_source(
      config::Environment::with_prefix("TETHER")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .set_override_option("store_path", cli.store.clone())?
    .set_override_option("lat", cli.lat)?
    .set_override_option("lng", cli.lng)?
    .build()
    .context("failed to read configuration")?;

  settings
    .try_deserialize()
    .context("failed to deserialise settings")
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so they don't interleave with the listing on stdout.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let mut settings = load_settings(&cli)?;
  settings.store_path = expand_tilde(&settings.store_path);

  if settings.remote.client_id.is_empty() {
    tracing::warn!("no remote.client_id configured; the venue API will reject requests");
  }

  let app = app::App::open(&settings).await?;
  app.run().await
}

/// Expand a leading `~/` using `$HOME`.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

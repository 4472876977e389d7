//! orbit-api server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the JSON API over HTTP.
//!
//! # Tenant provisioning
//!
//! Tenants are created out-of-band, never through the authenticated API:
//!
//! ```
//! cargo run -p orbit-api --bin server -- --create-tenant ada@example.com
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use orbit_api::{AppState, ServerConfig};
use orbit_core::{
  policy::{CascadePolicy, StorePolicy},
  store::RecordStore as _,
};
use orbit_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Orbit CRM API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create a tenant with this email, print its API key, and exit.
  #[arg(long, value_name = "EMAIL")]
  create_tenant: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ORBIT"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  let policy = StorePolicy {
    cascade: if server_cfg.detach_on_contact_delete {
      CascadePolicy::DetachDeals
    } else {
      CascadePolicy::DeleteDeals
    },
    ..StorePolicy::default()
  };

  // Open SQLite store.
  let store = SqliteStore::open_with(&store_path, policy)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: provision a tenant and exit.
  if let Some(email) = cli.create_tenant {
    let (tenant, key) = store
      .create_tenant(email)
      .await
      .context("failed to create tenant")?;
    println!("tenant:  {}", tenant.id);
    println!("api key: {}", key.as_str());
    return Ok(());
  }

  let state = AppState { store: Arc::new(store) };
  let app = orbit_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

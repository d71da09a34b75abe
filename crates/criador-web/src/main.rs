//! criador-web server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `CRIADOR_*` environment variables, opens the SQLite store, seeds the
//! configured breeds and serves the HTTP API.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use criador_core::store::ProfileRepository as _;
use criador_store_sqlite::SqliteStore;
use criador_web::{AppState, ServerConfig, attachments::FsAttachmentStore, notify::LogNotifier};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Criador breeder registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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
    .add_source(
      config::Environment::with_prefix("CRIADOR")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("seed_breeds"),
    )
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  for name in &server_cfg.seed_breeds {
    let breed = store
      .create_breed(name.trim().to_owned())
      .await
      .with_context(|| format!("failed to seed breed {name:?}"))?;
    tracing::debug!(breed_id = breed.id, name = %breed.name, "breed available");
  }

  let attachments_dir = expand_tilde(&server_cfg.attachments_dir);
  tokio::fs::create_dir_all(&attachments_dir)
    .await
    .with_context(|| format!("failed to create {attachments_dir:?}"))?;

  let state = AppState {
    store:       Arc::new(store),
    attachments: Arc::new(FsAttachmentStore::new(attachments_dir)),
    notifier:    Arc::new(LogNotifier),
    settings:    Arc::new(server_cfg.onboarding_settings()),
  };

  let app = criador_web::router(state);
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

//! Darasa HTTP server: configuration loading and application assembly.
//!
//! The binary in `main.rs` wires these together with a SQLite store.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use darasa_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Prefix for environment overrides, e.g. `DARASA_PORT=9000`.
pub const ENV_PREFIX: &str = "DARASA";

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
  config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("store_path", "~/.local/share/darasa/darasa.db")
}

/// Layer defaults, the optional TOML file at `path`, and `DARASA_*`
/// environment variables, in increasing precedence.
pub fn load_config(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  builder()?
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix(ENV_PREFIX))
    .build()?
    .try_deserialize()
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

// ─── Application ──────────────────────────────────────────────────────────────

/// The full application: the JSON API under `/api`, with request tracing.
pub fn app(store: SqliteStore) -> Router {
  Router::new()
    .nest("/api", darasa_api::api_router(Arc::new(store)))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn defaults_apply_without_a_config_file() {
    let cfg: ServerConfig = builder()
      .unwrap()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert!(cfg.store_path.ends_with("darasa.db"));
  }

  #[test]
  fn toml_values_override_defaults() {
    let cfg: ServerConfig = builder()
      .unwrap()
      .add_source(config::File::from_str(
        "port = 9100\nstore_path = \"/srv/darasa.db\"",
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.port, 9100);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.store_path, PathBuf::from("/srv/darasa.db"));
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/darasa.db")),
      PathBuf::from(home).join("darasa.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }

  #[tokio::test]
  async fn api_is_mounted_under_api() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let app = app(store);

    let req = Request::builder().uri("/api/schools/1").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder().uri("/schools/1").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}

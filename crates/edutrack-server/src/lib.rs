//! HTTP server wiring for EduTrack: configuration and the top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use edutrack_core::store::SchoolStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `EDUTRACK_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:          String,
  #[serde(default = "default_port")]
  pub port:          u16,
  pub database_path: PathBuf,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `EDUTRACK_*` variables.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("EDUTRACK"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
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

// ─── Router ───────────────────────────────────────────────────────────────────

/// The JSON API mounted under `/api`, with request tracing.
pub fn router<S>(store: Arc<S>) -> Router
where
  S: SchoolStore + 'static,
{
  Router::new()
    .nest("/api", edutrack_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{body::Body, http::{Request, StatusCode}};
  use edutrack_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/edutrack.db")),
      PathBuf::from(home).join("edutrack.db")
    );
    assert_eq!(expand_tilde(Path::new("/var/db")), PathBuf::from("/var/db"));
  }

  #[test]
  fn config_file_fills_defaults() {
    let dir = std::env::temp_dir().join(format!("edutrack-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.toml");
    std::fs::write(&path, "database_path = \"/tmp/edutrack.db\"\nport = 9000\n").unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.database_path, PathBuf::from("/tmp/edutrack.db"));
    assert_eq!(cfg.address(), "127.0.0.1:9000");

    std::fs::remove_dir_all(&dir).ok();
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let req = Request::builder()
      .uri("/api/roadmap/progress")
      .header("x-actor-id", "6f1b7a5e-1f0a-4a4e-9a53-0d2b4f1c9e10")
      .header("x-actor-role", "student")
      .body(Body::empty())
      .unwrap();

    let resp = router(store).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["total"], 0);
    assert_eq!(body["percentage"], 0.0);
  }
}

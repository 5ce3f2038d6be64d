use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

/// One request line on stdin: `{"id": ..., "method": ..., "params": {...}}`.
#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything the daemon holds between requests: the selected workspace and
/// its open database, nothing else. Day records live in the database only.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}

use chrono::NaiveDate;
use rusqlite::Connection;

use super::error::err;
use super::types::{AppState, Request};

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first"))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key)))
}

/// Dates cross the boundary as YYYY-MM-DD strings; everything past this
/// check can assume they parse.
pub fn required_date(req: &Request, key: &str) -> Result<NaiveDate, serde_json::Value> {
    let raw = required_str(req, key)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| err(&req.id, "bad_params", format!("{} must be YYYY-MM-DD", key)))
}

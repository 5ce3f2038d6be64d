use chrono::{Datelike, NaiveDate};
use serde_json::{json, Value};

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_date, required_str};
use crate::ipc::types::{AppState, Request};
use crate::record::SCHEDULE_HOURS;
use crate::store::{RecordStore, SqliteDayStore};

/// Day-of-year block the planner page header renders.
fn date_stats(date: NaiveDate) -> Value {
    let days_in_year = NaiveDate::from_ymd_opt(date.year(), 12, 31)
        .map(|d| d.ordinal())
        .unwrap_or(365);
    json!({
        "dayOfYear": date.ordinal(),
        "daysInYear": days_in_year,
        "daysRemaining": days_in_year.saturating_sub(date.ordinal()),
        "weekOfYear": date.iso_week().week(),
        "weekday": date.format("%A").to_string(),
    })
}

fn handle_day_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let owner = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let date = match required_date(req, "date") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let date_str = date.format("%Y-%m-%d").to_string();

    let records = RecordStore::new(SqliteDayStore::new(conn));
    match records.load(&owner, &date_str) {
        Ok(day) => ok(
            &req.id,
            json!({
                "date": date_str,
                "day": day,
                "stats": date_stats(date),
                "scheduleHours": SCHEDULE_HOURS,
            }),
        ),
        Err(e) => err(&req.id, "db_read_failed", e.to_string()),
    }
}

fn handle_day_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let owner = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let date = match required_date(req, "date") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let date_str = date.format("%Y-%m-%d").to_string();

    // Absent patch means "persist the canonical form of whatever is there".
    let patch = req.params.get("patch").cloned().unwrap_or_else(|| json!({}));
    if !patch.is_object() {
        return err(&req.id, "bad_params", "patch must be an object");
    }

    let mut records = RecordStore::new(SqliteDayStore::new(conn));
    match records.merge_and_save(&owner, &date_str, &patch) {
        Ok(day) => ok(&req.id, json!({ "date": date_str, "day": day })),
        Err(e) => err(&req.id, "db_write_failed", e.to_string()),
    }
}

fn handle_day_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let owner = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let date = match required_date(req, "date") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let date_str = date.format("%Y-%m-%d").to_string();

    let mut records = RecordStore::new(SqliteDayStore::new(conn));
    match records.clear(&owner, &date_str) {
        Ok(day) => ok(&req.id, json!({ "date": date_str, "day": day })),
        Err(e) => err(&req.id, "db_write_failed", e.to_string()),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "day.load" => Some(handle_day_load(state, req)),
        "day.save" => Some(handle_day_save(state, req)),
        "day.clear" => Some(handle_day_clear(state, req)),
        _ => None,
    }
}

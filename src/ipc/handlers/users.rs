use crate::auth;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use rusqlite::{params, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn user_json(id: &str, email: &str, name: &str) -> serde_json::Value {
    json!({ "id": id, "email": email, "name": name })
}

/// Upsert-by-email login. An unknown email creates the account on the spot;
/// a password is optional both at creation and afterwards. When the account
/// has a hash and the caller sent a password, the password must match —
/// otherwise identification is by email alone, which is all the original
/// product ever enforced.
fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let email = match req.params.get("email").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_ascii_lowercase(),
        None => return err(&req.id, "bad_params", "missing email"),
    };
    if email.is_empty() {
        return err(&req.id, "bad_params", "email must not be empty");
    }
    let name = req
        .params
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    let password = req
        .params
        .get("password")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty());

    let existing = match conn
        .query_row(
            "SELECT id, email, name, password_hash FROM users WHERE email = ?",
            [&email],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string()),
    };

    if let Some((id, email, name, stored_hash)) = existing {
        if let (Some(hash), Some(password)) = (stored_hash.as_deref(), password) {
            if !auth::verify_password(password, hash) {
                return err(&req.id, "invalid_credentials", "wrong password");
            }
        }
        return ok(&req.id, json!({ "user": user_json(&id, &email, &name) }));
    }

    let password_hash = match password.map(auth::hash_password).transpose() {
        Ok(v) => v,
        Err(e) => return err(&req.id, "hash_failed", e.to_string()),
    };
    let user_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO users(id, email, name, password_hash, created_at) VALUES(?, ?, ?, ?, ?)",
        params![user_id, email, name, password_hash, db::now_ts()],
    ) {
        return err(&req.id, "db_insert_failed", e.to_string());
    }
    ok(
        &req.id,
        json!({ "user": user_json(&user_id, &email, &name), "created": true }),
    )
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match conn
        .query_row(
            "SELECT id, email, name FROM users WHERE id = ?",
            [&user_id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                ))
            },
        )
        .optional()
    {
        Ok(Some((id, email, name))) => ok(&req.id, json!({ "user": user_json(&id, &email, &name) })),
        Ok(None) => err(&req.id, "not_found", "user not found"),
        Err(e) => err(&req.id, "db_query_failed", e.to_string()),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.login" => Some(handle_login(state, req)),
        "users.get" => Some(handle_get(state, req)),
        _ => None,
    }
}

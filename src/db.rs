use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("planner.sqlite3");
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL DEFAULT '',
            password_hash TEXT,
            created_at TEXT
        )",
        [],
    )?;

    // owner is an opaque identifier resolved by the UI layer; it is not
    // required to reference a row in users.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS days(
            owner TEXT NOT NULL,
            date TEXT NOT NULL,
            record TEXT NOT NULL DEFAULT '{}',
            updated_at TEXT,
            PRIMARY KEY(owner, date)
        )",
        [],
    )?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_days_owner ON days(owner)", [])?;

    // Workspaces from before the single-blob day shape stored notes and the
    // tracker payload as separate columns. Fold them into record if needed.
    ensure_days_record(&conn)?;

    Ok(conn)
}

/// Raw stored blob for `(owner, date)`, or None when the day was never saved.
pub fn day_get_raw(conn: &Connection, owner: &str, date: &str) -> anyhow::Result<Option<Vec<u8>>> {
    let raw = conn
        .query_row(
            "SELECT record FROM days WHERE owner = ? AND date = ?",
            [owner, date],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(raw.map(String::into_bytes))
}

/// Whole-value write for `(owner, date)`, replacing any prior blob.
pub fn day_put_raw(conn: &Connection, owner: &str, date: &str, raw: &[u8]) -> anyhow::Result<()> {
    let record = std::str::from_utf8(raw)?;
    conn.execute(
        "INSERT INTO days(owner, date, record, updated_at) VALUES(?, ?, ?, ?)
         ON CONFLICT(owner, date) DO UPDATE SET
            record = excluded.record,
            updated_at = excluded.updated_at",
        rusqlite::params![owner, date, record, now_ts()],
    )?;
    Ok(())
}

pub fn now_ts() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

fn ensure_days_record(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "days", "record")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE days ADD COLUMN record TEXT NOT NULL DEFAULT '{}'",
        [],
    )?;

    if !table_has_column(conn, "days", "notes")? || !table_has_column(conn, "days", "tracker")? {
        return Ok(());
    }

    // Old rows kept notes as text and everything else as a JSON object in
    // tracker. Fold both into one blob; legacy key names inside the blob are
    // the normalizer's problem, not ours.
    let mut stmt = conn.prepare("SELECT owner, date, notes, tracker FROM days")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);

    for (owner, date, notes, tracker) in rows {
        let mut blob = tracker
            .as_deref()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        blob.insert(
            "notes".to_string(),
            serde_json::Value::String(notes.unwrap_or_default()),
        );
        conn.execute(
            "UPDATE days SET record = ? WHERE owner = ? AND date = ?",
            rusqlite::params![serde_json::Value::Object(blob).to_string(), owner, date],
        )?;
    }

    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

use anyhow::Result;
use rusqlite::Connection;
use serde_json::Value;

use crate::db;
use crate::record::{self, PlannerRecord};

/// Whole-value key store for day records, keyed by `(owner, date)`. Reads
/// and writes complete blobs; no partial updates, no secondary indexes, no
/// transaction spanning a load-merge-save sequence.
pub trait DayStore {
    fn get(&self, owner: &str, date: &str) -> Result<Option<Vec<u8>>>;
    fn put(&mut self, owner: &str, date: &str, raw: &[u8]) -> Result<()>;
}

impl<S: DayStore + ?Sized> DayStore for &mut S {
    fn get(&self, owner: &str, date: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(owner, date)
    }

    fn put(&mut self, owner: &str, date: &str, raw: &[u8]) -> Result<()> {
        (**self).put(owner, date, raw)
    }
}

/// Load/merge/save engine for per-day planner records, built over an
/// injected `DayStore`. Storage errors propagate unchanged and are the only
/// way these operations fail; malformed stored data never surfaces — `load`
/// degrades to the canonical-default record instead, since planner content
/// is low-stakes and availability beats surfacing corruption.
pub struct RecordStore<S> {
    store: S,
}

impl<S: DayStore> RecordStore<S> {
    pub fn new(store: S) -> Self {
        RecordStore { store }
    }

    /// Fetch and normalize the record for `(owner, date)`. A missing or
    /// unparseable stored value yields the default record. Loading never
    /// writes anything back.
    pub fn load(&self, owner: &str, date: &str) -> Result<PlannerRecord> {
        let raw = self.store.get(owner, date)?;
        let parsed = raw
            .as_deref()
            .and_then(|bytes| serde_json::from_slice::<Value>(bytes).ok());
        Ok(record::normalize(parsed.as_ref()))
    }

    /// Merge `patch` onto the stored record and write the result back as a
    /// full overwrite. Returns the record as persisted. Concurrent saves for
    /// the same key are not coordinated; the last one to complete wins.
    pub fn merge_and_save(&mut self, owner: &str, date: &str, patch: &Value) -> Result<PlannerRecord> {
        let base = self.load(owner, date)?;
        let merged = record::merge(&base, patch);
        self.put_record(owner, date, &merged)?;
        Ok(merged)
    }

    /// Overwrite the record with canonical defaults. The row stays around;
    /// clearing is a save, not a delete.
    pub fn clear(&mut self, owner: &str, date: &str) -> Result<PlannerRecord> {
        let blank = PlannerRecord::default();
        self.put_record(owner, date, &blank)?;
        Ok(blank)
    }

    fn put_record(&mut self, owner: &str, date: &str, rec: &PlannerRecord) -> Result<()> {
        let raw = serde_json::to_vec(rec)?;
        self.store.put(owner, date, &raw)
    }
}

/// The production collaborator: day blobs in the workspace database.
pub struct SqliteDayStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDayStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        SqliteDayStore { conn }
    }
}

impl DayStore for SqliteDayStore<'_> {
    fn get(&self, owner: &str, date: &str) -> Result<Option<Vec<u8>>> {
        db::day_get_raw(self.conn, owner, date)
    }

    fn put(&mut self, owner: &str, date: &str, raw: &[u8]) -> Result<()> {
        db::day_put_raw(self.conn, owner, date, raw)
    }
}

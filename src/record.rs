use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Slots the daily tracker always carries, in render order.
pub const TRACKER_KEYS: [&str; 8] = ["1", "2", "3", "4", "5", "6", "7", "8"];

/// Hour labels the day view renders. Schedule entries are not limited to
/// these; the range only tells the UI which rows to draw.
pub const SCHEDULE_HOURS: [&str; 17] = [
    "06:00", "07:00", "08:00", "09:00", "10:00", "11:00", "12:00", "13:00", "14:00", "15:00",
    "16:00", "17:00", "18:00", "19:00", "20:00", "21:00", "22:00",
];

// Key renames applied to a stored record before defaulting. Old name on the
// left, canonical name on the right. A rename only fires when the canonical
// key is absent, so applying the table twice is a no-op. Future renames are
// one more row here, not another inline patch at a load site.
const RECORD_KEY_RENAMES: &[(&str, &str)] = &[
    ("abc_list", "tasks"),
    ("daily_tracker", "tracker"),
    ("appointments", "schedule"),
];

const TASK_KEY_RENAMES: &[(&str, &str)] = &[
    ("task", "description"),
    ("t", "description"),
    ("checked", "done"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    A,
    B,
    C,
}

impl Priority {
    /// Anything that is not recognizably A/B/C comes back as A.
    fn from_value(v: Option<&Value>) -> Priority {
        match v.and_then(Value::as_str).map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("b") => Priority::B,
            Some(s) if s.eq_ignore_ascii_case("c") => Priority::C,
            _ => Priority::A,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub priority: Priority,
    pub description: String,
    pub done: bool,
}

/// Canonical per-day planner record. Everything past the normalization
/// boundary operates on this type, never on loose JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerRecord {
    pub notes: String,
    pub quote: String,
    pub tasks: Vec<TaskEntry>,
    pub tracker: BTreeMap<String, String>,
    pub schedule: BTreeMap<String, String>,
}

impl Default for PlannerRecord {
    fn default() -> Self {
        PlannerRecord {
            notes: String::new(),
            quote: String::new(),
            tasks: Vec::new(),
            tracker: TRACKER_KEYS
                .iter()
                .map(|k| ((*k).to_string(), String::new()))
                .collect(),
            schedule: BTreeMap::new(),
        }
    }
}

impl PlannerRecord {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// Reconcile a possibly absent or legacy-shaped stored value into canonical
/// form. This is the only place untyped planner JSON is accepted; whatever
/// comes in, the result satisfies every record invariant. Running the output
/// through again yields the same record.
pub fn normalize(raw: Option<&Value>) -> PlannerRecord {
    let Some(obj) = raw.and_then(Value::as_object) else {
        return PlannerRecord::default();
    };
    let obj = apply_renames(obj, RECORD_KEY_RENAMES);

    let tasks = obj
        .get("tasks")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(normalize_task).collect())
        .unwrap_or_default();

    PlannerRecord {
        notes: string_field(&obj, "notes"),
        quote: string_field(&obj, "quote"),
        tasks,
        tracker: normalize_tracker(obj.get("tracker")),
        schedule: normalize_schedule(obj.get("schedule")),
    }
}

/// Apply a client patch on top of a canonical base record. Top-level fields
/// the patch names replace the base value outright, except `tracker`, which
/// merges key by key because slots are edited one at a time. Fields the
/// patch omits keep their base value, and a field with the wrong JSON type
/// counts as omitted. The merged result goes back through `normalize`, so a
/// malformed task entry in the patch cannot survive into storage.
pub fn merge(base: &PlannerRecord, patch: &Value) -> PlannerRecord {
    let Some(patch) = patch.as_object() else {
        return base.clone();
    };
    let mut merged = match base.to_value() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for key in ["notes", "quote"] {
        if let Some(v) = patch.get(key).filter(|v| v.is_string()) {
            merged.insert(key.to_string(), v.clone());
        }
    }
    if let Some(v) = patch.get("tasks").filter(|v| v.is_array()) {
        merged.insert("tasks".to_string(), v.clone());
    }
    // The legacy appointment-list shape is accepted here too; normalization
    // folds it into the canonical map.
    if let Some(v) = patch
        .get("schedule")
        .filter(|v| v.is_object() || v.is_array())
    {
        merged.insert("schedule".to_string(), v.clone());
    }
    if let Some(incoming) = patch.get("tracker").and_then(Value::as_object) {
        if let Some(Value::Object(slots)) = merged.get_mut("tracker") {
            for (k, v) in incoming {
                if v.is_string() {
                    slots.insert(k.clone(), v.clone());
                }
            }
        }
    }
    normalize(Some(&Value::Object(merged)))
}

fn apply_renames(obj: &Map<String, Value>, renames: &[(&str, &str)]) -> Map<String, Value> {
    let mut out = obj.clone();
    for (old, new) in renames {
        if out.contains_key(*new) {
            continue;
        }
        if let Some(v) = out.remove(*old) {
            out.insert((*new).to_string(), v);
        }
    }
    out
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn normalize_task(entry: &Value) -> Option<TaskEntry> {
    let obj = entry.as_object()?;
    let obj = apply_renames(obj, TASK_KEY_RENAMES);
    Some(TaskEntry {
        priority: Priority::from_value(obj.get("priority")),
        description: string_field(&obj, "description"),
        done: obj.get("done").and_then(Value::as_bool).unwrap_or(false),
    })
}

/// Rebuild the tracker as exactly the canonical slots, keeping stored string
/// values, defaulting the rest to empty, and dropping everything else.
fn normalize_tracker(raw: Option<&Value>) -> BTreeMap<String, String> {
    let stored = raw.and_then(Value::as_object);
    TRACKER_KEYS
        .iter()
        .map(|key| {
            let value = stored
                .and_then(|m| m.get(*key))
                .and_then(Value::as_str)
                .unwrap_or_default();
            ((*key).to_string(), value.to_string())
        })
        .collect()
}

/// Accepts the canonical time->text map or the legacy appointment list of
/// {"time", "text"} objects the original front end posted.
fn normalize_schedule(raw: Option<&Value>) -> BTreeMap<String, String> {
    match raw {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| {
                let obj = entry.as_object()?;
                let time = obj.get("time").and_then(Value::as_str)?.trim();
                if time.is_empty() {
                    return None;
                }
                let text = obj.get("text").and_then(Value::as_str).unwrap_or_default();
                Some((time.to_string(), text.to_string()))
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_input_yields_canonical_default() {
        let rec = normalize(None);
        assert_eq!(rec, PlannerRecord::default());
        assert_eq!(rec.tracker.len(), 8);
        assert!(rec.tracker.values().all(String::is_empty));
        assert!(rec.tasks.is_empty());
        assert!(rec.schedule.is_empty());
    }

    #[test]
    fn non_object_input_yields_canonical_default() {
        for v in [json!("scribble"), json!(17), json!([1, 2, 3]), json!(null)] {
            assert_eq!(normalize(Some(&v)), PlannerRecord::default());
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let shapes = [
            json!({}),
            json!({ "notes": "n", "tasks": [{ "task": "Buy milk", "checked": true }] }),
            json!({ "abc_list": [{ "t": "old", "priority": "b" }], "daily_tracker": { "2": "x", "9": "drop" } }),
            json!({ "appointments": [{ "time": "09:00", "text": "Dentist" }] }),
            json!({ "tracker": 5, "schedule": "oops", "tasks": "also oops" }),
        ];
        for shape in shapes {
            let once = normalize(Some(&shape));
            let twice = normalize(Some(&once.to_value()));
            assert_eq!(once, twice, "shape: {shape}");
        }
    }

    #[test]
    fn legacy_task_keys_migrate_without_losing_values() {
        let raw = json!({ "tasks": [{ "task": "Buy milk" }, { "t": "Call bank", "checked": true }] });
        let rec = normalize(Some(&raw));
        assert_eq!(rec.tasks.len(), 2);
        assert_eq!(rec.tasks[0].description, "Buy milk");
        assert_eq!(rec.tasks[0].priority, Priority::A);
        assert!(!rec.tasks[0].done);
        assert_eq!(rec.tasks[1].description, "Call bank");
        assert!(rec.tasks[1].done);
    }

    #[test]
    fn canonical_task_key_wins_over_legacy_alias() {
        let raw = json!({ "tasks": [{ "task": "stale", "description": "current" }] });
        let rec = normalize(Some(&raw));
        assert_eq!(rec.tasks[0].description, "current");
    }

    #[test]
    fn malformed_task_entries_are_dropped() {
        let raw = json!({ "tasks": ["free text", 3, { "description": "kept" }, null] });
        let rec = normalize(Some(&raw));
        assert_eq!(rec.tasks.len(), 1);
        assert_eq!(rec.tasks[0].description, "kept");
    }

    #[test]
    fn priority_defaults_to_a_and_accepts_lowercase() {
        let raw = json!({ "tasks": [
            { "description": "x", "priority": "b" },
            { "description": "y", "priority": "Z" },
            { "description": "z", "priority": 2 },
        ] });
        let rec = normalize(Some(&raw));
        assert_eq!(rec.tasks[0].priority, Priority::B);
        assert_eq!(rec.tasks[1].priority, Priority::A);
        assert_eq!(rec.tasks[2].priority, Priority::A);
    }

    #[test]
    fn tracker_is_rebuilt_to_exactly_the_canonical_slots() {
        let raw = json!({ "tracker": { "1": "water", "9": "extra", "theme": "dark", "3": 7 } });
        let rec = normalize(Some(&raw));
        assert_eq!(rec.tracker.len(), 8);
        assert_eq!(rec.tracker["1"], "water");
        assert_eq!(rec.tracker["2"], "");
        // Non-string slot values default like missing ones.
        assert_eq!(rec.tracker["3"], "");
        assert!(!rec.tracker.contains_key("9"));
        assert!(!rec.tracker.contains_key("theme"));
    }

    #[test]
    fn legacy_top_level_keys_migrate() {
        let raw = json!({
            "abc_list": [{ "task": "Plan week", "priority": "B" }],
            "daily_tracker": { "4": "run" },
            "appointments": [{ "time": "10:00", "text": "Standup" }, { "time": "  ", "text": "no slot" }],
        });
        let rec = normalize(Some(&raw));
        assert_eq!(rec.tasks.len(), 1);
        assert_eq!(rec.tasks[0].description, "Plan week");
        assert_eq!(rec.tasks[0].priority, Priority::B);
        assert_eq!(rec.tracker["4"], "run");
        assert_eq!(rec.schedule.len(), 1);
        assert_eq!(rec.schedule["10:00"], "Standup");
    }

    #[test]
    fn canonical_top_level_key_wins_over_legacy_alias() {
        let raw = json!({
            "tasks": [{ "description": "current" }],
            "abc_list": [{ "description": "stale" }],
        });
        let rec = normalize(Some(&raw));
        assert_eq!(rec.tasks.len(), 1);
        assert_eq!(rec.tasks[0].description, "current");
    }

    #[test]
    fn schedule_keeps_arbitrary_time_labels() {
        let raw = json!({ "schedule": { "05:30": "early", "22:00": "wind down", "flag": true } });
        let rec = normalize(Some(&raw));
        assert_eq!(rec.schedule.len(), 2);
        assert_eq!(rec.schedule["05:30"], "early");
        assert!(!rec.schedule.contains_key("flag"));
    }

    #[test]
    fn merge_replaces_named_fields_and_keeps_the_rest() {
        let base = normalize(Some(&json!({
            "notes": "keep me",
            "quote": "old quote",
            "tasks": [{ "description": "existing" }],
            "schedule": { "09:00": "existing appt" },
        })));
        let out = merge(&base, &json!({ "quote": "new quote" }));
        assert_eq!(out.quote, "new quote");
        assert_eq!(out.notes, "keep me");
        assert_eq!(out.tasks, base.tasks);
        assert_eq!(out.schedule, base.schedule);
    }

    #[test]
    fn merge_overwrites_lists_whole() {
        let base = normalize(Some(&json!({ "schedule": { "09:00": "Dentist", "14:00": "Gym" } })));
        let out = merge(&base, &json!({ "schedule": { "10:00": "Standup" } }));
        assert_eq!(out.schedule.len(), 1);
        assert_eq!(out.schedule["10:00"], "Standup");
    }

    #[test]
    fn merge_tracker_is_key_granular() {
        let base = merge(
            &PlannerRecord::default(),
            &json!({ "tracker": { "1": "a", "2": "b", "3": "c", "4": "d", "5": "e", "6": "f", "7": "g", "8": "h" } }),
        );
        let out = merge(&base, &json!({ "tracker": { "3": "Z" } }));
        assert_eq!(out.tracker["3"], "Z");
        for key in ["1", "2", "4", "5", "6", "7", "8"] {
            assert_eq!(out.tracker[key], base.tracker[key], "slot {key}");
        }
    }

    #[test]
    fn merge_tracker_drops_non_canonical_incoming_slots() {
        let out = merge(&PlannerRecord::default(), &json!({ "tracker": { "9": "x" } }));
        assert!(!out.tracker.contains_key("9"));
        assert_eq!(out.tracker.len(), 8);
    }

    #[test]
    fn merge_treats_mistyped_fields_as_absent() {
        let base = normalize(Some(&json!({
            "notes": "base notes",
            "tasks": [{ "description": "base task" }],
            "tracker": { "2": "kept" },
        })));
        let out = merge(
            &base,
            &json!({ "notes": 5, "tasks": "not a list", "schedule": "nope", "tracker": { "2": 9 } }),
        );
        assert_eq!(out, base);
    }

    #[test]
    fn merge_with_non_object_patch_is_a_no_op() {
        let base = normalize(Some(&json!({ "notes": "n" })));
        assert_eq!(merge(&base, &json!(null)), base);
        assert_eq!(merge(&base, &json!("text")), base);
    }

    #[test]
    fn merge_normalizes_incoming_task_entries() {
        let out = merge(
            &PlannerRecord::default(),
            &json!({ "tasks": [{ "task": "legacy key", "priority": "c" }, "garbage"] }),
        );
        assert_eq!(out.tasks.len(), 1);
        assert_eq!(out.tasks[0].description, "legacy key");
        assert_eq!(out.tasks[0].priority, Priority::C);
    }

    #[test]
    fn merge_accepts_legacy_appointment_list() {
        let out = merge(
            &PlannerRecord::default(),
            &json!({ "schedule": [{ "time": "07:00", "text": "Run" }] }),
        );
        assert_eq!(out.schedule["07:00"], "Run");
    }

    #[test]
    fn task_order_survives_normalization_and_merge() {
        let patch = json!({ "tasks": [
            { "description": "third", "priority": "C" },
            { "description": "first", "priority": "A" },
            { "description": "second", "priority": "B" },
        ] });
        let out = merge(&PlannerRecord::default(), &patch);
        let order: Vec<&str> = out.tasks.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(order, ["third", "first", "second"]);
    }
}

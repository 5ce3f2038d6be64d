
use serde_json::json;
use test_support::{error_code, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("plannerd-router-smoke");
    let bundle_out = workspace.join("smoke-backup.plannerbackup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let login = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "users.login",
        json!({ "email": "smoke@example.com" }),
    );
    let user_id = login
        .get("user")
        .and_then(|u| u.get("id"))
        .and_then(|v| v.as_str())
        .expect("user id")
        .to_string();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "users.get",
        json!({ "userId": user_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "day.save",
        json!({ "userId": user_id, "date": "2026-08-08", "patch": { "notes": "smoke" } }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "day.load",
        json!({ "userId": user_id, "date": "2026-08-08" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "backup.exportWorkspaceBundle",
        json!({ "outPath": bundle_out.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "backup.importWorkspaceBundle",
        json!({ "inPath": bundle_out.to_string_lossy() }),
    );

    // The restored database still serves the record saved before export.
    let loaded = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "day.load",
        json!({ "userId": user_id, "date": "2026-08-08" }),
    );
    assert_eq!(
        loaded
            .get("day")
            .and_then(|d| d.get("notes"))
            .and_then(|v| v.as_str()),
        Some("smoke")
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "day.clear",
        json!({ "userId": user_id, "date": "2026-08-08" }),
    );

    let unknown = request(
        &mut stdin,
        &mut reader,
        "11",
        "planner.doesNotExist",
        json!({}),
    );
    assert_eq!(error_code(&unknown), "not_implemented");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

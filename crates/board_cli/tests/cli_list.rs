use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskboard-{nanos}-{file_name}"))
}

fn run_offline(store_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_taskboard"))
        .args(args)
        .env("TASKBOARD_API_URL", "http://127.0.0.1:1/api")
        .env("TASKBOARD_STORE_DIR", store_dir)
        .env("TASKBOARD_CONFIG_PATH", store_dir.join("missing-config.json"))
        .env_remove("TASKBOARD_AUTH_TOKEN")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run taskboard")
}

fn json_ids(output: &Output) -> Vec<i64> {
    let tasks: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    tasks
        .as_array()
        .expect("task array")
        .iter()
        .map(|task| task["id"].as_i64().expect("numeric id"))
        .collect()
}

#[test]
fn board_shows_seeded_columns() {
    let store_dir = temp_path("cli-board");

    let output = run_offline(&store_dir, &["board"]);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("To Do (2)"));
    assert!(stdout.contains("In Progress (1)"));
    assert!(stdout.contains("Done (1)"));
    assert!(stdout.contains("#4 Setup API integration [low]"));
}

#[test]
fn first_run_writes_the_seed_into_the_store() {
    let store_dir = temp_path("cli-seed");

    let output = run_offline(&store_dir, &["list", "--json"]);
    let stored = std::fs::read_to_string(store_dir.join("taskboard_tasks.json")).unwrap();
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    assert_eq!(json_ids(&output), vec![1, 2, 3, 4]);
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored.as_array().unwrap().len(), 4);
    assert_eq!(stored[1]["status"], "in-progress");
    assert_eq!(stored[1]["dueDate"], "2025-08-05");
}

#[test]
fn list_filters_by_status_and_search() {
    let store_dir = temp_path("cli-filter");

    let todo = run_offline(&store_dir, &["list", "--status", "todo", "--json"]);
    let search = run_offline(&store_dir, &["list", "--search", "DASHBOARD", "--json"]);
    let none = run_offline(&store_dir, &["list", "--search", "nothing like this"]);
    std::fs::remove_dir_all(&store_dir).ok();

    assert_eq!(json_ids(&todo), vec![3, 4]);
    assert_eq!(json_ids(&search), vec![2]);
    assert!(String::from_utf8_lossy(&none.stdout).contains("No tasks"));
}

#[test]
fn list_plain_prints_a_table() {
    let store_dir = temp_path("cli-list-plain");

    let output = run_offline(&store_dir, &["list"]);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Title"));
    assert!(stdout.contains("Setup authentication system"));
    assert!(stdout.contains("Jane Smith"));
}

#[test]
fn stats_count_each_column() {
    let store_dir = temp_path("cli-stats");

    let json = run_offline(&store_dir, &["stats", "--json"]);
    let plain = run_offline(&store_dir, &["stats"]);
    std::fs::remove_dir_all(&store_dir).ok();

    let stats: serde_json::Value = serde_json::from_slice(&json.stdout).unwrap();
    assert_eq!(
        stats,
        serde_json::json!({ "total": 4, "todo": 2, "in-progress": 1, "done": 1 })
    );
    assert!(
        String::from_utf8_lossy(&plain.stdout)
            .contains("Total: 4 | To Do: 2 | In Progress: 1 | Done: 1")
    );
}

#[test]
fn board_json_groups_by_column() {
    let store_dir = temp_path("cli-board-json");

    let output = run_offline(&store_dir, &["board", "--json"]);
    std::fs::remove_dir_all(&store_dir).ok();

    let board: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(board["todo"].as_array().unwrap().len(), 2);
    assert_eq!(board["in-progress"][0]["title"], "Create dashboard UI");
    assert_eq!(board["done"][0]["id"], 1);
}

#[test]
fn corrupt_store_is_reseeded() {
    let store_dir = temp_path("cli-corrupt");
    std::fs::create_dir_all(&store_dir).unwrap();
    std::fs::write(store_dir.join("taskboard_tasks.json"), "{ not json").unwrap();

    let output = run_offline(&store_dir, &["list", "--json"]);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    assert_eq!(json_ids(&output), vec![1, 2, 3, 4]);
}

#[test]
fn unknown_status_filter_is_invalid_input() {
    let store_dir = temp_path("cli-bad-status");

    let output = run_offline(&store_dir, &["list", "--status", "blocked"]);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
}

#[test]
fn namespace_override_selects_another_slot() {
    let store_dir = temp_path("cli-namespace");

    let output = run_offline(
        &store_dir,
        &["list", "--config-override", "namespace=work", "--json"],
    );
    let exists = store_dir.join("work.json").exists();
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    assert!(exists);
}

#[test]
fn namespace_with_a_path_is_rejected() {
    let store_dir = temp_path("cli-namespace-escape");

    let output = run_offline(
        &store_dir,
        &["list", "--config-override", "namespace=../escape"],
    );
    let escaped = std::env::temp_dir().join("escape.json").exists();
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(!output.status.success());
    assert!(!escaped);
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: invalid_input - namespace"));
}

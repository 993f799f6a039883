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

fn stored_tasks(store_dir: &Path) -> Vec<serde_json::Value> {
    let content = std::fs::read_to_string(store_dir.join("taskboard_tasks.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn stored_task(store_dir: &Path, id: i64) -> Option<serde_json::Value> {
    stored_tasks(store_dir)
        .into_iter()
        .find(|task| task["id"] == id)
}

#[test]
fn add_creates_a_task_in_the_local_store() {
    let store_dir = temp_path("cli-add");

    let output = run_offline(
        &store_dir,
        &[
            "add",
            "Write release notes",
            "--priority",
            "high",
            "--assignee",
            "Jane Smith",
            "--minutes",
            "30",
            "--json",
        ],
    );
    let stored = stored_tasks(&store_dir);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    let task: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(task["title"], "Write release notes");
    assert_eq!(task["status"], "todo");
    assert_eq!(task["priority"], "high");
    assert_eq!(task["totalMinutes"], 30);
    assert!(task["id"].as_i64().unwrap() > 4);
    assert!(task["createdAt"].is_string());
    assert_eq!(stored.len(), 5);
    assert_eq!(stored[4], task);
}

#[test]
fn add_plain_prints_confirmation() {
    let store_dir = temp_path("cli-add-plain");

    let output = run_offline(&store_dir, &["add", "demo task"]);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Added task: demo task ("));
}

#[test]
fn add_without_title_fails() {
    let store_dir = temp_path("cli-add-empty");

    let missing = run_offline(&store_dir, &["add"]);
    let blank = run_offline(&store_dir, &["add", "   "]);
    std::fs::remove_dir_all(&store_dir).ok();

    for output in [missing, blank] {
        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("ERROR: invalid_input - Task title is required"));
    }
}

#[test]
fn edit_merges_supplied_fields() {
    let store_dir = temp_path("cli-edit");

    let output = run_offline(
        &store_dir,
        &["edit", "3", "Manage tasks", "--due", "2025-09-01"],
    );
    let task = stored_task(&store_dir, 3).unwrap();
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Updated task: Manage tasks (3)"));
    assert_eq!(task["title"], "Manage tasks");
    assert_eq!(task["dueDate"], "2025-09-01");
    assert_eq!(task["assignee"], "Bob Johnson");
    assert_eq!(task["priority"], "high");
}

#[test]
fn edit_without_fields_is_rejected() {
    let store_dir = temp_path("cli-edit-empty");

    let output = run_offline(&store_dir, &["edit", "3"]);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr)
            .contains("ERROR: invalid_input - Nothing to update")
    );
}

#[test]
fn delete_removes_the_task() {
    let store_dir = temp_path("cli-delete");

    let output = run_offline(&store_dir, &["delete", "1"]);
    let stored = stored_tasks(&store_dir);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Task deleted from local store"));
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().all(|task| task["id"] != 1));
}

#[test]
fn status_change_is_persisted() {
    let store_dir = temp_path("cli-status");

    let output = run_offline(&store_dir, &["status", "3", "in-progress"]);
    let task = stored_task(&store_dir, 3).unwrap();
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stdout)
            .contains("Moved task: Add task management (3) to In Progress")
    );
    assert_eq!(task["status"], "in-progress");
    assert!(task["updatedAt"].is_string());
}

#[test]
fn status_of_unknown_task_is_not_found() {
    let store_dir = temp_path("cli-status-missing");

    let output = run_offline(&store_dir, &["status", "99", "done"]);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: not_found - task 99"));
}

#[test]
fn move_to_column_changes_status() {
    let store_dir = temp_path("cli-move-column");

    let output = run_offline(&store_dir, &["move", "4", "--to", "done", "--json"]);
    let task = stored_task(&store_dir, 4).unwrap();
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    let printed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(printed["status"], "done");
    assert_eq!(task["status"], "done");
}

#[test]
fn move_onto_task_in_another_column_adopts_its_status() {
    let store_dir = temp_path("cli-move-onto");

    let output = run_offline(&store_dir, &["move", "1", "--onto", "3"]);
    let task = stored_task(&store_dir, 1).unwrap();
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    assert_eq!(task["status"], "todo");
}

#[test]
fn move_to_the_same_column_stays_in_place() {
    let store_dir = temp_path("cli-move-noop");

    let output = run_offline(&store_dir, &["move", "3", "--to", "todo"]);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Task 3 stayed in place"));
}

#[test]
fn move_onto_unknown_task_is_not_found() {
    let store_dir = temp_path("cli-move-missing");

    let output = run_offline(&store_dir, &["move", "3", "--onto", "42"]);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: not_found"));
}

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskboard-{nanos}-{file_name}"))
}

fn run_interactive(input: &str) -> std::process::Output {
    let exe = env!("CARGO_BIN_EXE_taskboard");
    let store_dir = temp_path("cli-interactive");

    let mut child = Command::new(exe)
        .env("TASKBOARD_API_URL", "http://127.0.0.1:1/api")
        .env("TASKBOARD_STORE_DIR", &store_dir)
        .env("TASKBOARD_CONFIG_PATH", store_dir.join("missing-config.json"))
        .env_remove("TASKBOARD_AUTH_TOKEN")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn interactive session");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    let output = child
        .wait_with_output()
        .expect("failed to read interactive output");

    std::fs::remove_dir_all(&store_dir).ok();
    output
}

fn last_json_line(stdout: &[u8]) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(stdout);
    let line = stdout
        .lines()
        .rev()
        .find(|line| line.starts_with('[') || line.starts_with('{'))
        .expect("json line");
    serde_json::from_str(line).unwrap()
}

#[test]
fn interactive_help_shows_usage() {
    let output = run_interactive("help\nexit\n");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage") || stdout.contains("USAGE"));
}

#[test]
fn interactive_question_mark_shows_usage() {
    let output = run_interactive("?\nquit\n");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage") || stdout.contains("USAGE"));
}

#[test]
fn interactive_invalid_command_prints_error() {
    let output = run_interactive("nope\nexit\n");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
}

#[test]
fn interactive_unterminated_quote_prints_error() {
    let output = run_interactive("add \"half open\nexit\n");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input - unterminated quote in command"));
}

#[test]
fn interactive_add_command_succeeds() {
    let output = run_interactive("add \"demo task\"\nexit\n");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Added task: demo task"));
}

#[test]
fn interactive_session_keeps_client_side_order() {
    let output = run_interactive("move 4 --onto 3\nlist --status todo --json\nexit\n");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Moved task: Setup API integration (4) to To Do"));
    let ids: Vec<i64> = last_json_line(&output.stdout)
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![4, 3]);
}

#[test]
fn interactive_reload_discards_client_side_order() {
    let output =
        run_interactive("move 4 --onto 3\nreload\nlist --status todo --json\nexit\n");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Loaded 4 tasks"));
    let ids: Vec<i64> = last_json_line(&output.stdout)
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![3, 4]);
}

#[test]
fn interactive_errors_do_not_end_the_session() {
    let output = run_interactive("status 99 done\nstats --json\nexit\n");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: not_found"));
    assert_eq!(last_json_line(&output.stdout)["total"], 4);
}

#[test]
fn interactive_rejects_config_overrides() {
    let output = run_interactive("list --config-override namespace=other\nexit\n");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--config-override is only accepted when starting taskboard"));
}

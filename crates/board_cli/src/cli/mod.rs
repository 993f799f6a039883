use board_core::config::ConfigOverrides;
use board_core::model::{Priority, TaskId, TaskPatch, TaskStatus};
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "taskboard", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the three columns side by side
    ///
    /// Example: taskboard board
    Board,
    /// List tasks in board order
    ///
    /// Example: taskboard list --status todo
    /// Example: taskboard list --search dashboard
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Count tasks per column
    ///
    /// Example: taskboard stats
    Stats,
    /// Add a new task
    ///
    /// Example: taskboard add "Write release notes" --priority high
    Add {
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Edit a task
    ///
    /// Example: taskboard edit 3 "Add task management" --assignee "Jane Smith"
    Edit {
        id: TaskId,
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Delete a task
    ///
    /// Example: taskboard delete 3
    Delete { id: TaskId },
    /// Change the column of a task
    ///
    /// Example: taskboard status 3 in-progress
    Status { id: TaskId, status: TaskStatus },
    /// Drag a task onto a column or onto another task
    ///
    /// Example: taskboard move 3 --to done
    /// Example: taskboard move 4 --onto 3
    Move {
        id: TaskId,
        #[command(flatten)]
        target: MoveTarget,
    },
    /// Reload the board from the task store
    ///
    /// Example: taskboard reload
    Reload,
}

#[derive(Args, Debug, Default, Clone)]
pub struct TaskFields {
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub status: Option<TaskStatus>,
    #[arg(long)]
    pub priority: Option<Priority>,
    #[arg(long)]
    pub assignee: Option<String>,
    /// Due date, e.g. 2025-08-05
    #[arg(long = "due", value_name = "DATE")]
    pub due_date: Option<String>,
    #[arg(long)]
    pub minutes: Option<u32>,
}

impl TaskFields {
    pub fn into_patch(self, title: Option<String>) -> TaskPatch {
        TaskPatch {
            title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            assignee: self.assignee,
            due_date: self.due_date,
            total_minutes: self.minutes,
            ..TaskPatch::default()
        }
    }
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct MoveTarget {
    /// Drop on the background of a column
    #[arg(long, value_name = "STATUS")]
    pub to: Option<TaskStatus>,
    /// Drop on another task's card
    #[arg(long, value_name = "ID")]
    pub onto: Option<TaskId>,
}

/// Flag name used to identify config override arguments by the runtime.
pub const CONFIG_OVERRIDE_FLAG: &str = "--config-override";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    ApiUrl,
    AuthToken,
    TimeoutSecs,
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match field.as_str() {
        "api_url" | "url" => ConfigOverrideTarget::ApiUrl,
        "auth_token" | "token" => ConfigOverrideTarget::AuthToken,
        "timeout_secs" | "timeout" => ConfigOverrideTarget::TimeoutSecs,
        "namespace" => ConfigOverrideTarget::Namespace,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride {
        target,
        value: value_raw.trim().to_string(),
    })
}

/// Folds every `--config-override` into one set; later values win.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::ApiUrl => overrides.api_url = Some(parsed.value),
            ConfigOverrideTarget::AuthToken => overrides.auth_token = Some(parsed.value),
            ConfigOverrideTarget::TimeoutSecs => {
                let secs = parsed.value.parse::<u64>().map_err(|_| {
                    format!("timeout_secs must be a whole number, got '{}'", parsed.value)
                })?;
                overrides.timeout_secs = Some(secs);
            }
            ConfigOverrideTarget::Namespace => overrides.namespace = Some(parsed.value),
        }
    }
    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

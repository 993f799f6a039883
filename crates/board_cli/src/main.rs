mod cli;

use board_core::board::{Board, BoardStats, TaskFilter};
use board_core::config::{self, merge_overrides};
use board_core::drag::{DragInterpreter, DropTarget, GestureEvent, GestureSource, MutationIntent};
use board_core::error::AppError;
use board_core::model::{Task, TaskId, TaskStatus};
use board_core::remote::HttpTaskApi;
use board_core::sync::{SyncController, SyncOutcome};
use board_core::task_api::PersistenceAdapter;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use cli::{CONFIG_OVERRIDE_FLAG, Cli, Command, MoveTarget, collect_overrides};
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

type Repository = PersistenceAdapter<HttpTaskApi>;

/// Board, drag state and sync controller for one process. Interactive mode keeps it
/// between commands.
struct Session {
    sync: SyncController<Repository>,
    board: Board,
    drag: DragInterpreter,
    loaded: bool,
}

impl Session {
    fn open(raw_overrides: &[String]) -> Result<Self, AppError> {
        let load = config::load_config_with_fallback();
        if let Some(err) = &load.error {
            warn!(error = %err, "config ignored, using defaults");
        }
        let overrides = collect_overrides(raw_overrides).map_err(AppError::invalid_input)?;
        let config = merge_overrides(&load.config, &overrides);

        Ok(Self {
            sync: SyncController::new(PersistenceAdapter::from_config(&config)?),
            board: Board::new(),
            drag: DragInterpreter::new(),
            loaded: false,
        })
    }

    async fn ensure_loaded(&mut self) -> Result<(), AppError> {
        if !self.loaded {
            self.sync.reload(&mut self.board).await?;
            self.loaded = true;
        }
        Ok(())
    }

    fn require_task(&self, id: &TaskId) -> Result<&Task, AppError> {
        self.board
            .get(id)
            .ok_or_else(|| AppError::not_found(format!("task {id} is not on the board")))
    }

    /// Replays a pointer drag of `id` onto the requested target.
    fn drag(&mut self, id: TaskId, target: MoveTarget) -> Result<MutationIntent, AppError> {
        let drop = match (target.to, target.onto) {
            (Some(status), _) => DropTarget::Column(status),
            (None, Some(onto)) => {
                self.require_task(&onto)?;
                DropTarget::Task(onto)
            }
            (None, None) => return Err(AppError::invalid_input("move needs --to or --onto")),
        };

        let events = [
            GestureEvent::Start {
                id,
                source: GestureSource::Pointer,
            },
            GestureEvent::Move {
                candidates: vec![drop],
            },
            GestureEvent::End,
        ];
        let mut intent = MutationIntent::NoOp;
        for event in events {
            if let Some(result) = self.drag.handle(&mut self.board, event) {
                intent = result;
            }
        }
        Ok(intent)
    }
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Priority")]
    priority: &'static str,
    #[tabled(rename = "Assignee")]
    assignee: String,
    #[tabled(rename = "Due")]
    due: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            title: task.title.clone(),
            status: task.status.title(),
            priority: task.priority.label(),
            assignee: or_dash(&task.assignee),
            due: or_dash(&task.due_date),
        }
    }
}

fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn card(task: &Task) -> String {
    format!("#{} {} [{}]", task.id, task.title, task.priority)
}

fn print_board(board: &Board) {
    let columns = board.group_by_status();
    let depth = columns
        .iter()
        .map(|column| column.tasks.len())
        .max()
        .unwrap_or(0);

    let mut builder = Builder::default();
    builder.push_record(
        columns
            .iter()
            .map(|column| format!("{} ({})", column.status.title(), column.tasks.len())),
    );
    for row in 0..depth {
        builder.push_record(columns.iter().map(|column| {
            column
                .tasks
                .get(row)
                .map(|task| card(task))
                .unwrap_or_default()
        }));
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");
}

fn print_board_json(board: &Board) {
    let mut payload = serde_json::Map::new();
    for column in board.group_by_status() {
        payload.insert(
            column.status.label().to_string(),
            serde_json::json!(column.tasks),
        );
    }
    println!("{}", serde_json::Value::Object(payload));
}

fn print_tasks_plain(tasks: &[&Task]) {
    if tasks.is_empty() {
        println!("No tasks");
        return;
    }
    let mut table = Table::new(tasks.iter().map(|task| TaskRow::from(*task)));
    table.with(Style::rounded());
    println!("{table}");
}

fn print_tasks_json(tasks: &[&Task]) {
    println!("{}", serde_json::json!(tasks));
}

fn print_task_json(task: &Task) {
    println!("{}", serde_json::json!(task));
}

fn print_stats(stats: BoardStats, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "total": stats.total,
                "todo": stats.todo,
                "in-progress": stats.in_progress,
                "done": stats.done,
            })
        );
    } else {
        println!(
            "Total: {} | {}: {} | {}: {} | {}: {}",
            stats.total,
            TaskStatus::Todo.title(),
            stats.todo,
            TaskStatus::InProgress.title(),
            stats.in_progress,
            TaskStatus::Done.title(),
            stats.done
        );
    }
}

/// Reports a sync result. A reload notice goes to stderr; an unrecovered board is an error.
fn report_outcome(
    outcome: SyncOutcome,
    board: &Board,
    id: &TaskId,
    json: bool,
) -> Result<(), AppError> {
    match outcome {
        SyncOutcome::Unrecovered { notice } => Err(AppError::request_failed(notice)),
        SyncOutcome::Resynced { notice } => {
            eprintln!("NOTICE: {notice}");
            Ok(())
        }
        SyncOutcome::Unchanged => {
            if !json {
                println!("Task {id} stayed in place");
            }
            Ok(())
        }
        SyncOutcome::Reordered | SyncOutcome::Confirmed(_) | SyncOutcome::Superseded => {
            if let Some(task) = board.get(id) {
                if json {
                    print_task_json(task);
                } else {
                    println!(
                        "Moved task: {} ({}) to {}",
                        task.title,
                        task.id,
                        task.status.title()
                    );
                }
            }
            Ok(())
        }
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

async fn run_command(session: &mut Session, command: Command, json: bool) -> Result<(), AppError> {
    if let Command::Reload = command {
        let count = session.sync.reload(&mut session.board).await?;
        session.loaded = true;
        if json {
            println!("{}", serde_json::json!({ "tasks": count }));
        } else {
            println!("Loaded {count} tasks");
        }
        return Ok(());
    }

    session.ensure_loaded().await?;

    match command {
        Command::Board => {
            if json {
                print_board_json(&session.board);
            } else {
                print_board(&session.board);
            }
        }
        Command::List { status, search } => {
            let filter = TaskFilter {
                query: search,
                status,
            };
            let tasks = session.board.filter(&filter);
            if json {
                print_tasks_json(&tasks);
            } else {
                print_tasks_plain(&tasks);
            }
        }
        Command::Stats => print_stats(session.board.stats(), json),
        Command::Add { title, fields } => {
            let task = session
                .sync
                .create(&mut session.board, fields.into_patch(title))
                .await?;
            if json {
                print_task_json(&task);
            } else {
                println!("Added task: {} ({})", task.title, task.id);
            }
        }
        Command::Edit { id, title, fields } => {
            let task = session
                .sync
                .update(&mut session.board, &id, fields.into_patch(title))
                .await?;
            if json {
                print_task_json(&task);
            } else {
                println!("Updated task: {} ({})", task.title, task.id);
            }
        }
        Command::Delete { id } => {
            let ack = session.sync.delete(&mut session.board, &id).await?;
            let message = ack
                .message
                .unwrap_or_else(|| format!("Deleted task {id}"));
            if json {
                println!("{}", serde_json::json!({ "id": id, "message": message }));
            } else {
                println!("{message}");
            }
        }
        Command::Status { id, status } => {
            session.require_task(&id)?;
            let outcome = session
                .sync
                .change_status(&mut session.board, &id, status)
                .await;
            report_outcome(outcome, &session.board, &id, json)?;
        }
        Command::Move { id, target } => {
            session.require_task(&id)?;
            let intent = session.drag(id.clone(), target)?;
            let outcome = session.sync.apply(&mut session.board, intent).await;
            report_outcome(outcome, &session.board, &id, json)?;
        }
        Command::Reload => {}
    }

    Ok(())
}

async fn run_interactive(session: &mut Session) -> Result<(), AppError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(input) = lines
        .next_line()
        .await
        .map_err(|err| AppError::io(err.to_string()))?
    {
        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {err}");
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("taskboard".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if !cli.config_override.is_empty() {
            eprintln!(
                "ERROR: {}",
                AppError::invalid_input(format!(
                    "{CONFIG_OVERRIDE_FLAG} is only accepted when starting taskboard"
                ))
            );
            continue;
        }

        if let Err(err) = run_command(session, cli.command, cli.json).await {
            eprintln!("ERROR: {err}");
        }
    }

    Ok(())
}

async fn run(interactive: bool) -> Result<(), AppError> {
    if interactive {
        let mut session = Session::open(&[])?;
        return run_interactive(&mut session).await;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => return Err(normalize_parse_error(err)),
    };
    let mut session = Session::open(&cli.config_override)?;
    run_command(&mut session, cli.command, cli.json).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();

    let mut args = std::env::args_os();
    args.next();
    let interactive = args.next().is_none();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("ERROR: {}", AppError::io(err.to_string()));
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run(interactive)) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

use crate::model::{Priority, Task, TaskStatus};

#[allow(clippy::too_many_arguments)]
fn seed(
    id: i64,
    title: &str,
    description: &str,
    status: TaskStatus,
    priority: Priority,
    assignee: &str,
    due_date: &str,
    created_at: &str,
) -> Task {
    Task {
        id: id.into(),
        title: title.to_string(),
        description: description.to_string(),
        status,
        priority,
        assignee: assignee.to_string(),
        due_date: due_date.to_string(),
        total_minutes: 0,
        created_at: Some(created_at.to_string()),
        updated_at: Some(created_at.to_string()),
    }
}

/// Tasks written into an empty local store so the board is never blank.
pub fn seed_tasks() -> Vec<Task> {
    vec![
        seed(
            1,
            "Setup authentication system",
            "Implement login and signup functionality",
            TaskStatus::Done,
            Priority::High,
            "John Doe",
            "2025-07-30",
            "2025-07-25",
        ),
        seed(
            2,
            "Create dashboard UI",
            "Design and implement the main dashboard interface",
            TaskStatus::InProgress,
            Priority::Medium,
            "Jane Smith",
            "2025-08-05",
            "2025-07-26",
        ),
        seed(
            3,
            "Add task management",
            "Implement CRUD operations for tasks",
            TaskStatus::Todo,
            Priority::High,
            "Bob Johnson",
            "2025-08-10",
            "2025-07-27",
        ),
        seed(
            4,
            "Setup API integration",
            "Connect frontend with backend APIs",
            TaskStatus::Todo,
            Priority::Low,
            "Alice Brown",
            "2025-08-15",
            "2025-07-28",
        ),
    ]
}

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal and non-terminal states of a generation task, as surfaced to the
/// user. Cancellation is a distinct terminal state, not an error.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded { nodes: usize },
    Failed { reason: String },
    Cancelled,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Succeeded { nodes } => write!(f, "succeeded ({nodes} nodes)"),
            TaskStatus::Failed { reason } => write!(f, "failed: {reason}"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskEvent {
    pub task: String,
    pub status: TaskStatus,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub scope: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    Task(TaskEvent),
    Diagnostic(DiagnosticEvent),
}

impl Event {
    pub fn task(task: impl Into<String>, status: TaskStatus) -> Self {
        Event::Task(TaskEvent {
            task: task.into(),
            status,
            at: Utc::now(),
        })
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
            at: Utc::now(),
        })
    }

    pub fn scope_label(&self) -> &str {
        match self {
            Event::Task(e) => &e.task,
            Event::Diagnostic(e) => &e.scope,
        }
    }

    /// The task status carried by this event, when it is a task event.
    pub fn task_status(&self) -> Option<&TaskStatus> {
        match self {
            Event::Task(e) => Some(&e.status),
            Event::Diagnostic(_) => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Task(e) => write!(f, "[{}] {}", e.task, e.status),
            Event::Diagnostic(e) => write!(f, "[{}] {}", e.scope, e.message),
        }
    }
}

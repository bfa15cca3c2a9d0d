//! Error types for router-scheduler

use thiserror::Error;

/// Scheduling errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Schedule definition could not be interpreted
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// A task with this id is already scheduled
    #[error("Task {0} is already scheduled")]
    DuplicateTask(String),

    /// No task with this id is scheduled
    #[error("Task {0} is not scheduled")]
    TaskNotFound(String),
}

/// Result type alias for scheduling operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
